//! Property tests for the report decoder.
//!
//! Verifies invariants across a wide range of inputs using `proptest`.

use dualshock::controller::{decode, ControllerError, DPadDirection, MIN_REPORT_LEN, REPORT_LEN};
use proptest::prelude::*;

fn report() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), REPORT_LEN)
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(500))]

    /// Decoding is pure: the same bytes always give the same state.
    #[test]
    fn prop_decode_is_deterministic(data in report()) {
        let first = decode(&data).expect("64-byte report must decode");
        let second = decode(&data).expect("64-byte report must decode");
        prop_assert_eq!(first, second);
    }

    /// Bytes past the last decoded offset never influence the result.
    #[test]
    fn prop_trailing_bytes_ignored(data in report(), tail in proptest::collection::vec(any::<u8>(), 21)) {
        let mut altered = data.clone();
        altered[MIN_REPORT_LEN..].copy_from_slice(&tail);
        prop_assert_eq!(
            decode(&data).expect("decode original"),
            decode(&altered).expect("decode altered")
        );
    }

    /// Any buffer shorter than the minimum is rejected with its length.
    #[test]
    fn prop_short_buffers_rejected(len in 0usize..MIN_REPORT_LEN) {
        let data = vec![0u8; len];
        let is_invalid_report = matches!(
            decode(&data),
            Err(ControllerError::InvalidReport { got, need }) if got == len && need == MIN_REPORT_LEN
        );
        prop_assert!(is_invalid_report, "{}-byte buffer must be rejected", len);
    }

    /// Hat codes 8..=15 leave every direction released.
    #[test]
    fn prop_neutral_hat_codes(data in report(), code in 8u8..16) {
        let mut data = data;
        data[5] = (data[5] & 0xf0) | code;
        let state = decode(&data).expect("decode");
        prop_assert!(!state.up && !state.down && !state.left && !state.right);
        prop_assert_eq!(state.dpad(), DPadDirection::Neutral);
    }

    /// Diagonal codes set exactly two adjacent directions, cardinal codes exactly one.
    #[test]
    fn prop_hat_direction_count(data in report(), code in 0u8..8) {
        let mut data = data;
        data[5] = (data[5] & 0xf0) | code;
        let state = decode(&data).expect("decode");
        let pressed = [state.up, state.right, state.down, state.left]
            .iter()
            .filter(|pressed| **pressed)
            .count();
        let expected = if code % 2 == 1 { 2 } else { 1 };
        prop_assert_eq!(pressed, expected, "hat code {}", code);
        prop_assert!(!(state.up && state.down));
        prop_assert!(!(state.left && state.right));
    }

    /// Accelerometer X/Z and gyro roll are negated, the rest pass through.
    #[test]
    fn prop_sensor_signs(x in any::<i16>(), y in any::<i16>(), roll in any::<i16>(), yaw in any::<i16>()) {
        let mut data = vec![0u8; REPORT_LEN];
        data[13..15].copy_from_slice(&y.to_le_bytes());
        data[15..17].copy_from_slice(&x.to_le_bytes());
        data[19..21].copy_from_slice(&roll.to_le_bytes());
        data[21..23].copy_from_slice(&yaw.to_le_bytes());
        let state = decode(&data).expect("decode");
        prop_assert_eq!(state.motion.x, x.wrapping_neg());
        prop_assert_eq!(state.motion.y, y);
        prop_assert_eq!(state.orientation.roll, roll.wrapping_neg());
        prop_assert_eq!(state.orientation.yaw, yaw);
    }

    /// Touch coordinates always fit in 12 bits and IDs in 7.
    #[test]
    fn prop_touch_ranges(data in report()) {
        let state = decode(&data).expect("decode");
        for touch in [state.touch0, state.touch1] {
            prop_assert!(touch.x <= 0x0fff);
            prop_assert!(touch.y <= 0x0fff);
            prop_assert!(touch.id <= 0x7f);
        }
        prop_assert_eq!(state.touch0.active, data[35] & 0x80 == 0);
        prop_assert_eq!(state.touch1.active, data[39] & 0x80 == 0);
    }
}

#[test]
fn positive_motion_x_becomes_negative() -> Result<(), ControllerError> {
    let mut data = [0u8; REPORT_LEN];
    data[15..17].copy_from_slice(&100i16.to_le_bytes());
    assert_eq!(decode(&data)?.motion.x, -100);
    Ok(())
}

#[test]
fn diagonals_match_compass() -> Result<(), ControllerError> {
    let cases = [
        (1u8, (true, true, false, false)),
        (3, (false, true, true, false)),
        (5, (false, false, true, true)),
        (7, (true, false, false, true)),
    ];
    let mut data = [0u8; REPORT_LEN];
    for (code, (up, right, down, left)) in cases {
        data[5] = code;
        let state = decode(&data)?;
        assert_eq!(
            (state.up, state.right, state.down, state.left),
            (up, right, down, left),
            "hat code {code}"
        );
    }
    Ok(())
}
