//! DualShock 4 input report decoding
//!
//! Turns one raw USB input report into an immutable [`State`] snapshot.
//!
//! # Report layout
//!
//! | Offset | Field                                                     |
//! |--------|-----------------------------------------------------------|
//! | 1–2    | left stick X, Y                                           |
//! | 3–4    | right stick X, Y                                          |
//! | 5      | hat (low nibble), square/cross/circle/triangle (bits 4–7) |
//! | 6      | L1 R1 L2 R2 share options L3 R3 (bits 0–7)                |
//! | 7      | PS (bit 0), trackpad click (bit 1), timestamp (bits 2–7)  |
//! | 8–9    | L2, R2 trigger pressure                                   |
//! | 12     | battery level                                             |
//! | 13–18  | accelerometer Y, X, Z (i16 LE)                            |
//! | 19–24  | gyroscope roll, yaw, pitch (i16 LE)                       |
//! | 35–38  | first touch point                                         |
//! | 39–42  | second touch point                                        |
//!
//! A touch point is four bytes `[id, x_lo, mid, y_hi]`. Bit 7 of `id` is set
//! while the finger is lifted. Both coordinates are 12 bits wide and share
//! the middle byte:
//!
//! ```text
//! x = ((mid & 0x0f) << 8) | x_lo
//! y = (y_hi << 4) | (mid >> 4)
//! ```

use serde::{Deserialize, Serialize};

use crate::controller::error::ControllerError;

/// Size of a full input report as emitted by the device.
pub const REPORT_LEN: usize = 64;

/// Smallest buffer that still covers every decoded field.
pub const MIN_REPORT_LEN: usize = 43;

/// Hat code for a released directional pad.
pub const HAT_NEUTRAL: u8 = 8;

// Raw analog stick axes, 0-255 with the rest position near 128
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalogStick {
    pub x: u8,
    pub y: u8,
}

/// One contact on the trackpad surface.
///
/// The ID stays stable while the finger is held and increments with every
/// new touch (modulo 128).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TouchPoint {
    pub id: u8,
    pub active: bool,
    pub x: u16,
    pub y: u16,
}

/// Accelerometer reading. X and Z are negated relative to the wire value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Motion {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

/// Gyroscope reading. Roll is negated relative to the wire value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Orientation {
    pub roll: i16,
    pub yaw: i16,
    pub pitch: i16,
}

// Trigger pressure, independent of the L2/R2 digital bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triggers {
    pub l2: u8,
    pub r2: u8,
}

/// Directional pad position as encoded by the 4-bit hat field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DPadDirection {
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
    #[default]
    Neutral,
}

impl DPadDirection {
    /// Decodes a hat nibble. Codes above 7 all mean released.
    pub fn from_hat(code: u8) -> Self {
        match code & 0x0f {
            0 => DPadDirection::Up,
            1 => DPadDirection::UpRight,
            2 => DPadDirection::Right,
            3 => DPadDirection::DownRight,
            4 => DPadDirection::Down,
            5 => DPadDirection::DownLeft,
            6 => DPadDirection::Left,
            7 => DPadDirection::UpLeft,
            _ => DPadDirection::Neutral,
        }
    }

    pub fn up(self) -> bool {
        matches!(
            self,
            DPadDirection::UpLeft | DPadDirection::Up | DPadDirection::UpRight
        )
    }

    pub fn right(self) -> bool {
        matches!(
            self,
            DPadDirection::UpRight | DPadDirection::Right | DPadDirection::DownRight
        )
    }

    pub fn down(self) -> bool {
        matches!(
            self,
            DPadDirection::DownRight | DPadDirection::Down | DPadDirection::DownLeft
        )
    }

    pub fn left(self) -> bool {
        matches!(
            self,
            DPadDirection::DownLeft | DPadDirection::Left | DPadDirection::UpLeft
        )
    }
}

/// Snapshot of the whole controller, decoded from exactly one report.
///
/// Every field comes from its own byte range; nothing is cross-checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    pub l1: bool,
    pub l2: bool,
    pub l3: bool,
    pub r1: bool,
    pub r2: bool,
    pub r3: bool,

    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,

    pub cross: bool,
    pub circle: bool,
    pub square: bool,
    pub triangle: bool,

    pub share: bool,
    pub options: bool,
    pub ps_home: bool,

    /// Device tick counter (6 bits, wraps).
    pub timestamp: u8,
    /// Raw battery byte, range defined by the firmware.
    pub battery_level: u8,

    pub left_stick: AnalogStick,
    pub right_stick: AnalogStick,
    pub motion: Motion,
    pub orientation: Orientation,

    /// Trackpad clicked down.
    pub trackpad: bool,
    /// First contact on the trackpad.
    pub touch0: TouchPoint,
    /// Second contact, only meaningful while `touch0` is active.
    pub touch1: TouchPoint,

    pub analog: Triggers,
}

impl State {
    /// Directional pad as a single compass value.
    pub fn dpad(&self) -> DPadDirection {
        match (self.up, self.right, self.down, self.left) {
            (true, false, false, false) => DPadDirection::Up,
            (true, true, false, false) => DPadDirection::UpRight,
            (false, true, false, false) => DPadDirection::Right,
            (false, true, true, false) => DPadDirection::DownRight,
            (false, false, true, false) => DPadDirection::Down,
            (false, false, true, true) => DPadDirection::DownLeft,
            (false, false, false, true) => DPadDirection::Left,
            (true, false, false, true) => DPadDirection::UpLeft,
            _ => DPadDirection::Neutral,
        }
    }

    /// Number of fingers currently on the trackpad.
    pub fn touch_count(&self) -> usize {
        match (self.touch0.active, self.touch1.active) {
            (false, _) => 0,
            (true, false) => 1,
            (true, true) => 2,
        }
    }
}

/// Decodes one input report.
///
/// Only the first [`MIN_REPORT_LEN`] bytes are inspected; anything after
/// that is ignored.
///
/// # Errors
///
/// Returns [`ControllerError::InvalidReport`] when `buf` is shorter than
/// [`MIN_REPORT_LEN`].
pub fn decode(buf: &[u8]) -> Result<State, ControllerError> {
    let b: &[u8; MIN_REPORT_LEN] = buf
        .get(..MIN_REPORT_LEN)
        .and_then(|head| head.try_into().ok())
        .ok_or(ControllerError::InvalidReport {
            got: buf.len(),
            need: MIN_REPORT_LEN,
        })?;

    let hat = DPadDirection::from_hat(b[5]);

    Ok(State {
        l1: bit(b[6], 0),
        r1: bit(b[6], 1),
        l2: bit(b[6], 2),
        r2: bit(b[6], 3),
        share: bit(b[6], 4),
        options: bit(b[6], 5),
        l3: bit(b[6], 6),
        r3: bit(b[6], 7),

        up: hat.up(),
        right: hat.right(),
        down: hat.down(),
        left: hat.left(),

        square: bit(b[5], 4),
        cross: bit(b[5], 5),
        circle: bit(b[5], 6),
        triangle: bit(b[5], 7),

        ps_home: bit(b[7], 0),
        trackpad: bit(b[7], 1),
        timestamp: b[7] >> 2,
        battery_level: b[12],

        left_stick: AnalogStick { x: b[1], y: b[2] },
        right_stick: AnalogStick { x: b[3], y: b[4] },

        motion: Motion {
            y: le_i16(b[13], b[14]),
            x: le_i16(b[15], b[16]).wrapping_neg(),
            z: le_i16(b[17], b[18]).wrapping_neg(),
        },
        orientation: Orientation {
            roll: le_i16(b[19], b[20]).wrapping_neg(),
            yaw: le_i16(b[21], b[22]),
            pitch: le_i16(b[23], b[24]),
        },

        touch0: touch_point([b[35], b[36], b[37], b[38]]),
        touch1: touch_point([b[39], b[40], b[41], b[42]]),

        analog: Triggers { l2: b[8], r2: b[9] },
    })
}

fn bit(byte: u8, n: u8) -> bool {
    byte & (1 << n) != 0
}

fn le_i16(lo: u8, hi: u8) -> i16 {
    i16::from_le_bytes([lo, hi])
}

fn touch_point(raw: [u8; 4]) -> TouchPoint {
    let [id, x_lo, mid, y_hi] = raw;
    TouchPoint {
        id: id & 0x7f,
        active: id & 0x80 == 0,
        x: (u16::from(mid & 0x0f) << 8) | u16::from(x_lo),
        y: (u16::from(y_hi) << 4) | u16::from(mid >> 4),
    }
}
