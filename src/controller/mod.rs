//! Controller subsystem for DualShock 4 report acquisition
//!
//! Implements a three-part pipeline:
//!
//! 1. [`reader`] - blocking reads of raw reports from a byte source
//! 2. [`decoder`] - bit-level decoding of a report into a [`State`]
//! 3. [`controller_handle`] - lifecycle, listener and error stream
//!
//! # Architecture
//!
//! ```text
//! Source ──► Reader ──[RawReport]──► Listener ──► decode ──► handler(State)
//!              │                        │
//!              └──────[ControllerError]─┴──► errors()
//! ```
//!
//! Reader and listener share one cancellation token and exit within one
//! report interval of it firing.

pub mod controller_handle;
pub mod decoder;
pub mod error;
pub mod reader;

pub use controller_handle::{
    ControllerHandle, ControllerSettings, LoopState, Running, Stopped, Stopper, Stopping,
};
pub use decoder::{
    decode, AnalogStick, DPadDirection, Motion, Orientation, State, TouchPoint, Triggers,
    MIN_REPORT_LEN, REPORT_LEN,
};
pub use error::ControllerError;
pub use reader::RawReport;
