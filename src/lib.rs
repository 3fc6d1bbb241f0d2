//! DualShock 4 input report decoding and acquisition
//!
//! [`controller::decode`] turns a raw 64-byte report into a [`State`];
//! [`ControllerHandle`] runs the read loop against any blocking byte source
//! and feeds decoded states to a handler.

pub mod config;
pub mod controller;

pub use controller::{ControllerError, ControllerHandle, ControllerSettings, State, Stopper};
