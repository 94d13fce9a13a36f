//! # HOTAS Input Library
//!
//! Flight-stick input acquisition: multiplexed button-matrix scanning and
//! analog axis calibration for game-controller reporting.
//!
//! This library converts the raw electrical state of a multi-button,
//! multi-axis hand controller into normalized digital values — a 32-bit
//! button mask and signed 16-bit axis codes — ready for an external
//! USB/HID report encoder.

pub mod config;
pub mod error;
pub mod fault;
pub mod hal;
pub mod input;
pub mod owner;
