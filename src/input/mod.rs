//! # Input Module
//!
//! Input acquisition and calibration core.
//!
//! This module handles:
//! - Scanning the multiplexed button matrix into a 32-bit state
//! - Calibrating and normalizing the analog axes
//! - Bounds-checked fixed-capacity storage for every fixed-topology table
//! - Aggregating both into the per-tick [`system::InputReport`] snapshot

pub mod axis;
pub mod bounded;
pub mod matrix;
pub mod system;
