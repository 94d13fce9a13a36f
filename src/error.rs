//! # Error Types
//!
//! Custom error types for HOTAS Input using `thiserror`.
//!
//! These cover the fallible startup paths only (configuration loading and
//! hardware backend construction). Scan-time acquisition never returns an
//! error: irregular signal values are absorbed by clamping, and a broken
//! invariant hands control to the fail-stop handler instead of the caller.

use thiserror::Error;

/// Main error type for HOTAS Input
#[derive(Debug, Error)]
pub enum HotasError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Hardware backend construction errors
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for HOTAS Input
pub type Result<T> = std::result::Result<T, HotasError>;
