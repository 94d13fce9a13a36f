//! # Fault Module
//!
//! Fail-stop handling for detected invariant violations.
//!
//! Exactly one fatal error kind exists in this system: a broken invariant
//! (an out-of-range bounded-array access, or a pin-table misuse inside a
//! hardware backend). The policy is fail-stop: [`fail`] formats a framed
//! diagnostic, logs it, and hands control to the installed [`FailureSink`],
//! which never returns. No subsystem keeps executing after entry.
//!
//! The sink is pluggable: production wiring installs a heartbeat sink that
//! blinks an indicator pin forever (see `hal::rpi::HeartbeatSink`), while
//! host and test runs fall back to a panic carrying the framed diagnostic,
//! so fail-stop entry stays observable without hardware.
//!
//! ## Diagnostic framing
//!
//! ```text
//! =================================
//! FATAL ERROR
//! Index out of range. Valid: 0 .. 31. Actual: 40
//! =================================
//! ```

use std::sync::OnceLock;

use tracing::error;

/// Delimiter line framing every fatal diagnostic.
const DELIMITER: &str = "=================================";

/// Terminal destination for a fatal diagnostic.
///
/// Implementations must not return; the process is done making progress the
/// moment a sink is engaged. The concrete hardware sink blinks an indicator
/// forever; a test double records the call and unwinds instead.
pub trait FailureSink: Send + Sync {
    /// Consume the framed diagnostic and halt. Never returns.
    fn engage(&self, diagnostic: &str) -> !;
}

static SINK: OnceLock<Box<dyn FailureSink>> = OnceLock::new();

/// Install the process-wide failure sink.
///
/// First call wins; returns `false` if a sink was already installed.
/// Intended to be called once during startup, before the polling loop.
pub fn install_sink(sink: Box<dyn FailureSink>) -> bool {
    SINK.set(sink).is_ok()
}

/// Format a message into the framed fatal diagnostic.
///
/// # Examples
///
/// ```
/// let framed = hotas_input::fault::framed("broken invariant");
/// assert!(framed.starts_with("================================="));
/// assert!(framed.contains("FATAL ERROR"));
/// assert!(framed.contains("broken invariant"));
/// ```
#[must_use]
pub fn framed(message: &str) -> String {
    format!("{DELIMITER}\nFATAL ERROR\n{message}\n{DELIMITER}")
}

/// Terminal entry point for detected invariant violations. Never returns.
///
/// Logs the framed diagnostic at error level, then engages the installed
/// sink. Without an installed sink, panics with the framed diagnostic.
pub fn fail(message: &str) -> ! {
    let diagnostic = framed(message);
    error!("{diagnostic}");

    match SINK.get() {
        Some(sink) => sink.engage(&diagnostic),
        None => panic!("{}", diagnostic),
    }
}
