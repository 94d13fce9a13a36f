//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! The configuration externalizes everything the original firmware
//! hard-coded: the pin assignment table (mux inhibit, mux common, three
//! address lines, four row-drive lines, one indicator pin, one analog
//! channel per axis), the settle delays, the per-axis range strategy and
//! the matrix state packing. Validation enforces the exclusive-ownership
//! rule: no pin or analog channel may be assigned to more than one
//! component.

use serde::de::Error;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{HotasError, Result};
use crate::input::axis::{RangeStrategy, RAW_DOMAIN_MAX};
use crate::input::matrix::StatePacking;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub matrix: MatrixConfig,

    #[serde(default = "default_axes")]
    pub axes: Vec<AxisConfig>,

    #[serde(default)]
    pub fault: FaultConfig,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hardware backend selection
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_backend_kind")]
    pub kind: BackendKind,

    /// SPI clock for the MCP3008 ADC (Raspberry Pi backend only).
    #[serde(default = "default_spi_clock_hz")]
    pub spi_clock_hz: u32,
}

/// Selectable pin backend
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Wiring-accurate simulation; runs anywhere.
    Simulated,
    /// Raspberry Pi GPIO + SPI-attached MCP3008.
    Rpi,
}

/// Button-matrix pin assignment and timing
#[derive(Debug, Deserialize, Clone)]
pub struct MatrixConfig {
    /// Goes to the mux inhibit (NOT-ENABLE) input.
    #[serde(default = "default_mux_inhibit")]
    pub mux_inhibit: u8,

    /// Goes to the mux common input/output.
    #[serde(default = "default_mux_common")]
    pub mux_common: u8,

    /// Go to the mux A/B/C address inputs, least significant first.
    #[serde(default = "default_mux_address_pins")]
    pub mux_address_pins: Vec<u8>,

    /// Drive the four matrix rows.
    #[serde(default = "default_row_pins")]
    pub row_pins: Vec<u8>,

    /// Wait after releasing inhibit with a new address selected.
    #[serde(default = "default_settle_us")]
    pub mux_settle_us: u64,

    /// Wait after driving a row before sampling the common line.
    #[serde(default = "default_settle_us")]
    pub row_settle_us: u64,

    /// Snapshot packing: packed 32-bit mask or bounds-checked boolean array.
    #[serde(default = "default_state_packing")]
    pub state_packing: StatePacking,
}

/// One analog axis
#[derive(Debug, Deserialize, Clone)]
pub struct AxisConfig {
    pub name: String,

    pub channel: u8,

    #[serde(default = "default_axis_strategy")]
    pub strategy: RangeStrategy,

    /// Initial learned bound; refined during the calibration phase.
    #[serde(default = "default_calibration_low")]
    pub calibration_low: u16,

    /// Initial learned bound; refined during the calibration phase.
    #[serde(default = "default_calibration_high")]
    pub calibration_high: u16,
}

/// Fail-stop indicator configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FaultConfig {
    /// Indicator pin pulsed by the heartbeat sink.
    #[serde(default = "default_indicator_pin")]
    pub indicator_pin: u8,

    /// Re-emit the framed diagnostic on every heartbeat cycle.
    #[serde(default = "default_emit_diagnostics")]
    pub emit_diagnostics: bool,
}

/// Polling loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    /// Scan tick period.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Duration of the startup calibration phase; 0 disables it.
    #[serde(default = "default_calibration_secs")]
    pub calibration_secs: u64,

    /// Ticks between status log lines.
    #[serde(default = "default_status_interval_ticks")]
    pub status_interval_ticks: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Directory for daily-rolled log files; empty logs to stdout only.
    #[serde(default)]
    pub dir: String,
}

// Default value functions
fn default_backend_kind() -> BackendKind { BackendKind::Simulated }
fn default_spi_clock_hz() -> u32 { 1_350_000 }

fn default_mux_inhibit() -> u8 { 5 }
fn default_mux_common() -> u8 { 6 }
fn default_mux_address_pins() -> Vec<u8> { vec![13, 19, 26] }
fn default_row_pins() -> Vec<u8> { vec![12, 16, 20, 21] }
fn default_settle_us() -> u64 { 1000 }
fn default_state_packing() -> StatePacking { StatePacking::Packed }

fn default_axis_strategy() -> RangeStrategy { RangeStrategy::Learned }
fn default_calibration_low() -> u16 { 0 }
fn default_calibration_high() -> u16 { RAW_DOMAIN_MAX }

fn default_indicator_pin() -> u8 { 18 }
fn default_emit_diagnostics() -> bool { true }

fn default_interval_ms() -> u64 { 10 }
fn default_calibration_secs() -> u64 { 0 }
fn default_status_interval_ticks() -> u64 { 1000 }

fn default_axes() -> Vec<AxisConfig> {
    vec![
        AxisConfig {
            name: "x".to_string(),
            channel: 0,
            strategy: RangeStrategy::Learned,
            calibration_low: default_calibration_low(),
            calibration_high: default_calibration_high(),
        },
        AxisConfig {
            name: "y".to_string(),
            channel: 1,
            strategy: RangeStrategy::Learned,
            calibration_low: default_calibration_low(),
            calibration_high: default_calibration_high(),
        },
        AxisConfig {
            name: "throttle".to_string(),
            channel: 2,
            strategy: RangeStrategy::Fixed,
            calibration_low: default_calibration_low(),
            calibration_high: default_calibration_high(),
        },
    ]
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
            spi_clock_hz: default_spi_clock_hz(),
        }
    }
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            mux_inhibit: default_mux_inhibit(),
            mux_common: default_mux_common(),
            mux_address_pins: default_mux_address_pins(),
            row_pins: default_row_pins(),
            mux_settle_us: default_settle_us(),
            row_settle_us: default_settle_us(),
            state_packing: default_state_packing(),
        }
    }
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            indicator_pin: default_indicator_pin(),
            emit_diagnostics: default_emit_diagnostics(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            calibration_secs: default_calibration_secs(),
            status_interval_ticks: default_status_interval_ticks(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { dir: String::new() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            matrix: MatrixConfig::default(),
            axes: default_axes(),
            fault: FaultConfig::default(),
            poll: PollConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn config_error(message: impl std::fmt::Display) -> HotasError {
    HotasError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hotas_input::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), hotas_input::error::HotasError>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range or if
    /// a pin or analog channel is assigned to more than one component.
    pub fn validate(&self) -> Result<()> {
        if self.matrix.mux_address_pins.len() != 3 {
            return Err(config_error("mux_address_pins must list exactly 3 pins"));
        }

        if self.matrix.row_pins.len() != 4 {
            return Err(config_error("row_pins must list exactly 4 pins"));
        }

        for (name, value) in [
            ("mux_settle_us", self.matrix.mux_settle_us),
            ("row_settle_us", self.matrix.row_settle_us),
        ] {
            if value == 0 || value > 10_000 {
                return Err(config_error(format!(
                    "{name} must be between 1 and 10000"
                )));
            }
        }

        if self.poll.interval_ms == 0 || self.poll.interval_ms > 1000 {
            return Err(config_error("interval_ms must be between 1 and 1000"));
        }

        if self.poll.status_interval_ticks == 0 {
            return Err(config_error(
                "status_interval_ticks must be greater than 0",
            ));
        }

        if self.axes.is_empty() {
            return Err(config_error("at least one axis must be configured"));
        }

        if self.axes.len() > 8 {
            return Err(config_error(
                "at most 8 axes are supported (one per ADC channel)",
            ));
        }

        let mut channels = HashSet::new();
        let mut names = HashSet::new();
        for axis in &self.axes {
            if axis.name.is_empty() {
                return Err(config_error("axis name cannot be empty"));
            }
            if !names.insert(axis.name.as_str()) {
                return Err(config_error(format!(
                    "axis name {:?} is assigned twice",
                    axis.name
                )));
            }
            if axis.channel > 7 {
                return Err(config_error(format!(
                    "axis {:?} channel {} is out of bounds (must be 0-7)",
                    axis.name, axis.channel
                )));
            }
            if !channels.insert(axis.channel) {
                return Err(config_error(format!(
                    "analog channel {} is assigned twice",
                    axis.channel
                )));
            }
            // low == high is the recognized degenerate state, not an error.
            if axis.calibration_low > axis.calibration_high {
                return Err(config_error(format!(
                    "axis {:?} calibration_low must not exceed calibration_high",
                    axis.name
                )));
            }
        }

        let mut digital_pins = HashSet::new();
        let assignments = [self.matrix.mux_inhibit, self.matrix.mux_common]
            .into_iter()
            .chain(self.matrix.mux_address_pins.iter().copied())
            .chain(self.matrix.row_pins.iter().copied())
            .chain(std::iter::once(self.fault.indicator_pin));
        for pin in assignments {
            if !digital_pins.insert(pin) {
                return Err(config_error(format!(
                    "pin {pin} is assigned to more than one component"
                )));
            }
        }

        if self.backend.spi_clock_hz < 10_000 || self.backend.spi_clock_hz > 3_600_000 {
            return Err(config_error(
                "spi_clock_hz must be between 10000 and 3600000",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[backend]
kind = "simulated"

[matrix]
mux_inhibit = 5
mux_common = 6
mux_address_pins = [13, 19, 26]
row_pins = [12, 16, 20, 21]

[[axes]]
name = "x"
channel = 0
strategy = "learned"

[[axes]]
name = "throttle"
channel = 2
strategy = "fixed"

[fault]

[poll]

[logging]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.backend.kind, BackendKind::Simulated);
        assert_eq!(config.axes.len(), 2);
        assert_eq!(config.axes[1].strategy, RangeStrategy::Fixed);
    }

    #[test]
    fn test_load_minimal_file_uses_defaults() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"").unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.matrix.mux_settle_us, 1000);
        assert_eq!(config.axes.len(), 3);
        assert_eq!(config.poll.interval_ms, 10);
    }

    #[test]
    fn test_wrong_address_pin_count() {
        let mut config = create_valid_config();
        config.matrix.mux_address_pins = vec![13, 19];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_wrong_row_pin_count() {
        let mut config = create_valid_config();
        config.matrix.row_pins = vec![12, 16, 20, 21, 22];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mux_settle_zero() {
        let mut config = create_valid_config();
        config.matrix.mux_settle_us = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_row_settle_too_high() {
        let mut config = create_valid_config();
        config.matrix.row_settle_us = 10_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_interval_zero() {
        let mut config = create_valid_config();
        config.poll.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_interval_too_high() {
        let mut config = create_valid_config();
        config.poll.interval_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_status_interval_zero() {
        let mut config = create_valid_config();
        config.poll.status_interval_ticks = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_no_axes() {
        let mut config = create_valid_config();
        config.axes.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_too_many_axes() {
        let mut config = create_valid_config();
        config.axes = (0..9)
            .map(|i| AxisConfig {
                name: format!("axis{i}"),
                channel: i as u8,
                strategy: RangeStrategy::Fixed,
                calibration_low: 0,
                calibration_high: 1023,
            })
            .collect();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_axis_name() {
        let mut config = create_valid_config();
        config.axes[0].name = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_axis_name() {
        let mut config = create_valid_config();
        config.axes[1].name = config.axes[0].name.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_axis_channel_out_of_bounds() {
        let mut config = create_valid_config();
        config.axes[0].channel = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_axis_channel() {
        let mut config = create_valid_config();
        config.axes[1].channel = config.axes[0].channel;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_calibration_bounds() {
        let mut config = create_valid_config();
        config.axes[0].calibration_low = 900;
        config.axes[0].calibration_high = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_degenerate_calibration_bounds_are_valid() {
        // low == high is the recognized degenerate state, not an error.
        let mut config = create_valid_config();
        config.axes[0].calibration_low = 512;
        config.axes[0].calibration_high = 512;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_digital_pin() {
        let mut config = create_valid_config();
        config.matrix.mux_common = config.matrix.mux_inhibit;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_indicator_pin_collision() {
        let mut config = create_valid_config();
        config.fault.indicator_pin = config.matrix.row_pins[0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_spi_clock_out_of_range() {
        let mut config = create_valid_config();
        config.backend.spi_clock_hz = 5_000;
        assert!(config.validate().is_err());

        config.backend.spi_clock_hz = 4_000_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_mux_inhibit(), 5);
        assert_eq!(default_mux_common(), 6);
        assert_eq!(default_mux_address_pins(), vec![13, 19, 26]);
        assert_eq!(default_row_pins(), vec![12, 16, 20, 21]);
        assert_eq!(default_settle_us(), 1000);
        assert_eq!(default_interval_ms(), 10);
        assert_eq!(default_calibration_secs(), 0);
        assert_eq!(default_status_interval_ticks(), 1000);
        assert_eq!(default_indicator_pin(), 18);
        assert!(default_emit_diagnostics());
        assert_eq!(default_spi_clock_hz(), 1_350_000);
        assert_eq!(default_calibration_high(), 1023);
    }
}
