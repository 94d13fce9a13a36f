//! # Raspberry Pi Backend
//!
//! Concrete pin backend: GPIO via `rppal`, analog sampling via an
//! SPI-attached MCP3008 (10-bit, 8 channels).
//!
//! Pins are acquired and configured once at construction from the validated
//! pin table — outputs for the mux inhibit, the address lines and the row
//! drives, a pulled-down input for the mux common line. Runtime operations
//! are infallible: a request naming a pin outside the configured table is
//! an invariant violation and enters fail-stop, and a transient ADC
//! transfer failure is absorbed as a zero reading with a warning,
//! consistent with the clamping policy for irregular signal conditions.
//!
//! The [`HeartbeatSink`] lives here too: the concrete fail-stop destination
//! that blinks the indicator pin forever.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use rppal::gpio::{Gpio, InputPin, OutputPin};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use tracing::warn;

use crate::config::Config;
use crate::error::{HotasError, Result};
use crate::fault::{self, FailureSink};
use crate::hal::{Level, PinBackend};

impl From<Level> for rppal::gpio::Level {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => rppal::gpio::Level::Low,
            Level::High => rppal::gpio::Level::High,
        }
    }
}

impl From<rppal::gpio::Level> for Level {
    fn from(level: rppal::gpio::Level) -> Self {
        match level {
            rppal::gpio::Level::Low => Level::Low,
            rppal::gpio::Level::High => Level::High,
        }
    }
}

/// SPI command frame for an MCP3008 single-ended conversion.
fn mcp3008_command(channel: u8) -> [u8; 3] {
    [0x01, 0x80 | (channel << 4), 0x00]
}

/// 10-bit sample from an MCP3008 response frame.
fn mcp3008_decode(rx: [u8; 3]) -> u16 {
    (u16::from(rx[1] & 0x03) << 8) | u16::from(rx[2])
}

/// Raspberry Pi pin backend.
pub struct RpiBackend {
    outputs: HashMap<u8, OutputPin>,
    inputs: HashMap<u8, InputPin>,
    adc: Spi,
}

impl std::fmt::Debug for RpiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpiBackend")
            .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
            .field("inputs", &self.inputs.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl RpiBackend {
    /// Acquire and configure every pin named by the matrix pin table.
    ///
    /// # Errors
    ///
    /// Returns error if the GPIO controller or SPI bus cannot be opened or
    /// a pin is already claimed by another process.
    pub fn from_config(config: &Config) -> Result<Self> {
        let gpio = Gpio::new()
            .map_err(|e| HotasError::Hardware(format!("Failed to open GPIO controller: {e}")))?;

        let mut outputs = HashMap::new();
        let output_pins = [config.matrix.mux_inhibit]
            .into_iter()
            .chain(config.matrix.mux_address_pins.iter().copied())
            .chain(config.matrix.row_pins.iter().copied());
        for pin in output_pins {
            let mut output = gpio
                .get(pin)
                .map_err(|e| HotasError::Hardware(format!("Failed to claim pin {pin}: {e}")))?
                .into_output();
            output.set_low();
            outputs.insert(pin, output);
        }

        let mut inputs = HashMap::new();
        let common = gpio
            .get(config.matrix.mux_common)
            .map_err(|e| {
                HotasError::Hardware(format!(
                    "Failed to claim pin {}: {e}",
                    config.matrix.mux_common
                ))
            })?
            .into_input_pulldown();
        inputs.insert(config.matrix.mux_common, common);

        let adc = Spi::new(
            Bus::Spi0,
            SlaveSelect::Ss0,
            config.backend.spi_clock_hz,
            Mode::Mode0,
        )
        .map_err(|e| HotasError::Hardware(format!("Failed to open SPI bus: {e}")))?;

        Ok(Self {
            outputs,
            inputs,
            adc,
        })
    }
}

impl PinBackend for RpiBackend {
    fn write(&mut self, pin: u8, level: Level) {
        match self.outputs.get_mut(&pin) {
            Some(output) => output.write(level.into()),
            None => fault::fail(&format!("Write to unassigned output pin {pin}")),
        }
    }

    fn read(&mut self, pin: u8) -> Level {
        match self.inputs.get(&pin) {
            Some(input) => input.read().into(),
            None => fault::fail(&format!("Read from unassigned input pin {pin}")),
        }
    }

    fn read_analog(&mut self, channel: u8) -> u16 {
        let tx = mcp3008_command(channel);
        let mut rx = [0u8; 3];
        match self.adc.transfer(&mut rx, &tx) {
            Ok(_) => mcp3008_decode(rx),
            Err(e) => {
                warn!("ADC transfer failed on channel {channel}: {e}");
                0
            }
        }
    }

    fn delay(&mut self, duration: Duration) {
        // Sub-millisecond settle waits need busy spinning; the scheduler's
        // sleep granularity is too coarse for datasheet timing.
        if duration < Duration::from_millis(1) {
            let start = Instant::now();
            while start.elapsed() < duration {
                std::hint::spin_loop();
            }
        } else {
            thread::sleep(duration);
        }
    }
}

/// Heartbeat cadence: long pause, then two short indicator pulses.
const HEARTBEAT_PAUSE: Duration = Duration::from_secs(1);
const PULSE: Duration = Duration::from_millis(200);

/// Concrete fail-stop destination: permanent indicator heartbeat.
///
/// Owns its indicator pin outright, separate from the scanning backend, so
/// it stays usable no matter which subsystem detected the violation.
pub struct HeartbeatSink {
    indicator: Mutex<OutputPin>,
    emit_diagnostics: bool,
}

impl HeartbeatSink {
    /// Claim the indicator pin named by the fault configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the GPIO controller or the pin cannot be acquired.
    pub fn from_config(config: &Config) -> Result<Self> {
        let gpio = Gpio::new()
            .map_err(|e| HotasError::Hardware(format!("Failed to open GPIO controller: {e}")))?;
        let indicator = gpio
            .get(config.fault.indicator_pin)
            .map_err(|e| {
                HotasError::Hardware(format!(
                    "Failed to claim indicator pin {}: {e}",
                    config.fault.indicator_pin
                ))
            })?
            .into_output();

        Ok(Self {
            indicator: Mutex::new(indicator),
            emit_diagnostics: config.fault.emit_diagnostics,
        })
    }
}

impl FailureSink for HeartbeatSink {
    fn engage(&self, diagnostic: &str) -> ! {
        let mut indicator = self
            .indicator
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        loop {
            thread::sleep(HEARTBEAT_PAUSE);

            if self.emit_diagnostics {
                eprintln!("{diagnostic}");
            }

            indicator.set_high();
            thread::sleep(PULSE);
            indicator.set_low();
            thread::sleep(PULSE);

            indicator.set_high();
            thread::sleep(PULSE);
            indicator.set_low();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== MCP3008 Framing Tests ====================

    #[test]
    fn test_mcp3008_command_frame() {
        // Start bit, single-ended mode, channel in the high nibble.
        assert_eq!(mcp3008_command(0), [0x01, 0x80, 0x00]);
        assert_eq!(mcp3008_command(5), [0x01, 0xD0, 0x00]);
        assert_eq!(mcp3008_command(7), [0x01, 0xF0, 0x00]);
    }

    #[test]
    fn test_mcp3008_decode_masks_to_ten_bits() {
        assert_eq!(mcp3008_decode([0x00, 0x00, 0x00]), 0);
        assert_eq!(mcp3008_decode([0x00, 0x03, 0xFF]), 1023);
        // Undefined bits above the sample must not leak through.
        assert_eq!(mcp3008_decode([0xFF, 0xFF, 0xFF]), 1023);
        assert_eq!(mcp3008_decode([0x00, 0x01, 0x80]), 384);
    }

    #[test]
    fn test_heartbeat_cadence_constants() {
        assert_eq!(HEARTBEAT_PAUSE, Duration::from_secs(1));
        assert_eq!(PULSE, Duration::from_millis(200));
    }
}
