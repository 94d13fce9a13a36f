//! # Simulated Backend
//!
//! Wiring-accurate simulation of the mux/matrix electronics.
//!
//! The simulation tracks the levels driven onto the inhibit, address and
//! row lines and answers mux-common reads from an injected 32-bit button
//! pattern using the same wiring equation as the hardware, so a scan
//! against this backend reproduces the injected pattern exactly. Analog
//! channels serve injected 10-bit values. Settle waits are counted instead
//! of slept, and every digital write is recorded in order, which lets tests
//! assert the scan protocol itself (inhibit held while address lines
//! change, row drive framing each sample).
//!
//! Not test-gated: the binary runs against this backend when the
//! configuration selects `backend = "simulated"`.

use std::time::Duration;

use crate::config::{Config, MatrixConfig};
use crate::hal::{Level, PinBackend};
use crate::input::bounded::BoundedArray;
use crate::input::matrix::{logical_index, pin_table};

/// Number of simulated analog channels (matching the MCP3008).
const ANALOG_CHANNEL_COUNT: usize = 8;

/// Simulated pin backend modeling one mux/matrix topology.
#[derive(Debug)]
pub struct SimBackend {
    mux_inhibit: u8,
    mux_common: u8,
    mux_address: BoundedArray<u8, 3>,
    rows: BoundedArray<u8, 4>,

    /// Levels currently driven on output pins.
    driven: [Level; 256],
    /// Closed-button pattern, bit i = logical button i.
    pattern: u32,
    /// Injected analog values per channel.
    analog: BoundedArray<u16, ANALOG_CHANNEL_COUNT>,

    writes: Vec<(u8, Level)>,
    delays: Vec<Duration>,
}

impl SimBackend {
    /// Build a simulation of the matrix wiring described by `config`.
    #[must_use]
    pub fn new(config: &MatrixConfig) -> Self {
        Self {
            mux_inhibit: config.mux_inhibit,
            mux_common: config.mux_common,
            mux_address: pin_table(&config.mux_address_pins, "Multiplexer address"),
            rows: pin_table(&config.row_pins, "Row drive"),
            driven: [Level::Low; 256],
            pattern: 0,
            analog: BoundedArray::default(),
            writes: Vec::new(),
            delays: Vec::new(),
        }
    }

    /// Build a simulation from the full configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.matrix)
    }

    /// Inject the full closed-button pattern, bit i = logical button i.
    pub fn set_pattern(&mut self, pattern: u32) {
        self.pattern = pattern;
    }

    /// Close or open a single logical button.
    pub fn set_button(&mut self, index: u8, closed: bool) {
        if closed {
            self.pattern |= 1 << index;
        } else {
            self.pattern &= !(1 << index);
        }
    }

    /// Inject the raw value served by an analog channel.
    pub fn set_analog(&mut self, channel: u8, value: u16) {
        self.analog[usize::from(channel)] = value;
    }

    /// Every digital write so far, in order.
    #[must_use]
    pub fn writes(&self) -> &[(u8, Level)] {
        &self.writes
    }

    /// Every settle wait so far, in order.
    #[must_use]
    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Forget recorded writes and delays.
    pub fn clear_recording(&mut self) {
        self.writes.clear();
        self.delays.clear();
    }

    /// Mux address currently encoded on the address lines.
    fn selected_address(&self) -> u8 {
        self.mux_address
            .iter()
            .enumerate()
            .fold(0, |address, (bit, &pin)| {
                if self.driven[usize::from(pin)].is_high() {
                    address | (1 << bit)
                } else {
                    address
                }
            })
    }

    /// Row currently driven high, if exactly one is.
    fn driven_row(&self) -> Option<u8> {
        let mut active = None;
        for (row, &pin) in self.rows.iter().enumerate() {
            if self.driven[usize::from(pin)].is_high() {
                if active.is_some() {
                    return None;
                }
                active = Some(row as u8);
            }
        }
        active
    }

    /// Level on the mux common line given the driven control lines.
    fn common_level(&self) -> Level {
        // Inhibit high disconnects every channel.
        if self.driven[usize::from(self.mux_inhibit)].is_high() {
            return Level::Low;
        }
        let Some(row) = self.driven_row() else {
            return Level::Low;
        };
        let index = logical_index(self.selected_address(), row);
        Level::from_bool(self.pattern & (1 << index) != 0)
    }
}

impl PinBackend for SimBackend {
    fn write(&mut self, pin: u8, level: Level) {
        self.writes.push((pin, level));
        self.driven[usize::from(pin)] = level;
    }

    fn read(&mut self, pin: u8) -> Level {
        if pin == self.mux_common {
            self.common_level()
        } else {
            self.driven[usize::from(pin)]
        }
    }

    fn read_analog(&mut self, channel: u8) -> u16 {
        self.analog[usize::from(channel)]
    }

    fn delay(&mut self, duration: Duration) {
        self.delays.push(duration);
    }
}
