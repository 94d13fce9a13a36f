//! # Input System
//!
//! Explicit application context owning the acquisition components.
//!
//! One `InputSystem` is constructed at startup from the validated
//! configuration and threaded through the polling loop as an explicit
//! handle — there is no global state. It owns the pin backend, the button
//! matrix and the axis list, and runs one scan tick at a time: matrix
//! first, then every axis, producing an [`InputReport`] snapshot for the
//! external report encoder.

use crate::config::Config;
use crate::hal::PinBackend;
use crate::input::axis::AnalogAxis;
use crate::input::matrix::ButtonMatrix;

/// One axis entry on the output surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisReading {
    /// Axis display name from the configuration.
    pub name: String,
    /// Last raw sample (diagnostics and calibration UI).
    pub raw: u16,
    /// Last normalized value.
    pub value: i16,
}

/// Complete snapshot of one scan tick, handed to the report encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputReport {
    /// 32-bit button mask, bit i = logical button i.
    pub buttons: u32,
    /// Per-axis readings in configuration order.
    pub axes: Vec<AxisReading>,
}

/// The acquisition context: backend, matrix and axes under one owner.
#[derive(Debug)]
pub struct InputSystem<B: PinBackend> {
    backend: B,
    matrix: ButtonMatrix,
    axes: Vec<AnalogAxis>,
}

impl<B: PinBackend> InputSystem<B> {
    /// Build the context from a validated configuration and a backend.
    #[must_use]
    pub fn from_config(config: &Config, backend: B) -> Self {
        let axes = config
            .axes
            .iter()
            .map(|axis| {
                AnalogAxis::new(
                    &axis.name,
                    axis.channel,
                    axis.strategy,
                    axis.calibration_low,
                    axis.calibration_high,
                )
            })
            .collect();

        Self {
            backend,
            matrix: ButtonMatrix::from_config(&config.matrix),
            axes,
        }
    }

    /// Run one full scan tick and return the committed snapshot.
    pub fn scan(&mut self) -> InputReport {
        self.matrix.read(&mut self.backend);
        for axis in &mut self.axes {
            axis.read(&mut self.backend);
        }
        self.report()
    }

    /// Snapshot of the most recent scan without touching the hardware.
    #[must_use]
    pub fn report(&self) -> InputReport {
        InputReport {
            buttons: self.matrix.get(),
            axes: self
                .axes
                .iter()
                .map(|axis| AxisReading {
                    name: axis.name().to_string(),
                    raw: axis.get_raw(),
                    value: axis.get(),
                })
                .collect(),
        }
    }

    /// Seed the learned calibration bounds from the current readings.
    pub fn start_calibration(&mut self) {
        for axis in &mut self.axes {
            axis.start_calibration(&mut self.backend);
        }
    }

    /// Widen the learned calibration bounds with the current readings.
    pub fn calibrate_tick(&mut self) {
        for axis in &mut self.axes {
            axis.calibrate(&mut self.backend);
        }
    }

    /// The button matrix.
    #[must_use]
    pub fn matrix(&self) -> &ButtonMatrix {
        &self.matrix
    }

    /// The configured axes in configuration order.
    #[must_use]
    pub fn axes(&self) -> &[AnalogAxis] {
        &self.axes
    }
}
