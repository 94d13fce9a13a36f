//! # HOTAS Input
//!
//! Flight-stick input acquisition daemon.
//!
//! Reads the physical state of a multi-button, multi-axis hand controller —
//! 32 switches behind a multiplexed button matrix plus the analog axes —
//! and converts it into normalized values for onward reporting.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Set up logging with tracing subscriber (optional rolling file)
//!    - Load and validate the TOML configuration
//!    - Construct the selected pin backend and install the failure sink
//!
//! 2. **Calibration phase** (optional, learned-range axes only)
//!    - Seed the bounds from the current stick position, then widen them
//!      while the user moves every axis through its full travel
//!
//! 3. **Main loop**
//!    - Run one full scan per tick (matrix, then every axis)
//!    - Log a status line every `status_interval_ticks` ticks
//!    - Handle Ctrl+C for graceful shutdown

use anyhow::Result;
use tokio::time::{interval, sleep, Duration, Instant};
use tracing::{debug, info};

use hotas_input::config::{BackendKind, Config};
use hotas_input::fault;
use hotas_input::hal::rpi::{HeartbeatSink, RpiBackend};
use hotas_input::hal::sim::SimBackend;
use hotas_input::hal::PinBackend;
use hotas_input::input::system::{InputReport, InputSystem};

/// Configuration file used when no path is given on the command line.
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;

    // Keep the non-blocking writer guard alive for the process lifetime.
    let _log_guard = init_logging(&config);

    info!("HOTAS Input v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from {config_path}");

    let backend: Box<dyn PinBackend> = match config.backend.kind {
        BackendKind::Rpi => {
            let sink = HeartbeatSink::from_config(&config)?;
            fault::install_sink(Box::new(sink));
            info!(
                "Raspberry Pi backend, indicator on pin {}",
                config.fault.indicator_pin
            );
            Box::new(RpiBackend::from_config(&config)?)
        }
        BackendKind::Simulated => {
            info!("Simulated backend (no hardware attached)");
            Box::new(SimBackend::from_config(&config))
        }
    };

    let mut system = InputSystem::from_config(&config, backend);

    if config.poll.calibration_secs > 0 {
        run_calibration_phase(&mut system, &config).await;
    }

    run_scan_loop(&mut system, &config).await;

    Ok(())
}

/// Initialize the tracing subscriber, optionally writing to a daily-rolled
/// file when the configuration names a log directory.
fn init_logging(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    if config.logging.dir.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        None
    } else {
        let appender = tracing_appender::rolling::daily(&config.logging.dir, "hotas-input.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    }
}

/// Drive the learned-range calibration phase for the configured duration.
///
/// The user is expected to move every axis through its full travel while
/// this runs; each tick widens the learned bounds.
async fn run_calibration_phase<B: PinBackend>(system: &mut InputSystem<B>, config: &Config) {
    info!(
        "Calibration phase: move all axes through their full travel ({}s)",
        config.poll.calibration_secs
    );

    system.start_calibration();

    let tick = Duration::from_millis(config.poll.interval_ms);
    let deadline = Instant::now() + Duration::from_secs(config.poll.calibration_secs);
    while Instant::now() < deadline {
        system.calibrate_tick();
        sleep(tick).await;
    }

    for axis in system.axes() {
        info!(
            "Axis {:?} calibrated: [{} .. {}]",
            axis.name(),
            axis.calibration_low(),
            axis.calibration_high()
        );
    }
}

/// Run the scan loop until Ctrl+C.
async fn run_scan_loop<B: PinBackend>(system: &mut InputSystem<B>, config: &Config) {
    let mut scan_interval = interval(Duration::from_millis(config.poll.interval_ms));

    info!(
        "Starting scan loop at {}ms per tick",
        config.poll.interval_ms
    );
    info!("Press Ctrl+C to exit");

    let mut tick_count: u64 = 0;

    loop {
        tokio::select! {
            _ = scan_interval.tick() => {
                let report = system.scan();
                tick_count += 1;

                debug!("Tick {}: {}", tick_count, format_report(&report));

                if tick_count % config.poll.status_interval_ticks == 0 {
                    info!("Scanned {} ticks: {}", tick_count, format_report(&report));
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total ticks scanned: {tick_count}");
                break;
            }
        }
    }
}

/// One-line summary of a snapshot for the log.
fn format_report(report: &InputReport) -> String {
    let axes = report
        .axes
        .iter()
        .map(|axis| format!("{}={} (raw {})", axis.name, axis.value, axis.raw))
        .collect::<Vec<_>>()
        .join(", ");
    format!("buttons={:#010x}, {axes}", report.buttons)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "config/default.toml");
    }

    #[test]
    fn test_format_report_summarizes_buttons_and_axes() {
        let report = InputReport {
            buttons: 0x0000_0C01,
            axes: vec![
                hotas_input::input::system::AxisReading {
                    name: "x".to_string(),
                    raw: 500,
                    value: 0,
                },
            ],
        };

        let line = format_report(&report);
        assert!(line.contains("buttons=0x00000c01"));
        assert!(line.contains("x=0 (raw 500)"));
    }
}
