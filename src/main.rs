//! Health monitor: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                      │
//! │                                                              │
//! │  SerialTransport   SimulatedBus   LogEventSink   SystemClock │
//! │  (Transport)       (Transport)    (EventSink)    (Clock)     │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │   Engine: PollScheduler · Parser · Store · DailyLog    │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  acquisition thread ──▶ Arc<SampleStore> ◀── status reporter │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{info, warn};

use healthmon::adapters::gpio::DirectionPin;
use healthmon::adapters::log_sink::LogEventSink;
use healthmon::adapters::serial::SerialTransport;
use healthmon::adapters::sim::SimulatedBus;
use healthmon::adapters::time::{StdDelay, SystemClock};
use healthmon::app::events::EngineEvent;
use healthmon::app::ports::EventSink;
use healthmon::error::TransportError;
use healthmon::protocol::transport::{OfflineTransport, Transport};
use healthmon::sensors::ChannelKind;
use healthmon::sensors::store::LatestValues;
use healthmon::{Engine, EngineConfig, EngineHandle};

/// Poll two facilities over RS-485 and log their sensors to daily CSV files.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// JSON configuration file (every field optional)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Answer requests from a simulated bus instead of the serial port
    #[arg(long)]
    simulate: bool,

    /// Serial device, overriding the configuration
    #[arg(long)]
    port: Option<String>,

    /// CSV directory, overriding the configuration
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

type Link = Box<dyn Transport + Send>;

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(port) = &cli.port {
        config.serial_port.clone_from(port);
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir.clone_from(dir);
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Open the configured link; fall back to offline rather than failing.
fn open_link(config: &EngineConfig, simulate: bool, sink: &mut impl EventSink) -> Link {
    if simulate {
        info!("Link: simulated bus");
        return Box::new(SimulatedBus::new());
    }

    let pin = match DirectionPin::from_config(config.direction_gpio) {
        Ok(pin) => pin,
        Err(e) => {
            warn!("Link: direction pin unavailable: {}", e);
            sink.emit(&EngineEvent::LinkUnavailable(TransportError::DirectionPin));
            return Box::new(OfflineTransport::new());
        }
    };

    match SerialTransport::open(config, pin) {
        Ok(serial) => Box::new(serial),
        Err(e) => {
            sink.emit(&EngineEvent::LinkUnavailable(e));
            Box::new(OfflineTransport::new())
        }
    }
}

fn format_latest(latest: &LatestValues) -> String {
    ChannelKind::ALL
        .iter()
        .map(|kind| match latest.get(*kind) {
            Some(v) => format!("{}={:.2}{}", kind.label(latest.facility), v, kind.unit()),
            None => format!("{}=--", kind.label(latest.facility)),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn report_status(handle: &EngineHandle) {
    let stats = handle.stats();
    info!(
        "STATUS | {} | cycles={} frames={} timeouts={} rejected={} rows={} csv_fail={}",
        if handle.is_live() { "LIVE" } else { "OFFLINE" },
        stats.cycles,
        stats.frames_accepted,
        stats.timeouts,
        stats.rejected,
        stats.rows_written,
        stats.persistence_failures,
    );
    for facility in healthmon::sensors::Facility::ALL {
        info!("STATUS | {}", format_latest(&handle.latest(facility)));
    }
}

/// Sleep until `deadline` in short slices so shutdown is noticed promptly.
fn sleep_until(deadline: Instant, shutdown: &AtomicBool) {
    const SLICE: Duration = Duration::from_millis(50);
    while !shutdown.load(Ordering::Relaxed) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        thread::sleep(remaining.min(SLICE));
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    info!("╔══════════════════════════════════════╗");
    info!("║  Health monitor v{:<20}║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 1. Configuration ──────────────────────────────────────
    let config = load_config(&cli)?;
    info!(
        "Config: port={} baud={} budget={}ms data_dir={}",
        config.serial_port,
        config.baud_rate,
        config.cycle_budget_ms,
        config.data_dir.display()
    );

    // ── 2. Link + engine ──────────────────────────────────────
    let mut sink = LogEventSink::new();
    let link = open_link(&config, cli.simulate, &mut sink);
    let mut engine = Engine::new(link, StdDelay, SystemClock, &config);
    let handle = engine.handle();

    // ── 3. Shutdown signal ────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed))
            .context("installing Ctrl-C handler")?;
    }

    // ── 4. Acquisition thread ─────────────────────────────────
    let worker = {
        let shutdown = Arc::clone(&shutdown);
        thread::Builder::new()
            .name("acquisition".into())
            .spawn(move || {
                let mut sink = LogEventSink::new();
                engine.run(&shutdown, &mut sink);
            })
            .context("spawning acquisition thread")?
    };

    // ── 5. Status reporter (read-only consumer) ───────────────
    let interval = Duration::from_millis(u64::from(config.status_interval_ms));
    let mut next = Instant::now() + interval;
    while !shutdown.load(Ordering::Relaxed) {
        sleep_until(next, &shutdown);
        next += interval;
        if !shutdown.load(Ordering::Relaxed) {
            report_status(&handle);
        }
    }

    info!("Shutdown requested, waiting for the current cycle");
    worker
        .join()
        .map_err(|_| anyhow!("acquisition thread panicked"))?;
    report_status(&handle);
    Ok(())
}
