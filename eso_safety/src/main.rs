//! # EsoCore Safety Supervisor
//!
//! Loads the safety configuration, opens a HAL driver from the registry,
//! initializes the supervisor and runs the supervisory loop until Ctrl-C
//! or the optional cycle limit. Shutdown de-energizes every output.

use clap::Parser;
use eso_common::config::{ConfigError, ConfigLoader, LogLevel};
use eso_hal::DriverRegistry;
use eso_safety::config::SafetyAppConfig;
use eso_safety::cycle::{CycleRunner, rt_setup};
use eso_safety::{SafetySupervisor, SharedSupervisor};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// EsoCore Safety Supervisor: safety I/O supervisory loop
#[derive(Parser, Debug)]
#[command(name = "eso_safety")]
#[command(author = "EsoCore")]
#[command(version)]
#[command(about = "Safety I/O supervisor with dual-channel monitoring and safe-state enforcement")]
struct Args {
    /// Path to the safety configuration TOML.
    #[arg(short, long, default_value = "config/safety.toml")]
    config: PathBuf,

    /// HAL driver name from the registry.
    #[arg(short, long, default_value = "simulation")]
    driver: String,

    /// Stop after N supervisory cycles (default: run until Ctrl-C).
    #[arg(long, value_name = "N")]
    cycles: Option<u64>,

    /// Print the event log as JSON on exit.
    #[arg(long)]
    dump_events: bool,

    /// List registered HAL drivers and exit.
    #[arg(long)]
    list_drivers: bool,

    /// CPU core to pin the supervisory thread to (default: 1).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (default: 80).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    // Loaded ahead of tracing so `[shared] log_level` can set the filter.
    let config = SafetyAppConfig::load_validated(&args.config);
    setup_tracing(&args, config.as_ref().ok().map(|c| c.shared.log_level));

    info!("EsoCore Safety Supervisor v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args, config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("EsoCore Safety Supervisor shutdown complete");
}

fn run(
    args: &Args,
    config: Result<SafetyAppConfig, ConfigError>,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = DriverRegistry::with_builtin();
    if args.list_drivers {
        for name in registry.list_drivers() {
            println!("{name}");
        }
        return Ok(());
    }

    let config = config?;
    info!(
        "Config OK: '{}', category {}, test pulse {} ms, {} inputs, {} outputs",
        config.shared.service_name,
        config.system.safety_category,
        config.system.test_pulse_interval_ms,
        config.inputs.len(),
        config.outputs.len()
    );

    let hal = registry.create_driver(&args.driver)?;
    info!("HAL driver '{}' loaded", hal.name());

    let mut supervisor = SafetySupervisor::with_monotonic_clock(hal);
    config.apply(&mut supervisor)?;
    let shared = SharedSupervisor::new(supervisor);

    rt_setup(args.cpu_core, args.rt_priority)?;

    let mut runner = CycleRunner::new(shared.clone());
    if let Some(n) = args.cycles {
        runner = runner.with_max_cycles(n);
    }

    let running = runner.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    let result = runner.run();

    // Outputs go off whatever the loop result.
    let mut guard = shared.lock();
    let status = guard.system_status();
    let stats = guard.statistics();
    info!(
        "Final state {:?}, fault {}, {} faults, {} resets, {} cycles",
        status.current_state, status.fault_code, stats.fault_count, stats.reset_count, stats.cycle_count
    );
    if args.dump_events {
        println!("{}", serde_json::to_string_pretty(&guard.event_log())?);
    }
    if let Err(e) = guard.deinit() {
        warn!("Deinit failed: {e}");
    }
    drop(guard);

    if let Err(e) = result {
        error!("Supervisory loop error: {e}");
        return Err(e.into());
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: Option<LogLevel>) {
    let directive: Directive = if args.verbose {
        Level::DEBUG.into()
    } else {
        configured
            .unwrap_or_default()
            .as_directive()
            .parse()
            .unwrap_or_else(|_| Level::INFO.into())
    };

    let filter = EnvFilter::from_default_env().add_directive(directive);

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
