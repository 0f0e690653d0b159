use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dispatch_throttle::clock::{Clock, ManualClock, Sleeper, SystemClock, ThreadSleeper};
use dispatch_throttle::config::{AppConfig, LoggingConfig};
use dispatch_throttle::scenario::{replay, ReplayRecord, ReplaySummary, Scenario};
use dispatch_throttle::throttle::{DispatchThrottler, TracingSink};

/// Replay a timed message sequence through a sliding-window throttler.
#[derive(Debug, Parser)]
#[command(name = "dispatch-throttle", version, about)]
struct Args {
    /// YAML configuration file (DISPATCH_THROTTLE__* variables override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// YAML scenario listing the messages to dispatch
    #[arg(short, long)]
    scenario: PathBuf,

    /// Use the wall clock and really sleep instead of simulating time
    #[arg(long)]
    realtime: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging);

    info!("Starting dispatch throttle replay");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let scenario = Scenario::from_file(&args.scenario)
        .with_context(|| format!("Failed to load scenario {}", args.scenario.display()))?;
    info!(messages = scenario.messages.len(), realtime = args.realtime, "Scenario loaded");

    let records = if args.realtime {
        let mut throttler = DispatchThrottler::from_config(
            &config.throttle,
            SystemClock,
            ThreadSleeper,
            Box::new(TracingSink),
        )?;
        replay(&mut throttler, &SystemClock, &scenario, |due| {
            let now = SystemClock.now_ms();
            if due > now {
                ThreadSleeper.sleep_ms(now.abs_diff(due));
            }
        })
    } else {
        let clock = ManualClock::new(0);
        let mut throttler = DispatchThrottler::from_config(
            &config.throttle,
            clock.clone(),
            clock.clone(),
            Box::new(TracingSink),
        )?;
        replay(&mut throttler, &clock, &scenario, |due| {
            if clock.now_ms() < due {
                clock.set(due);
            }
        })
    };

    print_records(&records)?;

    let summary = ReplaySummary::from_records(&records);
    info!(
        admitted = summary.admitted,
        delayed = summary.delayed,
        rejected = summary.rejected,
        "Replay finished"
    );
    Ok(())
}

/// Initialize tracing on stderr so stdout carries only replay records.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn print_records(records: &[ReplayRecord]) -> anyhow::Result<()> {
    for record in records {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}
