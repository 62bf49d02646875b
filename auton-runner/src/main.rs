/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use auton_core::config::{ConfigManager, RobotConfig};
use auton_core::hal::{Command, SimHal};
use auton_core::resource::ResourceRegistry;
use auton_core::routine::{FieldLayout, RoutineSelector, StartLocation, Subsystems};
use auton_core::trajectory::TrajectoryLibrary;
use auton_core::{BuildError, Scheduler, SchedulerStatus, Task};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Runs one autonomous routine against the simulated robot.
///
/// Example:
///   auton-runner -c robot.yaml -t paths/ -l center -f LRL
#[derive(Debug, Parser)]
#[command(
    name = "auton-runner",
    about = "Autonomous routine runner – simulated robot",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML robot configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Directory holding `<path>_left.csv` / `<path>_right.csv` trajectories.
    #[arg(short = 't', long = "paths", default_value = "paths")]
    paths: PathBuf,

    /// Start location on the alliance wall (left, center, right).
    #[arg(short = 'l', long = "location", default_value = "center")]
    location: StartLocation,

    /// Field layout code reported by the field, e.g. `LRL`.
    #[arg(short = 'f', long = "field")]
    field: FieldLayout,

    /// Tick as fast as possible instead of waiting for each period.
    #[arg(long = "no-wait", default_value_t = false)]
    no_wait: bool,

    /// Override the configured tick period (milliseconds).
    #[arg(long = "period-ms")]
    period_ms: Option<u64>,

    /// Override the configured autonomous period (seconds).
    #[arg(long = "duration-s")]
    duration_s: Option<f64>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut RobotConfig) {
        if let Some(period_ms) = self.period_ms {
            config.scheduler.period_ms = period_ms;
        }
        if let Some(duration_s) = self.duration_s {
            config.scheduler.autonomous_period_s = duration_s;
        }
    }
}

/// Configuration from `--config` (or the defaults) with the CLI overrides applied.
fn load_config(cli: &Cli) -> Result<RobotConfig> {
    let mut manager = ConfigManager::new();
    match &cli.config {
        Some(path) => manager
            .load_from_file(path)
            .with_context(|| format!("robot configuration {}", path.display()))?,
        None => warn!("No configuration file provided, using default robot settings"),
    }
    let mut config = manager.config().clone();
    cli.apply_overrides(&mut config);
    Ok(config)
}

/// Picks and builds the routine for the reported field layout.
fn build_routine(cli: &Cli, config: &RobotConfig) -> Result<Task, BuildError> {
    let mut registry = ResourceRegistry::new();
    let subsystems = Subsystems::register(&mut registry);
    RoutineSelector::new(subsystems, config.clone(), TrajectoryLibrary::new(&cli.paths))
        .select(cli.field, cli.location)
}

// ── Tick loop ─────────────────────────────────────────────────────────────────

/// Tick until the routine ends or the autonomous period runs out, then
/// cancel whatever is still running.
async fn run_autonomous(scheduler: &mut Scheduler<SimHal>, limit: Duration, wait: bool) -> SchedulerStatus {
    let mut interval = tokio::time::interval(scheduler.period());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    while scheduler.elapsed() < limit {
        if wait {
            tokio::select! {
                _ = interval.tick() => {}
                _ = &mut ctrl_c => {
                    warn!("Interrupted, canceling routine");
                    scheduler.cancel();
                    return scheduler.status();
                }
            }
        }
        let status = scheduler.tick();
        if status != SchedulerStatus::Running {
            return status;
        }
    }

    warn!(
        elapsed_ms = scheduler.elapsed().as_millis() as u64,
        "Autonomous period over with the routine still running, canceling"
    );
    scheduler.cancel();
    scheduler.status()
}

/// `(controller, actuator)` command counts.
fn command_counts(hal: &SimHal) -> (usize, usize) {
    hal.commands().iter().fold((0, 0), |(ctl, act), c| match c {
        Command::Set { .. } => (ctl + 1, act),
        Command::SetState(..) => (ctl, act + 1),
        _ => (ctl, act),
    })
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        config   = ?cli.config,
        paths    = %cli.paths.display(),
        location = ?cli.location,
        field    = %cli.field,
        no_wait  = cli.no_wait,
        "Configuration"
    );

    // ── Load robot configuration ──────────────────────────────────────────────
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load robot configuration: {:#}", e);
            process::exit(1);
        }
    };

    // ── Build the routine ─────────────────────────────────────────────────────
    let root = match build_routine(&cli, &config) {
        Ok(root) => root,
        Err(e) => {
            error!("Failed to build routine for {} from {:?}: {}", cli.field, cli.location, e);
            process::exit(1);
        }
    };

    // ── Run ───────────────────────────────────────────────────────────────────
    let mut scheduler = Scheduler::new(SimHal::new(), config.scheduler.period());
    scheduler.start(root);
    let outcome = run_autonomous(
        &mut scheduler,
        config.scheduler.autonomous_period(),
        !cli.no_wait,
    )
    .await;

    let (controller, actuator) = command_counts(scheduler.hal());
    info!(
        %outcome,
        ticks = scheduler.tick_count(),
        elapsed_ms = scheduler.elapsed().as_millis() as u64,
        controller_commands = controller,
        actuator_commands = actuator,
        "Autonomous done"
    );
}
