//! Robot configuration loading.
//!
//! Every field is optional; anything absent from the file falls back to the
//! value the robot was tuned with.
//!
//! The expected YAML structure is:
//! ```yaml
//! scheduler:
//!   period_ms: 20
//!   autonomous_period_s: 15
//! drivetrain:
//!   trajectory_tolerance: 100
//!   position_tolerance: 100
//!   position_min_executes: 10
//!   encoder_units_per_foot: 3911.5
//! elevator:
//!   tolerance: 75
//!   switch_height: 10000
//!   scale_height: 31000
//!   intake_height: 0
//! autonomous:
//!   baseline_distance_ft: 10
//!   scale_distance_ft: 22
//!   scale_outtake_s: 0.5
//!   switch_outtake_s: 0.17
//!   intake_s: 0.4
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

// ── Configuration sections ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Tick period in milliseconds.
    pub period_ms: u64,
    /// Length of the autonomous period; the runner cancels the routine after it.
    pub autonomous_period_s: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period_ms: 20,
            autonomous_period_s: 15.0,
        }
    }
}

impl SchedulerConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms.max(1))
    }

    pub fn autonomous_period(&self) -> Duration {
        Duration::try_from_secs_f64(self.autonomous_period_s.max(0.0)).unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DrivetrainConfig {
    /// Allowed primary closed-loop error at the end of a trajectory (encoder units).
    pub trajectory_tolerance: f64,
    /// Allowed primary closed-loop error for drive-to-position (encoder units).
    pub position_tolerance: f64,
    /// Executes before drive-to-position trusts its error reading.
    pub position_min_executes: u32,
    pub encoder_units_per_foot: f64,
}

impl Default for DrivetrainConfig {
    fn default() -> Self {
        Self {
            trajectory_tolerance: 100.0,
            position_tolerance: 100.0,
            position_min_executes: 10,
            encoder_units_per_foot: 3911.5,
        }
    }
}

impl DrivetrainConfig {
    pub fn feet_to_units(&self, feet: f64) -> f64 {
        feet * self.encoder_units_per_foot
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ElevatorConfig {
    pub tolerance: f64,
    pub switch_height: f64,
    pub scale_height: f64,
    pub intake_height: f64,
}

impl Default for ElevatorConfig {
    fn default() -> Self {
        Self {
            tolerance: 75.0,
            switch_height: 10_000.0,
            scale_height: 31_000.0,
            intake_height: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AutonomousConfig {
    pub baseline_distance_ft: f64,
    pub scale_distance_ft: f64,
    pub scale_outtake_s: f64,
    pub switch_outtake_s: f64,
    pub intake_s: f64,
}

impl Default for AutonomousConfig {
    fn default() -> Self {
        Self {
            baseline_distance_ft: 10.0,
            scale_distance_ft: 22.0,
            scale_outtake_s: 0.5,
            switch_outtake_s: 0.17,
            intake_s: 0.4,
        }
    }
}

/// Complete robot configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub scheduler: SchedulerConfig,
    pub drivetrain: DrivetrainConfig,
    pub elevator: ElevatorConfig,
    pub autonomous: AutonomousConfig,
}

// ── ConfigManager ─────────────────────────────────────────────────────────────

/// Loads and holds the [`RobotConfig`].
#[derive(Debug, Default)]
pub struct ConfigManager {
    config: RobotConfig,

    /// Set to `true` after a successful [`load_from_file`](Self::load_from_file).
    loaded: bool,
}

impl ConfigManager {
    /// Creates a manager holding the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `path`, replacing the current configuration.
    ///
    /// An empty document yields the defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or if the YAML is
    /// structurally invalid.  The previous configuration is kept.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        info!("Loading robot configuration from: {}", path.display());
        self.loaded = false;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let config: RobotConfig = if content.trim().is_empty() {
            RobotConfig::default()
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?
        };

        debug!(scheduler = ?config.scheduler, drivetrain = ?config.drivetrain, "timing and drive settings");
        debug!(elevator = ?config.elevator, autonomous = ?config.autonomous, "mechanism settings");

        self.config = config;
        self.loaded = true;

        info!(
            period_ms = self.config.scheduler.period_ms,
            autonomous_period_s = self.config.scheduler.autonomous_period_s,
            "Successfully loaded robot configuration"
        );
        Ok(())
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    /// Returns `true` after a successful call to [`load_from_file`](Self::load_from_file).
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
