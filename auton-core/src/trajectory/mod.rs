/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pre-computed drivetrain trajectories.
//!
//! A path is stored as two Pathfinder CSV files, one per drivetrain side:
//!
//! ```text
//! <dir>/<path>_left.csv
//! <dir>/<path>_right.csv
//! ```
//!
//! Each file starts with the header
//! `dt,x,y,position,velocity,acceleration,jerk,heading` followed by one row
//! per sample.  Only `dt`, `position`, `velocity` and `heading` are used.
//! Pathfinder headings are in radians; [`Sample::heading`] is in degrees.
//!
//! Every row of a stream must carry the same `dt`.

pub mod follower;

pub use follower::TrajectoryFollower;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::BuildError;

/// Tolerance when comparing per-row `dt` values.
const DT_TOLERANCE_S: f64 = 1e-6;

const EXPECTED_COLUMNS: usize = 8;
const COL_DT: usize = 0;
const COL_POSITION: usize = 3;
const COL_VELOCITY: usize = 4;
const COL_HEADING: usize = 7;

// ── Sample / Trajectory ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Distance along the path (encoder units).
    pub position: f64,
    /// Velocity feed-forward (encoder units per sample period).
    pub velocity: f64,
    /// Heading in degrees.
    pub heading: f64,
}

/// One side's sample stream at a fixed period.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    name: String,
    samples: Vec<Sample>,
    period: Duration,
}

impl Trajectory {
    pub fn new(
        name: impl Into<String>,
        samples: Vec<Sample>,
        period: Duration,
    ) -> Result<Self, BuildError> {
        let name = name.into();
        if samples.is_empty() {
            return Err(BuildError::EmptyTrajectory { name });
        }
        if period.is_zero() {
            return Err(BuildError::InvalidSamplePeriod {
                name,
                period_s: 0.0,
            });
        }
        Ok(Self {
            name,
            samples,
            period,
        })
    }

    /// Parse a Pathfinder CSV document.  `path` is only used in errors.
    pub fn parse_csv(name: impl Into<String>, path: &Path, text: &str) -> Result<Self, BuildError> {
        let name = name.into();
        let mut samples = Vec::new();
        let mut period_s: Option<f64> = None;
        let mut first_row = true;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if std::mem::take(&mut first_row) && fields[0].parse::<f64>().is_err() {
                // header row
                continue;
            }
            let malformed = |reason: String| BuildError::MalformedTrajectory {
                path: path.to_path_buf(),
                line: line_no,
                reason,
            };
            if fields.len() != EXPECTED_COLUMNS {
                return Err(malformed(format!(
                    "expected {EXPECTED_COLUMNS} columns, found {}",
                    fields.len()
                )));
            }
            let number = |col: usize| -> Result<f64, BuildError> {
                fields[col]
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| malformed(format!("column {} is not a number: '{}'", col + 1, fields[col])))
            };

            let dt = number(COL_DT)?;
            if dt <= 0.0 {
                return Err(BuildError::InvalidSamplePeriod { name, period_s: dt });
            }
            match period_s {
                None => period_s = Some(dt),
                Some(p) if (p - dt).abs() > DT_TOLERANCE_S => {
                    return Err(malformed(format!("dt {dt} differs from first row's {p}")));
                }
                Some(_) => {}
            }

            samples.push(Sample {
                position: number(COL_POSITION)?,
                velocity: number(COL_VELOCITY)?,
                heading: number(COL_HEADING)?.to_degrees(),
            });
        }

        let Some(period_s) = period_s else {
            return Err(BuildError::EmptyTrajectory { name });
        };
        debug!(trajectory = %name, samples = samples.len(), period_s, "trajectory parsed");
        match Duration::try_from_secs_f64(period_s) {
            Ok(period) => Trajectory::new(name, samples, period),
            Err(_) => Err(BuildError::InvalidSamplePeriod { name, period_s }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always `false`; construction rejects empty streams.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sample at `index`, or the last sample when the stream is shorter.
    pub fn sample_clamped(&self, index: usize) -> Sample {
        let last = self.samples.len() - 1;
        self.samples[index.min(last)]
    }

    pub fn last(&self) -> Sample {
        self.sample_clamped(usize::MAX)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
}

/// Left and right streams of one path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPair {
    pub left: Trajectory,
    pub right: Trajectory,
}

// ── TrajectoryLibrary ─────────────────────────────────────────────────────────

/// Loads [`PathPair`]s by name from a directory of CSV files.
#[derive(Debug, Clone)]
pub struct TrajectoryLibrary {
    dir: PathBuf,
}

impl TrajectoryLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self, path_name: &str) -> Result<PathPair, BuildError> {
        let left = self.load_side(path_name, "left")?;
        let right = self.load_side(path_name, "right")?;
        Ok(PathPair { left, right })
    }

    fn load_side(&self, path_name: &str, side: &str) -> Result<Trajectory, BuildError> {
        let file = self.dir.join(format!("{path_name}_{side}.csv"));
        let text = fs::read_to_string(&file).map_err(|source| BuildError::TrajectoryUnreadable {
            path: file.clone(),
            source,
        })?;
        Trajectory::parse_csv(format!("{path_name}_{side}"), &file, &text)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
