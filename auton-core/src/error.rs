/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error type for routine construction.
//!
//! Everything that can go wrong happens **before** the first tick: a missing
//! or malformed trajectory file, an invalid field layout string, a gate
//! threshold outside its domain.  Once a routine is built, ticking it cannot
//! fail; hardware faults are the HAL's concern.
//!
//! The runner wraps these in `anyhow` with file-path context; library callers
//! can match on the variants directly.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// The trajectory file could not be opened or read.
    #[error("cannot read trajectory file '{}': {source}", path.display())]
    TrajectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A row in a trajectory file is not a valid sample.
    #[error("trajectory file '{}' line {line}: {reason}", path.display())]
    MalformedTrajectory {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("trajectory '{name}' has no samples")]
    EmptyTrajectory { name: String },

    /// Sample period is zero, negative or not finite.
    #[error("trajectory '{name}' has invalid sample period {period_s}s")]
    InvalidSamplePeriod { name: String, period_s: f64 },

    /// Left and right sample streams disagree on the sample period.
    #[error("trajectory '{name}': left and right sample periods differ ({left_s}s vs {right_s}s)")]
    MismatchedSidePeriods {
        name: String,
        left_s: f64,
        right_s: f64,
    },

    #[error("field layout '{0}' is invalid: expected three characters, each 'L' or 'R'")]
    InvalidFieldLayout(String),

    #[error("unknown start location '{0}' (valid: left, center, right)")]
    UnknownStartLocation(String),

    /// Gate fraction outside `[0, 1]`, or a non-finite value.
    #[error("gate '{gate}' has invalid threshold {value}")]
    InvalidGateThreshold { gate: String, value: f64 },
}
