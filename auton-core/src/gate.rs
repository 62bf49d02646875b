/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Synchronization gates: tasks that do nothing and finish once another
//! task's published progress crosses a threshold.
//!
//! Placed at the head of a sequential branch, a gate delays the rest of the
//! branch until, for example, the drive path is 1.9 s from its end:
//!
//! ```text
//! Parallel ┬─ follow(path)
//!          └─ Sequential ── Gate(path, 1.9 s before end) ── raise elevator
//! ```
//!
//! | Condition | Fires when |
//! |---|---|
//! | from start, fraction `f` | `elapsed_fraction >= f` |
//! | before end, fraction `f` | `elapsed_fraction >= 1 - f` |
//! | from start, time `t` | `elapsed_fraction >= t / total_time` |
//! | before end, time `t` | `elapsed_fraction >= 1 - t / total_time` |
//! | position fraction `f` | `current / desired >= f`, once settled |
//!
//! A target that has not started never satisfies a gate; a finished target
//! always does.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::BuildError;
use crate::task::{Behavior, TaskHandle, TaskState, TickContext};

/// Slack applied to every threshold comparison.
pub const FRACTION_EPSILON: f64 = 1e-9;

// ── Condition types ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    FromStart,
    BeforeEnd,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    /// Fraction of the target's total, in `[0, 1]`.
    Fraction(f64),
    /// Absolute time, converted through the target's `total_time`.
    Time(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateCondition {
    Elapsed {
        polarity: Polarity,
        threshold: Threshold,
    },
    Position {
        fraction: f64,
    },
}

/// What a gate does when its target is canceled before the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetCanceledPolicy {
    /// Finish, letting the dependent branch continue.
    #[default]
    Release,
    /// Never finish; the branch waits until its enclosing group is canceled.
    Hold,
}

// ── Gate ──────────────────────────────────────────────────────────────────────

pub struct Gate {
    name: String,
    target: TaskHandle,
    condition: GateCondition,
    on_canceled: TargetCanceledPolicy,
    fired: bool,
}

impl Gate {
    pub fn new(target: &TaskHandle, condition: GateCondition) -> Result<Self, BuildError> {
        let name = format!("gate({})", target.name());
        let fraction = match condition {
            GateCondition::Elapsed {
                threshold: Threshold::Fraction(f),
                ..
            } => Some(f),
            GateCondition::Position { fraction } => Some(fraction),
            GateCondition::Elapsed {
                threshold: Threshold::Time(_),
                ..
            } => None,
        };
        if let Some(f) = fraction {
            if !(0.0..=1.0).contains(&f) {
                return Err(BuildError::InvalidGateThreshold {
                    gate: name,
                    value: f,
                });
            }
        }
        Ok(Self {
            name,
            target: target.clone(),
            condition,
            on_canceled: TargetCanceledPolicy::default(),
            fired: false,
        })
    }

    pub fn wait_for_start_fraction(target: &TaskHandle, fraction: f64) -> Result<Self, BuildError> {
        Self::new(
            target,
            GateCondition::Elapsed {
                polarity: Polarity::FromStart,
                threshold: Threshold::Fraction(fraction),
            },
        )
    }

    pub fn wait_for_end_fraction(target: &TaskHandle, fraction: f64) -> Result<Self, BuildError> {
        Self::new(
            target,
            GateCondition::Elapsed {
                polarity: Polarity::BeforeEnd,
                threshold: Threshold::Fraction(fraction),
            },
        )
    }

    pub fn wait_for_start_time(target: &TaskHandle, time: Duration) -> Result<Self, BuildError> {
        Self::new(
            target,
            GateCondition::Elapsed {
                polarity: Polarity::FromStart,
                threshold: Threshold::Time(time),
            },
        )
    }

    pub fn wait_for_end_time(target: &TaskHandle, time: Duration) -> Result<Self, BuildError> {
        Self::new(
            target,
            GateCondition::Elapsed {
                polarity: Polarity::BeforeEnd,
                threshold: Threshold::Time(time),
            },
        )
    }

    pub fn wait_for_position_fraction(
        target: &TaskHandle,
        fraction: f64,
    ) -> Result<Self, BuildError> {
        Self::new(target, GateCondition::Position { fraction })
    }

    pub fn on_target_canceled(mut self, policy: TargetCanceledPolicy) -> Self {
        self.on_canceled = policy;
        self
    }

    pub fn condition(&self) -> GateCondition {
        self.condition
    }

    fn threshold_met(&self) -> bool {
        let progress = self.target.progress();
        match self.condition {
            GateCondition::Elapsed {
                polarity,
                threshold,
            } => {
                let Some(elapsed) = progress.elapsed_fraction else {
                    return false;
                };
                let fraction = match threshold {
                    Threshold::Fraction(f) => f,
                    Threshold::Time(t) => match progress.total_time {
                        Some(total) if !total.is_zero() => t.as_secs_f64() / total.as_secs_f64(),
                        Some(_) => 1.0,
                        None => return false,
                    },
                };
                let required = match polarity {
                    Polarity::FromStart => fraction,
                    Polarity::BeforeEnd => 1.0 - fraction,
                };
                elapsed + FRACTION_EPSILON >= required
            }
            GateCondition::Position { fraction } => match progress.position {
                Some(p) if p.settled => p.fraction() + FRACTION_EPSILON >= fraction,
                _ => false,
            },
        }
    }
}

impl Behavior for Gate {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, _ctx: &mut TickContext<'_>) {
        self.fired = false;
        debug!(gate = %self.name, condition = ?self.condition, "gate armed");
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) {
        if self.fired {
            return;
        }
        self.fired = match self.target.state() {
            TaskState::Initialized => false,
            TaskState::Running => self.threshold_met(),
            TaskState::Finished => true,
            TaskState::Canceled => match self.on_canceled {
                TargetCanceledPolicy::Release => {
                    warn!(gate = %self.name, target = %self.target.name(), "target canceled, releasing gate");
                    true
                }
                TargetCanceledPolicy::Hold => false,
            },
        };
        if self.fired {
            info!(
                gate = %self.name,
                at = ?ctx.now(),
                target_fraction = ?self.target.elapsed_fraction(),
                "gate fired"
            );
        }
    }

    fn is_finished(&self, _ctx: &TickContext<'_>) -> bool {
        self.fired
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
