/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Leaf tasks used by the autonomous routines.
//!
//! | Action | Requires | Finishes |
//! |---|---|---|
//! | [`SetActuator`] | pneumatics | first tick |
//! | [`Delay`] | nothing | after the duration |
//! | [`RunIntakeTimed`] | intake | after the duration |
//! | [`MoveElevatorTimed`] | elevator | after the duration |
//! | [`DriveToPosition`] | drivetrain | settled and on target |
//! | [`MoveElevator`] | elevator | on target |

pub mod motion;

pub use motion::{DriveToPosition, MoveElevator};

use std::time::Duration;

use tracing::debug;

use crate::hal::{ActuatorId, ActuatorState, Axis, ControlMode};
use crate::resource::{Resource, ResourceSet};
use crate::task::{Behavior, Progress, TickContext};

/// Fraction of `total` covered by `elapsed`, clamped to `[0, 1]`.
fn time_fraction(elapsed: Duration, total: Duration) -> f64 {
    if total.is_zero() {
        1.0
    } else {
        (elapsed.as_secs_f64() / total.as_secs_f64()).min(1.0)
    }
}

// ── SetActuator ───────────────────────────────────────────────────────────────

pub struct SetActuator {
    name: String,
    requirements: ResourceSet,
    actuator: ActuatorId,
    state: ActuatorState,
}

impl SetActuator {
    pub fn new(pneumatics: &Resource, actuator: ActuatorId, state: ActuatorState) -> Self {
        Self {
            name: format!("set_actuator({actuator:?}={state:?})"),
            requirements: pneumatics.as_set(),
            actuator,
            state,
        }
    }
}

impl Behavior for SetActuator {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> ResourceSet {
        self.requirements
    }

    fn initialize(&mut self, ctx: &mut TickContext<'_>) {
        ctx.hal().set_state(self.actuator, self.state);
    }

    fn execute(&mut self, _ctx: &mut TickContext<'_>) {}

    fn is_finished(&self, _ctx: &TickContext<'_>) -> bool {
        true
    }
}

// ── Delay ─────────────────────────────────────────────────────────────────────

pub struct Delay {
    name: String,
    duration: Duration,
    started_at: Duration,
    elapsed: Duration,
}

impl Delay {
    pub fn new(duration: Duration) -> Self {
        Self {
            name: format!("delay({}ms)", duration.as_millis()),
            duration,
            started_at: Duration::ZERO,
            elapsed: Duration::ZERO,
        }
    }
}

impl Behavior for Delay {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, ctx: &mut TickContext<'_>) {
        self.started_at = ctx.now();
        self.elapsed = Duration::ZERO;
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) {
        self.elapsed = ctx.now().saturating_sub(self.started_at);
    }

    fn is_finished(&self, _ctx: &TickContext<'_>) -> bool {
        self.elapsed >= self.duration
    }

    fn progress(&self) -> Progress {
        Progress::timed(time_fraction(self.elapsed, self.duration), self.duration)
    }
}

// ── RunIntakeTimed ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeDirection {
    Intake,
    Outtake,
}

impl IntakeDirection {
    fn sign(self) -> f64 {
        match self {
            IntakeDirection::Intake => 1.0,
            IntakeDirection::Outtake => -1.0,
        }
    }
}

/// Runs the intake rollers open-loop for a fixed time.
pub struct RunIntakeTimed {
    name: String,
    requirements: ResourceSet,
    duration: Duration,
    direction: IntakeDirection,
    speed: f64,
    started_at: Duration,
    elapsed: Duration,
}

impl RunIntakeTimed {
    /// `speed` is the magnitude of the percent output, in `[0, 1]`.
    pub fn new(
        intake: &Resource,
        duration: Duration,
        direction: IntakeDirection,
        speed: f64,
    ) -> Self {
        Self {
            name: format!("intake({direction:?}, {}ms)", duration.as_millis()),
            requirements: intake.as_set(),
            duration,
            direction,
            speed: speed.abs().min(1.0),
            started_at: Duration::ZERO,
            elapsed: Duration::ZERO,
        }
    }
}

impl Behavior for RunIntakeTimed {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> ResourceSet {
        self.requirements
    }

    fn initialize(&mut self, ctx: &mut TickContext<'_>) {
        self.started_at = ctx.now();
        self.elapsed = Duration::ZERO;
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) {
        self.elapsed = ctx.now().saturating_sub(self.started_at);
        let output = self.direction.sign() * self.speed;
        ctx.hal()
            .set(Axis::Intake, ControlMode::PercentOutput, output, None);
    }

    fn is_finished(&self, _ctx: &TickContext<'_>) -> bool {
        self.elapsed >= self.duration
    }

    fn end(&mut self, ctx: &mut TickContext<'_>, interrupted: bool) {
        ctx.hal()
            .set(Axis::Intake, ControlMode::PercentOutput, 0.0, None);
        debug!(task = %self.name, interrupted, "intake stopped");
    }

    fn progress(&self) -> Progress {
        Progress::timed(time_fraction(self.elapsed, self.duration), self.duration)
    }
}

// ── MoveElevatorTimed ─────────────────────────────────────────────────────────

/// Drives the elevator open-loop for a fixed time.  Positive output raises it.
pub struct MoveElevatorTimed {
    name: String,
    requirements: ResourceSet,
    duration: Duration,
    output: f64,
    started_at: Duration,
    elapsed: Duration,
}

impl MoveElevatorTimed {
    /// `output` is clamped to `[-1, 1]`.
    pub fn new(elevator: &Resource, duration: Duration, output: f64) -> Self {
        Self {
            name: format!("elevator_timed({output:+.2}, {}ms)", duration.as_millis()),
            requirements: elevator.as_set(),
            duration,
            output: output.clamp(-1.0, 1.0),
            started_at: Duration::ZERO,
            elapsed: Duration::ZERO,
        }
    }
}

impl Behavior for MoveElevatorTimed {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> ResourceSet {
        self.requirements
    }

    fn initialize(&mut self, ctx: &mut TickContext<'_>) {
        self.started_at = ctx.now();
        self.elapsed = Duration::ZERO;
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) {
        self.elapsed = ctx.now().saturating_sub(self.started_at);
        ctx.hal()
            .set(Axis::Elevator, ControlMode::PercentOutput, self.output, None);
    }

    fn is_finished(&self, _ctx: &TickContext<'_>) -> bool {
        self.elapsed >= self.duration
    }

    fn end(&mut self, ctx: &mut TickContext<'_>, _interrupted: bool) {
        ctx.hal()
            .set(Axis::Elevator, ControlMode::PercentOutput, 0.0, None);
    }

    fn progress(&self) -> Progress {
        Progress::timed(time_fraction(self.elapsed, self.duration), self.duration)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
