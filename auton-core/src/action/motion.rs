/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Closed-loop position actions for the drivetrain and the elevator.

use tracing::debug;

use crate::hal::{Axis, ControlMode, LoopIndex, Side};
use crate::resource::{Resource, ResourceSet};
use crate::task::{Behavior, Progress, TickContext};

// ── DriveToPosition ───────────────────────────────────────────────────────────

/// Drives both sides to `distance` encoder units from where they start,
/// optionally holding `heading` on the auxiliary loop.  A zero distance with
/// a heading turns in place.
pub struct DriveToPosition {
    name: String,
    requirements: ResourceSet,
    distance: f64,
    heading: Option<f64>,
    tolerance: f64,
    /// Executes before the closed-loop error is trusted.
    min_executes: u32,
    executes: u32,
    current: f64,
}

impl DriveToPosition {
    pub fn new(drivetrain: &Resource, distance: f64, tolerance: f64, min_executes: u32) -> Self {
        Self {
            name: format!("drive_to({distance:.0})"),
            requirements: drivetrain.as_set(),
            distance,
            heading: None,
            tolerance,
            min_executes,
            executes: 0,
            current: 0.0,
        }
    }

    pub fn with_heading(mut self, degrees: f64) -> Self {
        self.heading = Some(degrees);
        self.name = format!("drive_to({:.0}, {degrees:.0}°)", self.distance);
        self
    }

    pub fn is_settled(&self) -> bool {
        self.executes >= self.min_executes
    }

    fn command(&self, ctx: &mut TickContext<'_>) {
        for side in [Side::Left, Side::Right] {
            ctx.hal()
                .set(side.axis(), ControlMode::Position, self.distance, self.heading);
        }
    }
}

impl Behavior for DriveToPosition {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> ResourceSet {
        self.requirements
    }

    fn initialize(&mut self, ctx: &mut TickContext<'_>) {
        self.executes = 0;
        self.current = 0.0;
        for side in [Side::Left, Side::Right] {
            ctx.hal().reset_position(side.axis());
        }
        self.command(ctx);
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) {
        if !self.is_settled() {
            self.executes += 1;
        }
        self.command(ctx);
        let hal = ctx.hal_ref();
        self.current = (hal.position(Axis::DriveLeft) + hal.position(Axis::DriveRight)) / 2.0;
    }

    fn is_finished(&self, ctx: &TickContext<'_>) -> bool {
        self.is_settled()
            && ctx
                .hal_ref()
                .drive_error_within(LoopIndex::Primary, self.tolerance)
    }

    fn end(&mut self, ctx: &mut TickContext<'_>, interrupted: bool) {
        for side in [Side::Left, Side::Right] {
            ctx.hal()
                .set(side.axis(), ControlMode::PercentOutput, 0.0, None);
        }
        debug!(task = %self.name, position = self.current, interrupted, "drive stopped");
    }

    fn progress(&self) -> Progress {
        Progress::positional(self.current, self.distance, self.is_settled())
    }
}

// ── MoveElevator ──────────────────────────────────────────────────────────────

pub struct MoveElevator {
    name: String,
    requirements: ResourceSet,
    height: f64,
    tolerance: f64,
    current: f64,
}

impl MoveElevator {
    pub fn new(elevator: &Resource, height: f64, tolerance: f64) -> Self {
        Self {
            name: format!("elevator_to({height:.0})"),
            requirements: elevator.as_set(),
            height,
            tolerance,
            current: 0.0,
        }
    }
}

impl Behavior for MoveElevator {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> ResourceSet {
        self.requirements
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) {
        ctx.hal()
            .set(Axis::Elevator, ControlMode::MotionMagic, self.height, None);
        self.current = ctx.hal_ref().position(Axis::Elevator);
    }

    fn is_finished(&self, ctx: &TickContext<'_>) -> bool {
        ctx.hal_ref()
            .closed_loop_error(Axis::Elevator, LoopIndex::Primary)
            .abs()
            <= self.tolerance
    }

    /// A completed move keeps holding its height; only an interrupted one
    /// drops to zero output.
    fn end(&mut self, ctx: &mut TickContext<'_>, interrupted: bool) {
        if interrupted {
            ctx.hal()
                .set(Axis::Elevator, ControlMode::PercentOutput, 0.0, None);
        }
    }

    fn progress(&self) -> Progress {
        Progress::positional(self.current, self.height, true)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
