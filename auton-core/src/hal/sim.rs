/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Deterministic in-memory robot used by the runner and the tests.
//!
//! Position targets are tracked instantly (the sensor jumps to the last
//! setpoint) unless a per-command step limit is configured with
//! [`SimHal::with_max_step`].  The closed-loop error of each axis is whatever
//! the caller configured, `0.0` by default.  Every command is appended to a
//! log.

use std::collections::BTreeMap;

use super::{ActuatorId, ActuatorState, Axis, ControlMode, Hal, LoopIndex};

/// One command issued through the [`Hal`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set {
        axis: Axis,
        mode: ControlMode,
        setpoint: f64,
        aux: Option<f64>,
    },
    ResetPosition(Axis),
    SetHeading(f64),
    SetState(ActuatorId, ActuatorState),
}

#[derive(Debug, Default)]
pub struct SimHal {
    log: Vec<Command>,
    positions: BTreeMap<Axis, f64>,
    errors: BTreeMap<(Axis, bool), f64>,
    actuators: BTreeMap<ActuatorId, ActuatorState>,
    heading: f64,
    max_step: Option<f64>,
}

impl SimHal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit how far a closed-loop axis moves per `set` call.
    pub fn with_max_step(mut self, step: f64) -> Self {
        self.max_step = Some(step.abs());
        self
    }

    /// Force the closed-loop error reported for `axis`.
    pub fn set_closed_loop_error(&mut self, axis: Axis, loop_index: LoopIndex, error: f64) {
        self.errors
            .insert((axis, loop_index == LoopIndex::Primary), error);
    }

    pub fn commands(&self) -> &[Command] {
        &self.log
    }

    pub fn command_count(&self) -> usize {
        self.log.len()
    }

    /// Number of `set` calls issued to `axis`.
    pub fn set_count(&self, axis: Axis) -> usize {
        self.log
            .iter()
            .filter(|c| matches!(c, Command::Set { axis: a, .. } if *a == axis))
            .count()
    }

    /// Most recent `set` issued to `axis`.
    pub fn last_set(&self, axis: Axis) -> Option<&Command> {
        self.log
            .iter()
            .rev()
            .find(|c| matches!(c, Command::Set { axis: a, .. } if *a == axis))
    }

    pub fn actuator(&self, id: ActuatorId) -> Option<ActuatorState> {
        self.actuators.get(&id).copied()
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}

impl Hal for SimHal {
    fn set(&mut self, axis: Axis, mode: ControlMode, setpoint: f64, aux: Option<f64>) {
        match mode {
            ControlMode::PercentOutput => {}
            ControlMode::Position | ControlMode::MotionMagic | ControlMode::ProfilePoint { .. } => {
                let next = match self.max_step {
                    None => setpoint,
                    Some(step) => {
                        let current = self.position(axis);
                        current + (setpoint - current).clamp(-step, step)
                    }
                };
                self.positions.insert(axis, next);
            }
        }
        if let Some(heading) = aux {
            self.heading = heading;
        }
        self.log.push(Command::Set {
            axis,
            mode,
            setpoint,
            aux,
        });
    }

    fn closed_loop_error(&self, axis: Axis, loop_index: LoopIndex) -> f64 {
        self.errors
            .get(&(axis, loop_index == LoopIndex::Primary))
            .copied()
            .unwrap_or(0.0)
    }

    fn position(&self, axis: Axis) -> f64 {
        self.positions.get(&axis).copied().unwrap_or(0.0)
    }

    fn reset_position(&mut self, axis: Axis) {
        self.positions.insert(axis, 0.0);
        self.log.push(Command::ResetPosition(axis));
    }

    fn set_heading(&mut self, degrees: f64) {
        self.heading = degrees;
        self.log.push(Command::SetHeading(degrees));
    }

    fn set_state(&mut self, actuator: ActuatorId, state: ActuatorState) {
        self.actuators.insert(actuator, state);
        self.log.push(Command::SetState(actuator, state));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
