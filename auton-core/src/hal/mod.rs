/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Hardware primitives consumed by tasks.
//!
//! The scheduler never touches motor-controller registers.  Everything a task
//! can do to the robot goes through the [`Hal`] trait:
//!
//! * `set(axis, mode, setpoint, aux)`: write a closed-loop target.
//! * `closed_loop_error(axis, loop)` / `position(axis)`: read back.
//! * `set_state(actuator, state)`: fire-and-forget actuator command.

pub mod sim;

pub use sim::{Command, SimHal};

// ── Axes and modes ────────────────────────────────────────────────────────────

/// Drivetrain side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn axis(self) -> Axis {
        match self {
            Side::Left => Axis::DriveLeft,
            Side::Right => Axis::DriveRight,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// A closed-loop motor axis the controller primitive can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Axis {
    DriveLeft,
    DriveRight,
    Elevator,
    Intake,
}

/// How the setpoint passed to [`Hal::set`] is interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMode {
    /// Open-loop output in `[-1, 1]`.
    PercentOutput,
    /// Closed-loop position target (encoder units).
    Position,
    /// Trapezoidal profiled position target.
    MotionMagic,
    /// One motion-profile point: position setpoint plus velocity feed-forward.
    ProfilePoint { velocity: f64 },
}

/// Which of the controller's PID loops to read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopIndex {
    Primary,
    Auxiliary,
}

// ── Actuators ─────────────────────────────────────────────────────────────────

/// Binary actuators (double solenoids).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActuatorId {
    /// Raises / lowers the intake.
    IntakeLift,
    /// Clamps / releases the intake arms.
    IntakeClamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActuatorState {
    /// Forward / on.
    Extended,
    /// Reverse / off.
    Retracted,
}

// ── Hal ───────────────────────────────────────────────────────────────────────

/// Everything the scheduler core is allowed to do to the hardware.
pub trait Hal {
    /// Write a target for `axis`.  `aux` is the auxiliary-loop setpoint
    /// (heading, in degrees) when the mode supports one.
    fn set(&mut self, axis: Axis, mode: ControlMode, setpoint: f64, aux: Option<f64>);

    fn closed_loop_error(&self, axis: Axis, loop_index: LoopIndex) -> f64;

    /// Current sensor position of `axis` (encoder units).
    fn position(&self, axis: Axis) -> f64;

    /// Zero the position sensor of `axis`.
    fn reset_position(&mut self, axis: Axis);

    /// Overwrite the gyro heading reference (degrees).
    fn set_heading(&mut self, degrees: f64);

    fn set_state(&mut self, actuator: ActuatorId, state: ActuatorState);

    /// Returns `true` when both drivetrain sides track within `tolerance`.
    fn drive_error_within(&self, loop_index: LoopIndex, tolerance: f64) -> bool {
        [Side::Left, Side::Right]
            .iter()
            .all(|side| self.closed_loop_error(side.axis(), loop_index).abs() <= tolerance)
    }
}
