/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Autonomous routine selection and construction.
//!
//! The field management system reports a three-letter layout code, one
//! letter per scoring element as seen from our driver station:
//!
//! ```text
//!  code:  L R L
//!         │ │ └─ far switch
//!         │ └─── scale
//!         └───── near switch
//! ```
//!
//! Together with the robot's start location it picks one routine:
//!
//! | Start | `LLL` | `LRL` | `RLR` | `RRR` |
//! |---|---|---|---|---|
//! | left   | side scale (L)   | one cube side (L)   | side scale (L)      | baseline |
//! | center | center switch (L) | center switch (L)  | one cube center (R) | one cube center (R) |
//! | right  | baseline         | side scale (R)      | one cube side (R)   | side scale (R) |
//!
//! Any other well-formed code drives the baseline.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::action::{DriveToPosition, IntakeDirection, MoveElevator, RunIntakeTimed, SetActuator};
use crate::config::RobotConfig;
use crate::error::BuildError;
use crate::gate::Gate;
use crate::group::{ParallelBuilder, SequentialBuilder};
use crate::hal::{ActuatorId, ActuatorState};
use crate::resource::{Resource, ResourceRegistry};
use crate::task::Task;
use crate::trajectory::{TrajectoryFollower, TrajectoryLibrary};

/// Percent output for scoring a cube.
const OUTTAKE_SPEED: f64 = 0.75;
/// Percent output for picking a cube up.
const INTAKE_SPEED: f64 = 1.0;
/// Heading for facing the scale from the left start (degrees).
const SCALE_TURN_DEG: f64 = 90.0;
/// Heading for facing the switch from the left start (degrees).
const SWITCH_TURN_DEG: f64 = -90.0;
/// Share of the baseline distance driven before turning onto the switch.
const SWITCH_APPROACH_FRACTION: f64 = 0.75;

// ── Subsystems ────────────────────────────────────────────────────────────────

/// Resource handles for every subsystem a routine may command.
#[derive(Debug, Clone)]
pub struct Subsystems {
    pub drivetrain: Resource,
    pub elevator: Resource,
    pub intake: Resource,
    pub pneumatics: Resource,
}

impl Subsystems {
    pub fn register(registry: &mut ResourceRegistry) -> Self {
        Self {
            drivetrain: registry.register("drivetrain"),
            elevator: registry.register("elevator"),
            intake: registry.register("intake"),
            pneumatics: registry.register("pneumatics"),
        }
    }
}

// ── Field layout / start location ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSide {
    Left,
    Right,
}

impl FieldSide {
    fn letter(self) -> char {
        match self {
            FieldSide::Left => 'L',
            FieldSide::Right => 'R',
        }
    }

    fn lower(self) -> &'static str {
        match self {
            FieldSide::Left => "left",
            FieldSide::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub near_switch: FieldSide,
    pub scale: FieldSide,
    pub far_switch: FieldSide,
}

impl FieldLayout {
    pub fn code(&self) -> String {
        [self.near_switch, self.scale, self.far_switch]
            .iter()
            .map(|s| s.letter())
            .collect()
    }
}

impl FromStr for FieldLayout {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BuildError::InvalidFieldLayout(s.to_string());
        let sides = s
            .trim()
            .chars()
            .map(|c| match c.to_ascii_uppercase() {
                'L' => Ok(FieldSide::Left),
                'R' => Ok(FieldSide::Right),
                _ => Err(invalid()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        match sides.as_slice() {
            [near_switch, scale, far_switch] => Ok(FieldLayout {
                near_switch: *near_switch,
                scale: *scale,
                far_switch: *far_switch,
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for FieldLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartLocation {
    Left,
    Center,
    Right,
}

impl FromStr for StartLocation {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(StartLocation::Left),
            "center" | "centre" | "middle" | "c" | "m" => Ok(StartLocation::Center),
            "right" | "r" => Ok(StartLocation::Right),
            _ => Err(BuildError::UnknownStartLocation(s.to_string())),
        }
    }
}

// ── Routine ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routine {
    Baseline,
    SideScale(FieldSide),
    OneCubeSide(FieldSide),
    OneCubeCenter(FieldSide),
    CenterSwitch(FieldSide),
}

impl Routine {
    /// Routine for `location` given the reported `layout`.
    pub fn choose(layout: FieldLayout, location: StartLocation) -> Routine {
        use FieldSide::{Left as L, Right as R};
        match (location, layout.code().as_str()) {
            (StartLocation::Left, "LLL" | "RLR") => Routine::SideScale(L),
            (StartLocation::Left, "LRL") => Routine::OneCubeSide(L),
            (StartLocation::Center, "LLL" | "LRL") => Routine::CenterSwitch(L),
            (StartLocation::Center, "RLR" | "RRR") => Routine::OneCubeCenter(R),
            (StartLocation::Right, "LRL" | "RRR") => Routine::SideScale(R),
            (StartLocation::Right, "RLR") => Routine::OneCubeSide(R),
            _ => Routine::Baseline,
        }
    }
}

impl fmt::Display for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Routine::Baseline => f.write_str("baseline"),
            Routine::SideScale(s) => write!(f, "side_scale_{}", s.lower()),
            Routine::OneCubeSide(s) => write!(f, "one_cube_side_{}", s.lower()),
            Routine::OneCubeCenter(s) => write!(f, "one_cube_center_{}", s.lower()),
            Routine::CenterSwitch(s) => write!(f, "center_switch_{}", s.lower()),
        }
    }
}

// ── RoutineSelector ───────────────────────────────────────────────────────────

/// Builds the task tree for a routine from the subsystems, the tuning
/// values and the trajectory library.
pub struct RoutineSelector {
    subsystems: Subsystems,
    config: RobotConfig,
    library: TrajectoryLibrary,
}

impl RoutineSelector {
    pub fn new(subsystems: Subsystems, config: RobotConfig, library: TrajectoryLibrary) -> Self {
        Self {
            subsystems,
            config,
            library,
        }
    }

    /// Choose and build the routine for `layout` and `location`.
    pub fn select(&self, layout: FieldLayout, location: StartLocation) -> Result<Task, BuildError> {
        let routine = Routine::choose(layout, location);
        info!(layout = %layout, ?location, %routine, "autonomous routine selected");
        self.build(routine)
    }

    pub fn build(&self, routine: Routine) -> Result<Task, BuildError> {
        match routine {
            Routine::Baseline => Ok(self.baseline()),
            Routine::SideScale(side) => self.side_scale(side),
            Routine::OneCubeSide(side) => Ok(self.one_cube_side(side)),
            Routine::OneCubeCenter(side) => self.one_cube_center(side),
            Routine::CenterSwitch(side) => self.center_switch(side),
        }
    }

    // ── Leaf helpers ──────────────────────────────────────────────────────────

    fn drive_feet(&self, feet: f64) -> DriveToPosition {
        let dt = &self.config.drivetrain;
        DriveToPosition::new(
            &self.subsystems.drivetrain,
            dt.feet_to_units(feet),
            dt.position_tolerance,
            dt.position_min_executes,
        )
    }

    /// Turn in place from a side start.  `from_left` is the heading for a
    /// left start; a right start mirrors it.
    fn side_turn(&self, side: FieldSide, from_left: f64) -> Task {
        let heading = match side {
            FieldSide::Left => from_left,
            FieldSide::Right => -from_left,
        };
        Task::new(self.drive_feet(0.0).with_heading(heading))
    }

    fn elevator(&self, height: f64) -> Task {
        Task::new(MoveElevator::new(
            &self.subsystems.elevator,
            height,
            self.config.elevator.tolerance,
        ))
    }

    fn actuator(&self, id: ActuatorId, state: ActuatorState) -> Task {
        Task::new(SetActuator::new(&self.subsystems.pneumatics, id, state))
    }

    fn release_cube(&self) -> Task {
        self.actuator(ActuatorId::IntakeClamp, ActuatorState::Retracted)
    }

    fn clamp_cube(&self) -> Task {
        self.actuator(ActuatorId::IntakeClamp, ActuatorState::Extended)
    }

    fn intake(&self, seconds: f64, direction: IntakeDirection) -> Task {
        let speed = match direction {
            IntakeDirection::Intake => INTAKE_SPEED,
            IntakeDirection::Outtake => OUTTAKE_SPEED,
        };
        Task::new(RunIntakeTimed::new(
            &self.subsystems.intake,
            Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::ZERO),
            direction,
            speed,
        ))
    }

    fn follower(&self, path: &str) -> Result<TrajectoryFollower, BuildError> {
        let pair = self.library.load(path)?;
        TrajectoryFollower::new(
            path,
            &self.subsystems.drivetrain,
            pair.left,
            pair.right,
            self.config.drivetrain.trajectory_tolerance,
        )
    }

    // ── Routines ──────────────────────────────────────────────────────────────

    fn baseline(&self) -> Task {
        let auto = &self.config.autonomous;
        SequentialBuilder::new("baseline")
            .sequential(Task::new(self.drive_feet(auto.baseline_distance_ft)))
            .build()
    }

    /// Drive to the scale raising the elevator on the way, turn, score.
    fn side_scale(&self, side: FieldSide) -> Result<Task, BuildError> {
        let auto = &self.config.autonomous;
        let drive = Task::new(self.drive_feet(auto.scale_distance_ft));
        let raise = SequentialBuilder::new("raise_to_scale")
            .sequential(Task::new(Gate::wait_for_position_fraction(&drive.handle(), 0.5)?))
            .sequential(self.elevator(self.config.elevator.scale_height))
            .build();

        Ok(SequentialBuilder::new(Routine::SideScale(side).to_string())
            .sequential(ParallelBuilder::new("approach_scale").with(drive).with(raise).build())
            .sequential(self.side_turn(side, SCALE_TURN_DEG))
            .sequential(self.release_cube())
            .sequential(self.intake(auto.scale_outtake_s, IntakeDirection::Outtake))
            .build())
    }

    /// Stop short of the baseline, face the switch, then raise and score.
    fn one_cube_side(&self, side: FieldSide) -> Task {
        let auto = &self.config.autonomous;
        SequentialBuilder::new(Routine::OneCubeSide(side).to_string())
            .sequential(Task::new(
                self.drive_feet(auto.baseline_distance_ft * SWITCH_APPROACH_FRACTION),
            ))
            .sequential(self.side_turn(side, SWITCH_TURN_DEG))
            .sequential(self.elevator(self.config.elevator.switch_height))
            .sequential(self.release_cube())
            .sequential(self.intake(auto.switch_outtake_s, IntakeDirection::Outtake))
            .build()
    }

    /// Follow `path`, raising the elevator 1.9 s before the end and
    /// scoring 0.15 s before the end.
    fn score_on_switch(&self, name: &str, path: Task) -> Result<Task, BuildError> {
        let auto = &self.config.autonomous;
        let handle = path.handle();
        let raise = SequentialBuilder::new("raise_to_switch")
            .sequential(Task::new(Gate::wait_for_end_time(&handle, Duration::from_millis(1900))?))
            .sequential(self.elevator(self.config.elevator.switch_height))
            .build();
        let score = SequentialBuilder::new("score_switch")
            .sequential(Task::new(Gate::wait_for_end_time(&handle, Duration::from_millis(150))?))
            .sequential(self.release_cube())
            .sequential(self.intake(auto.switch_outtake_s, IntakeDirection::Outtake))
            .build();

        Ok(ParallelBuilder::new(name)
            .with(path)
            .with(raise)
            .with(score)
            .build())
    }

    fn one_cube_center(&self, side: FieldSide) -> Result<Task, BuildError> {
        let path = self.follower(&format!("center_{}_switch_p1", side.lower()))?;
        self.score_on_switch(&Routine::OneCubeCenter(side).to_string(), Task::new(path))
    }

    /// Two cubes on the switch from the center start.
    fn center_switch(&self, side: FieldSide) -> Result<Task, BuildError> {
        let auto = &self.config.autonomous;
        let elevator = &self.config.elevator;
        let prefix = format!("center_{}_switch", side.lower());

        let to_switch = self.follower(&format!("{prefix}_p1"))?;
        let back_off = self
            .follower(&format!("{prefix}_p2_rev"))?
            .reversed(true)
            .reset_sensors(false)
            .seed_heading_from(&to_switch);
        let return_to_switch = self
            .follower(&format!("{prefix}_p5"))?
            .seed_heading_from(&back_off);

        let first_cube = self.score_on_switch("first_cube", Task::new(to_switch))?;

        // Back off, then creep into the pile with the intake lowered.
        let back_off = Task::new(back_off);
        let creep = Task::new(self.drive_feet(2.95).with_heading(0.0));
        let back_off_handle = back_off.handle();
        let creep_handle = creep.handle();
        let get_second_cube = ParallelBuilder::new("get_second_cube")
            .with(
                SequentialBuilder::new("to_pile")
                    .sequential(back_off)
                    .sequential(
                        ParallelBuilder::new("creep")
                            .with(creep)
                            .with(self.actuator(ActuatorId::IntakeLift, ActuatorState::Retracted))
                            .build(),
                    )
                    .build(),
            )
            .with(
                SequentialBuilder::new("lower_elevator")
                    .sequential(Task::new(Gate::wait_for_start_time(
                        &back_off_handle,
                        Duration::from_millis(500),
                    )?))
                    .sequential(self.elevator(elevator.intake_height))
                    .build(),
            )
            .with(
                SequentialBuilder::new("grab")
                    .sequential(Task::new(Gate::wait_for_position_fraction(&creep_handle, 0.45)?))
                    .sequential(self.intake(auto.intake_s, IntakeDirection::Intake))
                    .build(),
            )
            .build();

        let return_to_switch = Task::new(return_to_switch);
        let return_handle = return_to_switch.handle();
        let score_second_cube = ParallelBuilder::new("score_second_cube")
            .with(
                SequentialBuilder::new("drive_back")
                    .sequential(Task::new(self.drive_feet(-3.25).with_heading(0.0)))
                    .sequential(return_to_switch)
                    .build(),
            )
            .with(
                SequentialBuilder::new("secure_cube")
                    .sequential(self.intake(auto.intake_s, IntakeDirection::Intake))
                    .sequential(self.clamp_cube())
                    .build(),
            )
            .with(
                SequentialBuilder::new("score")
                    .sequential(Task::new(Gate::wait_for_end_time(&return_handle, Duration::from_secs(2))?))
                    .sequential(self.actuator(ActuatorId::IntakeLift, ActuatorState::Extended))
                    .sequential(self.elevator(elevator.switch_height))
                    .sequential(self.release_cube())
                    .sequential(self.intake(auto.switch_outtake_s, IntakeDirection::Outtake))
                    .build(),
            )
            .build();

        Ok(SequentialBuilder::new(Routine::CenterSwitch(side).to_string())
            .sequential(first_cube)
            .sequential(get_second_cube)
            .sequential(score_second_cube)
            .build())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
