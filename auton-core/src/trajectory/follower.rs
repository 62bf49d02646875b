/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Streams a [`PathPair`](super::PathPair) to the drivetrain, one sample per
//! tick, and finishes once the last sample is reached and both sides track it
//! within tolerance.

use std::time::Duration;

use tracing::{debug, info};

use super::{Sample, Trajectory};
use crate::error::BuildError;
use crate::hal::{ControlMode, LoopIndex, Side};
use crate::resource::{Resource, ResourceSet};
use crate::task::{Behavior, Progress, TickContext};

pub struct TrajectoryFollower {
    name: String,
    requirements: ResourceSet,
    left: Trajectory,
    right: Trajectory,
    total_samples: usize,
    counter: usize,
    reverse: bool,
    reset_sensors: bool,
    /// Heading of the robot when this path starts, relative to the gyro zero.
    heading_offset: Option<f64>,
    tolerance: f64,
}

impl TrajectoryFollower {
    /// `tolerance` is the primary closed-loop error (encoder units) both
    /// sides must be within before the follower finishes.
    pub fn new(
        name: impl Into<String>,
        drivetrain: &Resource,
        left: Trajectory,
        right: Trajectory,
        tolerance: f64,
    ) -> Result<Self, BuildError> {
        let name = name.into();
        if left.period() != right.period() {
            return Err(BuildError::MismatchedSidePeriods {
                name,
                left_s: left.period().as_secs_f64(),
                right_s: right.period().as_secs_f64(),
            });
        }
        let total_samples = left.len().max(right.len());
        Ok(Self {
            name,
            requirements: drivetrain.as_set(),
            left,
            right,
            total_samples,
            counter: 0,
            reverse: false,
            reset_sensors: true,
            heading_offset: None,
            tolerance,
        })
    }

    /// Drive the path backwards: sides are swapped and position and
    /// velocity negated.
    pub fn reversed(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Zero both drive encoders on initialize (default `true`).
    pub fn reset_sensors(mut self, reset: bool) -> Self {
        self.reset_sensors = reset;
        self
    }

    /// Continue from the heading `prior` ends on instead of zeroing the gyro.
    pub fn seed_heading_from(mut self, prior: &TrajectoryFollower) -> Self {
        self.heading_offset = Some(prior.final_heading());
        self
    }

    pub fn with_heading_offset(mut self, degrees: f64) -> Self {
        self.heading_offset = Some(degrees);
        self
    }

    /// Heading commanded with the last sample.
    pub fn final_heading(&self) -> f64 {
        self.heading_offset.unwrap_or(0.0) + self.lead().last().heading
    }

    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn period(&self) -> Duration {
        self.left.period()
    }

    pub fn total_time(&self) -> Duration {
        self.period() * self.total_samples as u32
    }

    pub fn elapsed_fraction(&self) -> f64 {
        self.counter as f64 / self.total_samples as f64
    }

    fn lead(&self) -> &Trajectory {
        &self.left
    }

    /// Stream feeding `side` after the reverse swap, and the sign applied to it.
    fn stream_for(&self, side: Side) -> (&Trajectory, f64) {
        let source = if self.reverse { side.opposite() } else { side };
        let stream = match source {
            Side::Left => &self.left,
            Side::Right => &self.right,
        };
        (stream, if self.reverse { -1.0 } else { 1.0 })
    }

    fn write_sample(&self, ctx: &mut TickContext<'_>, side: Side, sample: Sample, sign: f64) {
        let heading = self.heading_offset.unwrap_or(0.0) + sample.heading;
        ctx.hal().set(
            side.axis(),
            ControlMode::ProfilePoint {
                velocity: sign * sample.velocity,
            },
            sign * sample.position,
            Some(heading),
        );
    }
}

impl Behavior for TrajectoryFollower {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> ResourceSet {
        self.requirements
    }

    fn initialize(&mut self, ctx: &mut TickContext<'_>) {
        self.counter = 0;
        if self.reset_sensors {
            ctx.hal().reset_position(Side::Left.axis());
            ctx.hal().reset_position(Side::Right.axis());
        }
        if self.heading_offset.is_none() {
            ctx.hal().set_heading(0.0);
        }
        info!(
            path = %self.name,
            samples = self.total_samples,
            total_ms = self.total_time().as_millis() as u64,
            reverse = self.reverse,
            heading_offset = self.heading_offset.unwrap_or(0.0),
            "following trajectory"
        );
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) {
        let index = self.counter;
        for side in [Side::Left, Side::Right] {
            let (stream, sign) = self.stream_for(side);
            let sample = stream.sample_clamped(index);
            self.write_sample(ctx, side, sample, sign);
        }
        if self.counter < self.total_samples {
            self.counter += 1;
        }
    }

    fn is_finished(&self, ctx: &TickContext<'_>) -> bool {
        self.counter >= self.total_samples
            && ctx
                .hal_ref()
                .drive_error_within(LoopIndex::Primary, self.tolerance)
    }

    fn end(&mut self, ctx: &mut TickContext<'_>, interrupted: bool) {
        for side in [Side::Left, Side::Right] {
            ctx.hal().set(side.axis(), ControlMode::PercentOutput, 0.0, None);
        }
        debug!(
            path = %self.name,
            counter = self.counter,
            interrupted,
            "trajectory follower stopped"
        );
    }

    fn progress(&self) -> Progress {
        Progress::timed(self.elapsed_fraction(), self.total_time())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{Axis, Command, Hal, SimHal};
    use crate::resource::{Arbiter, ResourceRegistry};
    use crate::task::{Task, TaskState};

    const PERIOD: Duration = Duration::from_millis(20);

    fn stream(name: &str, n: usize, heading: f64) -> Trajectory {
        let samples = (0..n)
            .map(|i| Sample {
                position: i as f64 * 10.0,
                velocity: 10.0,
                heading,
            })
            .collect();
        Trajectory::new(name, samples, PERIOD).unwrap()
    }

    fn follower(left: usize, right: usize) -> TrajectoryFollower {
        let dt = ResourceRegistry::new().register("drivetrain");
        TrajectoryFollower::new("path", &dt, stream("l", left, 5.0), stream("r", right, 5.0), 50.0)
            .unwrap()
    }

    fn run(task: &mut Task, hal: &mut SimHal, ticks: usize) -> TaskState {
        let mut arb = Arbiter::new();
        let mut state = task.state();
        for _ in 0..ticks {
            let mut ctx = TickContext::new(hal, &mut arb, Duration::ZERO, PERIOD);
            state = task.tick(&mut ctx);
        }
        state
    }

    fn set_for(cmd: &Command) -> (f64, f64, Option<f64>) {
        match cmd {
            Command::Set {
                mode: ControlMode::ProfilePoint { velocity },
                setpoint,
                aux,
                ..
            } => (*setpoint, *velocity, *aux),
            other => panic!("expected profile point, got {other:?}"),
        }
    }

    #[test]
    fn total_samples_is_longer_side() {
        let f = follower(3, 5);
        assert_eq!(f.total_samples(), 5);
        assert_eq!(f.total_time(), Duration::from_millis(100));
    }

    #[test]
    fn mismatched_periods_are_rejected() {
        let dt = ResourceRegistry::new().register("drivetrain");
        let right = Trajectory::new(
            "r",
            vec![Sample {
                position: 0.0,
                velocity: 0.0,
                heading: 0.0,
            }],
            Duration::from_millis(10),
        )
        .unwrap();
        let err = TrajectoryFollower::new("p", &dt, stream("l", 2, 0.0), right, 1.0)
            .err()
            .unwrap();
        assert!(matches!(err, BuildError::MismatchedSidePeriods { .. }));
    }

    #[test]
    fn finishes_after_all_samples_when_on_target() {
        let mut task = Task::new(follower(4, 4));
        let mut hal = SimHal::new();
        assert_eq!(run(&mut task, &mut hal, 3), TaskState::Running);
        assert_eq!(run(&mut task, &mut hal, 1), TaskState::Finished);
        // 4 profile points per side, then the stop command.
        assert_eq!(hal.set_count(Axis::DriveLeft), 5);
    }

    #[test]
    fn holds_last_sample_until_error_within_tolerance() {
        let mut task = Task::new(follower(2, 2));
        let mut hal = SimHal::new();
        hal.set_closed_loop_error(Axis::DriveLeft, LoopIndex::Primary, 80.0);
        assert_eq!(run(&mut task, &mut hal, 5), TaskState::Running);
        let (pos, _, _) = set_for(hal.last_set(Axis::DriveLeft).unwrap());
        assert_eq!(pos, 10.0, "clamped to the final sample");

        hal.set_closed_loop_error(Axis::DriveLeft, LoopIndex::Primary, 20.0);
        assert_eq!(run(&mut task, &mut hal, 1), TaskState::Finished);
    }

    #[test]
    fn shorter_side_repeats_its_last_sample() {
        let mut task = Task::new(follower(2, 4));
        let mut hal = SimHal::new();
        hal.set_closed_loop_error(Axis::DriveLeft, LoopIndex::Primary, 1000.0);
        run(&mut task, &mut hal, 4);
        let (left, _, _) = set_for(hal.last_set(Axis::DriveLeft).unwrap());
        let (right, _, _) = set_for(hal.last_set(Axis::DriveRight).unwrap());
        assert_eq!(left, 10.0);
        assert_eq!(right, 30.0);
    }

    #[test]
    fn reversed_swaps_sides_and_negates() {
        let dt = ResourceRegistry::new().register("drivetrain");
        let left = stream("l", 3, 0.0);
        let right = Trajectory::new(
            "r",
            vec![
                Sample {
                    position: 100.0,
                    velocity: 7.0,
                    heading: 0.0
                };
                3
            ],
            PERIOD,
        )
        .unwrap();
        let f = TrajectoryFollower::new("rev", &dt, left, right, 1.0)
            .unwrap()
            .reversed(true);
        let mut task = Task::new(f);
        let mut hal = SimHal::new();
        run(&mut task, &mut hal, 1);

        let (pos, vel, _) = set_for(hal.last_set(Axis::DriveLeft).unwrap());
        assert_eq!((pos, vel), (-100.0, -7.0), "left side fed from right stream");
        let (pos, vel, _) = set_for(hal.last_set(Axis::DriveRight).unwrap());
        assert_eq!((pos, vel), (-0.0, -10.0));
    }

    #[test]
    fn unseeded_follower_zeroes_heading() {
        let mut task = Task::new(follower(2, 2));
        let mut hal = SimHal::new();
        hal.set_heading(45.0);
        run(&mut task, &mut hal, 1);
        assert!(hal.commands().contains(&Command::SetHeading(0.0)));
        let (_, _, aux) = set_for(hal.last_set(Axis::DriveLeft).unwrap());
        assert_eq!(aux, Some(5.0));
    }

    #[test]
    fn seeded_follower_continues_prior_heading() {
        let first = follower(2, 2).with_heading_offset(10.0);
        assert_eq!(first.final_heading(), 15.0);
        let second = follower(2, 2).seed_heading_from(&first).reset_sensors(false);

        let mut task = Task::new(second);
        let mut hal = SimHal::new();
        hal.clear_log();
        run(&mut task, &mut hal, 1);
        assert!(!hal
            .commands()
            .iter()
            .any(|c| matches!(c, Command::SetHeading(_) | Command::ResetPosition(_))));
        let (_, _, aux) = set_for(hal.last_set(Axis::DriveRight).unwrap());
        assert_eq!(aux, Some(20.0));
    }

    #[test]
    fn progress_reports_fraction_and_total_time() {
        let mut task = Task::new(follower(10, 10));
        let handle = task.handle();
        let mut hal = SimHal::new();
        run(&mut task, &mut hal, 5);
        assert_eq!(handle.elapsed_fraction(), Some(0.5));
        assert_eq!(handle.total_time(), Some(Duration::from_millis(200)));
    }
}
