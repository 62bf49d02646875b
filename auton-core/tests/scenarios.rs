/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! End-to-end scheduler scenarios on the simulated robot.
//!
//! Tick `n` (1-based) runs at `t = (n - 1) × 20 ms`.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use auton_core::action::{Delay, SetActuator};
use auton_core::gate::{Gate, TargetCanceledPolicy};
use auton_core::group::{ParallelBuilder, SequentialBuilder};
use auton_core::hal::{ActuatorId, ActuatorState, Axis, SimHal};
use auton_core::resource::{Resource, ResourceRegistry, ResourceSet};
use auton_core::task::{Behavior, Task, TaskHandle, TaskState, TickContext};
use auton_core::trajectory::{Sample, Trajectory, TrajectoryFollower};
use auton_core::{Scheduler, SchedulerStatus};

const PERIOD: Duration = Duration::from_millis(20);

// ── Helpers ───────────────────────────────────────────────────────────────────

type Log = Rc<RefCell<Vec<String>>>;

/// Leaf task that records its hooks and finishes after `len` executes
/// (never, when `len` is `None`).
struct Recorder {
    name: String,
    len: Option<u32>,
    executes: u32,
    requirements: ResourceSet,
    log: Log,
}

impl Recorder {
    fn task(name: &str, len: Option<u32>, requires: Option<&Resource>, log: &Log) -> Task {
        Task::new(Recorder {
            name: name.to_string(),
            len,
            executes: 0,
            requirements: requires.map_or(ResourceSet::EMPTY, Resource::as_set),
            log: Rc::clone(log),
        })
    }
}

impl Behavior for Recorder {
    fn name(&self) -> &str {
        &self.name
    }
    fn requirements(&self) -> ResourceSet {
        self.requirements
    }
    fn initialize(&mut self, ctx: &mut TickContext<'_>) {
        self.log
            .borrow_mut()
            .push(format!("{}:start@{}", self.name, ctx.now().as_millis()));
    }
    fn execute(&mut self, _ctx: &mut TickContext<'_>) {
        self.executes += 1;
    }
    fn is_finished(&self, _ctx: &TickContext<'_>) -> bool {
        self.len.is_some_and(|len| self.executes >= len)
    }
    fn end(&mut self, ctx: &mut TickContext<'_>, interrupted: bool) {
        let what = if interrupted { "cancel" } else { "end" };
        self.log
            .borrow_mut()
            .push(format!("{}:{what}@{}", self.name, ctx.now().as_millis()));
    }
}

fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn drivetrain() -> Resource {
    ResourceRegistry::new().register("drivetrain")
}

/// Straight-line follower with `samples` points per side.
fn follower(name: &str, dt: &Resource, samples: usize) -> TrajectoryFollower {
    let stream: Vec<Sample> = (0..samples)
        .map(|i| Sample {
            position: i as f64 * 5.0,
            velocity: 5.0,
            heading: 0.0,
        })
        .collect();
    let left = Trajectory::new(format!("{name}_left"), stream.clone(), PERIOD).unwrap();
    let right = Trajectory::new(format!("{name}_right"), stream, PERIOD).unwrap();
    TrajectoryFollower::new(name, dt, left, right, 100.0).unwrap()
}

fn scheduler() -> Scheduler<SimHal> {
    Scheduler::new(SimHal::new(), PERIOD)
}

/// Ticks until `handle` leaves `Initialized`; returns that tick's start time.
fn tick_until_started(s: &mut Scheduler<SimHal>, handle: &TaskHandle, limit: u32) -> Duration {
    for _ in 0..limit {
        let now = s.elapsed();
        s.tick();
        if handle.state() != TaskState::Initialized {
            return now;
        }
    }
    panic!("{} never started", handle.name());
}

// ── Composite ordering ────────────────────────────────────────────────────────

#[test]
fn sequential_entries_start_only_after_predecessor_finishes() {
    let log = new_log();
    let root = SequentialBuilder::new("root")
        .sequential(Recorder::task("a", Some(3), None, &log))
        .sequential(Recorder::task("b", Some(2), None, &log))
        .sequential(Recorder::task("c", Some(1), None, &log))
        .build();
    let mut s = scheduler();
    s.start(root);
    while s.tick() == SchedulerStatus::Running {}

    assert_eq!(
        *log.borrow(),
        vec![
            "a:start@0", "a:end@40", "b:start@60", "b:end@80", "c:start@100", "c:end@100",
        ]
    );
}

#[test]
fn parallel_entry_does_not_block_next_sequential_entry() {
    let log = new_log();
    let root = SequentialBuilder::new("root")
        .parallel(Recorder::task("fork", Some(10), None, &log))
        .sequential(Recorder::task("next", Some(1), None, &log))
        .build();
    let mut s = scheduler();
    s.start(root);
    s.tick();

    assert_eq!(
        *log.borrow(),
        vec!["fork:start@0", "next:start@0", "next:end@0"]
    );
}

#[test]
fn sequential_group_waits_for_every_fork() {
    let log = new_log();
    let fork = Recorder::task("fork", Some(6), None, &log);
    let fork_handle = fork.handle();
    let root = SequentialBuilder::new("root")
        .parallel(fork)
        .sequential(Recorder::task("short", Some(2), None, &log))
        .build();
    let mut s = scheduler();
    s.start(root);

    for _ in 0..5 {
        assert_eq!(s.tick(), SchedulerStatus::Running);
    }
    assert_eq!(fork_handle.state(), TaskState::Running);
    assert_eq!(s.tick(), SchedulerStatus::Finished);
    assert_eq!(fork_handle.state(), TaskState::Finished);
}

// ── Resource arbitration ──────────────────────────────────────────────────────

#[test]
fn conflicting_task_evicts_holder_before_running() {
    let dt = drivetrain();
    let log = new_log();
    let holder = Recorder::task("holder", None, Some(&dt), &log);
    let newcomer = Recorder::task("newcomer", Some(3), Some(&dt), &log);
    let (holder_h, newcomer_h) = (holder.handle(), newcomer.handle());

    let root = ParallelBuilder::new("root")
        .with(holder)
        .with(
            SequentialBuilder::new("later")
                .sequential(Task::new(Delay::new(Duration::from_millis(40))))
                .sequential(newcomer)
                .build(),
        )
        .build();
    let mut s = scheduler();
    s.start(root);

    let started = tick_until_started(&mut s, &newcomer_h, 50);
    assert_eq!(holder_h.state(), TaskState::Canceled);
    assert_eq!(newcomer_h.state(), TaskState::Running);
    assert_eq!(s.arbiter().holder(dt.id()), Some(newcomer_h.id()));

    while s.tick() == SchedulerStatus::Running {}
    let events = log.borrow();
    assert_eq!(
        events.iter().filter(|e| e.starts_with("holder:cancel")).count(),
        1,
        "holder teardown runs exactly once: {events:?}"
    );
    // Delay finishes at 40 ms, newcomer requests eviction at 60 ms and
    // starts on the following tick.
    assert!(events.contains(&"holder:cancel@60".to_string()));
    assert_eq!(started, Duration::from_millis(80));
    let cancel_at = events.iter().position(|e| e.starts_with("holder:cancel"));
    let start_at = events.iter().position(|e| e.starts_with("newcomer:start"));
    assert!(cancel_at < start_at);
}

#[test]
fn disjoint_resources_run_side_by_side() {
    let mut reg = ResourceRegistry::new();
    let dt = reg.register("drivetrain");
    let el = reg.register("elevator");
    let log = new_log();
    let a = Recorder::task("a", Some(5), Some(&dt), &log);
    let b = Recorder::task("b", Some(5), Some(&el), &log);
    let (ha, hb) = (a.handle(), b.handle());
    let mut s = scheduler();
    s.start(ParallelBuilder::new("root").with(a).with(b).build());
    while s.tick() == SchedulerStatus::Running {}
    assert_eq!(ha.state(), TaskState::Finished);
    assert_eq!(hb.state(), TaskState::Finished);
}

// ── Trajectory follower ───────────────────────────────────────────────────────

#[test]
fn follower_counts_every_sample_exactly_once() {
    let dt = drivetrain();
    let task = Task::new(follower("path", &dt, 50));
    let handle = task.handle();
    let mut s = scheduler();
    s.start(task);

    let total = Duration::from_secs(1);
    for n in 1..=49u32 {
        s.tick();
        let fraction = handle.elapsed_fraction().unwrap();
        assert!((fraction - n as f64 / 50.0).abs() < 1e-12);
        assert!(fraction < 1.0);
        assert_eq!(handle.total_time(), Some(total));
    }
    assert_eq!(s.tick(), SchedulerStatus::Finished);
    assert_eq!(handle.elapsed_fraction(), Some(1.0));
    assert_eq!(handle.total_time(), Some(total));
    // 50 profile points, then the stop command.
    assert_eq!(s.hal().set_count(Axis::DriveLeft), 51);
}

// ── Gates ─────────────────────────────────────────────────────────────────────

#[test]
fn end_fraction_gate_fires_at_eight_seconds_of_ten() {
    let dt = drivetrain();
    let log = new_log();
    let path = Task::new(follower("ten_seconds", &dt, 500));
    let gate = Task::new(Gate::wait_for_end_fraction(&path.handle(), 0.2).unwrap());
    let gate_h = gate.handle();
    let root = ParallelBuilder::new("root")
        .with(path)
        .with(
            SequentialBuilder::new("after_gate")
                .sequential(gate)
                .sequential(Recorder::task("marker", Some(1), None, &log))
                .build(),
        )
        .build();
    let mut s = scheduler();
    s.start(root);

    for _ in 0..399 {
        s.tick();
    }
    assert_eq!(gate_h.state(), TaskState::Running, "not before 8 s");
    s.tick();
    assert_eq!(gate_h.state(), TaskState::Finished);
    assert_eq!(s.elapsed(), Duration::from_secs(8));
}

#[test]
fn actuator_fires_mid_path_and_next_path_waits_for_group() {
    let dt = drivetrain();
    let pneumatics = ResourceRegistry::new().register("pneumatics");
    let path_a = Task::new(follower("a", &dt, 250));
    let path_b = Task::new(follower("b", &dt, 150));
    let b_handle = path_b.handle();
    let gated = SequentialBuilder::new("gated_actuator")
        .sequential(Task::new(Gate::wait_for_start_fraction(&path_a.handle(), 0.5).unwrap()))
        .sequential(Task::new(SetActuator::new(
            &pneumatics,
            ActuatorId::IntakeLift,
            ActuatorState::Extended,
        )))
        .build();
    let root = SequentialBuilder::new("root")
        .sequential(ParallelBuilder::new("drive_and_lift").with(path_a).with(gated).build())
        .sequential(path_b)
        .build();

    let mut s = scheduler();
    s.start(root);

    let mut fired_at = None;
    let mut b_started_at = None;
    while s.tick() == SchedulerStatus::Running {
        let tick_time = s.elapsed() - PERIOD;
        if fired_at.is_none() && s.hal().actuator(ActuatorId::IntakeLift).is_some() {
            fired_at = Some(tick_time);
        }
        if b_started_at.is_none() && b_handle.state() != TaskState::Initialized {
            b_started_at = Some(tick_time);
        }
    }

    assert_eq!(fired_at, Some(Duration::from_millis(2500)));
    assert_eq!(b_started_at, Some(Duration::from_millis(5000)));
    assert_eq!(s.status(), SchedulerStatus::Finished);
}

#[test]
fn held_gate_on_canceled_target_waits_until_group_is_canceled() {
    let dt = drivetrain();
    let log = new_log();
    let target = Recorder::task("target", None, Some(&dt), &log);
    let gate = Task::new(
        Gate::wait_for_start_fraction(&target.handle(), 0.0)
            .unwrap()
            .on_target_canceled(TargetCanceledPolicy::Hold),
    );
    let gate_h = gate.handle();
    // `target` has no progress, so the gate cannot fire before it is evicted.
    let root = ParallelBuilder::new("root")
        .with(target)
        .with(
            SequentialBuilder::new("waiting")
                .sequential(gate)
                .sequential(Recorder::task("after", Some(1), None, &log))
                .build(),
        )
        .with(
            SequentialBuilder::new("usurper")
                .sequential(Task::new(Delay::new(Duration::from_millis(100))))
                .sequential(Recorder::task("takeover", Some(1), Some(&dt), &log))
                .build(),
        )
        .build();
    let mut s = scheduler();
    s.start(root);

    for _ in 0..200 {
        assert_eq!(s.tick(), SchedulerStatus::Running);
    }
    assert!(log.borrow().iter().any(|e| e.starts_with("target:cancel")));
    assert!(log.borrow().iter().any(|e| e.starts_with("takeover:end")));
    assert_eq!(gate_h.state(), TaskState::Running);

    s.cancel();
    assert_eq!(s.status(), SchedulerStatus::Canceled);
    assert_eq!(gate_h.state(), TaskState::Canceled);
    assert!(!log.borrow().iter().any(|e| e.starts_with("after:start")));
}

#[test]
fn released_gate_on_canceled_target_lets_branch_continue() {
    let dt = drivetrain();
    let log = new_log();
    let target = Recorder::task("target", None, Some(&dt), &log);
    let gate = Task::new(Gate::wait_for_start_fraction(&target.handle(), 0.0).unwrap());
    let root = ParallelBuilder::new("root")
        .with(target)
        .with(
            SequentialBuilder::new("waiting")
                .sequential(gate)
                .sequential(Recorder::task("after", Some(1), None, &log))
                .build(),
        )
        .with(
            SequentialBuilder::new("usurper")
                .sequential(Task::new(Delay::new(Duration::from_millis(100))))
                .sequential(Recorder::task("takeover", Some(1), Some(&dt), &log))
                .build(),
        )
        .build();
    let root_h = root.handle();
    let mut s = scheduler();
    s.start(root);
    while s.tick() == SchedulerStatus::Running {}

    assert_eq!(s.status(), SchedulerStatus::Finished);
    assert!(log.borrow().iter().any(|e| e.starts_with("after:end")));
    assert_eq!(root_h.canceled_children(), 1);
}

#[test]
fn held_gate_on_never_started_target_is_canceled_with_its_group() {
    let log = new_log();
    let target = Recorder::task("target", Some(5), None, &log);
    let target_h = target.handle();
    let gate = Task::new(
        Gate::wait_for_start_fraction(&target_h, 0.0)
            .unwrap()
            .on_target_canceled(TargetCanceledPolicy::Hold),
    );
    let gate_h = gate.handle();
    let root = ParallelBuilder::new("root")
        .with(
            SequentialBuilder::new("blocked")
                .sequential(Recorder::task("forever", None, None, &log))
                .sequential(target)
                .build(),
        )
        .with(
            SequentialBuilder::new("waiting")
                .sequential(gate)
                .sequential(Recorder::task("after", Some(1), None, &log))
                .build(),
        )
        .build();
    let mut s = scheduler();
    s.start(root);

    for _ in 0..100 {
        assert_eq!(s.tick(), SchedulerStatus::Running);
    }
    assert_eq!(target_h.state(), TaskState::Initialized);
    assert_eq!(gate_h.state(), TaskState::Running);

    s.cancel();
    assert_eq!(target_h.state(), TaskState::Canceled);
    assert_eq!(gate_h.state(), TaskState::Canceled);
    let events = log.borrow();
    assert!(!events.iter().any(|e| e.starts_with("target:start")));
    assert!(!events.iter().any(|e| e.starts_with("after:start")));
    assert_eq!(events.iter().filter(|e| e.starts_with("target:cancel")).count(), 1);
}

// ── Cancellation ──────────────────────────────────────────────────────────────

#[test]
fn canceling_root_mid_path_cancels_every_active_descendant() {
    let dt = drivetrain();
    let log = new_log();
    let path = Task::new(follower("eight_seconds", &dt, 400));
    let path_h = path.handle();
    let side = Recorder::task("side", None, None, &log);
    let pending = Recorder::task("pending", Some(1), None, &log);
    let (side_h, pending_h) = (side.handle(), pending.handle());
    let group = ParallelBuilder::new("group").with(path).with(side).build();
    let group_h = group.handle();
    let root = SequentialBuilder::new("root")
        .sequential(group)
        .sequential(pending)
        .build();
    let root_h = root.handle();

    let mut s = scheduler();
    s.start(root);
    while s.elapsed() < Duration::from_secs(3) {
        s.tick();
    }
    assert_eq!(path_h.state(), TaskState::Running);

    s.cancel();
    for handle in [&root_h, &group_h, &path_h, &side_h, &pending_h] {
        assert_eq!(handle.state(), TaskState::Canceled, "{}", handle.name());
    }
    assert!(log.borrow().contains(&"side:cancel@3000".to_string()));
    assert!(s.arbiter().holder(dt.id()).is_none());

    let issued = s.hal().command_count();
    for _ in 0..50 {
        assert_eq!(s.tick(), SchedulerStatus::Canceled);
    }
    assert_eq!(s.hal().command_count(), issued, "no output after cancel");
}
