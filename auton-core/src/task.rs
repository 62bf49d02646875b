/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core task data structures for the autonomous scheduler.
//!
//! Two types split the work:
//!
//! ```text
//!  Behavior  (what the task does: setup / periodic / finished? / teardown hooks)
//!     ▲
//!     │ boxed inside
//!  Task      (lifecycle state machine, resource arbitration, published status)
//!     │
//!     └──(handle())──►  TaskHandle  (read-only view used by gates and callers)
//! ```
//!
//! # Ownership model
//! A `Task` is **owned** by its parent composite (or by the `Scheduler` when
//! it is the root) for its whole life; children never outlive the parent.
//! Other parts of the tree observe a task only through a [`TaskHandle`], a
//! shared status cell the owning `Task` refreshes after every transition.
//! Everything runs on the scheduler thread, so the handle uses `Rc<Cell<_>>`
//! rather than locks.
//!
//! # Lifecycle
//! ```text
//! Initialized ──first tick──► Running ──predicate holds──► Finished
//!      │                         │
//!      └──────── cancel ─────────┴─────────────────────► Canceled
//! ```
//! `Finished` and `Canceled` are terminal; ticking a terminal task is a no-op.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::debug;

use crate::hal::Hal;
use crate::resource::{Arbiter, ResourceSet};

// ── TaskId ────────────────────────────────────────────────────────────────────

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique task identifier, used as the resource holder key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Build an id from a raw value.  Only useful for tests and logging.
    pub fn from_raw(raw: u64) -> Self {
        TaskId(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── TaskState ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    /// Built (and possibly activated) but not yet started.
    #[default]
    Initialized,
    Running,
    Finished,
    Canceled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Finished | TaskState::Canceled)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Initialized => "initialized",
            TaskState::Running => "running",
            TaskState::Finished => "finished",
            TaskState::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

// ── Progress ──────────────────────────────────────────────────────────────────

/// Distance progress of a position-seeking task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionProgress {
    pub current: f64,
    pub desired: f64,
    /// `false` until the task has run its start-up executes; position
    /// readings are not meaningful before that.
    pub settled: bool,
}

impl PositionProgress {
    /// `current / desired`.  A zero target counts as already reached.
    pub fn fraction(&self) -> f64 {
        if self.desired == 0.0 {
            1.0
        } else {
            self.current / self.desired
        }
    }
}

/// Snapshot of a task's progress, published after every tick.
///
/// Tasks that are neither time- nor distance-bounded leave every field `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Progress {
    /// Normalised progress in `[0, 1]`.
    pub elapsed_fraction: Option<f64>,
    /// Total duration, fixed at construction.
    pub total_time: Option<Duration>,
    pub position: Option<PositionProgress>,
}

impl Progress {
    pub fn timed(elapsed_fraction: f64, total_time: Duration) -> Self {
        Progress {
            elapsed_fraction: Some(elapsed_fraction),
            total_time: Some(total_time),
            position: None,
        }
    }

    pub fn positional(current: f64, desired: f64, settled: bool) -> Self {
        Progress {
            position: Some(PositionProgress {
                current,
                desired,
                settled,
            }),
            ..Default::default()
        }
    }
}

// ── TickContext ───────────────────────────────────────────────────────────────

/// Everything a task may touch while it is ticked or canceled.
pub struct TickContext<'a> {
    hal: &'a mut dyn Hal,
    arbiter: &'a mut Arbiter,
    now: Duration,
    period: Duration,
}

impl<'a> TickContext<'a> {
    pub fn new(
        hal: &'a mut dyn Hal,
        arbiter: &'a mut Arbiter,
        now: Duration,
        period: Duration,
    ) -> Self {
        Self {
            hal,
            arbiter,
            now,
            period,
        }
    }

    pub fn hal(&mut self) -> &mut dyn Hal {
        &mut *self.hal
    }

    /// Read-only hardware access for completion predicates.
    pub fn hal_ref(&self) -> &dyn Hal {
        &*self.hal
    }

    pub fn arbiter(&mut self) -> &mut Arbiter {
        &mut *self.arbiter
    }

    /// Time since the scheduler started the current root.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Fixed tick period.
    pub fn period(&self) -> Duration {
        self.period
    }
}

// ── Behavior ──────────────────────────────────────────────────────────────────

/// What a task does.  The surrounding [`Task`] owns the lifecycle and calls
/// these hooks at the right moments:
///
/// | transition | hooks |
/// |---|---|
/// | `Initialized → Running` | `initialize`, then `execute`, then `is_finished` |
/// | `Running → Running` | `execute`, then `is_finished` |
/// | `Running → Finished` | `end(interrupted = false)` |
/// | `* → Canceled` | `end(interrupted = true)` |
///
/// No hook may block.  Waiting is expressed by returning `false` from
/// `is_finished` until the next tick.
pub trait Behavior {
    fn name(&self) -> &str;

    /// Resources held exclusively while running.
    fn requirements(&self) -> ResourceSet {
        ResourceSet::EMPTY
    }

    /// One-time setup (zero sensors, arm a control loop).
    fn initialize(&mut self, _ctx: &mut TickContext<'_>) {}

    /// Periodic side effect (write the current setpoint).
    fn execute(&mut self, ctx: &mut TickContext<'_>);

    /// Completion predicate, evaluated after every `execute`.
    fn is_finished(&self, ctx: &TickContext<'_>) -> bool;

    /// One-time teardown (stop outputs).  Composites cancel their
    /// non-terminal children here when `interrupted` is `true`.
    fn end(&mut self, _ctx: &mut TickContext<'_>, _interrupted: bool) {}

    fn progress(&self) -> Progress {
        Progress::default()
    }

    /// Number of direct children that ended `Canceled`.  Composites only.
    fn canceled_children(&self) -> usize {
        0
    }

    /// Visit direct children.  Composites only.
    fn visit_children(&mut self, _visit: &mut dyn FnMut(&mut Task)) {}
}

// ── TaskHandle ────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Status {
    id: TaskId,
    name: String,
    state: Cell<TaskState>,
    progress: Cell<Progress>,
    canceled_children: Cell<usize>,
}

/// Read-only, clonable view of a task owned elsewhere in the tree.
#[derive(Debug, Clone)]
pub struct TaskHandle(Rc<Status>);

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn state(&self) -> TaskState {
        self.0.state.get()
    }

    pub fn progress(&self) -> Progress {
        self.0.progress.get()
    }

    pub fn elapsed_fraction(&self) -> Option<f64> {
        self.progress().elapsed_fraction
    }

    pub fn total_time(&self) -> Option<Duration> {
        self.progress().total_time
    }

    pub fn position(&self) -> Option<PositionProgress> {
        self.progress().position
    }

    pub fn canceled_children(&self) -> usize {
        self.0.canceled_children.get()
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// A schedulable unit: one [`Behavior`] plus its lifecycle.
pub struct Task {
    id: TaskId,
    state: TaskState,
    requirements: ResourceSet,
    behavior: Box<dyn Behavior>,
    status: Rc<Status>,
}

impl Task {
    pub fn new(behavior: impl Behavior + 'static) -> Self {
        Self::from_boxed(Box::new(behavior))
    }

    pub fn from_boxed(behavior: Box<dyn Behavior>) -> Self {
        let id = TaskId::next();
        let status = Rc::new(Status {
            id,
            name: behavior.name().to_string(),
            state: Cell::new(TaskState::Initialized),
            progress: Cell::new(behavior.progress()),
            canceled_children: Cell::new(0),
        });
        Task {
            id,
            state: TaskState::Initialized,
            requirements: behavior.requirements(),
            behavior,
            status,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.status.name
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn requirements(&self) -> ResourceSet {
        self.requirements
    }

    pub fn handle(&self) -> TaskHandle {
        TaskHandle(Rc::clone(&self.status))
    }

    /// Advance one period and return the resulting state.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) -> TaskState {
        match self.state {
            TaskState::Finished | TaskState::Canceled => return self.state,
            TaskState::Initialized => {
                if !self.start(ctx) {
                    return self.state;
                }
            }
            TaskState::Running => {}
        }

        self.behavior.execute(ctx);
        if self.behavior.is_finished(ctx) {
            self.behavior.end(ctx, false);
            ctx.arbiter().release(self.id);
            self.state = TaskState::Finished;
            debug!(task = %self.name(), id = %self.id, at = ?ctx.now(), "finished");
        }
        self.publish();
        self.state
    }

    /// Cancel this task (and, for composites, every non-terminal descendant)
    /// before returning.  No-op on terminal tasks.
    pub fn cancel(&mut self, ctx: &mut TickContext<'_>) {
        if self.is_terminal() {
            return;
        }
        let was = self.state;
        self.behavior.end(ctx, true);
        ctx.arbiter().release(self.id);
        self.state = TaskState::Canceled;
        self.publish();
        debug!(task = %self.name(), id = %self.id, from = %was, "canceled");
    }

    /// Cancel every non-terminal task in this subtree whose id is in
    /// `targets`.  Returns how many were canceled.
    pub(crate) fn evict(&mut self, targets: &[TaskId], ctx: &mut TickContext<'_>) -> usize {
        if self.is_terminal() {
            return 0;
        }
        if targets.contains(&self.id) {
            debug!(task = %self.name(), id = %self.id, "evicted by resource conflict");
            self.cancel(ctx);
            return 1;
        }
        let mut evicted = 0;
        self.behavior
            .visit_children(&mut |child: &mut Task| evicted += child.evict(targets, ctx));
        if evicted > 0 {
            self.publish();
        }
        evicted
    }

    /// Arbitrate resources and run the setup hook.  Returns `false` when the
    /// task must wait for conflicting holders to be evicted.
    fn start(&mut self, ctx: &mut TickContext<'_>) -> bool {
        if !self.requirements.is_empty() {
            let conflicts = ctx.arbiter().conflicts(self.id, self.requirements);
            if !conflicts.is_empty() {
                debug!(
                    task = %self.name(),
                    id = %self.id,
                    holders = ?conflicts,
                    "waiting for resource holders to be evicted"
                );
                ctx.arbiter().request_eviction(&conflicts);
                return false;
            }
            ctx.arbiter().acquire(self.id, self.requirements);
        }

        debug!(task = %self.name(), id = %self.id, at = ?ctx.now(), "initialize");
        self.behavior.initialize(ctx);
        self.state = TaskState::Running;
        true
    }

    fn publish(&self) {
        self.status.state.set(self.state);
        self.status.progress.set(self.behavior.progress());
        self.status
            .canceled_children
            .set(self.behavior.canceled_children());
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("state", &self.state)
            .field("requirements", &self.requirements)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
