//! Fixed-period task scheduler.
//!
//! [`Scheduler`] owns the hardware, the resource [`Arbiter`] and the root
//! task of the running routine.  The caller drives it by calling
//! [`tick()`](Scheduler::tick) once per period from a single thread; there is
//! no internal timer and no locking.
//!
//! # One tick
//! ```text
//! tick()
//!  ├─ root.tick(ctx)            composites tick their children depth-first
//!  │    └─ a starting task that conflicts with a holder queues an eviction
//!  │       and stays Initialized
//!  ├─ eviction sweep            queued holders are canceled (teardown runs once,
//!  │                            resources released)
//!  └─ clock += period           the waiting task starts on the next tick
//! ```
//!
//! # Design decisions
//!
//! | Topic | Choice |
//! |---|---|
//! | Time base | `tick_count × period`; independent of wall clock |
//! | Eviction | Deferred to the end of the tick; the tree is owned, so a holder elsewhere in it cannot be canceled mid-walk |
//! | Restart | `start()` cancels any routine still running |
//! | Traversal order | Declaration order, depth-first; deterministic |
//!
//! # Example
//! ```rust,ignore
//! let mut scheduler = Scheduler::new(SimHal::new(), Duration::from_millis(20));
//! scheduler.start(routine);
//! while scheduler.tick() == SchedulerStatus::Running {}
//! ```

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::hal::Hal;
use crate::resource::Arbiter;
use crate::task::{Task, TaskHandle, TaskState, TickContext};

// ── SchedulerStatus ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerStatus {
    /// No routine has been started.
    Idle,
    Running,
    Finished,
    Canceled,
}

impl fmt::Display for SchedulerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchedulerStatus::Idle => "idle",
            SchedulerStatus::Running => "running",
            SchedulerStatus::Finished => "finished",
            SchedulerStatus::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

impl From<TaskState> for SchedulerStatus {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::Initialized | TaskState::Running => SchedulerStatus::Running,
            TaskState::Finished => SchedulerStatus::Finished,
            TaskState::Canceled => SchedulerStatus::Canceled,
        }
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

pub struct Scheduler<H: Hal> {
    hal: H,
    arbiter: Arbiter,
    root: Option<Task>,
    period: Duration,
    /// Ticks since the current root was started.
    ticks: u32,
}

impl<H: Hal> Scheduler<H> {
    pub fn new(hal: H, period: Duration) -> Self {
        Self {
            hal,
            arbiter: Arbiter::new(),
            root: None,
            period,
            ticks: 0,
        }
    }

    /// Install `root` as the running routine.  A previous routine that is
    /// still running is canceled first.
    pub fn start(&mut self, root: Task) {
        if self.is_running() {
            warn!("starting a new routine while another is running; canceling it");
            self.cancel();
        }
        self.arbiter.clear();
        self.ticks = 0;
        info!(routine = %root.name(), period_ms = self.period.as_millis() as u64, "routine started");
        self.root = Some(root);
    }

    /// Advance the routine by one period.
    pub fn tick(&mut self) -> SchedulerStatus {
        let now = self.elapsed();
        let Some(root) = self.root.as_mut() else {
            return SchedulerStatus::Idle;
        };
        if root.is_terminal() {
            return root.state().into();
        }

        let mut ctx = TickContext::new(&mut self.hal, &mut self.arbiter, now, self.period);
        let state = root.tick(&mut ctx);

        if ctx.arbiter().has_pending_evictions() {
            let targets = ctx.arbiter().take_pending_evictions();
            let evicted = root.evict(&targets, &mut ctx);
            debug!(requested = targets.len(), evicted, at = ?now, "eviction sweep");
        }

        self.ticks += 1;
        match state {
            TaskState::Finished => {
                let elapsed = self.period * self.ticks;
                info!(routine = %root.name(), elapsed_ms = elapsed.as_millis() as u64, "routine finished");
            }
            TaskState::Canceled => {
                warn!(routine = %root.name(), "routine canceled");
            }
            TaskState::Initialized | TaskState::Running => {}
        }
        root.state().into()
    }

    /// Cancel the running routine, tearing down every active task before
    /// returning.
    pub fn cancel(&mut self) {
        let now = self.elapsed();
        let Some(root) = self.root.as_mut() else {
            return;
        };
        if root.is_terminal() {
            return;
        }
        let mut ctx = TickContext::new(&mut self.hal, &mut self.arbiter, now, self.period);
        root.cancel(&mut ctx);
        self.arbiter.take_pending_evictions();
        info!(routine = %root.name(), at_ms = now.as_millis() as u64, "routine canceled by caller");
    }

    pub fn status(&self) -> SchedulerStatus {
        self.root
            .as_ref()
            .map_or(SchedulerStatus::Idle, |root| root.state().into())
    }

    pub fn is_running(&self) -> bool {
        self.status() == SchedulerStatus::Running
    }

    /// Time since the current routine started (`tick_count × period`).
    pub fn elapsed(&self) -> Duration {
        self.period * self.ticks
    }

    pub fn tick_count(&self) -> u32 {
        self.ticks
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn root_handle(&self) -> Option<TaskHandle> {
        self.root.as_ref().map(Task::handle)
    }

    pub fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn into_hal(self) -> H {
        self.hal
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
