/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use tracing::{debug, warn};

use super::count_canceled;
use crate::task::{Behavior, Task, TickContext};

/// Runs every child from its first tick and finishes once all are terminal.
pub struct ParallelGroup {
    name: String,
    children: Vec<Task>,
}

impl ParallelGroup {
    pub fn new(name: impl Into<String>, children: Vec<Task>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }
}

impl Behavior for ParallelGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, _ctx: &mut TickContext<'_>) {
        debug!(group = %self.name, children = self.children.len(), "parallel group started");
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) {
        for child in &mut self.children {
            child.tick(ctx);
        }
    }

    fn is_finished(&self, _ctx: &TickContext<'_>) -> bool {
        self.children.iter().all(Task::is_terminal)
    }

    fn end(&mut self, ctx: &mut TickContext<'_>, interrupted: bool) {
        if interrupted {
            for child in &mut self.children {
                child.cancel(ctx);
            }
            return;
        }
        let canceled = self.canceled_children();
        if canceled > 0 {
            warn!(group = %self.name, canceled, "parallel group finished with canceled children");
        }
    }

    fn canceled_children(&self) -> usize {
        count_canceled(self.children.iter())
    }

    fn visit_children(&mut self, visit: &mut dyn FnMut(&mut Task)) {
        for child in &mut self.children {
            visit(child);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::ParallelBuilder;
    use crate::hal::SimHal;
    use crate::resource::Arbiter;
    use crate::task::TaskState;
    use std::time::Duration;

    struct Ticks(u32, u32);

    impl Behavior for Ticks {
        fn name(&self) -> &str {
            "ticks"
        }
        fn execute(&mut self, _ctx: &mut TickContext<'_>) {
            self.1 += 1;
        }
        fn is_finished(&self, _ctx: &TickContext<'_>) -> bool {
            self.1 >= self.0
        }
    }

    fn tick(task: &mut Task, hal: &mut SimHal, arb: &mut Arbiter) -> TaskState {
        let mut ctx = TickContext::new(hal, arb, Duration::ZERO, Duration::from_millis(20));
        task.tick(&mut ctx)
    }

    #[test]
    fn all_children_start_on_first_tick() {
        let a = Task::new(Ticks(3, 0));
        let b = Task::new(Ticks(1, 0));
        let (ha, hb) = (a.handle(), b.handle());
        let mut group = ParallelBuilder::new("p").with(a).with(b).build();
        let (mut hal, mut arb) = (SimHal::new(), Arbiter::new());

        tick(&mut group, &mut hal, &mut arb);
        assert_eq!(ha.state(), TaskState::Running);
        assert_eq!(hb.state(), TaskState::Finished);
        assert_eq!(group.state(), TaskState::Running);
    }

    #[test]
    fn finishes_with_longest_child() {
        let mut group = ParallelBuilder::new("p")
            .with(Task::new(Ticks(2, 0)))
            .with(Task::new(Ticks(4, 0)))
            .build();
        let (mut hal, mut arb) = (SimHal::new(), Arbiter::new());
        for _ in 0..3 {
            assert_eq!(tick(&mut group, &mut hal, &mut arb), TaskState::Running);
        }
        assert_eq!(tick(&mut group, &mut hal, &mut arb), TaskState::Finished);
    }

    #[test]
    fn empty_group_finishes_immediately() {
        let mut group = ParallelBuilder::new("p").build();
        let (mut hal, mut arb) = (SimHal::new(), Arbiter::new());
        assert_eq!(tick(&mut group, &mut hal, &mut arb), TaskState::Finished);
    }

    #[test]
    fn cancel_propagates_to_running_children() {
        let a = Task::new(Ticks(10, 0));
        let b = Task::new(Ticks(1, 0));
        let (ha, hb) = (a.handle(), b.handle());
        let mut group = ParallelBuilder::new("p").with(a).with(b).build();
        let (mut hal, mut arb) = (SimHal::new(), Arbiter::new());
        tick(&mut group, &mut hal, &mut arb);

        let mut ctx = TickContext::new(&mut hal, &mut arb, Duration::ZERO, Duration::ZERO);
        group.cancel(&mut ctx);
        assert_eq!(group.state(), TaskState::Canceled);
        assert_eq!(ha.state(), TaskState::Canceled);
        assert_eq!(hb.state(), TaskState::Finished, "terminal children untouched");
    }
}
