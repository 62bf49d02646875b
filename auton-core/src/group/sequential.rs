/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Sequential group with fork-style parallel entries.
//!
//! The group keeps a cursor into its entry list:
//!
//! ```text
//! entries:  [ seq A ][ par B ][ seq C ][ seq D ]
//!                       │
//! tick N:   A finishes, cursor → B
//! tick N+1: B forked (ticked, not awaited), cursor → C; C starts the same tick
//! ...       C, D in turn; B keeps being ticked as a fork
//! finish:   cursor past D and B terminal
//! ```
//!
//! A sequential entry that finishes hands over to the next entry on the
//! following tick.  A sequential entry that is canceled (e.g. evicted) is
//! skipped the same way so the group does not stall.

use tracing::{debug, warn};

use super::count_canceled;
use crate::task::{Behavior, Task, TaskState, TickContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Awaited before the cursor moves on.
    Sequential,
    /// Started when reached, then ticked alongside later entries.
    Parallel,
}

pub struct SequentialGroup {
    name: String,
    entries: Vec<(EntryKind, Task)>,
    cursor: usize,
    /// Indices of parallel entries that have been started.
    forks: Vec<usize>,
}

impl SequentialGroup {
    pub fn new(name: impl Into<String>, entries: Vec<(EntryKind, Task)>) -> Self {
        Self {
            name: name.into(),
            entries,
            cursor: 0,
            forks: Vec::new(),
        }
    }

    fn tick_forks(&mut self, ctx: &mut TickContext<'_>) {
        for &idx in &self.forks {
            self.entries[idx].1.tick(ctx);
        }
    }
}

impl Behavior for SequentialGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, _ctx: &mut TickContext<'_>) {
        self.cursor = 0;
        self.forks.clear();
        debug!(group = %self.name, entries = self.entries.len(), "sequential group started");
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) {
        self.tick_forks(ctx);

        while let Some((kind, task)) = self.entries.get_mut(self.cursor) {
            match kind {
                EntryKind::Parallel => {
                    debug!(group = %self.name, task = %task.name(), "forking parallel entry");
                    task.tick(ctx);
                    self.forks.push(self.cursor);
                    self.cursor += 1;
                }
                EntryKind::Sequential => {
                    let state = task.tick(ctx);
                    if state == TaskState::Canceled {
                        warn!(group = %self.name, task = %task.name(), "sequential entry canceled, skipping");
                    }
                    if state.is_terminal() {
                        self.cursor += 1;
                    }
                    break;
                }
            }
        }
    }

    fn is_finished(&self, _ctx: &TickContext<'_>) -> bool {
        self.cursor >= self.entries.len()
            && self.forks.iter().all(|&idx| self.entries[idx].1.is_terminal())
    }

    fn end(&mut self, ctx: &mut TickContext<'_>, interrupted: bool) {
        if interrupted {
            for (_, task) in &mut self.entries {
                task.cancel(ctx);
            }
            return;
        }
        let canceled = self.canceled_children();
        if canceled > 0 {
            warn!(group = %self.name, canceled, "sequential group finished with canceled children");
        }
    }

    fn canceled_children(&self) -> usize {
        count_canceled(self.entries.iter().map(|(_, t)| t))
    }

    fn visit_children(&mut self, visit: &mut dyn FnMut(&mut Task)) {
        for (_, task) in &mut self.entries {
            visit(task);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
