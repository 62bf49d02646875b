/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Composite tasks.
//!
//! | Group | Children run | Finishes when |
//! |---|---|---|
//! | [`SequentialGroup`] | one at a time, in order; `parallel` entries fork off | last entry done and every fork terminal |
//! | [`ParallelGroup`] | all at once | every child terminal |
//!
//! Groups own their children.  Canceling a group cancels every non-terminal
//! child before the group itself reaches `Canceled`.  Groups declare no
//! resources of their own.

pub mod parallel;
pub mod sequential;

pub use parallel::ParallelGroup;
pub use sequential::{EntryKind, SequentialGroup};

use crate::task::{Task, TaskState};

/// Number of tasks in `children` that ended `Canceled`.
fn count_canceled<'a>(children: impl Iterator<Item = &'a Task>) -> usize {
    children
        .filter(|t| t.state() == TaskState::Canceled)
        .count()
}

// ── Builders ──────────────────────────────────────────────────────────────────

/// Fluent builder for a [`SequentialGroup`].
///
/// ```ignore
/// let routine = SequentialBuilder::new("score")
///     .sequential(drive)
///     .parallel(raise_elevator)   // starts with the next entry, not awaited
///     .sequential(outtake)
///     .build();
/// ```
#[derive(Debug)]
pub struct SequentialBuilder {
    name: String,
    entries: Vec<(EntryKind, Task)>,
}

impl SequentialBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Append an entry the group waits for before moving on.
    pub fn sequential(mut self, task: Task) -> Self {
        self.entries.push((EntryKind::Sequential, task));
        self
    }

    /// Append an entry that starts when reached and runs alongside the rest.
    pub fn parallel(mut self, task: Task) -> Self {
        self.entries.push((EntryKind::Parallel, task));
        self
    }

    pub fn build(self) -> Task {
        Task::new(SequentialGroup::new(self.name, self.entries))
    }
}

/// Fluent builder for a [`ParallelGroup`].
#[derive(Debug)]
pub struct ParallelBuilder {
    name: String,
    children: Vec<Task>,
}

impl ParallelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn with(mut self, task: Task) -> Self {
        self.children.push(task);
        self
    }

    pub fn build(self) -> Task {
        Task::new(ParallelGroup::new(self.name, self.children))
    }
}
