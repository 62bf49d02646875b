/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Exclusive-access resources and the arbiter that hands them out.
//!
//! ```text
//! ResourceRegistry ──(register at start-up)──► Resource ──(clone into tasks)──► ResourceSet
//!                                                                                  │
//!                              Arbiter ◄──(acquire / conflicts / release)──────────┘
//! ```
//!
//! # Ownership model
//! A [`Resource`] is a cheap, clonable handle (an index plus a shared name).
//! The registry creates every handle once at start-up; tasks receive clones at
//! build time and never look subsystems up through ambient globals.
//!
//! The [`Arbiter`] is owned by the scheduler and is the single place that
//! knows which task currently holds which resource.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::task::TaskId;

/// Upper bound on registered resources, one bit each in a [`ResourceSet`].
pub const MAX_RESOURCES: usize = 64;

// ── Resource ──────────────────────────────────────────────────────────────────

/// Index of a resource inside its [`ResourceRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(u8);

impl ResourceId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a mutually-exclusive physical subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    id: ResourceId,
    name: Arc<str>,
}

impl Resource {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A set containing only this resource.
    pub fn as_set(&self) -> ResourceSet {
        ResourceSet::EMPTY.with(self)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ── ResourceSet ───────────────────────────────────────────────────────────────

/// Set of resources a task declares before it starts.
///
/// Stored as a `u64` bitmask: bit N set means [`ResourceId`] N is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceSet(u64);

impl ResourceSet {
    pub const EMPTY: ResourceSet = ResourceSet(0);

    /// Returns a copy of the set with `resource` added.
    pub fn with(self, resource: &Resource) -> Self {
        ResourceSet(self.0 | (1u64 << resource.id.0))
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        (self.0 >> id.0) & 1 == 1
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: ResourceSet) -> Self {
        ResourceSet(self.0 | other.0)
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate over the ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ResourceId> + '_ {
        let mask = self.0;
        (0..MAX_RESOURCES as u8).filter(move |bit| (mask >> bit) & 1 == 1).map(ResourceId)
    }
}

impl FromIterator<Resource> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ResourceSet::EMPTY, |set, r| set.with(&r))
    }
}

// ── ResourceRegistry ──────────────────────────────────────────────────────────

/// Process-wide registry of resource handles, populated once at start-up.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: Vec<Resource>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` and returns its handle.
    ///
    /// Registering an existing name returns the existing handle.
    ///
    /// # Panics
    /// Panics when more than [`MAX_RESOURCES`] distinct resources are
    /// registered; the set of subsystems is fixed at start-up.
    pub fn register(&mut self, name: &str) -> Resource {
        if let Some(existing) = self.get(name) {
            return existing;
        }
        assert!(
            self.resources.len() < MAX_RESOURCES,
            "resource registry is full ({MAX_RESOURCES} entries)"
        );
        let resource = Resource {
            id: ResourceId(self.resources.len() as u8),
            name: Arc::from(name),
        };
        debug!(resource = %resource, id = resource.id.0, "resource registered");
        self.resources.push(resource.clone());
        resource
    }

    pub fn get(&self, name: &str) -> Option<Resource> {
        self.resources.iter().find(|r| &*r.name == name).cloned()
    }

    pub fn by_id(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

// ── Arbiter ───────────────────────────────────────────────────────────────────

/// Tracks which running task holds which resource.
///
/// Conflicts are resolved newest-wins: a task about to start asks for the
/// holders of its resources via [`conflicts`](Self::conflicts), the scheduler
/// cancels them (queued with [`request_eviction`](Self::request_eviction)),
/// and the requester then calls [`acquire`](Self::acquire).
#[derive(Debug, Default)]
pub struct Arbiter {
    /// `BTreeMap` so eviction order is deterministic.
    holders: BTreeMap<ResourceId, TaskId>,
    pending_evictions: Vec<TaskId>,
}

impl Arbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks other than `task` currently holding any resource in `set`.
    pub fn conflicts(&self, task: TaskId, set: ResourceSet) -> Vec<TaskId> {
        let mut holders: Vec<TaskId> = set
            .iter()
            .filter_map(|id| self.holders.get(&id).copied())
            .filter(|holder| *holder != task)
            .collect();
        holders.sort_unstable();
        holders.dedup();
        holders
    }

    /// Records `task` as the holder of every resource in `set`.
    ///
    /// Callers resolve conflicts first; any stale holder entry is overwritten.
    pub fn acquire(&mut self, task: TaskId, set: ResourceSet) {
        for id in set.iter() {
            self.holders.insert(id, task);
        }
    }

    /// Releases everything `task` holds.  Returns the number of resources freed.
    pub fn release(&mut self, task: TaskId) -> usize {
        let before = self.holders.len();
        self.holders.retain(|_, holder| *holder != task);
        before - self.holders.len()
    }

    pub fn holder(&self, id: ResourceId) -> Option<TaskId> {
        self.holders.get(&id).copied()
    }

    /// Queue holders to be canceled at the end of the current tick.
    pub fn request_eviction(&mut self, tasks: &[TaskId]) {
        for task in tasks {
            if !self.pending_evictions.contains(task) {
                debug!(task = %task, "eviction requested");
                self.pending_evictions.push(*task);
            }
        }
    }

    pub fn has_pending_evictions(&self) -> bool {
        !self.pending_evictions.is_empty()
    }

    pub fn take_pending_evictions(&mut self) -> Vec<TaskId> {
        std::mem::take(&mut self.pending_evictions)
    }

    /// Drop every holder entry and pending eviction.
    pub fn clear(&mut self) {
        self.holders.clear();
        self.pending_evictions.clear();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
