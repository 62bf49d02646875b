/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Auton – cooperative task scheduler for robot autonomous routines
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── task          – Behavior trait, Task lifecycle, TaskHandle, progress
//! ├── resource      – resource registry, bitmask sets, arbiter
//! ├── scheduler/    – fixed-period tick loop, eviction sweep
//! ├── group/        – sequential (with forks) and parallel composites
//! ├── trajectory/   – Pathfinder CSV loading and the trajectory follower
//! ├── gate          – progress-threshold synchronization tasks
//! ├── action/       – leaf tasks (actuators, delays, intake, position moves)
//! ├── routine/      – field layout, routine table and routine builders
//! ├── hal/          – hardware abstraction and the in-memory simulator
//! ├── config/       – YAML robot configuration
//! └── error         – BuildError
//! ```

pub mod action;
pub mod config;
pub mod error;
pub mod gate;
pub mod group;
pub mod hal;
pub mod resource;
pub mod routine;
pub mod scheduler;
pub mod task;
pub mod trajectory;

pub use error::BuildError;
pub use scheduler::{Scheduler, SchedulerStatus};
pub use task::{Behavior, Task, TaskHandle, TaskState};
