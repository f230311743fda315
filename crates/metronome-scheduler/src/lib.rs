//! `metronome-scheduler` — lightweight in-process cron task scheduler.
//!
//! # Overview
//!
//! Tasks are registered once at process start into a
//! [`registry::TaskRegistry`] with a cron expression, an enabled flag and an
//! executable [`types::TaskAction`]. The registry is then moved into the
//! [`engine::SchedulerEngine`], which polls it on a fixed cadence
//! (900 ms by default), computes each enabled task's next occurrence and
//! dispatches due tasks onto their own tokio tasks.
//!
//! # Guarantees
//!
//! | Property        | Mechanism                                            |
//! |-----------------|------------------------------------------------------|
//! | At-most-once    | atomic insert of a `(second, task)` fire key         |
//! | Failure isolation | each firing runs on its own task; errors are logged |
//! | Key cleanup     | drop guard releases the fire key even on panic       |
//! | No backfill     | a missed slot re-anchors the task; it is never replayed |
//!
//! There is deliberately no persistence, no cross-process coordination and
//! no cap on concurrent executions: a run that outlives its task's next due
//! instant simply overlaps with the next run.

pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod schedule;
pub mod types;

mod dispatch;

pub use config::SchedulerConfig;
pub use engine::SchedulerEngine;
pub use error::{Result, SchedulerError};
pub use registry::TaskRegistry;
pub use types::{FireKey, TaskAction, TaskDefinition};
