//! # ChronoBoard Core Library
//!
//! Task storage, calendar events, and the synchronization that keeps the two
//! consistent. Every task with a due date owns exactly one calendar event
//! derived from it; all operations are available through the standalone
//! `chronoboard-cli` binary over the same library.
//!
//! ## Architecture
//!
//! - **Storage**: SQLite tables for tasks and calendar events behind
//!   [`TaskStore`] / [`EventStore`], plus TOML configuration
//! - **Synchronizer**: create/update/delete cascades and a full-scan
//!   reconciliation pass
//! - **Board**: the transactional facade callers use; [`AsyncBoard`] wraps it
//!   for tokio
//!
//! ## Key Components
//!
//! - [`Board`]: task and event operations with their cascades
//! - [`Synchronizer`]: due-date to event derivation and repair
//! - [`Database`]: connection handle and transactions
//! - [`Config`]: Application configuration management

pub mod async_board;
pub mod board;
pub mod calendar;
pub mod error;
pub mod storage;
pub mod sync;
pub mod task;

pub use async_board::AsyncBoard;
pub use board::Board;
pub use calendar::{CalendarEvent, DueSlot, EventFields, EventId, UnreadableEvent};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use storage::{Config, Database, EventScan, EventStore, TaskStore};
pub use sync::{CascadeOutcome, ReconcileReport, Repair, RepairKind, Synchronizer, TaskDeletion};
pub use task::{DueDate, Priority, ProjectId, Task, TaskFields, TaskId, TaskInput, TaskStatus};
