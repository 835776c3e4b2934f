//! Task to calendar synchronization.
//!
//! Every task with a due date owns exactly one derived calendar event. The
//! [`Synchronizer`] keeps that true at write time through three cascades, and
//! [`Synchronizer::reconcile`] restores it after the fact when something
//! outside the cascades (a manual edit, an older database, another tool) has
//! broken it.
//!
//! The cascades take a plain `&Connection` and expect to be called inside the
//! caller's transaction; they never open one themselves.

mod reconcile;

pub use reconcile::{
    invariant_violations, plan_repairs, plan_unreadable, ReconcilePlan, ReconcileReport, Repair, RepairFailure, RepairKind,
};

use rusqlite::Connection;
use serde::Serialize;

use crate::calendar::{DueSlot, EventId};
use crate::storage::{EventStore, TaskStore};
use crate::task::{DueDate, TaskId};

/// What an update cascade did to the task's derived events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CascadeOutcome {
    /// Derived events removed.
    pub removed: usize,
    /// Replacement event, when the task still has a due date.
    pub created: Option<EventId>,
}

/// Rows removed by a delete cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TaskDeletion {
    pub task_rows: usize,
    pub event_rows: usize,
}

impl TaskDeletion {
    pub fn task_existed(&self) -> bool {
        self.task_rows > 0
    }
}

/// Derives calendar events from task due dates.
#[derive(Debug, Clone, Default)]
pub struct Synchronizer {
    slot: DueSlot,
}

impl Synchronizer {
    pub fn new(slot: DueSlot) -> Self {
        Self { slot }
    }

    pub fn slot(&self) -> &DueSlot {
        &self.slot
    }

    /// Create the derived event for a freshly inserted task.
    ///
    /// Returns `None` when the task has no due date.
    pub fn on_task_created(
        &self,
        conn: &Connection,
        task_id: TaskId,
        title: &str,
        due_date: Option<&DueDate>,
    ) -> Result<Option<EventId>, rusqlite::Error> {
        let Some(due_date) = due_date else {
            return Ok(None);
        };
        let fields = self.slot.derived_event(task_id, title, due_date);
        let event_id = EventStore::new(conn).create(&fields)?;
        tracing::debug!(task_id, event_id, start = %fields.start, "created derived event");
        Ok(Some(event_id))
    }

    /// Replace a task's derived events after a full update.
    ///
    /// Manual events attached to the task are left alone.
    pub fn on_task_updated(
        &self,
        conn: &Connection,
        task_id: TaskId,
        title: &str,
        due_date: Option<&DueDate>,
    ) -> Result<CascadeOutcome, rusqlite::Error> {
        let removed = EventStore::new(conn).delete_derived_by_task_id(task_id)?;
        tracing::debug!(task_id, removed, "cleared derived events");

        let created = self.on_task_created(conn, task_id, title, due_date)?;
        Ok(CascadeOutcome { removed, created })
    }

    /// Delete every event of a task, then the task.
    pub fn on_task_deleted(&self, conn: &Connection, task_id: TaskId) -> Result<TaskDeletion, rusqlite::Error> {
        let event_rows = EventStore::new(conn).delete_by_task_id(task_id)?;
        let task_rows = TaskStore::new(conn).delete(task_id)?;
        tracing::debug!(task_id, event_rows, task_rows, "deleted task with its events");
        Ok(TaskDeletion { task_rows, event_rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::EventFields;
    use crate::storage::Database;
    use crate::task::TaskFields;
    use chrono::NaiveDateTime;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, crate::calendar::EVENT_TIME_FORMAT).unwrap()
    }

    #[test]
    fn create_without_due_date_creates_nothing() {
        let db = Database::open_memory().unwrap();
        let sync = Synchronizer::default();
        db.write(|tx| {
            assert_eq!(sync.on_task_created(tx, 1, "x", None)?, None);
            assert!(EventStore::new(tx).list()?.is_empty());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn update_replaces_derived_and_keeps_manual() {
        let db = Database::open_memory().unwrap();
        let sync = Synchronizer::default();
        db.write(|tx| {
            let due = DueDate::parse("2024-05-01");
            let id = TaskStore::new(tx).create(&TaskFields::titled("t").with_due_date(due))?;
            sync.on_task_created(tx, id, "t", due.as_ref())?;
            let manual = EventFields::manual("prep", at("2024-04-30T09:00:00"), at("2024-04-30T10:00:00")).for_task(id);
            let manual_id = EventStore::new(tx).create(&manual)?;

            let moved = DueDate::parse("2024-05-03T15:00:00");
            let outcome = sync.on_task_updated(tx, id, "t", moved.as_ref())?;
            assert_eq!(outcome.removed, 1);
            assert!(outcome.created.is_some());

            let events = EventStore::new(tx).list_by_task(id)?;
            assert_eq!(events.len(), 2);
            assert_eq!(events[0].id, manual_id);
            assert_eq!(events[1].start, at("2024-05-03T15:00:00"));
            assert_eq!(events[1].end, at("2024-05-03T15:00:00"));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn update_to_no_due_date_leaves_no_derived_event() {
        let db = Database::open_memory().unwrap();
        let sync = Synchronizer::default();
        db.write(|tx| {
            let due = DueDate::parse("2024-05-01");
            sync.on_task_created(tx, 5, "t", due.as_ref())?;
            let outcome = sync.on_task_updated(tx, 5, "t", None)?;
            assert_eq!(outcome, CascadeOutcome { removed: 1, created: None });
            assert!(EventStore::new(tx).list_by_task(5)?.is_empty());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn delete_removes_events_then_task() {
        let db = Database::open_memory().unwrap();
        let sync = Synchronizer::default();
        db.write(|tx| {
            let due = DueDate::parse("2024-05-01");
            let id = TaskStore::new(tx).create(&TaskFields::titled("t").with_due_date(due))?;
            sync.on_task_created(tx, id, "t", due.as_ref())?;

            let deletion = sync.on_task_deleted(tx, id)?;
            assert_eq!(deletion, TaskDeletion { task_rows: 1, event_rows: 1 });
            assert!(deletion.task_existed());
            assert!(TaskStore::new(tx).get(id)?.is_none());

            assert!(!sync.on_task_deleted(tx, id)?.task_existed());
            Ok(())
        })
        .unwrap();
    }
}
