//! The board: the one entry point that pairs every task write with its
//! calendar cascade.
//!
//! Callers never reach the stores directly for writes. Each [`Board`] method
//! runs the store change and its cascade inside one immediate transaction,
//! so readers see either both or neither.

use std::sync::Arc;

use crate::calendar::{CalendarEvent, EventFields, EventId};
use crate::error::{CoreError, DatabaseError, Result};
use crate::storage::{Config, Database, EventStore, TaskStore};
use crate::sync::{ReconcileReport, Repair, Synchronizer, TaskDeletion};
use crate::task::{ProjectId, Task, TaskId, TaskInput, TaskStatus};

fn vanished(what: &str, id: i64) -> CoreError {
    DatabaseError::QueryFailed(format!("{what} {id} vanished inside its own transaction")).into()
}

/// Tasks and calendar events kept consistent with each other.
#[derive(Debug, Clone)]
pub struct Board {
    db: Arc<Database>,
    sync: Synchronizer,
}

impl Board {
    pub fn new(db: Arc<Database>, sync: Synchronizer) -> Self {
        Self { db, sync }
    }

    /// Open the configured database with the configured due-date slot.
    ///
    /// # Errors
    /// Returns an error if the slot settings are invalid or the database
    /// cannot be opened.
    pub fn open(config: &Config) -> Result<Self> {
        let slot = config.calendar.due_slot()?;
        let db = Database::open(&config.database)?;
        Ok(Self::new(Arc::new(db), Synchronizer::new(slot)))
    }

    /// In-memory board with the default slot.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        Ok(Self::new(Arc::new(Database::open_memory()?), Synchronizer::default()))
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// Create a task and, when it has a due date, its derived event.
    ///
    /// # Errors
    /// Returns a validation error for a blank title, or a store error; on a
    /// store error nothing is written.
    pub fn create_task(&self, input: TaskInput) -> Result<Task> {
        let fields = input.normalize()?;
        self.db.write(|tx| {
            let id = TaskStore::new(tx).create(&fields)?;
            self.sync
                .on_task_created(tx, id, &fields.title, fields.due_date.as_ref())?;
            TaskStore::new(tx).get(id)?.ok_or_else(|| vanished("task", id))
        })
    }

    pub fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
        self.db.read(|conn| Ok(TaskStore::new(conn).get(id)?))
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        self.db.read(|conn| Ok(TaskStore::new(conn).list()?))
    }

    pub fn list_tasks_with_due_date(&self) -> Result<Vec<Task>> {
        self.db.read(|conn| Ok(TaskStore::new(conn).list_with_due_date()?))
    }

    pub fn list_tasks_by_project(&self, project_id: ProjectId) -> Result<Vec<Task>> {
        self.db
            .read(|conn| Ok(TaskStore::new(conn).list_by_project(project_id)?))
    }

    /// Replace every writable field of a task and re-derive its event.
    ///
    /// Returns `None` when no task has this id; nothing is cascaded then.
    ///
    /// # Errors
    /// Returns a validation error for a blank title, or a store error.
    pub fn update_task(&self, id: TaskId, input: TaskInput) -> Result<Option<Task>> {
        let fields = input.normalize()?;
        self.db.write(|tx| {
            if TaskStore::new(tx).update_full(id, &fields)? == 0 {
                tracing::debug!(task_id = id, "update of missing task, skipping cascade");
                return Ok(None);
            }
            self.sync
                .on_task_updated(tx, id, &fields.title, fields.due_date.as_ref())?;
            Ok(TaskStore::new(tx).get(id)?)
        })
    }

    /// Move a task to another column. Never touches calendar events.
    ///
    /// Returns whether the task exists.
    pub fn update_task_status(&self, id: TaskId, status: TaskStatus) -> Result<bool> {
        self.db
            .write(|tx| Ok(TaskStore::new(tx).update_status(id, status)? > 0))
    }

    /// Record tracked seconds. Never touches calendar events.
    pub fn update_time_spent(&self, id: TaskId, seconds: u64) -> Result<bool> {
        self.db
            .write(|tx| Ok(TaskStore::new(tx).update_time_spent(id, seconds)? > 0))
    }

    /// Delete a task together with every event that references it.
    pub fn delete_task(&self, id: TaskId) -> Result<TaskDeletion> {
        self.db.write(|tx| Ok(self.sync.on_task_deleted(tx, id)?))
    }

    // =========================================================================
    // Calendar events
    // =========================================================================

    pub fn list_events(&self) -> Result<Vec<CalendarEvent>> {
        self.db.read(|conn| Ok(EventStore::new(conn).list()?))
    }

    pub fn events_for_task(&self, task_id: TaskId) -> Result<Vec<CalendarEvent>> {
        self.db
            .read(|conn| Ok(EventStore::new(conn).list_by_task(task_id)?))
    }

    pub fn get_event(&self, id: EventId) -> Result<Option<CalendarEvent>> {
        self.db.read(|conn| Ok(EventStore::new(conn).get(id)?))
    }

    /// Add an event as given. No cascade runs for event writes.
    ///
    /// # Errors
    /// Returns a validation error when `end` precedes `start`.
    pub fn create_event(&self, fields: EventFields) -> Result<CalendarEvent> {
        fields.validate()?;
        self.db.write(|tx| {
            let store = EventStore::new(tx);
            let id = store.create(&fields)?;
            store.get(id)?.ok_or_else(|| vanished("event", id))
        })
    }

    /// Overwrite an event. Returns `None` when no event has this id.
    pub fn update_event(&self, id: EventId, fields: EventFields) -> Result<Option<CalendarEvent>> {
        fields.validate()?;
        self.db.write(|tx| {
            let store = EventStore::new(tx);
            if store.update(id, &fields)? == 0 {
                return Ok(None);
            }
            Ok(store.get(id)?)
        })
    }

    /// Returns whether an event was removed.
    pub fn delete_event(&self, id: EventId) -> Result<bool> {
        self.db
            .write(|tx| Ok(EventStore::new(tx).delete_by_id(id)? > 0))
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Repair every task/event mismatch in one pass.
    pub fn reconcile(&self) -> Result<ReconcileReport> {
        self.db.write(|tx| Ok(self.sync.reconcile(tx)?))
    }

    /// The repairs [`Board::reconcile`] would apply right now, without
    /// applying them.
    pub fn plan_reconcile(&self) -> Result<Vec<Repair>> {
        self.db.read(|conn| Ok(self.sync.plan(conn)?.repairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{DueDate, Priority};

    #[test]
    fn create_with_due_date_derives_one_event() {
        let board = Board::open_memory().unwrap();
        let task = board
            .create_task(TaskInput::new("File taxes").due("2024-05-01").priority("High"))
            .unwrap();
        assert_eq!(task.priority, Priority::High);

        let events = board.events_for_task(task.id).unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].due_flag);
        assert_eq!(events[0].title, "File taxes");
    }

    #[test]
    fn blank_title_writes_nothing() {
        let board = Board::open_memory().unwrap();
        let err = board.create_task(TaskInput::new("  ").due("2024-05-01")).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(board.list_tasks().unwrap().is_empty());
        assert!(board.list_events().unwrap().is_empty());
    }

    #[test]
    fn update_missing_task_returns_none_without_cascade() {
        let board = Board::open_memory().unwrap();
        assert!(board.update_task(42, TaskInput::new("ghost").due("2024-05-01")).unwrap().is_none());
        assert!(board.list_events().unwrap().is_empty());
    }

    #[test]
    fn status_and_time_updates_do_not_cascade() {
        let board = Board::open_memory().unwrap();
        let task = board.create_task(TaskInput::new("Read").due("2024-05-01")).unwrap();
        let before = board.events_for_task(task.id).unwrap();

        assert!(board.update_task_status(task.id, TaskStatus::Done).unwrap());
        assert!(board.update_time_spent(task.id, 900).unwrap());
        assert!(!board.update_task_status(task.id + 1, TaskStatus::Done).unwrap());

        assert_eq!(board.events_for_task(task.id).unwrap(), before);
        let task = board.get_task(task.id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.time_spent, 900);
        assert_eq!(task.due_date, DueDate::parse("2024-05-01"));
    }

    #[test]
    fn inverted_event_is_rejected() {
        let board = Board::open_memory().unwrap();
        let start = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let fields = EventFields::manual("Backwards", start, start - chrono::Duration::minutes(5));
        assert!(matches!(board.create_event(fields), Err(CoreError::Validation(_))));
    }

    #[test]
    fn plan_reconcile_is_read_only() {
        let board = Board::open_memory().unwrap();
        board
            .database()
            .write(|tx| {
                tx.execute(
                    "INSERT INTO tasks (title, status, priority, due_date) VALUES ('raw', 'To Do', 'Low', '2024-05-01')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        assert_eq!(board.plan_reconcile().unwrap().len(), 1);
        assert_eq!(board.plan_reconcile().unwrap().len(), 1);
        assert!(board.list_events().unwrap().is_empty());
    }
}
