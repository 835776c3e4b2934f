//! Async access to a [`Board`].
//!
//! SQLite calls block, so every operation is moved onto tokio's blocking
//! pool. Callers sequence dependent writes with `.await`; independent ones
//! may run concurrently and are serialized by the database itself.

use std::sync::Arc;

use crate::board::Board;
use crate::calendar::{CalendarEvent, EventFields, EventId};
use crate::error::Result;
use crate::sync::{ReconcileReport, TaskDeletion};
use crate::task::{Task, TaskId, TaskInput, TaskStatus};

/// Cheaply cloneable async handle to a shared [`Board`].
#[derive(Debug, Clone)]
pub struct AsyncBoard {
    inner: Arc<Board>,
}

impl From<Board> for AsyncBoard {
    fn from(board: Board) -> Self {
        Self::new(board)
    }
}

impl AsyncBoard {
    pub fn new(board: Board) -> Self {
        Self {
            inner: Arc::new(board),
        }
    }

    pub fn board(&self) -> &Board {
        &self.inner
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Board) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let board = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&board)).await?
    }

    pub async fn create_task(&self, input: TaskInput) -> Result<Task> {
        self.run(move |b| b.create_task(input)).await
    }

    pub async fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
        self.run(move |b| b.get_task(id)).await
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.run(Board::list_tasks).await
    }

    pub async fn update_task(&self, id: TaskId, input: TaskInput) -> Result<Option<Task>> {
        self.run(move |b| b.update_task(id, input)).await
    }

    pub async fn update_task_status(&self, id: TaskId, status: TaskStatus) -> Result<bool> {
        self.run(move |b| b.update_task_status(id, status)).await
    }

    pub async fn update_time_spent(&self, id: TaskId, seconds: u64) -> Result<bool> {
        self.run(move |b| b.update_time_spent(id, seconds)).await
    }

    pub async fn delete_task(&self, id: TaskId) -> Result<TaskDeletion> {
        self.run(move |b| b.delete_task(id)).await
    }

    pub async fn list_events(&self) -> Result<Vec<CalendarEvent>> {
        self.run(Board::list_events).await
    }

    pub async fn events_for_task(&self, task_id: TaskId) -> Result<Vec<CalendarEvent>> {
        self.run(move |b| b.events_for_task(task_id)).await
    }

    pub async fn create_event(&self, fields: EventFields) -> Result<CalendarEvent> {
        self.run(move |b| b.create_event(fields)).await
    }

    pub async fn update_event(&self, id: EventId, fields: EventFields) -> Result<Option<CalendarEvent>> {
        self.run(move |b| b.update_event(id, fields)).await
    }

    pub async fn delete_event(&self, id: EventId) -> Result<bool> {
        self.run(move |b| b.delete_event(id)).await
    }

    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        self.run(Board::reconcile).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn awaited_writes_apply_in_order() {
        let board = AsyncBoard::new(Board::open_memory().unwrap());
        let task = board.create_task(TaskInput::new("Async").due("2024-05-01")).await.unwrap();
        board
            .update_task(task.id, TaskInput::new("Async").due("2024-05-09"))
            .await
            .unwrap();

        let events = board.events_for_task(task.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start.date(), chrono::NaiveDate::from_ymd_opt(2024, 5, 9).unwrap());

        assert!(board.reconcile().await.unwrap().is_clean());
    }
}
