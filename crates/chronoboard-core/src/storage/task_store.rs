//! Task table access.
//!
//! A [`TaskStore`] borrows a connection (or a transaction, through deref) so
//! the same statements serve plain reads and cascading writes.

use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::task::{DueDate, Priority, ProjectId, Task, TaskFields, TaskId, TaskStatus};

const TASK_COLUMNS: &str = "id, title, description, status, priority, due_date, time_spent, project_id";

fn row_to_task(row: &Row) -> Result<Task, rusqlite::Error> {
    let priority: Option<String> = row.get(4)?;
    let status: Option<String> = row.get(3)?;
    let due_date: Option<String> = row.get(5)?;
    let time_spent: Option<i64> = row.get(6)?;

    Ok(Task {
        id: row.get(0)?,
        title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        status: TaskStatus::normalize(status.as_deref()),
        priority: Priority::normalize(priority.as_deref()),
        due_date: due_date.as_deref().and_then(DueDate::parse),
        time_spent: time_spent.map_or(0, |secs| u64::try_from(secs).unwrap_or(0)),
        project_id: row.get(7)?,
    })
}

/// Row-level operations on `tasks`.
pub struct TaskStore<'c> {
    conn: &'c Connection,
}

impl<'c> TaskStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert a task and return its new id.
    pub fn create(&self, fields: &TaskFields) -> Result<TaskId, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO tasks (title, description, status, priority, due_date, time_spent, project_id)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![
                fields.title,
                fields.description,
                fields.status.as_str(),
                fields.priority.as_str(),
                DueDate::column_value(fields.due_date.as_ref()),
                fields.project_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get(&self, id: TaskId) -> Result<Option<Task>, rusqlite::Error> {
        self.conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                [id],
                row_to_task,
            )
            .optional()
    }

    /// All tasks, oldest first.
    pub fn list(&self) -> Result<Vec<Task>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id"))?;
        let tasks = stmt.query_map([], row_to_task)?.collect();
        tasks
    }

    /// Tasks carrying a usable due date.
    ///
    /// Rows holding the sentinel, NULL, or text that does not parse as a date
    /// are left out.
    pub fn list_with_due_date(&self) -> Result<Vec<Task>, rusqlite::Error> {
        Ok(self
            .list()?
            .into_iter()
            .filter(Task::has_due_date)
            .collect())
    }

    pub fn list_by_project(&self, project_id: ProjectId) -> Result<Vec<Task>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ?1 ORDER BY id"
        ))?;
        let tasks = stmt.query_map([project_id], row_to_task)?.collect();
        tasks
    }

    /// Ids of every existing task.
    pub fn ids(&self) -> Result<HashSet<TaskId>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT id FROM tasks")?;
        let ids = stmt.query_map([], |row| row.get(0))?.collect();
        ids
    }

    /// Returns the number of rows changed (0 when the task does not exist).
    pub fn update_status(&self, id: TaskId, status: TaskStatus) -> Result<usize, rusqlite::Error> {
        self.conn.execute(
            "UPDATE tasks SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )
    }

    pub fn update_time_spent(&self, id: TaskId, seconds: u64) -> Result<usize, rusqlite::Error> {
        let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        self.conn.execute(
            "UPDATE tasks SET time_spent = ?1 WHERE id = ?2",
            params![seconds, id],
        )
    }

    /// Overwrite every writable field.
    pub fn update_full(&self, id: TaskId, fields: &TaskFields) -> Result<usize, rusqlite::Error> {
        self.conn.execute(
            "UPDATE tasks
             SET title = ?1, description = ?2, status = ?3, priority = ?4, due_date = ?5, project_id = ?6
             WHERE id = ?7",
            params![
                fields.title,
                fields.description,
                fields.status.as_str(),
                fields.priority.as_str(),
                DueDate::column_value(fields.due_date.as_ref()),
                fields.project_id,
                id,
            ],
        )
    }

    pub fn delete(&self, id: TaskId) -> Result<usize, rusqlite::Error> {
        self.conn.execute("DELETE FROM tasks WHERE id = ?1", [id])
    }
}
