//! Task types for the kanban board.
//!
//! A [`Task`] is a work item with a status column, a priority and an optional
//! due date. Caller input arrives as a loosely typed [`TaskInput`] and is
//! normalized into [`TaskFields`] before it reaches the store: unknown
//! priorities fall back to `Medium`, unknown statuses to `To Do`, and
//! malformed due dates are dropped.

mod due_date;

pub use due_date::{parse_date_time, DueDate, NO_DUE_DATE};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Store-assigned task identifier.
pub type TaskId = i64;

/// Identifier of the project a task belongs to.
pub type ProjectId = i64;

/// Kanban column of a task.
///
/// No ordering between the columns is enforced; a task may move freely.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "To Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Done")]
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::ToDo, TaskStatus::InProgress, TaskStatus::Done];

    /// Column label as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }

    /// Parse a column label, defaulting to `To Do` for anything unknown.
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("In Progress") => TaskStatus::InProgress,
            Some("Done") => TaskStatus::Done,
            Some("To Do") | None | Some("") => TaskStatus::ToDo,
            Some(other) => {
                tracing::warn!(status = other, "unknown task status, using 'To Do'");
                TaskStatus::ToDo
            }
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Map raw input onto the allowed set.
    ///
    /// Matching is exact; anything else, including a missing value, is `Medium`.
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw {
            Some("High") => Priority::High,
            Some("Low") => Priority::Low,
            Some("Medium") | None => Priority::Medium,
            Some(other) => {
                tracing::warn!(priority = other, "priority outside allowed set, using 'Medium'");
                Priority::Medium
            }
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<DueDate>,
    /// Seconds of tracked work.
    pub time_spent: u64,
    pub project_id: Option<ProjectId>,
}

impl Task {
    pub fn has_due_date(&self) -> bool {
        self.due_date.is_some()
    }

    /// The writable fields of this task, e.g. as a base for a full update.
    pub fn fields(&self) -> TaskFields {
        TaskFields {
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status,
            priority: self.priority,
            due_date: self.due_date,
            project_id: self.project_id,
        }
    }
}

/// Normalized, writable task fields.
///
/// `time_spent` is deliberately absent: it has its own narrow update path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<DueDate>,
    pub project_id: Option<ProjectId>,
}

impl TaskFields {
    /// Fields for a task with only a title; everything else takes its default.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: TaskStatus::default(),
            priority: Priority::default(),
            due_date: None,
            project_id: None,
        }
    }

    pub fn with_due_date(mut self, due_date: Option<DueDate>) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_project(mut self, project_id: Option<ProjectId>) -> Self {
        self.project_id = project_id;
        self
    }
}

/// Raw task input as received at the API boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
}

impl TaskInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn due(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Reject what cannot be defaulted and normalize the rest.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyField`] when the title is blank.
    pub fn normalize(self) -> Result<TaskFields, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyField("title".to_string()));
        }

        let due_date = self.due_date.as_deref().and_then(|raw| {
            let parsed = DueDate::parse(raw);
            if parsed.is_none() && !DueDate::is_absent(raw) {
                tracing::warn!(due_date = raw, "malformed due date, storing no due date");
            }
            parsed
        });

        Ok(TaskFields {
            title: title.to_string(),
            description: self.description.unwrap_or_default(),
            status: TaskStatus::normalize(self.status.as_deref()),
            priority: Priority::normalize(self.priority.as_deref()),
            due_date,
            project_id: self.project_id,
        })
    }
}

/// Input that reproduces an existing task, used as the base of a partial edit.
impl From<&Task> for TaskInput {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: Some(task.description.clone()),
            status: Some(task.status.as_str().to_string()),
            priority: Some(task.priority.as_str().to_string()),
            due_date: task.due_date.map(|d| d.to_storage()),
            project_id: task.project_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_from_task_normalizes_back_to_same_fields() {
        let task = Task {
            id: 1,
            title: "Ship".into(),
            description: "v1".into(),
            status: TaskStatus::InProgress,
            priority: Priority::Low,
            due_date: DueDate::parse("2024-05-01T09:30:00"),
            time_spent: 60,
            project_id: Some(2),
        };
        assert_eq!(TaskInput::from(&task).normalize().unwrap(), task.fields());
    }

    #[test]
    fn priority_outside_allowed_set_is_medium() {
        assert_eq!(Priority::normalize(Some("urgent")), Priority::Medium);
        assert_eq!(Priority::normalize(Some("high")), Priority::Medium);
        assert_eq!(Priority::normalize(None), Priority::Medium);
        assert_eq!(Priority::normalize(Some("High")), Priority::High);
        assert_eq!(Priority::normalize(Some("Low")), Priority::Low);
    }

    #[test]
    fn status_labels_round_trip() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::normalize(Some(status.as_str())), status);
        }
        assert_eq!(TaskStatus::normalize(Some("Blocked")), TaskStatus::ToDo);
        assert_eq!(TaskStatus::normalize(None), TaskStatus::ToDo);
    }

    #[test]
    fn status_serializes_as_column_label() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
    }

    #[test]
    fn normalize_rejects_blank_title() {
        let err = TaskInput::new("   ").normalize().unwrap_err();
        assert!(matches!(err, ValidationError::EmptyField(field) if field == "title"));
    }

    #[test]
    fn normalize_defaults_everything_else() {
        let fields = TaskInput::new(" Write report ")
            .priority("urgent")
            .status("Someday")
            .due("not a date")
            .normalize()
            .unwrap();

        assert_eq!(fields.title, "Write report");
        assert_eq!(fields.description, "");
        assert_eq!(fields.priority, Priority::Medium);
        assert_eq!(fields.status, TaskStatus::ToDo);
        assert_eq!(fields.due_date, None);
    }

    #[test]
    fn normalize_keeps_valid_due_date() {
        let fields = TaskInput::new("Ship").due("2024-05-01").normalize().unwrap();
        assert_eq!(fields.due_date, DueDate::parse("2024-05-01"));
        assert!(fields.due_date.is_some());
    }

    #[test]
    fn task_input_deserializes_with_missing_fields() {
        let input: TaskInput = serde_json::from_str(r#"{"title": "Plan sprint"}"#).unwrap();
        assert_eq!(input, TaskInput::new("Plan sprint"));
    }
}
