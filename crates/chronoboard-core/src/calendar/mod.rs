//! Calendar events and the due-date slot rule.
//!
//! Events are either entered by hand or derived from a task's due date
//! (`due_flag`). Derived events are owned by the synchronizer; their span is
//! computed by [`DueSlot`].

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::task::{parse_date_time, DueDate, TaskId};

/// Store-assigned event identifier.
pub type EventId = i64;

/// Text format of `start` / `end` in the database.
pub const EVENT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Default start of the slot for day-only due dates.
pub const DEFAULT_SLOT_START: (u32, u32) = (7, 0);

/// Default slot length in minutes.
pub const DEFAULT_SLOT_MINUTES: i64 = 30;

/// Read an event time typed by a user or left in the table by another
/// writer. Seconds are optional and a space may replace the `T`.
pub fn parse_event_time(raw: &str) -> Result<NaiveDateTime, ValidationError> {
    parse_date_time(raw).ok_or_else(|| ValidationError::InvalidValue {
        field: "event time".to_string(),
        message: format!("'{}' is not YYYY-MM-DDTHH:MM[:SS]", raw.trim()),
    })
}

/// A `calendar_events` row whose `start` or `end` text is not a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnreadableEvent {
    pub id: EventId,
    pub task_id: Option<TaskId>,
    pub due_flag: bool,
    pub start: String,
    pub end: String,
}

/// A persisted calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: EventId,
    /// Owning task, if any. A lookup key only; nothing enforces it exists.
    pub task_id: Option<TaskId>,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub all_day: bool,
    /// Set on events derived from a task's due date.
    pub due_flag: bool,
}

impl CalendarEvent {
    pub fn is_derived(&self) -> bool {
        self.due_flag
    }

    pub fn fields(&self) -> EventFields {
        EventFields {
            task_id: self.task_id,
            title: self.title.clone(),
            start: self.start,
            end: self.end,
            all_day: self.all_day,
            due_flag: self.due_flag,
        }
    }
}

/// Writable event fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFields {
    #[serde(default)]
    pub task_id: Option<TaskId>,
    #[serde(default)]
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub due_flag: bool,
}

impl EventFields {
    /// A manual, freestanding event.
    pub fn manual(title: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            task_id: None,
            title: title.into(),
            start,
            end,
            all_day: false,
            due_flag: false,
        }
    }

    pub fn for_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn all_day(mut self, all_day: bool) -> Self {
        self.all_day = all_day;
        self
    }

    /// Check the span is not inverted.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidTimeRange`] when `end < start`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.end < self.start {
            return Err(ValidationError::InvalidTimeRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// Scheduling rule turning a due date into an event span.
///
/// A due date with a time of day is used verbatim for both ends. A day-only
/// due date gets a fixed slot starting at `start_time` and lasting `length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueSlot {
    start_time: NaiveTime,
    length: Duration,
}

impl Default for DueSlot {
    fn default() -> Self {
        let (hour, minute) = DEFAULT_SLOT_START;
        Self {
            start_time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN),
            length: Duration::minutes(DEFAULT_SLOT_MINUTES),
        }
    }
}

impl DueSlot {
    pub fn new(start_time: NaiveTime, length_minutes: u32) -> Self {
        Self {
            start_time,
            length: Duration::minutes(i64::from(length_minutes)),
        }
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn length(&self) -> Duration {
        self.length
    }

    /// Compute `(start, end)` for a due date.
    pub fn span(&self, due_date: &DueDate) -> (NaiveDateTime, NaiveDateTime) {
        match due_date {
            DueDate::DateTime(at) => (*at, *at),
            DueDate::Date(day) => {
                let start = day.and_time(self.start_time);
                (start, start + self.length)
            }
        }
    }

    /// The derived event a task with this due date should own.
    pub fn derived_event(&self, task_id: TaskId, title: &str, due_date: &DueDate) -> EventFields {
        let (start, end) = self.span(due_date);
        EventFields {
            task_id: Some(task_id),
            title: title.to_string(),
            start,
            end,
            all_day: false,
            due_flag: true,
        }
    }

    /// Whether an event already has the span this rule assigns to `due_date`.
    pub fn matches(&self, event: &CalendarEvent, due_date: &DueDate) -> bool {
        let (start, end) = self.span(due_date);
        event.start == start && event.end == end
    }
}
