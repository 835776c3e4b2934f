//! Calendar event table access.

use chrono::NaiveDateTime;
use rusqlite::{params, types::Type, types::ValueRef, Connection, OptionalExtension, Row};

use crate::calendar::{parse_event_time, CalendarEvent, EventFields, EventId, UnreadableEvent, EVENT_TIME_FORMAT};
use crate::task::TaskId;

const EVENT_COLUMNS: &str = "id, task_id, title, \"start\", \"end\", all_day, due_flag";

fn format_event_time(at: &NaiveDateTime) -> String {
    at.format(EVENT_TIME_FORMAT).to_string()
}

/// Column text as written, or a debug rendering for non-text values.
fn raw_text(row: &Row, idx: usize) -> Result<String, rusqlite::Error> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        other => format!("{other:?}"),
    })
}

/// Readable and unreadable rows of one full scan.
#[derive(Debug, Default)]
pub struct EventScan {
    pub events: Vec<CalendarEvent>,
    pub unreadable: Vec<UnreadableEvent>,
}

enum ScannedRow {
    Event(CalendarEvent),
    Unreadable(UnreadableEvent),
}

fn scan_row(row: &Row) -> Result<ScannedRow, rusqlite::Error> {
    let id: EventId = row.get(0)?;
    let task_id: Option<TaskId> = row.get(1)?;
    let due_flag: bool = row.get(6)?;
    let start = raw_text(row, 3)?;
    let end = raw_text(row, 4)?;

    let (Ok(start_at), Ok(end_at)) = (parse_event_time(&start), parse_event_time(&end)) else {
        return Ok(ScannedRow::Unreadable(UnreadableEvent {
            id,
            task_id,
            due_flag,
            start,
            end,
        }));
    };
    Ok(ScannedRow::Event(CalendarEvent {
        id,
        task_id,
        title: row.get(2)?,
        start: start_at,
        end: end_at,
        all_day: row.get(5)?,
        due_flag,
    }))
}

fn row_to_event(row: &Row) -> Result<CalendarEvent, rusqlite::Error> {
    match scan_row(row)? {
        ScannedRow::Event(event) => Ok(event),
        ScannedRow::Unreadable(bad) => Err(rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("event {} has unreadable times '{}'..'{}'", bad.id, bad.start, bad.end).into(),
        )),
    }
}

fn sort_by_start(events: &mut [CalendarEvent]) {
    events.sort_by_key(|e| (e.start, e.id));
}

/// Row-level operations on `calendar_events`.
pub struct EventStore<'c> {
    conn: &'c Connection,
}

impl<'c> EventStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, fields: &EventFields) -> Result<EventId, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO calendar_events (task_id, title, \"start\", \"end\", all_day, due_flag)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                fields.task_id,
                fields.title,
                format_event_time(&fields.start),
                format_event_time(&fields.end),
                fields.all_day,
                fields.due_flag,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get(&self, id: EventId) -> Result<Option<CalendarEvent>, rusqlite::Error> {
        self.conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM calendar_events WHERE id = ?1"),
                [id],
                row_to_event,
            )
            .optional()
    }

    /// Read every row, setting aside those whose times do not parse.
    pub fn scan(&self) -> Result<EventScan, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {EVENT_COLUMNS} FROM calendar_events ORDER BY id"))?;
        let mut scan = EventScan::default();
        for row in stmt.query_map([], scan_row)? {
            match row? {
                ScannedRow::Event(event) => scan.events.push(event),
                ScannedRow::Unreadable(bad) => scan.unreadable.push(bad),
            }
        }
        sort_by_start(&mut scan.events);
        Ok(scan)
    }

    /// All readable events ordered by start, then id.
    pub fn list(&self) -> Result<Vec<CalendarEvent>, rusqlite::Error> {
        let scan = self.scan()?;
        for bad in &scan.unreadable {
            tracing::warn!(event_id = bad.id, start = %bad.start, end = %bad.end, "skipping unreadable event");
        }
        Ok(scan.events)
    }

    /// Events pointing at one task, manual and derived, lowest id first.
    /// Rows with unreadable times are left out.
    pub fn list_by_task(&self, task_id: TaskId) -> Result<Vec<CalendarEvent>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM calendar_events WHERE task_id = ?1 ORDER BY id"
        ))?;
        let mut events = Vec::new();
        for row in stmt.query_map([task_id], scan_row)? {
            match row? {
                ScannedRow::Event(event) => events.push(event),
                ScannedRow::Unreadable(bad) => {
                    tracing::warn!(event_id = bad.id, task_id, "skipping unreadable event");
                }
            }
        }
        Ok(events)
    }

    /// Overwrite every field of an event.
    pub fn update(&self, id: EventId, fields: &EventFields) -> Result<usize, rusqlite::Error> {
        self.conn.execute(
            "UPDATE calendar_events
             SET task_id = ?1, title = ?2, \"start\" = ?3, \"end\" = ?4, all_day = ?5, due_flag = ?6
             WHERE id = ?7",
            params![
                fields.task_id,
                fields.title,
                format_event_time(&fields.start),
                format_event_time(&fields.end),
                fields.all_day,
                fields.due_flag,
                id,
            ],
        )
    }

    /// Move an event without touching its other fields.
    pub fn update_span(
        &self,
        id: EventId,
        start: &NaiveDateTime,
        end: &NaiveDateTime,
    ) -> Result<usize, rusqlite::Error> {
        self.conn.execute(
            "UPDATE calendar_events SET \"start\" = ?1, \"end\" = ?2 WHERE id = ?3",
            params![format_event_time(start), format_event_time(end), id],
        )
    }

    pub fn delete_by_id(&self, id: EventId) -> Result<usize, rusqlite::Error> {
        self.conn
            .execute("DELETE FROM calendar_events WHERE id = ?1", [id])
    }

    /// Remove every event of a task, manual ones included.
    pub fn delete_by_task_id(&self, task_id: TaskId) -> Result<usize, rusqlite::Error> {
        self.conn
            .execute("DELETE FROM calendar_events WHERE task_id = ?1", [task_id])
    }

    /// Remove only the events derived from a task's due date.
    pub fn delete_derived_by_task_id(&self, task_id: TaskId) -> Result<usize, rusqlite::Error> {
        self.conn.execute(
            "DELETE FROM calendar_events WHERE task_id = ?1 AND due_flag = 1",
            [task_id],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, EVENT_TIME_FORMAT).unwrap()
    }

    fn derived(task_id: TaskId) -> EventFields {
        EventFields {
            task_id: Some(task_id),
            title: "due".into(),
            start: at("2024-05-01T07:00:00"),
            end: at("2024-05-01T07:30:00"),
            all_day: false,
            due_flag: true,
        }
    }

    #[test]
    fn create_then_get() {
        let db = Database::open_memory().unwrap();
        db.read(|conn| {
            let store = EventStore::new(conn);
            let id = store.create(&derived(7)).unwrap();
            let event = store.get(id).unwrap().unwrap();
            assert_eq!(event.fields(), derived(7));
            assert!(event.is_derived());
            assert!(store.get(id + 100).unwrap().is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn delete_derived_keeps_manual_events() {
        let db = Database::open_memory().unwrap();
        db.read(|conn| {
            let store = EventStore::new(conn);
            store.create(&derived(7)).unwrap();
            let manual = EventFields::manual("prep", at("2024-05-01T09:00:00"), at("2024-05-01T10:00:00")).for_task(7);
            let manual_id = store.create(&manual).unwrap();

            assert_eq!(store.delete_derived_by_task_id(7).unwrap(), 1);
            let left = store.list_by_task(7).unwrap();
            assert_eq!(left.len(), 1);
            assert_eq!(left[0].id, manual_id);

            assert_eq!(store.delete_by_task_id(7).unwrap(), 1);
            assert!(store.list_by_task(7).unwrap().is_empty());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn update_span_moves_event_only() {
        let db = Database::open_memory().unwrap();
        db.read(|conn| {
            let store = EventStore::new(conn);
            let id = store.create(&derived(1)).unwrap();
            let changed = store
                .update_span(id, &at("2024-06-01T12:00:00"), &at("2024-06-01T12:00:00"))
                .unwrap();
            assert_eq!(changed, 1);

            let event = store.get(id).unwrap().unwrap();
            assert_eq!(event.start, at("2024-06-01T12:00:00"));
            assert_eq!(event.title, "due");
            assert_eq!(event.task_id, Some(1));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn list_orders_by_start() {
        let db = Database::open_memory().unwrap();
        db.read(|conn| {
            let store = EventStore::new(conn);
            store
                .create(&EventFields::manual("late", at("2024-05-02T09:00:00"), at("2024-05-02T10:00:00")))
                .unwrap();
            store
                .create(&EventFields::manual("early", at("2024-05-01T09:00:00"), at("2024-05-01T10:00:00")))
                .unwrap();
            let titles: Vec<String> = store.list().unwrap().into_iter().map(|e| e.title).collect();
            assert_eq!(titles, vec!["early", "late"]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn loose_time_spellings_are_read() {
        let db = Database::open_memory().unwrap();
        db.read(|conn| {
            conn.execute(
                "INSERT INTO calendar_events (task_id, title, \"start\", \"end\") VALUES (NULL, 'x', '2024-05-01 07:00', '2024-05-01T07:30')",
                [],
            )?;
            let events = EventStore::new(conn).list().unwrap();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].start, at("2024-05-01T07:00:00"));
            assert_eq!(events[0].end, at("2024-05-01T07:30:00"));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn unparsable_rows_are_set_aside() {
        let db = Database::open_memory().unwrap();
        db.read(|conn| {
            let store = EventStore::new(conn);
            let good = store.create(&derived(3)).unwrap();
            conn.execute(
                "INSERT INTO calendar_events (task_id, title, \"start\", \"end\", due_flag) VALUES (3, 'x', 'noon', 'later', 1)",
                [],
            )?;
            let bad = conn.last_insert_rowid();

            let scan = store.scan().unwrap();
            assert_eq!(scan.events.len(), 1);
            assert_eq!(scan.events[0].id, good);
            assert_eq!(
                scan.unreadable,
                vec![UnreadableEvent {
                    id: bad,
                    task_id: Some(3),
                    due_flag: true,
                    start: "noon".into(),
                    end: "later".into(),
                }]
            );

            assert_eq!(store.list().unwrap().len(), 1);
            assert_eq!(store.list_by_task(3).unwrap().len(), 1);
            let err = store.get(bad).unwrap_err();
            assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(3, Type::Text, _)));
            Ok(())
        })
        .unwrap();
    }
}
