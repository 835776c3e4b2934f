//! Calendar event commands for CLI.

use chrono::NaiveDateTime;
use chronoboard_core::calendar::parse_event_time as parse_time;
use chronoboard_core::EventFields;
use clap::Subcommand;

use super::{open_board, print_json};

#[derive(Subcommand)]
pub enum EventAction {
    /// Create a calendar event
    Create {
        /// Event title
        title: String,
        /// Start time, YYYY-MM-DDTHH:MM[:SS]
        #[arg(long, value_parser = parse_time)]
        start: NaiveDateTime,
        /// End time (default: same as start)
        #[arg(long, value_parser = parse_time)]
        end: Option<NaiveDateTime>,
        /// Task the event belongs to
        #[arg(long)]
        task_id: Option<i64>,
        /// Mark as an all-day event
        #[arg(long)]
        all_day: bool,
    },
    /// List calendar events
    List {
        /// Only events of this task
        #[arg(long)]
        task_id: Option<i64>,
    },
    /// Update an event; omitted fields keep their current value
    Update {
        /// Event ID
        id: i64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New start time
        #[arg(long, value_parser = parse_time)]
        start: Option<NaiveDateTime>,
        /// New end time
        #[arg(long, value_parser = parse_time)]
        end: Option<NaiveDateTime>,
        /// Attach to a task
        #[arg(long, conflicts_with = "detach")]
        task_id: Option<i64>,
        /// Detach from its task
        #[arg(long)]
        detach: bool,
        /// Set or clear the all-day flag
        #[arg(long)]
        all_day: Option<bool>,
    },
    /// Delete an event
    Delete {
        /// Event ID
        id: i64,
    },
}

pub fn run(action: EventAction) -> Result<(), Box<dyn std::error::Error>> {
    let board = open_board()?;

    match action {
        EventAction::Create {
            title,
            start,
            end,
            task_id,
            all_day,
        } => {
            let mut fields = EventFields::manual(title, start, end.unwrap_or(start)).all_day(all_day);
            fields.task_id = task_id;
            let event = board.create_event(fields)?;
            print_json(&event)?;
        }
        EventAction::List { task_id } => {
            let events = match task_id {
                Some(id) => board.events_for_task(id)?,
                None => board.list_events()?,
            };
            print_json(&events)?;
        }
        EventAction::Update {
            id,
            title,
            start,
            end,
            task_id,
            detach,
            all_day,
        } => {
            let current = board.get_event(id)?.ok_or(format!("event not found: {id}"))?;
            let mut fields = current.fields();

            if let Some(t) = title { fields.title = t; }
            if let Some(s) = start { fields.start = s; }
            if let Some(e) = end { fields.end = e; }
            if let Some(t) = task_id { fields.task_id = Some(t); }
            if detach { fields.task_id = None; }
            if let Some(a) = all_day { fields.all_day = a; }

            let event = board
                .update_event(id, fields)?
                .ok_or(format!("event not found: {id}"))?;
            print_json(&event)?;
        }
        EventAction::Delete { id } => {
            if !board.delete_event(id)? {
                return Err(format!("event not found: {id}").into());
            }
            println!("Event deleted: {id}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronoboard_core::calendar::EVENT_TIME_FORMAT;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        action: EventAction,
    }

    #[test]
    fn start_accepts_minute_precision() {
        let parsed = Harness::try_parse_from(["x", "create", "Dentist", "--start", "2024-05-01 09:30"]).unwrap();
        let EventAction::Create { start, end, .. } = parsed.action else {
            panic!("expected create");
        };
        assert_eq!(start.format(EVENT_TIME_FORMAT).to_string(), "2024-05-01T09:30:00");
        assert!(end.is_none());
    }

    #[test]
    fn bad_time_names_the_accepted_shape() {
        let err = Harness::try_parse_from(["x", "create", "Dentist", "--start", "tomorrow"])
            .err()
            .expect("parse should fail");
        assert!(err.to_string().contains("YYYY-MM-DDTHH:MM[:SS]"));
    }
}
