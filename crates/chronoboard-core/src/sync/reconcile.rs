//! Full-scan repair of the task/event invariant.
//!
//! Planning is pure: [`plan_repairs`] compares a snapshot of tasks and events
//! and lists what to change. Applying runs each repair in its own savepoint
//! so one bad row cannot sink the rest of the pass.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, Transaction};
use serde::Serialize;

use super::Synchronizer;
use crate::calendar::{CalendarEvent, DueSlot, EventFields, EventId, UnreadableEvent};
use crate::storage::{EventStore, TaskStore};
use crate::task::{Task, TaskId};

/// Category of a repair, for summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairKind {
    CreateMissing,
    DeleteStale,
    DeleteOrphan,
    DeleteDuplicate,
    DeleteUnreadable,
    Reschedule,
}

/// One change needed to restore the invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Repair {
    /// A due-dated task has no derived event.
    CreateMissing { task_id: TaskId, event: EventFields },
    /// A derived event belongs to a task that no longer has a due date.
    DeleteStale { event_id: EventId, task_id: TaskId },
    /// An event points at a task that does not exist, or a derived event
    /// points at no task at all.
    DeleteOrphan { event_id: EventId, task_id: Option<TaskId> },
    /// A task has more than one derived event; all but the oldest go.
    DeleteDuplicate { event_id: EventId, task_id: TaskId },
    /// A row with unreadable times that is derived, or whose task is gone.
    DeleteUnreadable { event_id: EventId, task_id: Option<TaskId> },
    /// A derived event's span no longer matches its task's due date.
    Reschedule {
        event_id: EventId,
        task_id: TaskId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

impl Repair {
    pub fn kind(&self) -> RepairKind {
        match self {
            Repair::CreateMissing { .. } => RepairKind::CreateMissing,
            Repair::DeleteStale { .. } => RepairKind::DeleteStale,
            Repair::DeleteOrphan { .. } => RepairKind::DeleteOrphan,
            Repair::DeleteDuplicate { .. } => RepairKind::DeleteDuplicate,
            Repair::DeleteUnreadable { .. } => RepairKind::DeleteUnreadable,
            Repair::Reschedule { .. } => RepairKind::Reschedule,
        }
    }

    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            Repair::CreateMissing { task_id, .. }
            | Repair::DeleteStale { task_id, .. }
            | Repair::DeleteDuplicate { task_id, .. }
            | Repair::Reschedule { task_id, .. } => Some(*task_id),
            Repair::DeleteOrphan { task_id, .. } | Repair::DeleteUnreadable { task_id, .. } => *task_id,
        }
    }

    fn apply(&self, conn: &Connection) -> Result<(), rusqlite::Error> {
        let events = EventStore::new(conn);
        match self {
            Repair::CreateMissing { event, .. } => {
                events.create(event)?;
            }
            Repair::DeleteStale { event_id, .. }
            | Repair::DeleteOrphan { event_id, .. }
            | Repair::DeleteDuplicate { event_id, .. }
            | Repair::DeleteUnreadable { event_id, .. } => {
                events.delete_by_id(*event_id)?;
            }
            Repair::Reschedule {
                event_id, start, end, ..
            } => {
                events.update_span(*event_id, start, end)?;
            }
        }
        Ok(())
    }
}

/// A repair that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairFailure {
    pub repair: Repair,
    pub error: String,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub applied: Vec<Repair>,
    pub failed: Vec<RepairFailure>,
    /// Manual events with unreadable times on live tasks, left in place.
    pub skipped: Vec<UnreadableEvent>,
    pub tasks_scanned: usize,
    pub events_scanned: usize,
    pub reconciled_at: DateTime<Utc>,
}

impl ReconcileReport {
    /// True when the pass found nothing to repair or set aside.
    pub fn is_clean(&self) -> bool {
        self.applied.is_empty() && self.failed.is_empty() && self.skipped.is_empty()
    }

    /// Number of rows written by this pass.
    pub fn mutation_count(&self) -> usize {
        self.applied.len()
    }

    pub fn count(&self, kind: RepairKind) -> usize {
        self.applied.iter().filter(|r| r.kind() == kind).count()
    }

    /// Human-readable one-line summary.
    pub fn message(&self) -> String {
        if self.is_clean() {
            return format!(
                "{} tasks and {} events already consistent",
                self.tasks_scanned, self.events_scanned
            );
        }
        let mut msg = format!(
            "{} repairs applied (created {}, rescheduled {}, deleted {})",
            self.applied.len(),
            self.count(RepairKind::CreateMissing),
            self.count(RepairKind::Reschedule),
            self.count(RepairKind::DeleteStale)
                + self.count(RepairKind::DeleteOrphan)
                + self.count(RepairKind::DeleteDuplicate)
                + self.count(RepairKind::DeleteUnreadable),
        );
        if !self.failed.is_empty() {
            msg.push_str(&format!(", {} failed", self.failed.len()));
        }
        if !self.skipped.is_empty() {
            msg.push_str(&format!(", {} unreadable events left alone", self.skipped.len()));
        }
        msg
    }
}

/// Compute the repairs that bring `events` in line with `tasks`.
///
/// `tasks` must be every task in the store, not only the due-dated ones;
/// anything absent from it is treated as deleted. Each derived event is built
/// from the task it belongs to.
pub fn plan_repairs(tasks: &[Task], events: &[CalendarEvent], slot: &DueSlot) -> Vec<Repair> {
    let by_id: HashMap<TaskId, &Task> = tasks.iter().map(|t| (t.id, t)).collect();

    let mut events: Vec<&CalendarEvent> = events.iter().collect();
    events.sort_by_key(|e| e.id);

    let mut repairs = Vec::new();
    let mut derived: BTreeMap<TaskId, Vec<&CalendarEvent>> = BTreeMap::new();

    for event in events {
        let task = match event.task_id {
            None if event.is_derived() => {
                repairs.push(Repair::DeleteOrphan {
                    event_id: event.id,
                    task_id: None,
                });
                continue;
            }
            None => continue,
            Some(task_id) => match by_id.get(&task_id) {
                Some(task) => *task,
                None => {
                    repairs.push(Repair::DeleteOrphan {
                        event_id: event.id,
                        task_id: Some(task_id),
                    });
                    continue;
                }
            },
        };

        if !event.is_derived() {
            continue;
        }
        if task.has_due_date() {
            derived.entry(task.id).or_default().push(event);
        } else {
            repairs.push(Repair::DeleteStale {
                event_id: event.id,
                task_id: task.id,
            });
        }
    }

    let mut due_tasks: Vec<&Task> = tasks.iter().filter(|t| t.has_due_date()).collect();
    due_tasks.sort_by_key(|t| t.id);

    for task in due_tasks {
        let Some(due_date) = task.due_date.as_ref() else {
            continue;
        };
        let Some((kept, extra)) = derived.get(&task.id).and_then(|evs| evs.split_first()) else {
            repairs.push(Repair::CreateMissing {
                task_id: task.id,
                event: slot.derived_event(task.id, &task.title, due_date),
            });
            continue;
        };

        for duplicate in extra {
            repairs.push(Repair::DeleteDuplicate {
                event_id: duplicate.id,
                task_id: task.id,
            });
        }
        if !slot.matches(kept, due_date) {
            let (start, end) = slot.span(due_date);
            repairs.push(Repair::Reschedule {
                event_id: kept.id,
                task_id: task.id,
                start,
                end,
            });
        }
    }

    repairs
}

/// Sort unreadable rows into deletions and rows to leave alone.
///
/// Derived rows are rebuilt from their task by the regular plan, so they go.
/// So do rows whose task no longer exists. A manual event on a live task or
/// on no task is user data and is only reported.
pub fn plan_unreadable(tasks: &[Task], rows: &[UnreadableEvent]) -> (Vec<Repair>, Vec<UnreadableEvent>) {
    let live: HashSet<TaskId> = tasks.iter().map(|t| t.id).collect();
    let mut rows: Vec<&UnreadableEvent> = rows.iter().collect();
    rows.sort_by_key(|r| r.id);

    let mut repairs = Vec::new();
    let mut skipped = Vec::new();
    for row in rows {
        let orphaned = row.task_id.is_some_and(|id| !live.contains(&id));
        if row.due_flag || orphaned {
            repairs.push(Repair::DeleteUnreadable {
                event_id: row.id,
                task_id: row.task_id,
            });
        } else {
            skipped.push(row.clone());
        }
    }
    (repairs, skipped)
}

/// Everything one pass would do, computed from a single snapshot.
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    pub repairs: Vec<Repair>,
    pub skipped: Vec<UnreadableEvent>,
    pub tasks_scanned: usize,
    pub events_scanned: usize,
}

fn apply_in_savepoint(tx: &mut Transaction<'_>, repair: &Repair) -> Result<(), rusqlite::Error> {
    let sp = tx.savepoint()?;
    repair.apply(&sp)?;
    sp.commit()
}

impl Synchronizer {
    /// Read a snapshot and plan the pass without writing anything.
    /// Unreadable rows are planned first so their deletions precede the
    /// recreation of the events they stood for.
    pub fn plan(&self, conn: &Connection) -> Result<ReconcilePlan, rusqlite::Error> {
        let tasks = TaskStore::new(conn).list()?;
        let scan = EventStore::new(conn).scan()?;
        let (mut repairs, skipped) = plan_unreadable(&tasks, &scan.unreadable);
        repairs.extend(plan_repairs(&tasks, &scan.events, &self.slot));
        Ok(ReconcilePlan {
            repairs,
            skipped,
            tasks_scanned: tasks.len(),
            events_scanned: scan.events.len() + scan.unreadable.len(),
        })
    }

    /// Scan every task and event and repair the invariant.
    ///
    /// Runs inside the caller's transaction. A repair that fails is rolled
    /// back on its own and reported in [`ReconcileReport::failed`]; only a
    /// failure to read the snapshot aborts the pass.
    pub fn reconcile(&self, tx: &mut Transaction<'_>) -> Result<ReconcileReport, rusqlite::Error> {
        let ReconcilePlan {
            repairs,
            skipped,
            tasks_scanned,
            events_scanned,
        } = self.plan(tx)?;
        for row in &skipped {
            tracing::warn!(event_id = row.id, task_id = ?row.task_id, start = %row.start, "manual event has unreadable times");
        }

        let mut applied = Vec::with_capacity(repairs.len());
        let mut failed = Vec::new();
        for repair in repairs {
            match apply_in_savepoint(tx, &repair) {
                Ok(()) => {
                    tracing::debug!(kind = ?repair.kind(), task_id = ?repair.task_id(), "applied repair");
                    applied.push(repair);
                }
                Err(e) => {
                    tracing::warn!(
                        kind = ?repair.kind(),
                        task_id = ?repair.task_id(),
                        error = %e,
                        "repair failed"
                    );
                    failed.push(RepairFailure {
                        repair,
                        error: e.to_string(),
                    });
                }
            }
        }

        let report = ReconcileReport {
            applied,
            failed,
            skipped,
            tasks_scanned,
            events_scanned,
            reconciled_at: Utc::now(),
        };
        tracing::info!(
            applied = report.applied.len(),
            failed = report.failed.len(),
            tasks = report.tasks_scanned,
            events = report.events_scanned,
            "reconciliation finished"
        );
        Ok(report)
    }
}

/// Task ids whose derived-event count differs from what their due date
/// requires. Empty when the invariant holds.
pub fn invariant_violations(tasks: &[Task], events: &[CalendarEvent]) -> HashSet<TaskId> {
    let mut counts: HashMap<TaskId, usize> = HashMap::new();
    for event in events.iter().filter(|e| e.is_derived()) {
        if let Some(task_id) = event.task_id {
            *counts.entry(task_id).or_default() += 1;
        }
    }
    tasks
        .iter()
        .filter(|t| {
            let expected = usize::from(t.has_due_date());
            counts.get(&t.id).copied().unwrap_or(0) != expected
        })
        .map(|t| t.id)
        .collect()
}
