//! `chronoboard-cli task ...`: board rows and their due-date cascades.

use clap::{Subcommand, ValueEnum};
use chronoboard_core::{TaskInput, TaskStatus};

use super::{open_board, print_json};

/// Board column as typed on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Todo,
    InProgress,
    Done,
}

impl From<StatusArg> for TaskStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Todo => TaskStatus::ToDo,
            StatusArg::InProgress => TaskStatus::InProgress,
            StatusArg::Done => TaskStatus::Done,
        }
    }
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task; a due date also books a calendar event
    Create {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Priority: High, Medium or Low (anything else is stored as Medium)
        #[arg(long)]
        priority: Option<String>,
        /// Due date, YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS]
        #[arg(long)]
        due: Option<String>,
        /// Initial column (default: todo)
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        /// Owning project
        #[arg(long)]
        project_id: Option<i64>,
    },
    /// Print tasks as JSON
    List {
        /// Restrict to one project
        #[arg(long)]
        project_id: Option<i64>,
        /// Only tasks that have a due date
        #[arg(long)]
        with_due_date: bool,
    },
    /// Print one task
    Get {
        /// Task ID
        id: i64,
    },
    /// Update a task; omitted fields keep their current value
    Update {
        /// Task ID
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// High, Medium or Low
        #[arg(long)]
        priority: Option<String>,
        /// Replacement due date
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
        /// New column
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        /// Move to another project
        #[arg(long)]
        project_id: Option<i64>,
    },
    /// Move a task to another column
    Status {
        /// Task ID
        id: i64,
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// Record tracked time
    Time {
        /// Task ID
        id: i64,
        /// Total seconds spent
        seconds: u64,
    },
    /// Delete a task and its calendar events
    Delete {
        /// Task ID
        id: i64,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let board = open_board()?;

    match action {
        TaskAction::Create {
            title,
            description,
            priority,
            due,
            status,
            project_id,
        } => {
            let input = TaskInput {
                title,
                description,
                status: status.map(|s| TaskStatus::from(s).as_str().to_string()),
                priority,
                due_date: due,
                project_id,
            };
            let task = board.create_task(input)?;
            print_json(&task)?;
        }
        TaskAction::List {
            project_id,
            with_due_date,
        } => {
            let tasks = match project_id {
                Some(pid) => board.list_tasks_by_project(pid)?,
                None if with_due_date => board.list_tasks_with_due_date()?,
                None => board.list_tasks()?,
            };
            let tasks: Vec<_> = tasks
                .into_iter()
                .filter(|t| !with_due_date || t.has_due_date())
                .collect();
            print_json(&tasks)?;
        }
        TaskAction::Get { id } => {
            let task = board.get_task(id)?.ok_or(format!("task not found: {id}"))?;
            print_json(&task)?;
        }
        TaskAction::Update {
            id,
            title,
            description,
            priority,
            due,
            clear_due,
            status,
            project_id,
        } => {
            let current = board.get_task(id)?.ok_or(format!("task not found: {id}"))?;
            let mut input = TaskInput::from(&current);

            if let Some(t) = title { input.title = t; }
            if let Some(d) = description { input.description = Some(d); }
            if let Some(p) = priority { input.priority = Some(p); }
            if let Some(d) = due { input.due_date = Some(d); }
            if clear_due { input.due_date = None; }
            if let Some(s) = status { input.status = Some(TaskStatus::from(s).as_str().to_string()); }
            if let Some(p) = project_id { input.project_id = Some(p); }

            let task = board
                .update_task(id, input)?
                .ok_or(format!("task not found: {id}"))?;
            print_json(&task)?;
        }
        TaskAction::Status { id, status } => {
            if !board.update_task_status(id, status.into())? {
                return Err(format!("task not found: {id}").into());
            }
            let task = board.get_task(id)?.ok_or(format!("task not found: {id}"))?;
            print_json(&task)?;
        }
        TaskAction::Time { id, seconds } => {
            if !board.update_time_spent(id, seconds)? {
                return Err(format!("task not found: {id}").into());
            }
            let task = board.get_task(id)?.ok_or(format!("task not found: {id}"))?;
            print_json(&task)?;
        }
        TaskAction::Delete { id } => {
            let deletion = board.delete_task(id)?;
            print_json(&deletion)?;
        }
    }
    Ok(())
}
