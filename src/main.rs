use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, eyre};
use std::path::PathBuf;
use std::process;
use taskboard::{
    Category, CategoryFilter, Config, NewTask, Priority, Recurrence, Record, SortKey, StatusFilter, Task, TaskError,
    TaskPatch, TaskStore, ViewQuery,
};

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "Taskboard CLI - freelancer task list with recurring tasks, timers and an archive")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to a YAML config file (default: <config dir>/taskboard/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory from the config
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        name: String,
        #[arg(short, long)]
        priority: Option<Priority>,
        /// YYYY-MM-DD
        #[arg(short, long)]
        deadline: Option<NaiveDate>,
        #[arg(short, long)]
        category: Option<Category>,
        /// Comma separated
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
        /// daily, weekly or monthly
        #[arg(short, long)]
        recurrence: Option<Recurrence>,
        /// Comma separated
        #[arg(long, value_delimiter = ',')]
        collaborators: Vec<String>,
        /// Attachment file name (repeatable)
        #[arg(short, long)]
        attach: Vec<String>,
    },

    /// List active tasks
    List {
        /// Case-insensitive match on the task name
        #[arg(short, long, default_value = "")]
        search: String,
        /// all, completed or pending
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        /// all or a category name
        #[arg(long, default_value = "all")]
        category: CategoryFilter,
        /// none, deadline, priority or time-spent
        #[arg(long, default_value = "none")]
        sort: SortKey,
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },

    /// Show every field of a task
    Show { id: String },

    /// Mark a task complete or incomplete
    Toggle { id: String },

    /// Change task fields
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(short, long, conflicts_with = "clear_deadline")]
        deadline: Option<NaiveDate>,
        #[arg(long)]
        clear_deadline: bool,
        #[arg(short, long)]
        category: Option<Category>,
        #[arg(short, long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
        #[arg(short, long)]
        recurrence: Option<Recurrence>,
        #[arg(long, value_delimiter = ',')]
        collaborators: Option<Vec<String>>,
        #[arg(long, value_delimiter = ',')]
        attachments: Option<Vec<String>>,
    },

    /// Copy a task
    Duplicate { id: String },

    /// Permanently remove a task
    Delete { id: String },

    /// Permanently remove several tasks
    BulkDelete {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        yes: bool,
    },

    /// Mark several tasks complete
    BulkComplete {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Move a task to the archive
    Archive { id: String },

    /// Bring a task back from the archive
    Restore { id: String },

    /// List archived tasks
    Archived,

    /// Mark a task as favorite
    Favorite {
        id: String,
        /// Remove the favorite mark instead
        #[arg(long)]
        off: bool,
    },

    /// Replace a task's notes
    Notes { id: String, text: String },

    /// Set a reminder date, or clear it when no date is given
    Reminder { id: String, date: Option<NaiveDate> },

    /// Push the deadline back one day
    Snooze { id: String },

    /// Log minutes spent on a task
    Time {
        id: String,
        #[arg(allow_hyphen_values = true)]
        minutes: i64,
    },

    /// Time tracking
    Timer {
        #[command(subcommand)]
        command: TimerCommand,
    },

    /// Subtasks
    Subtask {
        #[command(subcommand)]
        command: SubtaskCommand,
    },

    /// Add a comment
    Comment { id: String, text: String },

    /// Add dependency ids (comma separated)
    Depend {
        id: String,
        #[arg(value_delimiter = ',', required = true)]
        dependencies: Vec<String>,
    },

    /// Set the full order of active tasks
    Reorder {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Move a task from one list position to another (1-based)
    Move { from: usize, to: usize },

    /// Remove all completed tasks
    ClearCompleted {
        #[arg(long)]
        yes: bool,
    },

    /// Remove all active tasks
    ClearAll {
        #[arg(long)]
        yes: bool,
    },

    /// Export active tasks as CSV
    Export {
        /// Output file (default: ./tasks.csv)
        path: Option<PathBuf>,
    },

    /// Percentage of active tasks completed
    Progress,

    /// Open tasks past their deadline
    Overdue,
}

#[derive(Subcommand)]
enum TimerCommand {
    /// Start the timer on a task
    Start { id: String },
    /// Stop the timer and log the elapsed minutes
    Stop { id: String },
    /// Show the running timer
    Status,
}

#[derive(Subcommand)]
enum SubtaskCommand {
    /// Add a subtask
    Add { id: String, name: String },
    /// Flip a subtask by its 0-based index
    Toggle { id: String, index: usize },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    // Setup tracing
    tracing_subscriber::fmt()
        .with_max_level(config.log_level())
        .with_writer(std::io::stderr)
        .init();

    let mut store = config.open_store()?;

    if let Err(e) = run(&mut store, &config, cli.command) {
        if let Some(task_error) = e.downcast_ref::<TaskError>() {
            eprintln!("{} {}", "✗".red().bold(), task_error);
            process::exit(1);
        }
        return Err(e);
    }

    Ok(())
}

fn run(store: &mut TaskStore, config: &Config, command: Commands) -> Result<()> {
    match command {
        Commands::Add {
            name,
            priority,
            deadline,
            category,
            tags,
            recurrence,
            collaborators,
            attach,
        } => {
            let mut new = NewTask::new(name)
                .with_priority(priority.unwrap_or_default())
                .with_category(category.unwrap_or_default())
                .with_recurrence(recurrence.unwrap_or_default())
                .with_tags(tags)
                .with_collaborators(collaborators)
                .with_attachments(attach);
            if let Some(deadline) = deadline {
                new = new.with_deadline(deadline);
            }
            let id = store.add_task(new)?;
            notify(&format!("Task added successfully! ({})", id));
        }

        Commands::List {
            search,
            status,
            category,
            sort,
            page,
        } => {
            let query = ViewQuery {
                search,
                status,
                category,
                sort,
                page,
                page_size: config.page_size,
            };
            let today = Local::now().date_naive();
            let running = store.running_timer().map(|t| t.task_id.clone());
            let result = store.view(&query);

            if result.items.is_empty() {
                println!("{}", "No tasks found.".dimmed());
            }
            for task in &result.items {
                print_task_line(task, today, running.as_deref() == Some(task.id.as_str()));
            }
            println!(
                "{}",
                format!(
                    "Page {} of {} ({} matching) - {}% complete",
                    result.page,
                    result.total_pages.max(1),
                    result.total_matches,
                    store.progress()
                )
                .dimmed()
            );
        }

        Commands::Show { id } => {
            let id = resolve_active(store, &id)?;
            if let Some(task) = store.get(&id) {
                print_task_detail(task);
            }
        }

        Commands::Toggle { id } => {
            let id = resolve_active(store, &id)?;
            let toggled = store.toggle_completion(&id)?;
            notify("Task status updated!");
            if let Some(next) = toggled.spawned {
                notify(&format!("Recurring task auto-rescheduled! ({})", next));
            }
        }

        Commands::Edit {
            id,
            name,
            priority,
            deadline,
            clear_deadline,
            category,
            tags,
            recurrence,
            collaborators,
            attachments,
        } => {
            let id = resolve_active(store, &id)?;
            let patch = TaskPatch {
                name,
                priority,
                deadline: if clear_deadline { Some(None) } else { deadline.map(Some) },
                category,
                tags,
                recurrence,
                collaborators,
                attachments,
            };
            if patch.is_empty() {
                return Err(eyre!("Nothing to change; pass at least one field"));
            }
            store.edit_task(&id, patch)?;
            notify("Task updated successfully!");
        }

        Commands::Duplicate { id } => {
            let id = resolve_active(store, &id)?;
            let copy = store.duplicate_task(&id)?;
            notify(&format!("Task duplicated successfully! ({})", copy));
        }

        Commands::Delete { id } => {
            let id = resolve_active(store, &id)?;
            let task = store.delete_task(&id)?;
            notify(&format!("Task '{}' removed successfully!", task.name));
        }

        Commands::BulkDelete { ids, yes } => {
            confirm(yes, "bulk-delete")?;
            let ids = ids
                .iter()
                .map(|id| resolve_active(store, id))
                .collect::<Result<Vec<_>>>()?;
            let removed = store.bulk_delete(&ids);
            notify(&format!("{} selected tasks removed!", removed));
        }

        Commands::BulkComplete { ids } => {
            let ids = ids
                .iter()
                .map(|id| resolve_active(store, id))
                .collect::<Result<Vec<_>>>()?;
            let count = store.bulk_complete(&ids);
            notify(&format!("{} selected tasks marked as completed!", count));
        }

        Commands::Archive { id } => {
            let id = resolve_active(store, &id)?;
            store.archive_task(&id)?;
            notify("Task archived successfully!");
        }

        Commands::Restore { id } => {
            let id = resolve(store.archived(), &id).map_err(|_| TaskError::ArchivedNotFound(id.clone()))?;
            store.restore_task(&id)?;
            notify("Task restored successfully!");
        }

        Commands::Archived => {
            let today = Local::now().date_naive();
            if store.archived().is_empty() {
                println!("{}", "Archive is empty.".dimmed());
            }
            for task in store.archived() {
                print_task_line(task, today, false);
            }
        }

        Commands::Favorite { id, off } => {
            let id = resolve_active(store, &id)?;
            store.set_favorite(&id, !off)?;
            notify("Favorite status updated!");
        }

        Commands::Notes { id, text } => {
            let id = resolve_active(store, &id)?;
            store.set_notes(&id, &text)?;
            notify("Task notes updated!");
        }

        Commands::Reminder { id, date } => {
            let id = resolve_active(store, &id)?;
            store.set_reminder(&id, date)?;
            notify(if date.is_some() {
                "Reminder set successfully!"
            } else {
                "Reminder cleared!"
            });
        }

        Commands::Snooze { id } => {
            let id = resolve_active(store, &id)?;
            match store.snooze(&id)? {
                Some(deadline) => notify(&format!("Task snoozed to {}!", deadline)),
                None => println!("{}", "Task has no deadline; nothing to snooze.".yellow()),
            }
        }

        Commands::Time { id, minutes } => {
            let id = resolve_active(store, &id)?;
            store.add_time_spent(&id, minutes)?;
            notify("Time updated successfully!");
        }

        Commands::Timer { command } => match command {
            TimerCommand::Start { id } => {
                let id = resolve_active(store, &id)?;
                store.start_timer(&id)?;
                notify("Timer started!");
            }
            TimerCommand::Stop { id } => {
                let id = resolve_active(store, &id)?;
                let minutes = store.stop_timer(&id)?;
                notify(&format!("Timer stopped; {} minutes logged!", minutes));
            }
            TimerCommand::Status => match store.running_timer() {
                Some(timer) => {
                    let minutes = (store.now() - timer.started_at).num_minutes();
                    let name = store.get(&timer.task_id).map(|t| t.name.as_str()).unwrap_or("?");
                    println!("{} {} ({} min so far)", "⏱".cyan(), name.bold(), minutes);
                }
                None => println!("{}", "No timer running.".dimmed()),
            },
        },

        Commands::Subtask { command } => match command {
            SubtaskCommand::Add { id, name } => {
                let id = resolve_active(store, &id)?;
                store.add_subtask(&id, &name)?;
                notify("Subtask added successfully!");
            }
            SubtaskCommand::Toggle { id, index } => {
                let id = resolve_active(store, &id)?;
                store.toggle_subtask(&id, index)?;
                notify("Subtask status updated!");
            }
        },

        Commands::Comment { id, text } => {
            let id = resolve_active(store, &id)?;
            store.add_comment(&id, &text)?;
            notify("Comment added!");
        }

        Commands::Depend { id, dependencies } => {
            let id = resolve_active(store, &id)?;
            store.add_dependency(&id, &dependencies)?;
            notify("Dependencies added!");
        }

        Commands::Reorder { ids } => {
            let ids = ids
                .iter()
                .map(|id| resolve_active(store, id))
                .collect::<Result<Vec<_>>>()?;
            store.reorder(&ids)?;
            notify("Tasks reordered!");
        }

        Commands::Move { from, to } => {
            store.move_task(list_index(from)?, list_index(to)?)?;
            notify("Task moved!");
        }

        Commands::ClearCompleted { yes } => {
            confirm(yes, "clear-completed")?;
            let removed = store.clear_completed();
            notify(&format!("{} completed tasks cleared!", removed));
        }

        Commands::ClearAll { yes } => {
            confirm(yes, "clear-all")?;
            let removed = store.clear_all();
            notify(&format!("All tasks cleared! ({} removed)", removed));
        }

        Commands::Export { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(format!("{}.csv", Task::collection_name())));
            store.export_csv(&path)?;
            notify(&format!("Tasks exported to {}!", path.display()));
        }

        Commands::Progress => {
            println!("{}% of {} tasks completed", store.progress(), store.tasks().len());
        }

        Commands::Overdue => {
            let today = Local::now().date_naive();
            let overdue = store.overdue(today);
            if overdue.is_empty() {
                println!("{}", "Nothing overdue.".green());
            }
            for task in overdue {
                print_task_line(task, today, false);
            }
        }
    }

    Ok(())
}

/// Irreversible commands need --yes
fn confirm(yes: bool, command: &str) -> Result<()> {
    if yes {
        Ok(())
    } else {
        Err(eyre!("{} cannot be undone; re-run with --yes to confirm", command))
    }
}

fn notify(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

fn resolve_active(store: &TaskStore, id: &str) -> Result<String> {
    resolve(store.tasks(), id).map_err(|_| TaskError::NotFound(id.to_string()).into())
}

/// Convert a 1-based list position to an index
fn list_index(position: usize) -> Result<usize> {
    position.checked_sub(1).ok_or_else(|| eyre!("Positions start at 1"))
}

/// Accept a full id or an unambiguous prefix of one
fn resolve(tasks: &[Task], id: &str) -> Result<String> {
    let id = id.trim();
    if id.is_empty() {
        return Err(eyre!("Task id cannot be empty"));
    }
    if tasks.iter().any(|t| t.id == id) {
        return Ok(id.to_string());
    }

    let matches: Vec<&Task> = tasks.iter().filter(|t| t.id.starts_with(id)).collect();
    match matches.as_slice() {
        [only] => Ok(only.id.clone()),
        [] => Err(eyre!("No task with id {}", id)),
        _ => Err(eyre!("Id prefix {} matches {} tasks", id, matches.len())),
    }
}

fn priority_label(priority: Priority) -> colored::ColoredString {
    match priority {
        Priority::High => priority.to_string().red(),
        Priority::Medium => priority.to_string().yellow(),
        Priority::Low => priority.to_string().green(),
    }
}

fn print_task_line(task: &Task, today: NaiveDate, timing: bool) {
    let check = if task.completed { "[x]".green() } else { "[ ]".normal() };
    let name = if task.completed {
        task.name.strikethrough()
    } else {
        task.name.bold()
    };

    let mut line = format!("{} {} {}", check, name, priority_label(task.priority));
    if task.favorite {
        line.push_str(&format!(" {}", "★".yellow()));
    }
    if let Some(deadline) = task.deadline {
        if task.is_overdue(today) {
            line.push_str(&format!(" {}", format!("due {} (overdue)", deadline).red()));
        } else {
            line.push_str(&format!(" due {}", deadline));
        }
    }
    line.push_str(&format!(" [{}]", task.category));
    if !task.subtasks.is_empty() {
        line.push_str(&format!(" {}/{} subtasks", task.completed_subtasks(), task.subtasks.len()));
    }
    if timing {
        line.push_str(&format!(" {}", "⏱ running".cyan()));
    }

    println!("{}", line);
    println!("    {}", task.id.dimmed());
}

fn print_task_detail(task: &Task) {
    println!("{} {}", task.name.bold(), priority_label(task.priority));
    println!("  id:            {}", task.id);
    println!("  completed:     {}", task.completed);
    println!("  favorite:      {}", task.favorite);
    println!("  category:      {}", task.category);
    println!(
        "  deadline:      {}",
        task.deadline.map(|d| d.to_string()).unwrap_or_default()
    );
    println!("  recurrence:    {}", task.recurrence);
    println!(
        "  reminder:      {}",
        task.reminder.map(|d| d.to_string()).unwrap_or_default()
    );
    println!("  time spent:    {} min", task.time_spent);
    println!("  tags:          {}", task.tags.join(", "));
    println!("  collaborators: {}", task.collaborators.join(", "));
    println!("  attachments:   {}", task.attachments.join(", "));
    println!("  dependencies:  {}", task.dependencies.join(", "));
    println!("  created:       {}", task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
    if !task.notes.is_empty() {
        println!("  notes:         {}", task.notes);
    }

    if !task.subtasks.is_empty() {
        println!("{}", "Subtasks".underline());
        for (index, subtask) in task.subtasks.iter().enumerate() {
            let check = if subtask.completed { "[x]" } else { "[ ]" };
            println!("  {} {} {}", index, check, subtask.name);
        }
    }
    if !task.comments.is_empty() {
        println!("{}", "Comments".underline());
        for comment in &task.comments {
            println!("  - {}", comment);
        }
    }
    println!("{}", "History".underline());
    for entry in &task.history {
        println!("  {}", entry.dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str) -> Task {
        serde_json::from_str(&format!(r#"{{"id":"{}","name":"t"}}"#, id)).unwrap()
    }

    #[test]
    fn test_resolve_exact_and_prefix() {
        let tasks = vec![task("0192-abc"), task("0192-abd"), task("0192-ab")];

        // An exact id wins even when it prefixes others
        assert_eq!(resolve(&tasks, "0192-ab").unwrap(), "0192-ab");
        assert_eq!(resolve(&tasks, "0192-abc").unwrap(), "0192-abc");
        assert_eq!(resolve(&tasks, "0192-abd").unwrap(), "0192-abd");
        assert_eq!(resolve(&tasks, " 0192-abd ").unwrap(), "0192-abd");

        assert!(resolve(&[task("0192-abc")], "0192").is_ok());
        assert!(resolve(&tasks, "0192-a").is_err());
        assert!(resolve(&tasks, "ffff").is_err());
    }

    #[test]
    fn test_resolve_rejects_empty_id() {
        let tasks = vec![task("0192-abc")];
        assert!(resolve(&tasks, "").is_err());
        assert!(resolve(&tasks, "   ").is_err());
    }

    #[test]
    fn test_resolve_active_reports_not_found() {
        let store = TaskStore::open(Box::new(taskboard::MemorySlots::new()));
        let err = resolve_active(&store, "missing").unwrap_err();
        assert_eq!(
            err.downcast_ref::<TaskError>(),
            Some(&TaskError::NotFound("missing".to_string()))
        );
    }

    #[test]
    fn test_confirm_needs_yes() {
        assert!(confirm(true, "clear-all").is_ok());
        let err = confirm(false, "clear-all").unwrap_err();
        assert!(err.to_string().contains("--yes"));
    }

    #[test]
    fn test_list_index_is_one_based() {
        assert_eq!(list_index(1).unwrap(), 0);
        assert_eq!(list_index(4).unwrap(), 3);
        assert!(list_index(0).is_err());
    }

    #[test]
    fn test_cli_parses_move_and_negative_minutes() {
        let cli = Cli::try_parse_from(["taskboard", "move", "2", "1"]).unwrap();
        assert!(matches!(cli.command, Commands::Move { from: 2, to: 1 }));

        let cli = Cli::try_parse_from(["taskboard", "time", "abc", "-5"]).unwrap();
        assert!(matches!(cli.command, Commands::Time { minutes: -5, .. }));

        assert!(Cli::try_parse_from(["taskboard", "bulk-delete"]).is_err());
    }
}
