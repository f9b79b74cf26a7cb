//! Example 01: Basic Task Operations
//!
//! Adds, edits, completes, archives and restores tasks, then reopens the
//! store to show that everything survived in the SQLite slots.
//!
//! Run with: cargo run --example 01_basic_tasks

use chrono::NaiveDate;
use eyre::Result;
use taskboard::{Category, NewTask, Priority, SqliteSlots, TaskPatch, TaskStore};

fn main() -> Result<()> {
    // Create a temporary directory for this example
    let temp_dir = tempfile::tempdir()?;
    let data_dir = temp_dir.path().to_path_buf();

    println!("Taskboard Basic Tasks Example");
    println!("=============================\n");
    println!("Data dir: {}\n", data_dir.display());

    let mut store = TaskStore::open(Box::new(SqliteSlots::open(&data_dir)?));

    println!("1. ADD - Creating two tasks...");
    let invoice = store.add_task(
        NewTask::new("Send invoice to ACME")
            .with_priority(Priority::High)
            .with_category(Category::Work)
            .with_deadline(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap_or_default())
            .with_tags(["billing", "acme"]),
    )?;
    let gym = store.add_task(NewTask::new("Gym").with_category(Category::Personal))?;
    println!("   Added {} and {}\n", invoice, gym);

    println!("2. EDIT - Renaming and adding detail...");
    store.edit_task(
        &invoice,
        TaskPatch {
            name: Some("Send March invoice to ACME".to_string()),
            ..Default::default()
        },
    )?;
    store.add_subtask(&invoice, "Export hours")?;
    store.add_subtask(&invoice, "Attach PDF")?;
    store.toggle_subtask(&invoice, 0)?;
    store.add_time_spent(&invoice, 45)?;
    store.add_comment(&invoice, "Client asked for net 30")?;
    if let Some(task) = store.get(&invoice) {
        println!(
            "   {} - {}/{} subtasks, {} min",
            task.name,
            task.completed_subtasks(),
            task.subtasks.len(),
            task.time_spent
        );
    }
    println!();

    println!("3. COMPLETE - Toggling the gym task...");
    store.toggle_completion(&gym)?;
    println!("   Progress: {}%\n", store.progress());

    println!("4. ARCHIVE - Moving the invoice out of the way...");
    store.archive_task(&invoice)?;
    println!("   Active: {}, archived: {}", store.tasks().len(), store.archived().len());
    store.restore_task(&invoice)?;
    println!("   Restored, active: {}\n", store.tasks().len());

    println!("5. REOPEN - Loading the store again from disk...");
    drop(store);
    let store = TaskStore::open(Box::new(SqliteSlots::open(&data_dir)?));
    for task in store.tasks() {
        println!("   [{}] {}", if task.completed { "x" } else { " " }, task.name);
        for entry in &task.history {
            println!("       {}", entry);
        }
    }

    println!("\nDone.");
    Ok(())
}
