//! Example 02: Recurring Tasks and Views
//!
//! Uses an in-memory slot backend and a manual clock to show recurring
//! rescheduling, the timer, and the filter/sort/page pipeline.
//!
//! Run with: cargo run --example 02_recurring_and_views

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use eyre::Result;
use taskboard::{
    Category, CategoryFilter, ManualClock, MemorySlots, NewTask, Priority, Recurrence, SortKey, StatusFilter,
    TaskStore, ViewQuery,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, d).unwrap_or_default()
}

fn main() -> Result<()> {
    println!("Taskboard Recurring and Views Example");
    println!("=====================================\n");

    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).single().unwrap_or_default());
    let slots = MemorySlots::new();
    let mut store = TaskStore::with_clock(Box::new(slots.clone()), Box::new(clock.clone()));

    println!("1. RECURRING - Completing a weekly task...");
    let standup = store.add_task(
        NewTask::new("Weekly client report")
            .with_recurrence(Recurrence::Weekly)
            .with_deadline(day(2))
            .with_category(Category::Work),
    )?;
    let toggled = store.toggle_completion(&standup)?;
    if let Some(next) = toggled.spawned.as_deref().and_then(|id| store.get(id)) {
        println!("   Next occurrence due {:?}", next.deadline);
    }
    println!();

    println!("2. TIMER - Tracking 25 minutes...");
    let design = store.add_task(NewTask::new("Logo design").with_priority(Priority::High).with_deadline(day(5)))?;
    store.start_timer(&design)?;
    clock.advance(Duration::minutes(25));
    let minutes = store.stop_timer(&design)?;
    println!("   Logged {} minutes\n", minutes);

    for (i, name) in ["Email Alice", "Email Bob", "Book flights", "Renew domain"].iter().enumerate() {
        store.add_task(NewTask::new(*name).with_priority(if i % 2 == 0 { Priority::Low } else { Priority::Medium }))?;
    }

    println!("3. VIEWS - Pending tasks sorted by deadline...");
    let query = ViewQuery {
        status: StatusFilter::Pending,
        sort: SortKey::Deadline,
        ..Default::default()
    };
    let page = store.view(&query);
    for task in &page.items {
        println!("   {:<24} {:?}", task.name, task.deadline);
    }
    println!("   page {} of {}\n", page.page, page.total_pages);

    println!("4. VIEWS - Searching \"email\" by priority...");
    let query = ViewQuery {
        search: "email".to_string(),
        sort: SortKey::Priority,
        ..Default::default()
    };
    for task in &store.view(&query).items {
        println!("   {:<24} {}", task.name, task.priority);
    }
    println!();

    println!("5. VIEWS - Work category, two per page...");
    let query = ViewQuery {
        category: CategoryFilter::Only(Category::Work),
        page_size: 2,
        ..Default::default()
    };
    let page = store.view(&query);
    println!("   {} matches over {} pages", page.total_matches, page.total_pages);

    println!("\n6. SLOTS - Raw persisted tasks slot:");
    if let Some(raw) = slots.get("tasks") {
        println!("   {} bytes of JSON", raw.len());
    }

    println!("\nDone.");
    Ok(())
}
