// Task store: active and archived collections mirrored to key-value slots

use crate::clock::{Clock, SystemClock};
use crate::error::{TaskError, TaskResult};
use crate::export;
use crate::models::{NewTask, Recurrence, RunningTimer, Subtask, Task, TaskPatch, clean_list};
use crate::slots::{SlotBackend, load_slot, save_slot};
use crate::view::{self, Page, ViewQuery};
use chrono::{DateTime, Days, NaiveDate, Utc};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Slot holding the active collection
pub const TASKS_SLOT: &str = "tasks";
/// Slot holding the archived collection
pub const ARCHIVED_SLOT: &str = "archivedTasks";
/// Slot holding the running timer, or `null`
pub const TIMER_SLOT: &str = "activeTimer";

/// Result of flipping a task's completion flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toggled {
    /// Completion state after the toggle
    pub completed: bool,
    /// Id of the follow-up task created for a recurring task
    pub spawned: Option<String>,
}

/// Owner of the active and archived task collections.
///
/// Every successful mutation is followed by a write of all slots. Write
/// failures are logged and otherwise ignored; the in-memory state stays
/// authoritative for the life of the store.
pub struct TaskStore {
    active: Vec<Task>,
    archived: Vec<Task>,
    timer: Option<RunningTimer>,
    slots: Box<dyn SlotBackend>,
    clock: Box<dyn Clock>,
}

fn new_id() -> String {
    Uuid::now_v7().to_string()
}

impl TaskStore {
    /// Load the store from its slots using the system clock
    pub fn open(slots: Box<dyn SlotBackend>) -> Self {
        Self::with_clock(slots, Box::new(SystemClock))
    }

    /// Load the store from its slots. Absent or unreadable slots start empty.
    pub fn with_clock(slots: Box<dyn SlotBackend>, clock: Box<dyn Clock>) -> Self {
        let active: Vec<Task> = load_slot(slots.as_ref(), TASKS_SLOT).unwrap_or_default();
        let archived: Vec<Task> = load_slot(slots.as_ref(), ARCHIVED_SLOT).unwrap_or_default();
        let timer: Option<RunningTimer> = load_slot::<Option<RunningTimer>>(slots.as_ref(), TIMER_SLOT).flatten();

        info!(
            backend = slots.name(),
            active = active.len(),
            archived = archived.len(),
            timer = timer.is_some(),
            "Loaded task store"
        );

        Self {
            active,
            archived,
            timer,
            slots,
            clock,
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Active tasks in store order
    pub fn tasks(&self) -> &[Task] {
        &self.active
    }

    pub fn archived(&self) -> &[Task] {
        &self.archived
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.active.iter().find(|t| t.id == id)
    }

    pub fn get_archived(&self, id: &str) -> Option<&Task> {
        self.archived.iter().find(|t| t.id == id)
    }

    pub fn running_timer(&self) -> Option<&RunningTimer> {
        self.timer.as_ref()
    }

    /// Current time according to the store's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Search, filter, sort and page the active tasks
    pub fn view(&self, query: &ViewQuery) -> Page<'_> {
        view::apply(&self.active, query)
    }

    /// Share of active tasks that are completed, as a rounded percentage
    pub fn progress(&self) -> u8 {
        if self.active.is_empty() {
            return 0;
        }
        let done = self.active.iter().filter(|t| t.completed).count();
        ((done as f64 / self.active.len() as f64) * 100.0).round() as u8
    }

    /// Open tasks whose deadline has passed
    pub fn overdue(&self, today: NaiveDate) -> Vec<&Task> {
        self.active.iter().filter(|t| t.is_overdue(today)).collect()
    }

    /// Write the active tasks to a CSV file
    pub fn export_csv(&self, path: &Path) -> eyre::Result<()> {
        export::export_csv(&self.active, path)
    }

    // ========================================================================
    // Create / edit / delete
    // ========================================================================

    /// Append a new task and return its id
    pub fn add_task(&mut self, new: NewTask) -> TaskResult<String> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(TaskError::EmptyName);
        }

        let now = self.clock.now();
        let mut task = Task {
            id: new_id(),
            name,
            priority: new.priority,
            deadline: new.deadline,
            category: new.category.canonical(),
            tags: clean_list(new.tags),
            recurrence: new.recurrence.canonical(),
            collaborators: clean_list(new.collaborators),
            attachments: clean_list(new.attachments),
            subtasks: Vec::new(),
            completed: false,
            created_at: now,
            history: Vec::new(),
            time_spent: 0,
            reminder: None,
            notes: String::new(),
            favorite: false,
            dependencies: Vec::new(),
            comments: Vec::new(),
        };
        task.record("Task created", now);

        let id = task.id.clone();
        debug!(id = %id, name = %task.name, "Task added");
        self.active.push(task);
        self.persist();
        Ok(id)
    }

    /// Flip completion. Completing a recurring task with a deadline appends
    /// one follow-up task with the deadline moved forward by the interval.
    pub fn toggle_completion(&mut self, id: &str) -> TaskResult<Toggled> {
        let now = self.clock.now();
        let index = self.position(id)?;

        let task = &mut self.active[index];
        task.completed = !task.completed;
        task.record("Status toggled", now);
        let completed = task.completed;

        let mut follow_up = None;
        if completed {
            match (task.recurrence.interval_days(), task.deadline) {
                (Some(days), Some(deadline)) => {
                    let mut next = task.clone();
                    next.id = new_id();
                    next.deadline = deadline.checked_add_days(Days::new(days));
                    next.completed = false;
                    next.history = Vec::new();
                    next.record("Recurring task generated", now);
                    follow_up = Some(next);
                }
                (None, _) if matches!(task.recurrence, Recurrence::Unrecognized(_)) => {
                    debug!(id, recurrence = %task.recurrence, "Unrecognized recurrence, no follow-up task");
                }
                _ => {}
            }
        }

        let spawned = follow_up.as_ref().map(|t| t.id.clone());
        if let Some(next) = follow_up {
            debug!(id, next_id = %next.id, deadline = ?next.deadline, "Recurring task rescheduled");
            self.active.push(next);
        }

        self.persist();
        Ok(Toggled { completed, spawned })
    }

    /// Apply a field patch. A patch may not blank out the name.
    pub fn edit_task(&mut self, id: &str, patch: TaskPatch) -> TaskResult<()> {
        if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(TaskError::EmptyName);
        }
        self.update(id, "Task edited", |task| patch.apply(task))
    }

    /// Copy a task under a new id with " (Copy)" appended to the name
    pub fn duplicate_task(&mut self, id: &str) -> TaskResult<String> {
        let now = self.clock.now();
        let index = self.position(id)?;

        let mut copy = self.active[index].clone();
        copy.id = new_id();
        copy.name = format!("{} (Copy)", copy.name);
        copy.created_at = now;
        copy.history = Vec::new();
        copy.record("Task duplicated", now);

        let copy_id = copy.id.clone();
        debug!(id, copy_id = %copy_id, "Task duplicated");
        self.active.push(copy);
        self.persist();
        Ok(copy_id)
    }

    /// Permanently remove one active task
    pub fn delete_task(&mut self, id: &str) -> TaskResult<Task> {
        let index = self.position(id)?;
        let task = self.active.remove(index);
        debug!(id, "Task deleted");
        self.persist();
        Ok(task)
    }

    /// Permanently remove every listed active task. Unknown ids are skipped.
    pub fn bulk_delete(&mut self, ids: &[String]) -> usize {
        let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let before = self.active.len();
        self.active.retain(|t| !targets.contains(t.id.as_str()));
        let removed = before - self.active.len();

        if removed > 0 {
            debug!(removed, "Bulk delete");
            self.persist();
        }
        removed
    }

    /// Mark every listed active task completed. Recurrence is not applied.
    pub fn bulk_complete(&mut self, ids: &[String]) -> usize {
        let now = self.clock.now();
        let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();

        let mut count = 0;
        for task in self.active.iter_mut().filter(|t| targets.contains(t.id.as_str())) {
            task.completed = true;
            task.record("Marked complete in bulk", now);
            count += 1;
        }

        if count > 0 {
            debug!(count, "Bulk complete");
            self.persist();
        }
        count
    }

    /// Remove all completed active tasks
    pub fn clear_completed(&mut self) -> usize {
        let before = self.active.len();
        self.active.retain(|t| !t.completed);
        let removed = before - self.active.len();
        info!(removed, "Cleared completed tasks");
        self.persist();
        removed
    }

    /// Remove every active task. The archive is left alone.
    pub fn clear_all(&mut self) -> usize {
        let removed = self.active.len();
        self.active.clear();
        info!(removed, "Cleared all tasks");
        self.persist();
        removed
    }

    // ========================================================================
    // Archive
    // ========================================================================

    pub fn archive_task(&mut self, id: &str) -> TaskResult<()> {
        let now = self.clock.now();
        let index = self.position(id)?;

        let mut task = self.active.remove(index);
        task.record("Task archived", now);
        self.archived.push(task);

        debug!(id, "Task archived");
        self.persist();
        Ok(())
    }

    pub fn restore_task(&mut self, id: &str) -> TaskResult<()> {
        let now = self.clock.now();
        let index = self
            .archived
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TaskError::ArchivedNotFound(id.to_string()))?;

        let mut task = self.archived.remove(index);
        task.record("Task restored", now);
        self.active.push(task);

        debug!(id, "Task restored");
        self.persist();
        Ok(())
    }

    // ========================================================================
    // Field updates
    // ========================================================================

    pub fn set_favorite(&mut self, id: &str, favorite: bool) -> TaskResult<()> {
        let event = if favorite {
            "Marked as favorite"
        } else {
            "Removed from favorites"
        };
        self.update(id, event, |task| task.favorite = favorite)
    }

    pub fn set_notes(&mut self, id: &str, notes: &str) -> TaskResult<()> {
        let notes = notes.to_string();
        self.update(id, "Notes updated", |task| task.notes = notes)
    }

    /// Set or clear the reminder date
    pub fn set_reminder(&mut self, id: &str, reminder: Option<NaiveDate>) -> TaskResult<()> {
        let event = match reminder {
            Some(date) => format!("Reminder set for {}", date),
            None => "Reminder cleared".to_string(),
        };
        self.update(id, &event, |task| task.reminder = reminder)
    }

    /// Push the deadline back one day. Tasks without a deadline are left
    /// untouched and `None` is returned.
    pub fn snooze(&mut self, id: &str) -> TaskResult<Option<NaiveDate>> {
        let index = self.position(id)?;
        let Some(deadline) = self.active[index].deadline else {
            debug!(id, "Snooze ignored, task has no deadline");
            return Ok(None);
        };

        let Some(snoozed) = deadline.checked_add_days(Days::new(1)) else {
            debug!(id, %deadline, "Snooze ignored, deadline cannot move forward");
            return Ok(None);
        };
        let event = format!("Task snoozed to {}", snoozed);
        self.update(id, &event, |task| task.deadline = Some(snoozed))?;
        Ok(Some(snoozed))
    }

    /// Add manually tracked minutes
    pub fn add_time_spent(&mut self, id: &str, minutes: i64) -> TaskResult<()> {
        if minutes <= 0 {
            return Err(TaskError::InvalidMinutes(minutes));
        }
        let event = format!("Added {} minutes", minutes);
        self.update(id, &event, |task| {
            task.time_spent = task.time_spent.saturating_add(minutes as u64)
        })
    }

    // ========================================================================
    // Timer
    // ========================================================================

    /// Start the store-wide timer on a task. Fails if any timer is running.
    pub fn start_timer(&mut self, id: &str) -> TaskResult<()> {
        if let Some(running) = &self.timer {
            return Err(TaskError::TimerBusy {
                running: running.task_id.clone(),
            });
        }
        self.position(id)?;

        let started_at = self.clock.now();
        self.timer = Some(RunningTimer {
            task_id: id.to_string(),
            started_at,
        });
        info!(id, %started_at, "Timer started");
        self.persist();
        Ok(())
    }

    /// Stop the timer running on `id`, adding the elapsed whole minutes to
    /// the task. Returns the minutes added.
    pub fn stop_timer(&mut self, id: &str) -> TaskResult<u64> {
        let started_at = match &self.timer {
            Some(timer) if timer.task_id == id => timer.started_at,
            _ => return Err(TaskError::TimerNotRunning(id.to_string())),
        };

        let now = self.clock.now();
        let elapsed = (now - started_at).num_minutes().max(0) as u64;
        self.timer = None;
        info!(id, elapsed, "Timer stopped");

        let event = format!("Timer stopped; {} minutes added", elapsed);
        match self.update(id, &event, |task| task.time_spent = task.time_spent.saturating_add(elapsed)) {
            Ok(()) => Ok(elapsed),
            Err(e) => {
                // The timer is gone either way
                self.persist();
                Err(e)
            }
        }
    }

    // ========================================================================
    // Subtasks, comments, dependencies
    // ========================================================================

    pub fn add_subtask(&mut self, id: &str, name: &str) -> TaskResult<()> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(TaskError::EmptySubtask);
        }
        let event = format!("Subtask '{}' added", name);
        self.update(id, &event, |task| {
            task.subtasks.push(Subtask { name, completed: false })
        })
    }

    /// Flip a subtask by position. Returns its new completion state.
    pub fn toggle_subtask(&mut self, id: &str, index: usize) -> TaskResult<bool> {
        let now = self.clock.now();
        let task = self.task_mut(id)?;

        let len = task.subtasks.len();
        let subtask = task
            .subtasks
            .get_mut(index)
            .ok_or(TaskError::SubtaskOutOfRange { index, len })?;
        subtask.completed = !subtask.completed;

        let completed = subtask.completed;
        let event = if completed {
            format!("Subtask '{}' completed", subtask.name)
        } else {
            format!("Subtask '{}' reopened", subtask.name)
        };
        task.record(&event, now);

        self.persist();
        Ok(completed)
    }

    pub fn add_comment(&mut self, id: &str, text: &str) -> TaskResult<()> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(TaskError::EmptyComment);
        }
        self.update(id, "Comment added", |task| task.comments.push(text))
    }

    /// Append dependency ids. They are not checked against the store.
    pub fn add_dependency(&mut self, id: &str, dependencies: &[String]) -> TaskResult<()> {
        let dependencies = clean_list(dependencies.to_vec());
        if dependencies.is_empty() {
            return Err(TaskError::NoDependencies);
        }
        self.update(id, "Dependencies added", |task| task.dependencies.extend(dependencies))
    }

    // ========================================================================
    // Ordering
    // ========================================================================

    /// Replace the order of the active tasks. `order` must list every active
    /// id exactly once.
    pub fn reorder(&mut self, order: &[String]) -> TaskResult<()> {
        if order.len() != self.active.len() {
            return Err(TaskError::InvalidOrder(format!(
                "expected {} ids, got {}",
                self.active.len(),
                order.len()
            )));
        }

        let mut indices = Vec::with_capacity(order.len());
        let mut seen = HashSet::new();
        for id in order {
            let index = self
                .active
                .iter()
                .position(|t| &t.id == id)
                .ok_or_else(|| TaskError::InvalidOrder(format!("unknown task id {}", id)))?;
            if !seen.insert(index) {
                return Err(TaskError::InvalidOrder(format!("task id {} listed twice", id)));
            }
            indices.push(index);
        }

        let mut old: Vec<Option<Task>> = std::mem::take(&mut self.active).into_iter().map(Some).collect();
        self.active = indices.into_iter().filter_map(|i| old[i].take()).collect();

        debug!(count = self.active.len(), "Tasks reordered");
        self.persist();
        Ok(())
    }

    /// Move the task at position `from` to position `to` (drag and drop)
    pub fn move_task(&mut self, from: usize, to: usize) -> TaskResult<()> {
        let len = self.active.len();
        if from >= len || to >= len {
            return Err(TaskError::InvalidOrder(format!(
                "positions {} -> {} out of range for {} tasks",
                from, to, len
            )));
        }

        let mut order: Vec<String> = self.active.iter().map(|t| t.id.clone()).collect();
        let moved = order.remove(from);
        order.insert(to, moved);
        self.reorder(&order)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn position(&self, id: &str) -> TaskResult<usize> {
        self.active
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    fn task_mut(&mut self, id: &str) -> TaskResult<&mut Task> {
        self.active
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    /// Mutate one active task, record the event in its history, persist
    fn update<F>(&mut self, id: &str, event: &str, change: F) -> TaskResult<()>
    where
        F: FnOnce(&mut Task),
    {
        let now = self.clock.now();
        let task = self.task_mut(id)?;
        change(task);
        task.record(event, now);

        debug!(id, event, "Task updated");
        self.persist();
        Ok(())
    }

    /// Write every slot. Failures are logged and swallowed.
    fn persist(&mut self) {
        let orphaned = self
            .timer
            .as_ref()
            .is_some_and(|timer| !self.active.iter().any(|t| t.id == timer.task_id));
        if orphaned {
            debug!("Dropping timer whose task left the active list");
            self.timer = None;
        }

        if let Err(e) = save_slot(self.slots.as_mut(), TASKS_SLOT, &self.active) {
            warn!(key = TASKS_SLOT, error = ?e, "Failed to persist tasks");
        }
        if let Err(e) = save_slot(self.slots.as_mut(), ARCHIVED_SLOT, &self.archived) {
            warn!(key = ARCHIVED_SLOT, error = ?e, "Failed to persist archived tasks");
        }
        if let Err(e) = save_slot(self.slots.as_mut(), TIMER_SLOT, &self.timer) {
            warn!(key = TIMER_SLOT, error = ?e, "Failed to persist timer");
        }
    }
}
