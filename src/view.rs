// Filtering, sorting and paging of the active task list

use crate::models::{Category, Task};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Completion status filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

impl StatusFilter {
    fn matches(self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Completed => task.completed,
            StatusFilter::Pending => !task.completed,
        }
    }
}

/// Category filter: everything, or one exact category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    fn matches(&self, task: &Task) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => &task.category == category,
        }
    }
}

/// Sort order for the list. Every order is stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Store order
    #[default]
    None,
    /// Earliest deadline first, tasks without a deadline last
    Deadline,
    /// High, then Medium, then Low
    Priority,
    /// Most time spent first
    TimeSpent,
}

/// Everything that decides which tasks are shown
#[derive(Debug, Clone)]
pub struct ViewQuery {
    /// Case-insensitive substring matched against the task name
    pub search: String,
    pub status: StatusFilter,
    pub category: CategoryFilter,
    pub sort: SortKey,
    /// 1-based
    pub page: usize,
    pub page_size: usize,
}

impl Default for ViewQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: StatusFilter::All,
            category: CategoryFilter::All,
            sort: SortKey::None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of matching tasks
#[derive(Debug)]
pub struct Page<'a> {
    pub items: Vec<&'a Task>,
    pub page: usize,
    pub total_pages: usize,
    pub total_matches: usize,
}

/// Apply search, filters, sort and paging to a task list
pub fn apply<'a>(tasks: &'a [Task], query: &ViewQuery) -> Page<'a> {
    let needle = query.search.to_lowercase();

    let mut matches: Vec<&Task> = tasks
        .iter()
        .filter(|task| query.status.matches(task))
        .filter(|task| query.category.matches(task))
        .filter(|task| task.name.to_lowercase().contains(&needle))
        .collect();

    match query.sort {
        SortKey::None => {}
        // Tasks without a deadline carry `true` and land after dated ones
        SortKey::Deadline => matches.sort_by_key(|task| (task.deadline.is_none(), task.deadline)),
        SortKey::Priority => matches.sort_by_key(|task| task.priority),
        SortKey::TimeSpent => matches.sort_by(|a, b| b.time_spent.cmp(&a.time_spent)),
    }

    let page_size = query.page_size.max(1);
    let total_matches = matches.len();
    let total_pages = total_matches.div_ceil(page_size);
    let page = query.page.max(1);

    let items = matches.into_iter().skip((page - 1) * page_size).take(page_size).collect();

    Page {
        items,
        page,
        total_pages,
        total_matches,
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => write!(f, "All"),
            StatusFilter::Completed => write!(f, "Completed"),
            StatusFilter::Pending => write!(f, "Pending"),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "completed" | "done" => Ok(StatusFilter::Completed),
            "pending" | "open" => Ok(StatusFilter::Pending),
            other => Err(format!("unknown status '{}' (expected all, completed or pending)", other)),
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => write!(f, "All"),
            CategoryFilter::Only(category) => write!(f, "{}", category),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Only(Category::from(s.to_string())))
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::None => write!(f, "None"),
            SortKey::Deadline => write!(f, "Deadline"),
            SortKey::Priority => write!(f, "Priority"),
            SortKey::TimeSpent => write!(f, "TimeSpent"),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "none" => Ok(SortKey::None),
            "deadline" => Ok(SortKey::Deadline),
            "priority" => Ok(SortKey::Priority),
            "timespent" | "time" => Ok(SortKey::TimeSpent),
            other => Err(format!(
                "unknown sort '{}' (expected none, deadline, priority or time-spent)",
                other
            )),
        }
    }
}
