// Data models for the task board

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Task priority. Ordering follows display order: High < Medium < Low.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "High"),
            Priority::Medium => write!(f, "Medium"),
            Priority::Low => write!(f, "Low"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority '{}' (expected high, medium or low)", other)),
        }
    }
}

/// Task category. Text outside the known set is kept verbatim in `Other`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    #[default]
    General,
    Work,
    Personal,
    Urgent,
    Other(String),
}

impl Category {
    /// Map `Other` text that names a known category onto that variant
    pub fn canonical(self) -> Self {
        match self {
            Category::Other(text) => Category::from(text),
            known => known,
        }
    }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "" | "general" => Category::General,
            "work" => Category::Work,
            "personal" => Category::Personal,
            "urgent" => Category::Urgent,
            _ => Category::Other(raw.trim().to_string()),
        }
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::General => write!(f, "General"),
            Category::Work => write!(f, "Work"),
            Category::Personal => write!(f, "Personal"),
            Category::Urgent => write!(f, "Urgent"),
            Category::Other(text) => write!(f, "{}", text),
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Category::from(s.to_string()))
    }
}

/// How a task repeats once completed. Persisted as free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    /// Text that names no known interval; completing the task spawns nothing
    Unrecognized(String),
}

impl Recurrence {
    /// Days added to the deadline of the follow-up task
    pub fn interval_days(&self) -> Option<u64> {
        match self {
            Recurrence::Daily => Some(1),
            Recurrence::Weekly => Some(7),
            Recurrence::Monthly => Some(30),
            Recurrence::None | Recurrence::Unrecognized(_) => None,
        }
    }

    /// Map `Unrecognized` text that names a known interval onto that variant
    pub fn canonical(self) -> Self {
        match self {
            Recurrence::Unrecognized(text) => Recurrence::from(text),
            known => known,
        }
    }
}

impl From<String> for Recurrence {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "" | "none" => Recurrence::None,
            "daily" => Recurrence::Daily,
            "weekly" => Recurrence::Weekly,
            "monthly" => Recurrence::Monthly,
            _ => Recurrence::Unrecognized(raw.trim().to_string()),
        }
    }
}

impl From<Recurrence> for String {
    fn from(recurrence: Recurrence) -> Self {
        recurrence.to_string()
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::None => Ok(()),
            Recurrence::Daily => write!(f, "daily"),
            Recurrence::Weekly => write!(f, "weekly"),
            Recurrence::Monthly => write!(f, "monthly"),
            Recurrence::Unrecognized(text) => write!(f, "{}", text),
        }
    }
}

impl FromStr for Recurrence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Recurrence::from(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub name: String,
    #[serde(default)]
    pub completed: bool,
}

/// A single task record, as stored in the `tasks` and `archivedTasks` slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, with = "date_or_empty")]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub collaborators: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub time_spent: u64,
    #[serde(default, with = "date_or_empty")]
    pub reminder: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub comments: Vec<String>,
}

impl Task {
    /// True when the deadline lies strictly before `today` and the task is still open
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.deadline.is_some_and(|deadline| deadline < today)
    }

    pub fn completed_subtasks(&self) -> usize {
        self.subtasks.iter().filter(|s| s.completed).count()
    }

    pub(crate) fn record(&mut self, event: &str, now: DateTime<Utc>) {
        self.history.push(format!("{} on {}", event, history_stamp(now)));
    }
}

/// Input for creating a task
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub name: String,
    pub priority: Priority,
    pub deadline: Option<NaiveDate>,
    pub category: Category,
    pub tags: Vec<String>,
    pub recurrence: Recurrence,
    pub collaborators: Vec<String>,
    pub attachments: Vec<String>,
}

impl NewTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category.canonical();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = recurrence.canonical();
        self
    }

    pub fn with_collaborators<I, S>(mut self, collaborators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collaborators = collaborators.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_attachments<I, S>(mut self, attachments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attachments = attachments.into_iter().map(Into::into).collect();
        self
    }
}

/// Fields that can be changed by an edit. `None` leaves the field alone.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub priority: Option<Priority>,
    /// `Some(None)` clears the deadline
    pub deadline: Option<Option<NaiveDate>>,
    pub category: Option<Category>,
    pub tags: Option<Vec<String>>,
    pub recurrence: Option<Recurrence>,
    pub collaborators: Option<Vec<String>>,
    pub attachments: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.priority.is_none()
            && self.deadline.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.recurrence.is_none()
            && self.collaborators.is_none()
            && self.attachments.is_none()
    }

    pub(crate) fn apply(self, task: &mut Task) {
        if let Some(name) = self.name {
            task.name = name.trim().to_string();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(category) = self.category {
            task.category = category.canonical();
        }
        if let Some(tags) = self.tags {
            task.tags = clean_list(tags);
        }
        if let Some(recurrence) = self.recurrence {
            task.recurrence = recurrence.canonical();
        }
        if let Some(collaborators) = self.collaborators {
            task.collaborators = clean_list(collaborators);
        }
        if let Some(attachments) = self.attachments {
            task.attachments = clean_list(attachments);
        }
    }
}

/// The one timer that may run across the whole store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningTimer {
    pub task_id: String,
    pub started_at: DateTime<Utc>,
}

/// Trim entries and drop the empty ones
pub(crate) fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Human-readable local timestamp used in history entries
pub fn history_stamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

// Dates are stored as "YYYY-MM-DD", with "" (or null) meaning unset
mod date_or_empty {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => {
                // Tolerate full ISO timestamps by keeping the date part
                let date_part = text.split('T').next().unwrap_or(text);
                NaiveDate::parse_from_str(date_part, FORMAT)
                    .map(Some)
                    .map_err(serde::de::Error::custom)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_recurrence_parsing() {
        assert_eq!(Recurrence::from("Weekly".to_string()), Recurrence::Weekly);
        assert_eq!(Recurrence::from("  ".to_string()), Recurrence::None);
        assert_eq!(
            Recurrence::from("fortnightly".to_string()),
            Recurrence::Unrecognized("fortnightly".to_string())
        );
        assert_eq!(Recurrence::Daily.interval_days(), Some(1));
        assert_eq!(Recurrence::Monthly.interval_days(), Some(30));
        assert_eq!(Recurrence::Unrecognized("x".to_string()).interval_days(), None);
    }

    #[test]
    fn test_category_fallback() {
        assert_eq!("work".parse::<Category>().unwrap(), Category::Work);
        assert_eq!(
            "Clients".parse::<Category>().unwrap(),
            Category::Other("Clients".to_string())
        );
        assert_eq!(serde_json::to_string(&Category::Urgent).unwrap(), "\"Urgent\"");
    }

    #[test]
    fn test_task_deserializes_browser_format() {
        // Browser-era slot payload, with empty strings for unset dates
        let json = r#"{
            "id": "abc",
            "name": "Invoice client",
            "priority": "High",
            "deadline": "",
            "category": "Work",
            "tags": ["billing"],
            "recurrence": "Monthly",
            "collaborators": [""],
            "attachments": [],
            "subtasks": [{"name": "draft", "completed": true}],
            "completed": false,
            "createdAt": "2025-01-01T10:00:00.000Z",
            "history": ["Task created on 1/1/2025"],
            "timeSpent": 15,
            "reminder": null,
            "notes": "",
            "favorite": true,
            "dependencies": [],
            "comments": []
        }"#;

        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.deadline, None);
        assert_eq!(task.reminder, None);
        assert_eq!(task.recurrence, Recurrence::Monthly);
        assert_eq!(task.time_spent, 15);
        assert_eq!(task.completed_subtasks(), 1);
    }

    #[test]
    fn test_task_minimal_record_uses_defaults() {
        let task: Task = serde_json::from_str(r#"{"id":"1","name":"Bare"}"#).unwrap();
        assert_eq!(task.category, Category::General);
        assert_eq!(task.recurrence, Recurrence::None);
        assert!(task.history.is_empty());
    }

    #[test]
    fn test_dates_serialize_as_plain_strings() {
        let mut task: Task = serde_json::from_str(r#"{"id":"1","name":"Bare"}"#).unwrap();
        task.deadline = Some(date("2025-01-08"));

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["deadline"], "2025-01-08");
        assert_eq!(value["reminder"], "");
        assert_eq!(value["recurrence"], "");
        assert!(value.get("timeSpent").is_some());
    }

    #[test]
    fn test_is_overdue() {
        let mut task: Task = serde_json::from_str(r#"{"id":"1","name":"Bare"}"#).unwrap();
        let today = date("2025-03-10");
        assert!(!task.is_overdue(today));

        task.deadline = Some(date("2025-03-09"));
        assert!(task.is_overdue(today));

        task.deadline = Some(today);
        assert!(!task.is_overdue(today));

        task.deadline = Some(date("2025-03-01"));
        task.completed = true;
        assert!(!task.is_overdue(today));
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(TaskPatch::default().is_empty());
        let patch = TaskPatch {
            deadline: Some(None),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_clean_list_drops_blank_entries() {
        let cleaned = clean_list(vec![" a ".to_string(), "".to_string(), "  ".to_string(), "b".to_string()]);
        assert_eq!(cleaned, vec!["a", "b"]);
    }
}
