// Flat, exportable view of a stored record

use crate::models::Task;
use std::fmt;

/// Anything that can be written out as one row of a table
pub trait Record {
    /// Collection name for this record type (e.g., "tasks")
    /// Determines the slot key and the default export filename
    fn collection_name() -> &'static str
    where
        Self: Sized;

    /// Top-level fields in column order
    fn export_fields(&self) -> Vec<(&'static str, FieldValue)>;
}

/// Value of a single exported cell
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::List(items) => write!(f, "{}", items.join("; ")),
        }
    }
}

fn date_cell(date: Option<chrono::NaiveDate>) -> FieldValue {
    FieldValue::String(date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default())
}

impl Record for Task {
    fn collection_name() -> &'static str {
        "tasks"
    }

    fn export_fields(&self) -> Vec<(&'static str, FieldValue)> {
        let subtasks = self
            .subtasks
            .iter()
            .map(|s| {
                if s.completed {
                    format!("[x] {}", s.name)
                } else {
                    format!("[ ] {}", s.name)
                }
            })
            .collect();

        vec![
            ("id", FieldValue::String(self.id.clone())),
            ("name", FieldValue::String(self.name.clone())),
            ("priority", FieldValue::String(self.priority.to_string())),
            ("deadline", date_cell(self.deadline)),
            ("category", FieldValue::String(self.category.to_string())),
            ("tags", FieldValue::List(self.tags.clone())),
            ("recurrence", FieldValue::String(self.recurrence.to_string())),
            ("collaborators", FieldValue::List(self.collaborators.clone())),
            ("attachments", FieldValue::List(self.attachments.clone())),
            ("subtasks", FieldValue::List(subtasks)),
            ("completed", FieldValue::Bool(self.completed)),
            ("createdAt", FieldValue::String(self.created_at.to_rfc3339())),
            ("history", FieldValue::List(self.history.clone())),
            ("timeSpent", FieldValue::Int(self.time_spent as i64)),
            ("reminder", date_cell(self.reminder)),
            ("notes", FieldValue::String(self.notes.clone())),
            ("favorite", FieldValue::Bool(self.favorite)),
            ("dependencies", FieldValue::List(self.dependencies.clone())),
            ("comments", FieldValue::List(self.comments.clone())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Subtask;

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::String("test".to_string()).to_string(), "test");
        assert_eq!(FieldValue::Int(42).to_string(), "42");
        assert_eq!(FieldValue::Bool(true).to_string(), "true");
        assert_eq!(
            FieldValue::List(vec!["a".to_string(), "b".to_string()]).to_string(),
            "a; b"
        );
    }

    #[test]
    fn test_task_export_fields() {
        let mut task: Task = serde_json::from_str(r#"{"id":"t-1","name":"Logo","deadline":"2025-02-01"}"#).unwrap();
        task.subtasks.push(Subtask {
            name: "sketch".to_string(),
            completed: true,
        });
        task.subtasks.push(Subtask {
            name: "vector".to_string(),
            completed: false,
        });

        assert_eq!(Task::collection_name(), "tasks");

        let fields = task.export_fields();
        assert_eq!(fields.len(), 19);
        assert_eq!(fields[0], ("id", FieldValue::String("t-1".to_string())));
        assert_eq!(fields[3].1.to_string(), "2025-02-01");
        assert_eq!(fields[9].1.to_string(), "[x] sketch; [ ] vector");
        assert_eq!(fields[14].1.to_string(), "");
    }
}
