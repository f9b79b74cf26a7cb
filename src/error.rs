// Validation errors reported by task store operations

use thiserror::Error;

/// A rejected operation. The store is left exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task name cannot be empty")]
    EmptyName,

    #[error("No task with id {0}")]
    NotFound(String),

    #[error("No archived task with id {0}")]
    ArchivedNotFound(String),

    #[error("Time spent must be a positive number of minutes, got {0}")]
    InvalidMinutes(i64),

    /// Only one timer may run across the whole store
    #[error("Another timer is running (task {running}). Please stop it first")]
    TimerBusy { running: String },

    #[error("No timer is running for task {0}")]
    TimerNotRunning(String),

    #[error("Subtask name cannot be empty")]
    EmptySubtask,

    #[error("Subtask index {index} out of range (task has {len} subtasks)")]
    SubtaskOutOfRange { index: usize, len: usize },

    #[error("Comment cannot be empty")]
    EmptyComment,

    #[error("No dependency ids given")]
    NoDependencies,

    #[error("Invalid order: {0}")]
    InvalidOrder(String),
}

pub type TaskResult<T> = std::result::Result<T, TaskError>;
