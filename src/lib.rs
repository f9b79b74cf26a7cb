// Taskboard - freelancer task list persisted to local key-value slots

pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod record;
pub mod slots;
pub mod store;
pub mod view;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Backend, Config};
pub use error::{TaskError, TaskResult};
pub use models::{Category, NewTask, Priority, Recurrence, RunningTimer, Subtask, Task, TaskPatch};
pub use record::{FieldValue, Record};
pub use slots::{FileSlots, MemorySlots, SlotBackend, SqliteSlots};
pub use store::{TaskStore, Toggled};
pub use view::{CategoryFilter, Page, SortKey, StatusFilter, ViewQuery};
