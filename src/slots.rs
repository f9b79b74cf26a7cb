// Durable key-value slots backing the task store

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// A named-slot store holding one serialized value per key.
///
/// Writes replace the whole slot. There is no versioning and no merge:
/// the last writer wins.
pub trait SlotBackend {
    /// Read a slot. `Ok(None)` means the slot has never been written.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replace a slot's contents
    fn write(&mut self, key: &str, value: &str) -> Result<()>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Read and decode a slot, treating absent or malformed contents as missing
pub fn load_slot<T: DeserializeOwned>(backend: &dyn SlotBackend, key: &str) -> Option<T> {
    let raw = match backend.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(backend = backend.name(), key, "Slot is empty");
            return None;
        }
        Err(e) => {
            warn!(backend = backend.name(), key, error = ?e, "Failed to read slot, starting empty");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(backend = backend.name(), key, error = ?e, "Failed to parse slot, starting empty");
            None
        }
    }
}

/// Encode a value as JSON and write it to a slot
pub fn save_slot<T: Serialize + ?Sized>(backend: &mut dyn SlotBackend, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value).context("Failed to serialize slot")?;
    backend.write(key, &json)
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Slot key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Slot key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid slot key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}

// ============================================================================
// SQLite
// ============================================================================

/// Slots kept as rows of a single SQLite table
pub struct SqliteSlots {
    db: Connection,
}

impl SqliteSlots {
    /// Open or create `taskboard.db` inside `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).context("Failed to create data directory")?;

        let db_path = dir.join("taskboard.db");
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;
        info!(path = ?db_path, "Opened SQLite slot store");

        let slots = Self { db };
        slots.create_schema()?;
        Ok(slots)
    }

    /// In-memory database, gone when dropped
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let slots = Self { db };
        slots.create_schema()?;
        Ok(slots)
    }

    fn create_schema(&self) -> Result<()> {
        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl SlotBackend for SqliteSlots {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .db
            .query_row("SELECT value FROM slots WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.db.execute(
            "INSERT OR REPLACE INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, chrono::Utc::now().timestamp_millis()],
        )?;
        debug!(key, bytes = value.len(), "Wrote SQLite slot");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

// ============================================================================
// JSON files
// ============================================================================

/// One `<key>.json` file per slot
pub struct FileSlots {
    dir: PathBuf,
}

impl FileSlots {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create data directory")?;
        info!(path = ?dir, "Opened JSON file slot store");
        Ok(Self { dir })
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl SlotBackend for FileSlots {
    fn read(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let path = self.slot_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("Failed to read slot file {:?}", path))?;
        Ok(Some(raw))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.slot_path(key);

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .context("Failed to open slot file for writing")?;

        // Truncate only once the lock is held
        file.lock_exclusive().context("Failed to acquire file lock")?;
        file.set_len(0)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;

        // Lock is released when file is dropped
        debug!(key, bytes = value.len(), "Wrote slot file");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Slots held in a shared map. Clones see the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemorySlots {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw contents of a slot
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Overwrite a slot directly, bypassing any store
    pub fn put(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SlotBackend for MemorySlots {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.put(key, value);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
