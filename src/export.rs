// Spreadsheet export of task collections

use crate::record::Record;
use eyre::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Quote a cell, doubling any quotes inside it
fn csv_escape(value: &str) -> String {
    let escaped = value.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Render records as CSV: a header row, then one row per record
pub fn to_csv<R: Record>(records: &[R]) -> String {
    let mut out = String::new();

    let header = match records.first() {
        Some(first) => first.export_fields().into_iter().map(|(name, _)| name).collect::<Vec<_>>(),
        None => return out,
    };
    out.push_str(&header.join(","));
    out.push('\n');

    for record in records {
        let row = record
            .export_fields()
            .into_iter()
            .map(|(_, value)| csv_escape(&value.to_string().replace("\r\n", "\n")))
            .collect::<Vec<_>>();
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

/// Write records to a CSV file, replacing it atomically
pub fn export_csv<R: Record>(records: &[R], path: &Path) -> Result<()> {
    let csv = to_csv(records);

    // Atomic-ish write via temp + rename
    let tmp = path.with_extension("csv.tmp");
    let mut file = File::create(&tmp).with_context(|| format!("Failed to create {:?}", tmp))?;
    file.write_all(csv.as_bytes())?;
    file.sync_all()?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to move export into place at {:?}", path))?;

    info!(path = ?path, rows = records.len(), "Exported records to CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;
    use tempfile::TempDir;

    fn task(id: &str, name: &str) -> Task {
        serde_json::from_str(&format!(r#"{{"id":"{}","name":"{}"}}"#, id, name)).unwrap()
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "\"plain\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_to_csv_has_header_and_one_row_per_task() {
        let mut first = task("1", "Design, phase one");
        first.tags = vec!["client".to_string(), "logo".to_string()];
        let tasks = vec![first, task("2", "Review")];

        let csv = to_csv(&tasks);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,name,priority,deadline,category,tags"));
        assert!(lines[1].starts_with("\"1\",\"Design, phase one\",\"Medium\""));
        assert!(lines[1].contains("\"client; logo\""));
        assert!(lines[2].starts_with("\"2\",\"Review\""));
    }

    #[test]
    fn test_to_csv_empty() {
        let tasks: Vec<Task> = Vec::new();
        assert_eq!(to_csv(&tasks), "");
    }

    #[test]
    fn test_export_csv_writes_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tasks.csv");

        export_csv(&[task("1", "Write proposal")], &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("Write proposal"));
        assert!(!temp.path().join("tasks.csv.tmp").exists());
    }
}
