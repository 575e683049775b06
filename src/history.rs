// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! History management for undo support

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::rewrite;
use crate::{BlurwatchError, Result};

/// A single settings rewrite in history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub settings_path: PathBuf,
    pub source_image: String,
    pub blurred_image: PathBuf,
    pub radius: u32,
    pub original_line: String,
    pub replacement: Vec<String>,
    pub undone: bool,
}

/// History manager for tracking settings rewrites
pub struct History {
    path: PathBuf,
}

impl History {
    /// Create a new history manager
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append an entry to the history
    pub fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    /// Read all history entries
    pub fn read_all(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!("Failed to parse history entry: {}", e);
                }
            }
        }

        Ok(entries)
    }

    /// Get the most recent N entries (newest first)
    pub fn get_recent(&self, count: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries = self.read_all()?;
        entries.reverse();
        entries.truncate(count);
        Ok(entries)
    }

    /// Mark an entry as undone
    pub fn mark_undone(&self, id: &str) -> Result<()> {
        let entries = self.read_all()?;

        // Rewrite the entire file with the updated entry
        let file = File::create(&self.path)?;
        let mut writer = std::io::BufWriter::new(file);

        for mut entry in entries {
            if entry.id == id {
                entry.undone = true;
            }
            let json = serde_json::to_string(&entry)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Most recent entry for a settings file that hasn't been undone
    pub fn last_undoable(&self, settings_path: &Path) -> Result<Option<HistoryEntry>> {
        let entries = self.read_all()?;
        Ok(entries
            .into_iter()
            .rev()
            .find(|e| !e.undone && e.settings_path == settings_path))
    }

    /// Revert the latest rewrite of `settings_path`
    ///
    /// Puts the original image line back and, unless `keep_image` is set,
    /// removes the blurred file. Returns the reverted entry, or `None` when
    /// there is nothing to undo.
    pub fn undo(&self, settings_path: &Path, keep_image: bool, dry_run: bool) -> Result<Option<HistoryEntry>> {
        let Some(entry) = self.last_undoable(settings_path)? else {
            return Ok(None);
        };

        let text = fs::read_to_string(settings_path)?;
        let restored = rewrite::restore(&text, &entry.original_line, &entry.replacement)
            .ok_or_else(|| {
                BlurwatchError::History(format!(
                    "rewritten lines for {} not found in {:?}; was the file edited since?",
                    entry.source_image, settings_path
                ))
            })?;

        if dry_run {
            info!("DRY RUN: Would restore {} in {:?}", entry.source_image, settings_path);
            return Ok(Some(entry));
        }

        fs::write(settings_path, restored)?;
        if !keep_image && entry.blurred_image.exists() {
            fs::remove_file(&entry.blurred_image)?;
        }
        self.mark_undone(&entry.id)?;
        info!("Restored {} in {:?}", entry.source_image, settings_path);

        Ok(Some(entry))
    }

    /// Clear all history
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Get history file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Create a new history entry
pub fn create_entry(
    id: String,
    settings_path: PathBuf,
    source_image: String,
    blurred_image: PathBuf,
    radius: u32,
    original_line: String,
    replacement: Vec<String>,
) -> HistoryEntry {
    HistoryEntry {
        id,
        timestamp: Utc::now(),
        settings_path,
        source_image,
        blurred_image,
        radius,
        original_line,
        replacement,
        undone: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, settings: &Path, blurred: PathBuf) -> HistoryEntry {
        create_entry(
            id.to_string(),
            settings.to_path_buf(),
            "a.png".to_string(),
            blurred,
            4,
            "  \"backgroundImage\": \"a.png\",".to_string(),
            vec![
                "  \"backgroundImage\": \"a.png\",".to_string(),
                "  \"backgroundImage\": \"/t/blurred-r4-a.png\",".to_string(),
            ],
        )
    }

    #[test]
    fn test_append_and_recent() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("h.jsonl"));
        let settings = dir.path().join("settings.json");

        assert!(history.read_all().unwrap().is_empty());
        history.append(&entry("one", &settings, dir.path().join("b1.png"))).unwrap();
        history.append(&entry("two", &settings, dir.path().join("b2.png"))).unwrap();

        let recent = history.get_recent(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "two");
    }

    #[test]
    fn test_corrupt_lines_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("h.jsonl"));
        let settings = dir.path().join("settings.json");
        history.append(&entry("one", &settings, dir.path().join("b.png"))).unwrap();
        let mut file = OpenOptions::new().append(true).open(history.path()).unwrap();
        writeln!(file, "{{ not json").unwrap();
        writeln!(file).unwrap();

        assert_eq!(history.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_undo_restores_and_removes_image() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("h.jsonl"));
        let settings = dir.path().join("settings.json");
        let blurred = dir.path().join("blurred-r4-a.png");
        std::fs::write(&blurred, b"png").unwrap();
        std::fs::write(
            &settings,
            "{\n  \"backgroundImage\": \"a.png\",\n  \"backgroundImage\": \"/t/blurred-r4-a.png\",\n}",
        )
        .unwrap();
        history.append(&entry("one", &settings, blurred.clone())).unwrap();

        let undone = history.undo(&settings, false, false).unwrap().unwrap();
        assert_eq!(undone.id, "one");
        assert_eq!(
            std::fs::read_to_string(&settings).unwrap(),
            "{\n  \"backgroundImage\": \"a.png\",\n}"
        );
        assert!(!blurred.exists());
        assert!(history.read_all().unwrap()[0].undone);

        // Nothing left to undo
        assert!(history.undo(&settings, false, false).unwrap().is_none());
    }

    #[test]
    fn test_undo_dry_run_and_keep_image() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("h.jsonl"));
        let settings = dir.path().join("settings.json");
        let blurred = dir.path().join("blurred-r4-a.png");
        std::fs::write(&blurred, b"png").unwrap();
        let text = "  \"backgroundImage\": \"a.png\",\n  \"backgroundImage\": \"/t/blurred-r4-a.png\",";
        std::fs::write(&settings, text).unwrap();
        history.append(&entry("one", &settings, blurred.clone())).unwrap();

        history.undo(&settings, false, true).unwrap().unwrap();
        assert_eq!(std::fs::read_to_string(&settings).unwrap(), text);
        assert!(!history.read_all().unwrap()[0].undone);

        history.undo(&settings, true, false).unwrap().unwrap();
        assert!(blurred.exists());
    }

    #[test]
    fn test_undo_after_manual_edit_fails() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("h.jsonl"));
        let settings = dir.path().join("settings.json");
        std::fs::write(&settings, "{}").unwrap();
        history.append(&entry("one", &settings, dir.path().join("b.png"))).unwrap();

        assert!(matches!(
            history.undo(&settings, false, false),
            Err(BlurwatchError::History(_))
        ));
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("h.jsonl"));
        history.append(&entry("one", &dir.path().join("s.json"), dir.path().join("b.png"))).unwrap();
        history.clear().unwrap();
        assert!(!history.path().exists());
        history.clear().unwrap();
    }
}
