// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Key/value preference store with typed reads and batched writes.
//!
//! Provides:
//! - `MemoryStore` (tests, and anything that does not need to survive a restart)
//! - `JsonFileStore` (a single JSON object on disk, rewritten on every batch)

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A stored preference value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Int(i64),
    String(String),
}

/// Writes applied together by [`KeyValueStore::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    entries: Vec<(String, PrefValue)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries
            .push((key.into(), PrefValue::String(value.into())));
        self
    }

    pub fn put_int(mut self, key: impl Into<String>, value: i64) -> Self {
        self.entries.push((key.into(), PrefValue::Int(value)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[(String, PrefValue)] {
        &self.entries
    }
}

/// Durable preference storage.
///
/// Reads fall back to `default` when the key is absent or holds the other type.
pub trait KeyValueStore: Send {
    fn get_string(&self, key: &str, default: &str) -> String;

    fn get_int(&self, key: &str, default: i64) -> i64;

    /// Apply every write in the batch. Later writes to the same key win.
    fn apply(&mut self, batch: WriteBatch) -> Result<()>;
}

fn read_string(values: &BTreeMap<String, PrefValue>, key: &str, default: &str) -> String {
    match values.get(key) {
        Some(PrefValue::String(s)) => s.clone(),
        _ => default.to_string(),
    }
}

fn read_int(values: &BTreeMap<String, PrefValue>, key: &str, default: i64) -> i64 {
    match values.get(key) {
        Some(PrefValue::Int(v)) => *v,
        _ => default,
    }
}

/// In-memory store that counts applied batches.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, PrefValue>,
    batches_applied: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-empty batches applied so far.
    pub fn batches_applied(&self) -> usize {
        self.batches_applied
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get_string(&self, key: &str, default: &str) -> String {
        read_string(&self.values, key, default)
    }

    fn get_int(&self, key: &str, default: i64) -> i64 {
        read_int(&self.values, key, default)
    }

    fn apply(&mut self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.values.extend(batch.entries);
        self.batches_applied += 1;
        Ok(())
    }
}

/// Store persisted as one JSON object.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, PrefValue>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Store file not found, starting empty");
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), keys = values.len(), "Opened key/value store");
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_to_disk(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.values)?;
        // Write then rename so a crash never leaves a truncated file behind.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            AppError::Storage(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_string(&self, key: &str, default: &str) -> String {
        read_string(&self.values, key, default)
    }

    fn get_int(&self, key: &str, default: i64) -> i64 {
        read_int(&self.values, key, default)
    }

    fn apply(&mut self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let count = batch.len();
        self.values.extend(batch.entries);
        self.write_to_disk()?;
        tracing::debug!(writes = count, "Applied write batch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_defaults() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get_string("missing", "fallback"), "fallback");
        assert_eq!(store.get_int("missing", 7), 7);

        store
            .apply(WriteBatch::new().put_string("a", "x").put_int("a_p", 3))
            .unwrap();
        assert_eq!(store.get_string("a", ""), "x");
        assert_eq!(store.get_int("a_p", 0), 3);

        // Type mismatch falls back to the default.
        assert_eq!(store.get_int("a", -1), -1);
        assert_eq!(store.get_string("a_p", "none"), "none");
    }

    #[test]
    fn test_empty_batch_is_not_counted() {
        let mut store = MemoryStore::new();
        store.apply(WriteBatch::new()).unwrap();
        assert_eq!(store.batches_applied(), 0);
        assert!(!store.contains_key("a"));
    }

    #[test]
    fn test_batch_keeps_write_order() {
        let batch = WriteBatch::new()
            .put_string("a", "x")
            .put_int("a_p", 1)
            .put_int("a_p", 2);
        assert_eq!(batch.len(), 3);
        assert_eq!(
            batch.entries().last(),
            Some(&("a_p".to_string(), PrefValue::Int(2)))
        );

        let mut store = MemoryStore::new();
        store.apply(batch).unwrap();
        assert!(store.contains_key("a"));
        assert_eq!(store.get_int("a_p", 0), 2);
        assert_eq!(store.batches_applied(), 1);
    }

    #[test]
    fn test_json_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store
            .apply(
                WriteBatch::new()
                    .put_string("destinations", "3|true|KB|55.0|12.0||true|local_bar")
                    .put_int("visit_kb_p", 1),
            )
            .unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get_int("visit_kb_p", 0), 1);
        assert!(reopened.get_string("destinations", "").starts_with("3|true|KB"));
    }

    #[test]
    fn test_json_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(AppError::Serialization(_))
        ));
    }
}
