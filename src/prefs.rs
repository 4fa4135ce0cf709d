//! Durable key/value preferences.
//!
//! The [`PreferenceStore`] trait is injected into the generation session so
//! the persisted system prompt never lives in a global. Two backends:
//!
//! - [`FilePreferenceStore`]: a JSON object on disk, rewritten on every
//!   change so edits survive process restarts.
//! - [`InMemoryPreferenceStore`]: `HashMap` behind a `RwLock`, for tests.
//!
//! Empty (or whitespace-only) values have no stored representation:
//! `save(k, "")` behaves exactly like `clear(k)`.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Key under which the RAG system prompt is stored.
pub const SYSTEM_PROMPT_KEY: &str = "rag_system_prompt";

pub trait PreferenceStore: Send + Sync {
    /// Stored value, or `None` if the key was never set or was cleared.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Store a value. Blank values clear the key.
    fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the key. Removing an absent key is not an error.
    fn clear(&self, key: &str) -> Result<()>;
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

// ============ File store ============

/// Preferences persisted as a flat JSON object.
///
/// Every `save`/`clear` rewrites the file synchronously; there is no
/// batching. Writes go to a sibling `.tmp` file that is renamed over the
/// original, so a reader never sees a half-written file. A missing file
/// reads as an empty store.
pub struct FilePreferenceStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read preferences: {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse preferences: {}", self.path.display()))
    }

    fn write_all(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(map)?;
        let tmp = self.tmp_path();
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write preferences: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace preferences: {}", self.path.display()))
    }

    /// Sibling file the new contents are staged in before the rename.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "prefs.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        if is_blank(value) {
            return self.clear(key);
        }
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_all()?;
        map.insert(key.to_string(), value.to_string());
        self.write_all(&map)
    }

    fn clear(&self, key: &str) -> Result<()> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_all()?;
        if map.remove(key).is_some() {
            self.write_all(&map)?;
        }
        Ok(())
    }
}

// ============ In-memory store ============

#[derive(Default)]
pub struct InMemoryPreferenceStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        if is_blank(value) {
            return self.clear(key);
        }
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}
