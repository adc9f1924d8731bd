//! Flat-file key/value memory for the assistant.

use std::{collections::BTreeMap, fs, path::PathBuf};

use serde_json::Value;

use crate::{config::Config, error::Result};

#[derive(Debug, Clone)]
pub struct MemoryStore {
    path: PathBuf,
}

impl MemoryStore {
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.memory_path())
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<BTreeMap<String, Value>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn write_all(&self, entries: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Replace atomically via a sibling temp file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value);
        self.write_all(&entries)
    }

    /// Returns whether the key was present.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let mut entries = self.read_all()?;
        let existed = entries.remove(key).is_some();
        if existed {
            self.write_all(&entries)?;
        }
        Ok(existed)
    }

    pub fn entries(&self) -> Result<BTreeMap<String, Value>> {
        self.read_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mem = MemoryStore::new(dir.path().join("nested").join("memory.json"));

        assert_eq!(mem.get("village").unwrap(), None);
        mem.set("village", json!("Hosur")).unwrap();
        mem.set("acres", json!(4.5)).unwrap();
        assert_eq!(mem.get("village").unwrap(), Some(json!("Hosur")));

        let keys: Vec<String> = mem.entries().unwrap().into_keys().collect();
        assert_eq!(keys, vec!["acres".to_string(), "village".to_string()]);

        assert!(mem.remove("village").unwrap());
        assert!(!mem.remove("village").unwrap());
        assert_eq!(mem.get("village").unwrap(), None);
    }

    #[test]
    fn empty_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        fs::write(&path, "").unwrap();
        assert!(MemoryStore::new(path).entries().unwrap().is_empty());
    }
}
