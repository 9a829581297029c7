//! Durable variable storage.
//!
//! Only `$`-prefixed names reach the store. Values are kept as JSON text so
//! any backend that can hold strings works.

use crate::error::RuntimeResult;
use minibind_evaluator::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Marker prefix of durably persisted variable names
pub const DURABLE_MARKER: char = '$';

pub fn is_durable(name: &str) -> bool {
    name.starts_with(DURABLE_MARKER)
}

pub trait DurableStore {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&mut self, key: &str, value: &str) -> RuntimeResult<()>;
    fn remove(&mut self, key: &str) -> RuntimeResult<()>;

    fn load_value(&self, key: &str) -> Option<Value> {
        let text = self.load(key)?;
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(json) => Some(Value::from_json(&json)),
            Err(error) => {
                tracing::warn!(key, %error, "ignoring unreadable durable value");
                None
            }
        }
    }

    fn save_value(&mut self, key: &str, value: &Value) -> RuntimeResult<()> {
        let text = serde_json::to_string(&value.to_json())?;
        self.save(key, &text)
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) -> RuntimeResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> RuntimeResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per variable under `base_path`
#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn path(&self, key: &str) -> PathBuf {
        let file = key.replace(['/', '\\'], "_");
        self.base_path.join(format!("{}.json", file))
    }
}

impl DurableStore for FileStore {
    fn load(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key)).ok()
    }

    fn save(&mut self, key: &str, value: &str) -> RuntimeResult<()> {
        fs::create_dir_all(&self.base_path)?;
        fs::write(self.path(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> RuntimeResult<()> {
        let path = self.path(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
