//! # State Store
//!
//! The variable namespaces bound expressions read and write: one flat
//! global namespace and one namespace per scope root. Lookup falls back to
//! the durable store for `$` names, and every write records a changed key
//! so the runtime knows which bindings to re-run.

use crate::persistence::{is_durable, DurableStore, MemoryStore};
use indexmap::IndexSet;
use minibind_evaluator::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Identity of one reactive variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChangedKey {
    Global(String),
    Scoped { scope: String, name: String },
}

pub struct StateStore {
    globals: HashMap<String, Value>,
    scopes: HashMap<String, HashMap<String, Value>>,
    durable: Box<dyn DurableStore>,
    changed: IndexSet<ChangedKey>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }
}

impl StateStore {
    pub fn new(durable: Box<dyn DurableStore>) -> Self {
        Self {
            globals: HashMap::new(),
            scopes: HashMap::new(),
            durable,
            changed: IndexSet::new(),
        }
    }

    /// Global lookup, loading `$` names from the durable store on first use
    pub fn get(&mut self, name: &str) -> Option<Value> {
        if let Some(value) = self.globals.get(name) {
            return Some(value.clone());
        }
        if !is_durable(name) {
            return None;
        }
        let value = self.durable.load_value(name)?;
        debug!(name, "loaded durable variable");
        self.globals.insert(name.to_string(), value.clone());
        Some(value)
    }

    /// Value without durable fallback
    pub fn peek(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        if is_durable(name) {
            if let Err(error) = self.durable.save_value(name, &value) {
                warn!(name, %error, "failed to persist variable");
            }
        }
        self.globals.insert(name.to_string(), value);
        self.changed.insert(ChangedKey::Global(name.to_string()));
    }

    // -- Scopes --------------------------------------------------------------

    pub fn create_scope(&mut self, scope: &str) {
        self.scopes.entry(scope.to_string()).or_default();
    }

    pub fn drop_scope(&mut self, scope: &str) {
        self.scopes.remove(scope);
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains_key(scope)
    }

    /// Make sure `name` has a slot in `scope`, seeding `$` names from the
    /// durable store
    pub fn ensure_slot(&mut self, scope: &str, name: &str) {
        let key = scoped_key(scope, name);
        let seeded = is_durable(name)
            .then(|| self.durable.load_value(&key))
            .flatten();
        let Some(slots) = self.scopes.get_mut(scope) else {
            return;
        };
        if !slots.contains_key(name) {
            slots.insert(name.to_string(), seeded.unwrap_or(Value::Undefined));
        }
    }

    pub fn scoped_get(&self, scope: &str, name: &str) -> Option<Value> {
        let slots = self.scopes.get(scope)?;
        Some(slots.get(name).cloned().unwrap_or(Value::Undefined))
    }

    /// Write a scoped variable; `false` when the scope does not exist
    pub fn scoped_set(&mut self, scope: &str, name: &str, value: Value) -> bool {
        let Some(slots) = self.scopes.get_mut(scope) else {
            return false;
        };
        if is_durable(name) {
            if let Err(error) = self.durable.save_value(&scoped_key(scope, name), &value) {
                warn!(scope, name, %error, "failed to persist scoped variable");
            }
        }
        slots.insert(name.to_string(), value);
        self.changed.insert(ChangedKey::Scoped {
            scope: scope.to_string(),
            name: name.to_string(),
        });
        true
    }

    /// Keys written since the last call, in write order
    pub fn take_changed(&mut self) -> Vec<ChangedKey> {
        std::mem::take(&mut self.changed).into_iter().collect()
    }

    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    pub fn globals(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.globals.iter()
    }
}

fn scoped_key(scope: &str, name: &str) -> String {
    format!("{}.{}", scope, name)
}
