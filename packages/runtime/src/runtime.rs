//! # Runtime
//!
//! Owns the document, the state store, the entity registry and the listener
//! table. All binding work happens through `&mut Runtime` on one thread;
//! mutation batches are processed one at a time by the coordinator.

use crate::config::RuntimeConfig;
use crate::dom::{Document, NodeId};
use crate::entity::{Entity, EntityId, EntityState};
use crate::error::{BindingReport, RuntimeError, RuntimeResult};
use crate::host::BindingHost;
use crate::id_generator::IdGenerator;
use crate::listeners::ListenerTable;
use crate::persistence::{DurableStore, FileStore, MemoryStore};
use crate::registry::Registry;
use crate::scripts::{BlockExecutor, InterpreterExecutor, PendingBlocks};
use crate::state::{ChangedKey, StateStore};
use minibind_evaluator::{evaluate, Frame, Value};
use minibind_parser::SCOPE_ROOT;
use tracing::{debug, warn};

pub struct Runtime {
    pub(crate) document: Document,
    pub(crate) state: StateStore,
    pub(crate) registry: Registry,
    pub(crate) listeners: ListenerTable,
    pub(crate) blocks: PendingBlocks,
    pub(crate) config: RuntimeConfig,
    pub(crate) ids: IdGenerator,
    pub(crate) executor: Box<dyn BlockExecutor>,
}

impl Runtime {
    /// Runtime over `document` with the durable store named by the config
    pub fn new(document: Document, config: RuntimeConfig) -> Self {
        let store: Box<dyn DurableStore> = match &config.storage_dir {
            Some(dir) => Box::new(FileStore::new(dir.clone())),
            None => Box::new(MemoryStore::new()),
        };
        Self::with_store(document, config, store)
    }

    pub fn with_store(document: Document, config: RuntimeConfig, store: Box<dyn DurableStore>) -> Self {
        Self {
            document,
            state: StateStore::new(store),
            registry: Registry::new(),
            listeners: ListenerTable::new(),
            blocks: PendingBlocks::new(),
            config,
            ids: IdGenerator::new(),
            executor: Box::new(InterpreterExecutor),
        }
    }

    pub fn with_executor(mut self, executor: impl BlockExecutor + 'static) -> Self {
        self.executor = Box::new(executor);
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Direct document access; changes are picked up by the next
    /// [`Runtime::flush`] while observing
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn listeners(&self) -> &ListenerTable {
        &self.listeners
    }

    pub fn blocks(&self) -> &PendingBlocks {
        &self.blocks
    }

    pub fn entity(&self, id: &EntityId) -> RuntimeResult<&Entity> {
        self.registry
            .get(id)
            .ok_or_else(|| RuntimeError::stale(id.as_str()))
    }

    pub(crate) fn entity_mut(&mut self, id: &EntityId) -> RuntimeResult<&mut Entity> {
        self.registry
            .get_mut(id)
            .ok_or_else(|| RuntimeError::stale(id.as_str()))
    }

    pub fn entity_for(&self, node: NodeId) -> Option<&Entity> {
        self.registry.for_node(node).and_then(|id| self.registry.get(id))
    }

    /// Lifecycle state; disposed ids report `Disposed`
    pub fn entity_state(&self, id: &EntityId) -> EntityState {
        self.registry
            .get(id)
            .map(|e| e.state)
            .unwrap_or(EntityState::Disposed)
    }

    pub(crate) fn host(&mut self) -> BindingHost<'_> {
        BindingHost {
            document: &mut self.document,
            state: &mut self.state,
            blocks: &mut self.blocks,
            stamp_attribute: &self.config.script_id_attribute,
        }
    }

    // -- State ---------------------------------------------------------------

    /// Global variable, loading `$` names from the durable store
    pub fn variable(&mut self, name: &str) -> Option<Value> {
        self.state.get(name)
    }

    pub fn globals(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.state.globals()
    }

    pub fn scoped_variable(&self, scope: &str, name: &str) -> Option<Value> {
        self.state.scoped_get(scope, name)
    }

    /// Write a global from outside and re-evaluate its dependents
    pub fn set_variable(&mut self, name: &str, value: Value) -> BindingReport {
        self.state.set(name, value);
        let mut report = self.propagate();
        report.merge(self.flush());
        report
    }

    /// Evaluate `text` in the scope of the element `node` is bound to, or
    /// globally when `node` is `None`
    pub fn evaluate(&mut self, node: Option<NodeId>, text: &str) -> RuntimeResult<Value> {
        let value = match node {
            Some(node) => {
                let id = self
                    .registry
                    .for_node(node)
                    .cloned()
                    .ok_or_else(|| RuntimeError::NodeNotFound {
                        node: node.to_string(),
                    })?;
                self.evaluate_in(&id, text, None)?
            }
            None => {
                let mut host = self.host();
                evaluate(text, &mut host, &mut Frame::new())?
            }
        };
        self.propagate();
        Ok(value)
    }

    /// Re-run every binding of one entity
    pub fn evaluate_entity(&mut self, id: &EntityId) -> RuntimeResult<BindingReport> {
        self.entity(id)?;
        Ok(self.refresh_entity(id))
    }

    // -- Reactive propagation ------------------------------------------------

    /// Re-evaluate the entities whose variables changed, repeating for
    /// cascades up to the configured pass limit
    pub(crate) fn propagate(&mut self) -> BindingReport {
        let mut report = BindingReport::new();

        for pass in 0..self.config.max_update_passes {
            let changed = self.state.take_changed();
            if changed.is_empty() {
                return report;
            }

            let dependents: Vec<EntityId> = self
                .registry
                .iter()
                .filter(|entity| self.depends_on(entity, &changed))
                .map(|entity| entity.id.clone())
                .collect();
            debug!(pass, changed = changed.len(), dependents = dependents.len(), "update pass");

            for id in dependents {
                // `:each` regeneration earlier in the pass may have removed it
                if self.registry.contains(&id) {
                    report.merge(self.refresh_entity(&id));
                }
            }
        }

        if self.state.has_changes() {
            let dropped = self.state.take_changed();
            warn!(
                limit = self.config.max_update_passes,
                pending = dropped.len(),
                "update passes exhausted"
            );
        }
        report
    }

    fn depends_on(&self, entity: &Entity, changed: &[ChangedKey]) -> bool {
        let scope = self.cached_scope(entity);
        entity.variables.iter().any(|variable| {
            changed.iter().any(|key| match key {
                ChangedKey::Global(name) => name == variable,
                ChangedKey::Scoped {
                    scope: changed_scope,
                    name,
                } => {
                    scope == Some(changed_scope.as_str())
                        && (variable == SCOPE_ROOT
                            || variable.strip_prefix("el.") == Some(name.as_str()))
                }
            })
        })
    }
}
