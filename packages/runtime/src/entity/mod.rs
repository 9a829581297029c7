//! # Entities
//!
//! One entity per bound element. An entity owns nothing but ids: its node,
//! its cached scope root and the listeners it attached are all looked up
//! through the runtime's registry and tables.
//!
//! Lifecycle: `Constructed → VariablesDiscovered → Bound → Evaluated →
//! Disposed`. The operations live in submodules as `Runtime` methods keyed
//! by [`EntityId`].

mod attributes;
mod data;
mod each;
mod events;

use crate::bindings::{classify, BindingKind};
use crate::dom::{Fragment, NodeId};
use crate::error::{BindingReport, RuntimeError, RuntimeResult};
use crate::runtime::Runtime;
use minibind_evaluator::{evaluate, Frame, Value};
use minibind_parser::{analyze, rewrite, AnalyzeOptions, RewriteMode, SubstitutionMap, SCOPE_ROOT};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        EntityId(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Constructed,
    VariablesDiscovered,
    Bound,
    Evaluated,
    Disposed,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub node: NodeId,
    pub state: EntityState,
    /// `class` attribute at construction
    pub base_classes: Vec<String>,
    pub dynamic_attributes: Vec<String>,
    pub variables: Vec<String>,
    /// Set when this entity is a scope root
    pub scope_id: Option<String>,
    /// Nearest scope root, once resolved
    pub parent_scope: Option<EntityId>,
    /// Child markup `:each` expands, captured on first use
    pub each_template: Option<Vec<Fragment>>,
}

impl Entity {
    pub fn new(id: EntityId, node: NodeId, base_classes: Vec<String>) -> Self {
        Self {
            id,
            node,
            state: EntityState::Constructed,
            base_classes,
            dynamic_attributes: Vec::new(),
            variables: Vec::new(),
            scope_id: None,
            parent_scope: None,
            each_template: None,
        }
    }

    pub fn is_scope_root(&self) -> bool {
        self.scope_id.is_some()
    }
}

impl Runtime {
    /// Entity for `node`, creating it when the node has none
    #[instrument(level = "debug", skip(self))]
    pub(crate) fn construct_entity(&mut self, node: NodeId) -> RuntimeResult<EntityId> {
        if let Some(id) = self.registry.for_node(node) {
            return Ok(id.clone());
        }
        if !self.document.is_element(node) {
            return Err(RuntimeError::NodeNotFound {
                node: node.to_string(),
            });
        }

        let id = EntityId(self.ids.entity_id());
        let base_classes = self
            .document
            .attribute(node, "class")
            .map(|c| vec![c.to_string()])
            .unwrap_or_default();
        self.registry.insert(Entity::new(id.clone(), node, base_classes));
        self.discover_dynamic_attributes(&id)?;

        if self.document.has_attribute(node, ":scope") {
            self.promote(&id);
        }
        debug!(entity = %id, %node, "constructed entity");
        Ok(id)
    }

    /// Full first binding of one element: discovery, listeners, `:load`,
    /// `:each` and content bindings
    pub(crate) fn init_entity(&mut self, node: NodeId) -> BindingReport {
        let mut report = BindingReport::new();
        let id = match self.construct_entity(node) {
            Ok(id) => id,
            Err(error) => {
                report.push("", "", error);
                return report;
            }
        };

        report.merge(self.discover_variables(&id));
        report.merge(self.apply_event_bindings(&id));
        report.merge(self.run_load(&id));
        report.merge(self.refresh_entity(&id));
        report
    }

    /// `:each` regeneration followed by every content binding
    pub(crate) fn refresh_entity(&mut self, id: &EntityId) -> BindingReport {
        let mut report = BindingReport::new();
        let Some(node) = self.registry.get(id).map(|e| e.node) else {
            return report;
        };
        if self.document.has_attribute(node, ":each") {
            match self.evaluate_each(id) {
                Ok(each) => report.merge(each),
                Err(error) => report.push(id.as_str(), ":each", error),
            }
        }
        report.merge(self.evaluate_all(id));
        report
    }

    /// Detach listeners, drop owned scope storage and leave the registry
    #[instrument(level = "debug", skip(self))]
    pub fn dispose_entity(&mut self, id: &EntityId) -> RuntimeResult<()> {
        let entity = self
            .registry
            .remove(id)
            .ok_or_else(|| RuntimeError::stale(id.as_str()))?;

        let detached = self.listeners.detach_entity(id);
        if let Some(scope) = &entity.scope_id {
            self.state.drop_scope(scope);
        }
        debug!(entity = %id, listeners = detached, "disposed entity");
        Ok(())
    }

    /// Make `id` a scope root owning a fresh scope
    pub(crate) fn promote(&mut self, id: &EntityId) -> String {
        if let Some(scope) = self.registry.get(id).and_then(|e| e.scope_id.clone()) {
            return scope;
        }
        let scope = id.0.clone();
        self.state.create_scope(&scope);
        self.registry.mark_scope_root(id, scope.clone());
        debug!(entity = %id, "promoted to scope root");
        scope
    }

    /// Nearest scope root of `id`: itself, its cached root, or the first
    /// ancestor element owning a scope. `Ok(None)` when there is none.
    pub(crate) fn find_scope_root(&self, id: &EntityId) -> RuntimeResult<Option<EntityId>> {
        let entity = self.entity(id)?;
        if entity.is_scope_root() {
            return Ok(Some(id.clone()));
        }
        if let Some(parent) = &entity.parent_scope {
            return match self.registry.get(parent) {
                Some(root) if root.is_scope_root() => Ok(Some(parent.clone())),
                _ => Err(RuntimeError::scope_resolution(
                    id.as_str(),
                    format!("scope root {} is disposed", parent),
                )),
            };
        }

        for ancestor in self.document.ancestors(entity.node) {
            let owner = self
                .registry
                .for_node(ancestor)
                .and_then(|owner| self.registry.get(owner));
            if let Some(owner) = owner.filter(|o| o.is_scope_root()) {
                return Ok(Some(owner.id.clone()));
            }
        }
        Ok(None)
    }

    /// Scope id `el.` names of `id` resolve to
    pub(crate) fn parent_scope(&mut self, id: &EntityId) -> RuntimeResult<String> {
        let root = self.find_scope_root(id)?.ok_or_else(|| {
            RuntimeError::scope_resolution(id.as_str(), "no scope root above this element")
        })?;

        if root != *id {
            if let Some(entity) = self.registry.get_mut(id) {
                entity.parent_scope = Some(root.clone());
            }
        }
        self.registry
            .get(&root)
            .and_then(|r| r.scope_id.clone())
            .ok_or_else(|| RuntimeError::scope_resolution(id.as_str(), "scope root lost its scope"))
    }

    /// Scope id an entity's `el.` names currently map to, without resolving
    pub(crate) fn cached_scope<'a>(&'a self, entity: &'a Entity) -> Option<&'a str> {
        if let Some(scope) = &entity.scope_id {
            return Some(scope);
        }
        let parent = self.registry.get(entity.parent_scope.as_ref()?)?;
        parent.scope_id.as_deref()
    }

    /// `text` with `el` redirected into the entity's scope storage
    pub(crate) fn scoped_text(&mut self, id: &EntityId, text: &str) -> RuntimeResult<String> {
        let uses_scope = analyze(text, &AnalyzeOptions::default())?
            .all()
            .iter()
            .any(|name| name == SCOPE_ROOT || name.starts_with("el."));
        if !uses_scope {
            return Ok(text.to_string());
        }

        let scope = self.parent_scope(id)?;
        let substitutions: SubstitutionMap = [(
            SCOPE_ROOT.to_string(),
            format!("__scopes[\"{}\"]", scope),
        )]
        .into_iter()
        .collect();
        Ok(rewrite(text, &substitutions, &[RewriteMode::Declared])?)
    }

    /// Evaluate binding text with `this` bound to the entity's element
    pub(crate) fn evaluate_in(
        &mut self,
        id: &EntityId,
        text: &str,
        event: Option<Value>,
    ) -> RuntimeResult<Value> {
        let node = self.entity(id)?.node;
        let text = self.scoped_text(id, text)?;

        let mut frame = Frame::with_this(Value::Node(node.handle()));
        if let Some(event) = event {
            frame = frame.with_event(event);
        }
        let mut host = self.host();
        Ok(evaluate(&text, &mut host, &mut frame)?)
    }

    /// Run `:load` once, when the element is first bound
    pub(crate) fn run_load(&mut self, id: &EntityId) -> BindingReport {
        let mut report = BindingReport::new();
        let Some(node) = self.registry.get(id).map(|e| e.node) else {
            return report;
        };
        let Some(text) = self.document.attribute(node, ":load").map(str::to_string) else {
            return report;
        };
        if let Err(error) = self.evaluate_in(id, &text, None) {
            report.push(id.as_str(), ":load", error);
        }
        report
    }

    /// Names of the present binding attributes, classified
    pub(crate) fn bindings_of(&self, node: NodeId) -> Vec<(String, BindingKind)> {
        self.document
            .attribute_names(node)
            .into_iter()
            .filter_map(|name| classify(&name).map(|kind| (name, kind)))
            .collect()
    }
}
