//! Variable discovery.

use super::{EntityId, EntityState};
use crate::bindings::BindingKind;
use crate::error::{BindingReport, RuntimeResult};
use crate::persistence::is_durable;
use crate::runtime::Runtime;
use crate::scripts::COMPLETION_CALL;
use minibind_evaluator::builtins::is_builtin_name;
use minibind_parser::{analyze, parse_each, AnalyzeOptions, SCOPE_ROOT};
use tracing::debug;

/// Ambient names that are never reactive state
const AMBIENT_NAMES: &[&str] = &["$", "window", "document", "console", "__scopes"];

/// Name of the event object inside event handler text
const EVENT_NAME: &str = "event";

/// Variables referenced by one binding's text
pub(crate) fn binding_variables(text: &str, kind: &BindingKind) -> RuntimeResult<Vec<String>> {
    let mut ignored = AMBIENT_NAMES.to_vec();
    if kind.is_event() {
        ignored.push(EVENT_NAME);
    }
    let options = AnalyzeOptions::ignoring(ignored);

    // Loop names of `:each` are not state; only the iterable is analyzed
    let identifiers = match kind {
        BindingKind::Each => analyze(&parse_each(text)?.iterable_source, &options)?,
        _ => analyze(text, &options)?,
    };
    Ok(identifiers.all())
}

impl Runtime {
    /// Marker attributes that are neither keywords nor events
    pub(crate) fn discover_dynamic_attributes(&mut self, id: &EntityId) -> RuntimeResult<()> {
        let node = self.entity(id)?.node;
        let dynamic: Vec<String> = self
            .bindings_of(node)
            .into_iter()
            .filter(|(_, kind)| matches!(kind, BindingKind::Attribute(_)))
            .map(|(name, _)| name)
            .collect();
        self.entity_mut(id)?.dynamic_attributes = dynamic;
        Ok(())
    }

    /// Recompute the entity's variable set from its current binding text
    pub(crate) fn discover_variables(&mut self, id: &EntityId) -> BindingReport {
        let mut report = BindingReport::new();
        let node = match self.entity(id) {
            Ok(entity) => entity.node,
            Err(error) => {
                report.push(id.as_str(), "", error);
                return report;
            }
        };

        let mut names: Vec<String> = Vec::new();
        for (attribute, kind) in self.bindings_of(node) {
            if !kind.tracks_variables() {
                continue;
            }
            let Some(text) = self.document.attribute(node, &attribute) else {
                continue;
            };
            match binding_variables(text, &kind) {
                Ok(found) => {
                    for name in found {
                        if !names.contains(&name) {
                            names.push(name);
                        }
                    }
                }
                Err(error) => report.push(id.as_str(), &attribute, error),
            }
        }
        names.retain(|name| self.is_state_name(name));
        self.registry.merge_variables(&names);

        for name in &names {
            if name == SCOPE_ROOT || name.starts_with("el.") {
                let slot = name.strip_prefix("el.");
                match self.ensure_scope(id) {
                    Ok(scope) => {
                        if let Some(slot) = slot {
                            self.state.ensure_slot(&scope, slot);
                        }
                    }
                    Err(error) => report.push(id.as_str(), name, error),
                }
            } else if is_durable(name) {
                self.state.get(name);
            }
        }

        debug!(entity = %id, variables = ?names, "discovered variables");
        if let Some(entity) = self.registry.get_mut(id) {
            entity.variables = names;
            if entity.state == EntityState::Constructed {
                entity.state = EntityState::VariablesDiscovered;
            }
        }
        report
    }

    /// Whether a discovered name is reactive state.
    ///
    /// Names holding a function are references, not state. Built-in names
    /// (`String`, `Math`, `parseInt`, ...) count as state only while the
    /// store holds a non-function value under them.
    pub(crate) fn is_state_name(&self, name: &str) -> bool {
        if name == SCOPE_ROOT || name.starts_with("el.") {
            return true;
        }
        match self.state.peek(name) {
            Some(value) => !value.is_callable(),
            None => !is_builtin_name(name) && name != COMPLETION_CALL,
        }
    }

    /// Scope of `id` for its `el.` names, promoting `id` when no ancestor
    /// owns one
    fn ensure_scope(&mut self, id: &EntityId) -> RuntimeResult<String> {
        match self.find_scope_root(id)? {
            Some(_) => self.parent_scope(id),
            None => Ok(self.promote(id)),
        }
    }
}
