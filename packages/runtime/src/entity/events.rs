//! Event bindings and dispatch.

use super::{EntityId, EntityState};
use crate::bindings::{classify, BindingKind};
use crate::error::{BindingReport, RuntimeResult};
use crate::listeners::{listeners_for, HostEvent, Listener};
use crate::runtime::Runtime;
use tracing::{debug, instrument};

impl Runtime {
    /// Attach listeners for every event binding on the element
    pub(crate) fn apply_event_bindings(&mut self, id: &EntityId) -> BindingReport {
        let mut report = BindingReport::new();
        let node = match self.entity(id) {
            Ok(entity) => entity.node,
            Err(error) => {
                report.push(id.as_str(), "", error);
                return report;
            }
        };

        for (attribute, kind) in self.bindings_of(node) {
            if kind.is_event() {
                if let Err(error) = self.apply_event(id, &attribute) {
                    report.push(id.as_str(), &attribute, error);
                }
            }
        }
        if let Some(entity) = self.registry.get_mut(id) {
            if entity.state == EntityState::VariablesDiscovered {
                entity.state = EntityState::Bound;
            }
        }
        report
    }

    /// (Re)attach the listeners of one event binding
    pub(crate) fn apply_event(&mut self, id: &EntityId, attribute: &str) -> RuntimeResult<()> {
        let node = self.entity(id)?.node;
        self.listeners.detach(id, attribute);

        let Some(BindingKind::Event(kind)) = classify(attribute) else {
            return Ok(());
        };
        for listener in listeners_for(&kind, id, node, attribute, &self.document) {
            debug!(entity = %id, event = %listener.event, attribute, "attached listener");
            self.listeners.attach(listener);
        }
        Ok(())
    }

    pub(crate) fn dispose_event(&mut self, id: &EntityId, attribute: &str) -> RuntimeResult<()> {
        self.entity(id)?;
        self.listeners.detach(id, attribute);
        Ok(())
    }

    /// Deliver a host event: run every matching handler, then re-evaluate
    /// whatever the handlers changed
    #[instrument(level = "debug", skip(self), fields(kind = %event.kind, target = %event.target))]
    pub fn dispatch(&mut self, event: HostEvent) -> BindingReport {
        if let Some(value) = &event.value {
            self.document.set_value(event.target, value);
        }
        if let Some(checked) = event.checked {
            self.document.set_checked(event.target, checked);
        }

        let mut report = BindingReport::new();
        let fired = self
            .listeners
            .matching(&event, &self.document, self.document.root());
        for listener in fired {
            if let Err(error) = self.fire(&listener, &event) {
                report.push(listener.entity.as_str(), &listener.attribute, error);
            }
        }

        report.merge(self.propagate());
        report.merge(self.flush());
        report
    }

    /// Run the handler text of `listener` for `event`
    fn fire(&mut self, listener: &Listener, event: &HostEvent) -> RuntimeResult<()> {
        // An earlier handler in the same dispatch may have disposed it
        if !self.registry.contains(&listener.entity) {
            return Ok(());
        }
        let Some(text) = self
            .document
            .attribute(listener.node, &listener.attribute)
            .map(str::to_string)
        else {
            return Ok(());
        };
        self.evaluate_in(&listener.entity, &text, Some(event.to_value()))?;
        Ok(())
    }
}
