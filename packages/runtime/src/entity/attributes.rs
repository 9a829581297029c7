//! Content and dynamic attribute bindings.

use super::{EntityId, EntityState};
use crate::bindings::{classify, BindingKind, CONTENT_BINDINGS};
use crate::error::{BindingReport, RuntimeResult};
use crate::runtime::Runtime;
use minibind_evaluator::{evaluate_class_list, Frame, Value};
use tracing::trace;

impl Runtime {
    /// Apply every present content binding: value and checked, class, text,
    /// then the dynamic attributes. Each binding fails on its own.
    pub(crate) fn evaluate_all(&mut self, id: &EntityId) -> BindingReport {
        let mut report = BindingReport::new();
        let (node, dynamic) = match self.entity(id) {
            Ok(entity) => (entity.node, entity.dynamic_attributes.clone()),
            Err(error) => {
                report.push(id.as_str(), "", error);
                return report;
            }
        };

        let attributes = CONTENT_BINDINGS
            .iter()
            .map(|name| name.to_string())
            .chain(dynamic);
        for attribute in attributes {
            if !self.document.has_attribute(node, &attribute) {
                continue;
            }
            match self.evaluate_attribute(id, &attribute) {
                Ok(nested) => report.merge(nested),
                Err(error) => report.push(id.as_str(), &attribute, error),
            }
        }

        if let Some(entity) = self.registry.get_mut(id) {
            entity.state = EntityState::Evaluated;
        }
        report
    }

    /// Evaluate one binding and apply its result
    pub(crate) fn evaluate_attribute(
        &mut self,
        id: &EntityId,
        attribute: &str,
    ) -> RuntimeResult<BindingReport> {
        let node = self.entity(id)?.node;
        let (Some(kind), Some(text)) = (
            classify(attribute),
            self.document.attribute(node, attribute).map(str::to_string),
        ) else {
            return Ok(BindingReport::new());
        };

        match kind {
            BindingKind::Value => {
                let value = self.evaluate_in(id, &text, None)?;
                if !value.is_nullish() {
                    let value = value.to_string();
                    if self.document.value(node) != value {
                        self.document.set_value(node, &value);
                    }
                }
            }
            BindingKind::Checked => {
                let value = self.evaluate_in(id, &text, None)?;
                if !value.is_nullish() && self.document.checked(node) != value.is_truthy() {
                    self.document.set_checked(node, value.is_truthy());
                }
            }
            BindingKind::Class => {
                let base = self.entity(id)?.base_classes.clone();
                let text = self.scoped_text(id, &text)?;
                let mut frame = Frame::with_this(Value::Node(node.handle()));
                let classes = {
                    let mut host = self.host();
                    evaluate_class_list(&text, &base, &mut host, &mut frame)?
                };
                if self.document.class_name(node) != classes {
                    self.document.set_attribute(node, "class", &classes);
                }
            }
            BindingKind::Text => {
                let value = self.evaluate_in(id, &text, None)?;
                if !value.is_nullish() {
                    let text = value.to_string();
                    if self.document.text_content(node) != text {
                        self.document.set_text_content(node, &text);
                    }
                }
            }
            BindingKind::Attribute(property) => {
                let value = self.evaluate_in(id, &text, None)?;
                if !value.is_nullish() && self.document.property(node, &property) != value {
                    trace!(entity = %id, property = %property, "applying dynamic attribute");
                    self.document.set_property(node, &property, value);
                }
            }
            BindingKind::Each => return self.evaluate_each(id),
            BindingKind::Load | BindingKind::Scope | BindingKind::Event(_) => {}
        }
        Ok(BindingReport::new())
    }

    /// Forget a removed binding; its last applied effect stays in place
    pub(crate) fn dispose_attribute(&mut self, id: &EntityId, attribute: &str) -> RuntimeResult<()> {
        let entity = self.entity_mut(id)?;
        entity.dynamic_attributes.retain(|a| a != attribute);
        if attribute == ":each" {
            entity.each_template = None;
        }
        Ok(())
    }
}
