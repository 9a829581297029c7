//! `:each` expansion.
//!
//! The element's original children are captured once and stamped out per
//! item. Loop names are substituted textually: binding attributes get the
//! item's source literal through the rewriter, text nodes get its display
//! form. Every run fully regenerates the children.

use super::EntityId;
use crate::bindings::classify;
use crate::dom::Fragment;
use crate::error::{BindingReport, RuntimeError, RuntimeResult};
use crate::runtime::Runtime;
use minibind_evaluator::{EvalError, Value};
use minibind_parser::{parse_each, rewrite, EachHeader, RewriteMode, SubstitutionMap};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn word_pattern() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"[A-Za-z0-9_$]+").expect("valid word pattern"))
}

/// Substitutions for one iteration
struct LoopValues {
    literals: SubstitutionMap,
    display: HashMap<String, String>,
}

impl LoopValues {
    fn new(header: &EachHeader, item: &Value, index: usize) -> Self {
        let mut literals = SubstitutionMap::new();
        let mut display = HashMap::new();

        if let Some(literal) = item.to_source_literal() {
            literals.insert(header.item.clone(), literal);
        }
        display.insert(header.item.clone(), item.to_string());

        if let Some(name) = &header.index {
            literals.insert(name.clone(), index.to_string());
            display.insert(name.clone(), index.to_string());
        }
        Self { literals, display }
    }

    fn replace_words(&self, text: &str) -> String {
        word_pattern()
            .replace_all(text, |caps: &Captures| {
                let word = &caps[0];
                self.display
                    .get(word)
                    .cloned()
                    .unwrap_or_else(|| word.to_string())
            })
            .into_owned()
    }

    fn apply(&self, fragment: &Fragment) -> Fragment {
        match fragment {
            Fragment::Text(text) => Fragment::Text(self.replace_words(text)),
            Fragment::Element {
                tag,
                attributes,
                children,
                value,
                checked,
                properties,
            } => Fragment::Element {
                tag: tag.clone(),
                attributes: attributes
                    .iter()
                    .map(|(name, text)| {
                        let text = if classify(name).is_some() {
                            rewrite(text, &self.literals, &[RewriteMode::Declared])
                                .unwrap_or_else(|error| {
                                    warn!(attribute = %name, %error, "loop binding did not parse");
                                    self.replace_words(text)
                                })
                        } else {
                            text.clone()
                        };
                        (name.clone(), text)
                    })
                    .collect(),
                children: children.iter().map(|c| self.apply(c)).collect(),
                value: value.clone(),
                checked: *checked,
                properties: properties.clone(),
            },
        }
    }
}

/// Children for every item of `items`
fn expand(header: &EachHeader, template: &[Fragment], items: &[Value]) -> Vec<Fragment> {
    items
        .iter()
        .enumerate()
        .flat_map(|(index, item)| {
            let values = LoopValues::new(header, item, index);
            template.iter().map(move |f| values.apply(f)).collect::<Vec<_>>()
        })
        .collect()
}

impl Runtime {
    pub(crate) fn evaluate_each(&mut self, id: &EntityId) -> RuntimeResult<BindingReport> {
        let mut report = BindingReport::new();
        let node = self.entity(id)?.node;
        let Some(text) = self.document.attribute(node, ":each").map(str::to_string) else {
            return Ok(report);
        };

        let header = parse_each(&text)?;
        let items = match self.evaluate_in(id, &header.iterable_source, None)? {
            Value::Array(items) => items,
            other => {
                return Err(RuntimeError::from(EvalError::type_error(format!(
                    "{} is not iterable ({})",
                    header.iterable_source,
                    other.type_of()
                ))))
            }
        };

        let template = match self.entity(id)?.each_template.clone() {
            Some(template) => template,
            None => {
                let template = self.document.snapshot_children(node);
                self.entity_mut(id)?.each_template = Some(template.clone());
                template
            }
        };

        for child in self.document.children(node).to_vec() {
            for element in self.document.subtree_elements(child) {
                if let Some(owner) = self.registry.for_node(element).cloned() {
                    if let Err(error) = self.dispose_entity(&owner) {
                        report.push(owner.as_str(), ":each", error);
                    }
                }
            }
        }

        // No record follows an unobserved removal
        let stale = self.document.children(node).to_vec();
        let observed = self.document.is_observed(node);
        self.document.replace_children(node, Vec::new());
        if !observed {
            for child in stale {
                for released in self.document.release(child) {
                    self.blocks.forget(released);
                }
            }
        }

        let fresh: Vec<_> = expand(&header, &template, &items)
            .iter()
            .map(|fragment| self.document.instantiate(fragment))
            .collect();
        debug!(entity = %id, items = items.len(), nodes = fresh.len(), "expanded :each");
        self.document.replace_children(node, fresh.clone());

        for child in fresh {
            report.merge(self.mount(child));
        }
        Ok(report)
    }
}
