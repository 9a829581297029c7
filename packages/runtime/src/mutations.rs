//! # Document Mutations
//!
//! Serializable edits addressed by selector. They are what scripted
//! sessions and tests use to change the tree from outside; the coordinator
//! only ever sees the resulting mutation records.

use crate::dom::{Document, Fragment, NodeId};
use crate::error::{BindingReport, RuntimeError, RuntimeResult};
use crate::runtime::Runtime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mutation {
    /// Set an attribute value
    SetAttribute {
        selector: String,
        name: String,
        value: String,
    },

    RemoveAttribute { selector: String, name: String },

    /// Append a new subtree as the last child
    AppendChild { selector: String, fragment: Fragment },

    /// Insert a new subtree at a child index
    InsertChild {
        selector: String,
        index: usize,
        fragment: Fragment,
    },

    /// Remove a node and all descendants
    RemoveNode { selector: String },

    /// Replace the children with one text node
    SetText { selector: String, text: String },
}

impl Mutation {
    pub fn apply(&self, doc: &mut Document) -> RuntimeResult<()> {
        match self {
            Mutation::SetAttribute {
                selector,
                name,
                value,
            } => {
                let node = Self::find(doc, selector)?;
                doc.set_attribute(node, name, value);
            }

            Mutation::RemoveAttribute { selector, name } => {
                let node = Self::find(doc, selector)?;
                doc.remove_attribute(node, name);
            }

            Mutation::AppendChild { selector, fragment } => {
                let parent = Self::find(doc, selector)?;
                let child = doc.instantiate(fragment);
                doc.append_child(parent, child);
            }

            Mutation::InsertChild {
                selector,
                index,
                fragment,
            } => {
                let parent = Self::find(doc, selector)?;
                let child = doc.instantiate(fragment);
                doc.insert_child(parent, *index, child);
            }

            Mutation::RemoveNode { selector } => {
                let node = Self::find(doc, selector)?;
                if node == doc.root() {
                    return Err(RuntimeError::NodeNotFound {
                        node: format!("{} (the root cannot be removed)", selector),
                    });
                }
                doc.remove(node);
            }

            Mutation::SetText { selector, text } => {
                let node = Self::find(doc, selector)?;
                doc.set_text_content(node, text);
            }
        }
        Ok(())
    }

    /// `body` addresses the root; anything else is a selector under it
    fn find(doc: &Document, selector: &str) -> RuntimeResult<NodeId> {
        if selector.trim() == "body" {
            return Ok(doc.root());
        }
        doc.query_selector(doc.root(), selector)
            .ok_or_else(|| RuntimeError::NodeNotFound {
                node: selector.to_string(),
            })
    }
}

impl Runtime {
    /// Apply `mutation` and process the records it produced
    pub fn apply_mutation(&mut self, mutation: &Mutation) -> RuntimeResult<BindingReport> {
        mutation.apply(&mut self.document)?;
        Ok(self.flush())
    }
}
