//! # Mutation Coordinator
//!
//! Turns batches of mutation records into entity lifecycle calls:
//!
//! - attribute changes rebind or dispose the single binding they touch
//! - removed elements dispose their entity
//! - added subtrees register and run their code blocks, then get entities
//!
//! Batches are handled one at a time and in record order. Handling a batch
//! can produce new records (bindings write to the tree); those form the
//! next batch.

use crate::bindings::{classify, BindingKind};
use crate::dom::{MutationRecord, MutationSource, NodeId};
use crate::entity::EntityId;
use crate::error::{BindingReport, RuntimeResult};
use crate::host::BindingHost;
use crate::runtime::Runtime;
use crate::scripts::{completion_suffix, strip_block, wait_all};
use std::future::Future;
use tracing::{debug, info, instrument, warn};

/// Upper bound on follow-up batches drained by one [`Runtime::flush`]
const MAX_FLUSH_BATCHES: usize = 32;

impl Runtime {
    /// Observe the document root and bind everything already in it
    pub fn start(&mut self) -> BindingReport {
        if self.document.is_observing() {
            return BindingReport::new();
        }
        let root = self.document.root();
        self.document.observe(root);
        info!(%root, "observing document");

        let mut report = BindingReport::new();
        for child in self.document.children(root).to_vec() {
            report.merge(self.mount(child));
        }
        report.merge(self.propagate());
        report.merge(self.flush());
        report
    }

    /// Stop observing; later changes go unnoticed
    pub fn stop(&mut self) {
        if self.document.is_observing() {
            self.document.disconnect();
            info!("stopped observing document");
        }
    }

    pub fn is_observing(&self) -> bool {
        self.document.is_observing()
    }

    /// Process pending records until the tree settles
    pub fn flush(&mut self) -> BindingReport {
        let mut report = BindingReport::new();
        for _ in 0..MAX_FLUSH_BATCHES {
            let records = self.document.take_records();
            if records.is_empty() {
                report.merge(self.release_detached());
                return report;
            }
            report.merge(self.process(records));
        }
        let dropped = self.document.take_records();
        if !dropped.is_empty() {
            warn!(dropped = dropped.len(), "mutation batches did not settle");
        }
        report.merge(self.release_detached());
        report
    }

    /// Hand the slots of removed subtrees back to the document once no
    /// pending record refers to them
    fn release_detached(&mut self) -> BindingReport {
        let mut report = BindingReport::new();
        let released = self.document.release_detached();
        if released.is_empty() {
            return report;
        }
        for node in &released {
            if let Some(id) = self.registry.for_node(*node).cloned() {
                if let Err(error) = self.dispose_entity(&id) {
                    report.push(id.as_str(), "", error);
                }
            }
            self.blocks.forget(*node);
        }
        debug!(nodes = released.len(), "released detached nodes");
        report
    }

    /// Handle one batch of records in order
    #[instrument(level = "debug", skip_all, fields(records = records.len()))]
    pub fn process(&mut self, records: Vec<MutationRecord>) -> BindingReport {
        let mut report = BindingReport::new();
        for record in records {
            match record {
                MutationRecord::Attribute { target, name, .. } => {
                    report.merge(self.attribute_changed(target, &name));
                }
                MutationRecord::Removed { node, .. } => {
                    if let Some(id) = self.registry.for_node(node).cloned() {
                        if let Err(error) = self.dispose_entity(&id) {
                            report.push(id.as_str(), "", error);
                        }
                    }
                }
                MutationRecord::Added { node, .. } => {
                    if self.document.is_element(node) && self.document.is_attached(node) {
                        report.merge(self.mount(node));
                    }
                }
            }
        }
        report.merge(self.propagate());
        report
    }

    fn attribute_changed(&mut self, target: NodeId, name: &str) -> BindingReport {
        let mut report = BindingReport::new();
        let Some(kind) = classify(name) else {
            return report;
        };
        let Some(id) = self.registry.for_node(target).cloned() else {
            return report;
        };

        if !self.document.has_attribute(target, name) {
            debug!(entity = %id, attribute = name, "binding removed");
            let result = if kind.is_event() {
                self.dispose_event(&id, name)
            } else {
                self.dispose_attribute(&id, name)
            };
            if let Err(error) = result {
                report.push(id.as_str(), name, error);
            }
            report.merge(self.discover_variables(&id));
            return report;
        }

        if matches!(kind, BindingKind::Attribute(_)) {
            if let Err(error) = self.discover_dynamic_attributes(&id) {
                report.push(id.as_str(), name, error);
                return report;
            }
        }
        report.merge(self.discover_variables(&id));

        match kind {
            BindingKind::Event(_) => {
                if let Err(error) = self.apply_event(&id, name) {
                    report.push(id.as_str(), name, error);
                }
            }
            BindingKind::Scope => {
                self.promote(&id);
            }
            // Runs only when the element is first bound
            BindingKind::Load => {}
            _ => match self.evaluate_attribute(&id, name) {
                Ok(nested) => report.merge(nested),
                Err(error) => report.push(id.as_str(), name, error),
            },
        }
        report
    }

    /// Bind a newly attached subtree: code blocks first, then one entity
    /// per element top-down
    pub(crate) fn mount(&mut self, node: NodeId) -> BindingReport {
        let mut report = BindingReport::new();
        let blocks = self.register_blocks(node);
        report.merge(self.execute_blocks(blocks));
        report.merge(self.bind_subtree(node));
        report
    }

    fn bind_subtree(&mut self, node: NodeId) -> BindingReport {
        let mut report = BindingReport::new();
        if !self.document.is_element(node) {
            return report;
        }
        if self.registry.for_node(node).is_none() {
            report.merge(self.init_entity(node));
        }
        // Children as they are now; `:each` may just have replaced them
        for child in self.document.children(node).to_vec() {
            report.merge(self.bind_subtree(child));
        }
        report
    }

    // -- Code blocks ---------------------------------------------------------

    /// Stamp and register every unseen code block under `root`
    fn register_blocks(&mut self, root: NodeId) -> Vec<(NodeId, String)> {
        let tag = self.config.script_tag.clone();
        let stamp = self.config.script_id_attribute.clone();
        let mut registered = Vec::new();

        for node in self.document.subtree_elements(root) {
            if self.document.tag(node) != Some(tag.as_str()) || !self.blocks.mark_seen(node) {
                continue;
            }
            let id = match self.document.attribute(node, &stamp) {
                Some(id) => id.to_string(),
                None => {
                    let id = self.ids.block_id();
                    self.document.set_attribute(node, &stamp, &id);
                    id
                }
            };
            self.blocks.register(&id, node);

            let text = self.document.text_content(node);
            self.document
                .set_text_content(node, &format!("{}{}", text, completion_suffix(&id)));
            debug!(block = %id, %node, "registered code block");
            registered.push((node, id));
        }
        registered
    }

    fn execute_blocks(&mut self, blocks: Vec<(NodeId, String)>) -> BindingReport {
        let mut report = BindingReport::new();
        let tag = self.config.script_tag.clone();

        for (node, id) in blocks {
            let source = self.document.text_content(node);
            let result = {
                let mut host = BindingHost {
                    document: &mut self.document,
                    state: &mut self.state,
                    blocks: &mut self.blocks,
                    stamp_attribute: &self.config.script_id_attribute,
                };
                self.executor.execute(&id, &source, &mut host)
            };

            if let Err(error) = result {
                self.blocks.fail(&id, error.to_string());
                strip_block(
                    &mut self.document,
                    node,
                    &id,
                    &self.config.script_id_attribute,
                );
                report.push(&id, &tag, error.into());
            }
        }
        report
    }

    /// Settle a deferred block as completed, as its completion call would
    pub fn resolve_block(&mut self, id: &str) -> bool {
        if let Some(node) = self.blocks.node_of(id) {
            strip_block(
                &mut self.document,
                node,
                id,
                &self.config.script_id_attribute,
            );
        }
        let resolved = self.blocks.resolve(id);
        self.propagate();
        resolved
    }

    pub fn fail_block(&mut self, id: &str, message: &str) -> bool {
        if let Some(node) = self.blocks.node_of(id) {
            strip_block(
                &mut self.document,
                node,
                id,
                &self.config.script_id_attribute,
            );
        }
        self.blocks.fail(id, message)
    }

    /// Resolves once every code block under `nodes` has settled, with the
    /// first failure if any block threw. The future does not borrow the
    /// runtime, so blocks can still be settled while it is pending.
    pub fn await_pending_blocks(
        &self,
        nodes: &[NodeId],
    ) -> impl Future<Output = RuntimeResult<()>> {
        wait_all(self.blocks.watchers(&self.document, nodes))
    }

    /// Entity ids bound under `node`, in document order
    pub fn entities_under(&self, node: NodeId) -> Vec<EntityId> {
        self.document
            .subtree_elements(node)
            .into_iter()
            .filter_map(|n| self.registry.for_node(n).cloned())
            .collect()
    }
}
