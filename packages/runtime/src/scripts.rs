//! # Code Blocks
//!
//! Executable blocks found in added subtrees get a pending handle before
//! they run. The block text gets a completion call appended; running it to
//! the end resolves the handle, throwing resolves it with the error. Awaiting
//! a set of blocks is the one asynchronous operation of the runtime.

use crate::dom::{Document, NodeId};
use crate::error::{RuntimeError, RuntimeResult};
use minibind_evaluator::{evaluate, EvalResult, Frame, Host};
use std::collections::{HashMap, HashSet};
use tokio::sync::watch;
use tracing::debug;

/// Host function a block calls when it ran to completion
pub const COMPLETION_CALL: &str = "__resolveScript";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockStatus {
    Pending,
    Completed,
    Failed(String),
}

/// Text appended to the block registered as `id`
pub fn completion_suffix(id: &str) -> String {
    format!("\n{}(\"{}\")", COMPLETION_CALL, id)
}

/// Runs the text of code blocks
pub trait BlockExecutor {
    fn execute(&mut self, id: &str, source: &str, host: &mut dyn Host) -> EvalResult<()>;
}

/// Runs blocks as statement sequences with the binding interpreter
#[derive(Debug, Default)]
pub struct InterpreterExecutor;

impl BlockExecutor for InterpreterExecutor {
    fn execute(&mut self, id: &str, source: &str, host: &mut dyn Host) -> EvalResult<()> {
        debug!(block = id, "executing code block");
        evaluate(source, host, &mut Frame::new()).map(|_| ())
    }
}

#[derive(Debug, Default)]
pub struct PendingBlocks {
    handles: HashMap<String, watch::Sender<BlockStatus>>,
    by_node: HashMap<NodeId, String>,
    seen: HashSet<NodeId>,
}

impl PendingBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// First sighting of a block node; later sightings return `false`
    pub fn mark_seen(&mut self, node: NodeId) -> bool {
        self.seen.insert(node)
    }

    pub fn register(&mut self, id: &str, node: NodeId) {
        self.by_node.insert(node, id.to_string());
        self.handles
            .entry(id.to_string())
            .or_insert_with(|| watch::channel(BlockStatus::Pending).0);
    }

    pub fn resolve(&mut self, id: &str) -> bool {
        self.settle(id, BlockStatus::Completed)
    }

    pub fn fail(&mut self, id: &str, message: impl Into<String>) -> bool {
        self.settle(id, BlockStatus::Failed(message.into()))
    }

    /// Settle a pending handle; settled handles keep their first outcome
    fn settle(&mut self, id: &str, status: BlockStatus) -> bool {
        let Some(sender) = self.handles.get(id) else {
            return false;
        };
        if *sender.borrow() != BlockStatus::Pending {
            return false;
        }
        sender.send_replace(status);
        true
    }

    /// Drop everything known about `node`. A block still pending fails for
    /// anyone awaiting it.
    pub fn forget(&mut self, node: NodeId) {
        self.seen.remove(&node);
        let Some(id) = self.by_node.remove(&node) else {
            return;
        };
        if self.by_node.values().any(|other| *other == id) {
            return;
        }
        self.fail(&id, "removed before completion");
        self.handles.remove(&id);
        debug!(block = %id, "forgot code block");
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn status(&self, id: &str) -> Option<BlockStatus> {
        self.handles.get(id).map(|s| s.borrow().clone())
    }

    pub fn id_of(&self, node: NodeId) -> Option<&str> {
        self.by_node.get(&node).map(String::as_str)
    }

    pub fn node_of(&self, id: &str) -> Option<NodeId> {
        self.by_node
            .iter()
            .find(|(_, block)| block.as_str() == id)
            .map(|(node, _)| *node)
    }

    /// Receivers for every registered block under `nodes`
    pub fn watchers(&self, document: &Document, nodes: &[NodeId]) -> Vec<(String, watch::Receiver<BlockStatus>)> {
        let mut watchers = Vec::new();
        for node in nodes {
            for element in document.subtree_elements(*node) {
                let Some(id) = self.by_node.get(&element) else {
                    continue;
                };
                if let Some(sender) = self.handles.get(id) {
                    watchers.push((id.clone(), sender.subscribe()));
                }
            }
        }
        watchers
    }
}

/// Wait until every watched block settled; the first failure wins
pub async fn wait_all(watchers: Vec<(String, watch::Receiver<BlockStatus>)>) -> RuntimeResult<()> {
    for (id, mut receiver) in watchers {
        let status = match receiver.wait_for(|s| *s != BlockStatus::Pending).await {
            Ok(status) => status.clone(),
            Err(_) => BlockStatus::Failed("runtime dropped before completion".to_string()),
        };
        if let BlockStatus::Failed(message) = status {
            return Err(RuntimeError::BlockFailed { id, message });
        }
    }
    Ok(())
}

/// Remove the completion call and the id stamp from a settled block
pub fn strip_block(document: &mut Document, node: NodeId, id: &str, stamp_attribute: &str) {
    let text = document.text_content(node);
    if let Some(original) = text.strip_suffix(&completion_suffix(id)) {
        document.set_text_content(node, original);
    }
    document.remove_attribute(node, stamp_attribute);
}
