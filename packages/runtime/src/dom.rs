//! # Document
//!
//! Arena-backed element tree the runtime binds against. Nodes are addressed
//! by [`NodeId`] and never move. Detached subtrees stay in the arena until
//! they are released, after which their slots are handed to new nodes.
//!
//! While a root is observed, every structural or attribute change under it
//! appends a [`MutationRecord`]. Records are drained in batches through the
//! [`MutationSource`] trait.

use indexmap::IndexMap;
use minibind_evaluator::{NodeHandle, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn handle(self) -> NodeHandle {
        NodeHandle(self.0)
    }
}

impl From<NodeHandle> for NodeId {
    fn from(handle: NodeHandle) -> Self {
        NodeId(handle.0)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub attributes: IndexMap<String, String>,
    /// Form control value
    pub value: String,
    pub checked: bool,
    /// Properties written by dynamic attribute bindings
    pub properties: IndexMap<String, Value>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// One observed change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MutationRecord {
    Attribute {
        target: NodeId,
        name: String,
        old_value: Option<String>,
    },
    Added {
        parent: NodeId,
        node: NodeId,
    },
    Removed {
        parent: NodeId,
        node: NodeId,
    },
}

/// Anything that can report tree changes in batches
pub trait MutationSource {
    fn observe(&mut self, root: NodeId);
    fn disconnect(&mut self);
    fn is_observing(&self) -> bool;
    /// Drain the records collected since the last call
    fn take_records(&mut self) -> Vec<MutationRecord>;
}

/// Serializable subtree description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fragment {
    Text(String),
    Element {
        tag: String,
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        attributes: IndexMap<String, String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<Fragment>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checked: Option<bool>,
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        properties: IndexMap<String, serde_json::Value>,
    },
}

impl Fragment {
    pub fn element(tag: &str) -> Self {
        Fragment::Element {
            tag: tag.to_string(),
            attributes: IndexMap::new(),
            children: Vec::new(),
            value: None,
            checked: None,
            properties: IndexMap::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if let Fragment::Element { attributes, .. } = &mut self {
            attributes.insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn child(mut self, child: Fragment) -> Self {
        if let Fragment::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    pub fn text(text: &str) -> Self {
        Fragment::Text(text.to_string())
    }
}

#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    observed: Option<NodeId>,
    records: Vec<MutationRecord>,
    /// Released slots, reused lowest first
    free: BTreeSet<NodeId>,
    /// Roots of subtrees removed under observation
    detached: Vec<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document with a `body` root element
    pub fn new() -> Self {
        let mut document = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            observed: None,
            records: Vec::new(),
            free: BTreeSet::new(),
            detached: Vec::new(),
        };
        document.root = document.create_element("body");
        document
    }

    /// Document whose root holds `children`
    pub fn from_fragments(children: &[Fragment]) -> Self {
        let mut document = Self::new();
        let root = document.root;
        for fragment in children {
            let node = document.instantiate(fragment);
            document.append_child(root, node);
        }
        document
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(Element {
            tag: tag.to_ascii_lowercase(),
            attributes: IndexMap::new(),
            value: String::new(),
            checked: false,
            properties: IndexMap::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let node = Node {
            kind,
            parent: None,
            children: Vec::new(),
        };
        if let Some(id) = self.free.pop_first() {
            self.nodes[id.0] = node;
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Nodes currently in use, attached or not
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Slots in the arena, including released ones
    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    /// Return the detached subtree rooted at `id` to the arena. Ids into it
    /// are invalid afterwards. Attached nodes are left alone.
    pub fn release(&mut self, id: NodeId) -> Vec<NodeId> {
        if id == self.root
            || self.observed == Some(id)
            || self.parent(id).is_some()
            || self.node(id).is_none()
            || self.free.contains(&id)
        {
            return Vec::new();
        }
        let released: Vec<NodeId> = std::iter::once(id).chain(self.descendants(id)).collect();
        for node in &released {
            self.nodes[node.0] = Node {
                kind: NodeKind::Text(String::new()),
                parent: None,
                children: Vec::new(),
            };
            self.free.insert(*node);
        }
        released
    }

    /// Release every subtree removed under observation that is still detached
    pub fn release_detached(&mut self) -> Vec<NodeId> {
        let roots = std::mem::take(&mut self.detached);
        roots.into_iter().flat_map(|root| self.release(root)).collect()
    }

    // -- Structure -----------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    /// Ancestors from the parent upward
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            ancestors.push(node);
            current = self.parent(node);
        }
        ancestors
    }

    /// Descendants in document order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// `id` followed by its element descendants, in document order
    pub fn subtree_elements(&self, id: NodeId) -> Vec<NodeId> {
        std::iter::once(id)
            .chain(self.descendants(id))
            .filter(|n| self.is_element(*n))
            .collect()
    }

    /// Inclusive containment
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).contains(&ancestor)
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child);
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        if self.parent(child).is_some() {
            self.remove(child);
        }
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);

        if self.is_observed(parent) {
            self.records.push(MutationRecord::Added {
                parent,
                node: child,
            });
        }
    }

    /// Detach `id` from its parent. Observers see one record per removed
    /// element of the subtree.
    pub fn remove(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        let observed = self.is_observed(parent);
        let removed = if observed {
            self.subtree_elements(id)
        } else {
            Vec::new()
        };

        self.nodes[parent.0].children.retain(|c| *c != id);
        self.nodes[id.0].parent = None;

        if observed {
            self.detached.push(id);
            if !self.is_element(id) {
                self.records.push(MutationRecord::Removed { parent, node: id });
            }
            for node in removed {
                let parent = if node == id {
                    parent
                } else {
                    self.parent(node).unwrap_or(parent)
                };
                self.records.push(MutationRecord::Removed { parent, node });
            }
        }
    }

    pub fn replace_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        for child in self.children(parent).to_vec() {
            self.remove(child);
        }
        for child in children {
            self.append_child(parent, child);
        }
    }

    // -- Attributes and state ------------------------------------------------

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)
            .and_then(|e| e.attributes.get(name))
            .map(String::as_str)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// Attribute names in source order
    pub fn attribute_names(&self, id: NodeId) -> Vec<String> {
        self.element(id)
            .map(|e| e.attributes.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let observed = self.is_observed(id);
        let Some(element) = self.element_mut(id) else {
            return;
        };
        let old_value = element.attributes.insert(name.to_string(), value.to_string());
        if observed {
            self.records.push(MutationRecord::Attribute {
                target: id,
                name: name.to_string(),
                old_value,
            });
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        let observed = self.is_observed(id);
        let Some(element) = self.element_mut(id) else {
            return;
        };
        let Some(old_value) = element.attributes.shift_remove(name) else {
            return;
        };
        if observed {
            self.records.push(MutationRecord::Attribute {
                target: id,
                name: name.to_string(),
                old_value: Some(old_value),
            });
        }
    }

    pub fn class_name(&self, id: NodeId) -> &str {
        self.attribute(id, "class").unwrap_or("")
    }

    pub fn text_content(&self, id: NodeId) -> String {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Text(text)) => text.clone(),
            Some(NodeKind::Element(_)) => self
                .descendants(id)
                .into_iter()
                .filter_map(|n| match &self.nodes[n.0].kind {
                    NodeKind::Text(text) => Some(text.as_str()),
                    NodeKind::Element(_) => None,
                })
                .collect(),
            None => String::new(),
        }
    }

    /// Replace all children with a single text node (none for `""`). A lone
    /// text child is updated in place.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if let Some(Node {
            kind: NodeKind::Text(content),
            ..
        }) = self.nodes.get_mut(id.0)
        {
            *content = text.to_string();
            return;
        }
        if !self.is_element(id) {
            return;
        }
        let lone = match self.children(id) {
            [only] if !text.is_empty() => Some(*only),
            _ => None,
        };
        if let Some(Node {
            kind: NodeKind::Text(content),
            ..
        }) = lone.and_then(|only| self.nodes.get_mut(only.0))
        {
            *content = text.to_string();
            return;
        }
        let children = if text.is_empty() {
            Vec::new()
        } else {
            vec![self.create_text(text)]
        };
        self.replace_children(id, children);
    }

    pub fn value(&self, id: NodeId) -> &str {
        self.element(id).map(|e| e.value.as_str()).unwrap_or("")
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if let Some(element) = self.element_mut(id) {
            element.value = value.to_string();
        }
    }

    pub fn checked(&self, id: NodeId) -> bool {
        self.element(id).map(|e| e.checked).unwrap_or(false)
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) {
        if let Some(element) = self.element_mut(id) {
            element.checked = checked;
        }
    }

    /// Element property as seen from expressions (`this.value`, `el.id`)
    pub fn property(&self, id: NodeId, name: &str) -> Value {
        let Some(element) = self.element(id) else {
            return match name {
                "textContent" | "nodeValue" => Value::from(self.text_content(id)),
                _ => Value::Undefined,
            };
        };
        match name {
            "value" => Value::from(element.value.as_str()),
            "checked" => Value::Bool(element.checked),
            "textContent" | "innerText" => Value::from(self.text_content(id)),
            "className" => Value::from(self.class_name(id)),
            "tagName" | "nodeName" => Value::from(element.tag.to_ascii_uppercase()),
            "parentElement" | "parentNode" => self
                .parent(id)
                .map(|p| Value::Node(p.handle()))
                .unwrap_or(Value::Null),
            _ => match element.properties.get(name) {
                Some(value) => value.clone(),
                None => element
                    .attributes
                    .get(name)
                    .map(|v| Value::from(v.as_str()))
                    .unwrap_or(Value::Undefined),
            },
        }
    }

    pub fn set_property(&mut self, id: NodeId, name: &str, value: Value) {
        match name {
            "value" => self.set_value(id, &value.to_string()),
            "checked" => self.set_checked(id, value.is_truthy()),
            "textContent" | "innerText" => self.set_text_content(id, &value.to_string()),
            "className" => self.set_attribute(id, "class", &value.to_string()),
            "id" => self.set_attribute(id, "id", &value.to_string()),
            _ => {
                if let Some(element) = self.element_mut(id) {
                    element.properties.insert(name.to_string(), value);
                }
            }
        }
    }

    // -- Queries -------------------------------------------------------------

    /// First element under `scope` (exclusive) matching `selector`
    pub fn query_selector(&self, scope: NodeId, selector: &str) -> Option<NodeId> {
        self.query_selector_all(scope, selector).into_iter().next()
    }

    pub fn query_selector_all(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
        let groups: Vec<Vec<Compound>> = selector
            .split(',')
            .map(|group| group.split_whitespace().map(Compound::parse).collect())
            .filter(|parts: &Vec<Compound>| !parts.is_empty())
            .collect();
        if groups.is_empty() {
            return Vec::new();
        }

        self.descendants(scope)
            .into_iter()
            .filter(|node| self.is_element(*node))
            .filter(|node| groups.iter().any(|parts| self.matches_chain(*node, parts, scope)))
            .collect()
    }

    fn matches_chain(&self, node: NodeId, parts: &[Compound], scope: NodeId) -> bool {
        let Some((last, rest)) = parts.split_last() else {
            return false;
        };
        if !last.matches(self, node) {
            return false;
        }
        let mut remaining = rest.iter().rev().peekable();
        for ancestor in self.ancestors(node) {
            if ancestor == scope {
                break;
            }
            match remaining.peek() {
                Some(part) if part.matches(self, ancestor) => {
                    remaining.next();
                }
                Some(_) => {}
                None => break,
            }
        }
        remaining.peek().is_none()
    }

    // -- Fragments -----------------------------------------------------------

    /// Build a detached subtree from `fragment`
    pub fn instantiate(&mut self, fragment: &Fragment) -> NodeId {
        match fragment {
            Fragment::Text(text) => self.create_text(text),
            Fragment::Element {
                tag,
                attributes,
                children,
                value,
                checked,
                properties,
            } => {
                let node = self.create_element(tag);
                if let Some(element) = self.element_mut(node) {
                    element.attributes = attributes.clone();
                    element.value = value
                        .clone()
                        .or_else(|| attributes.get("value").cloned())
                        .unwrap_or_default();
                    element.checked = checked.unwrap_or_else(|| attributes.contains_key("checked"));
                    element.properties = properties
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::from_json(v)))
                        .collect();
                }
                for child in children {
                    let child = self.instantiate(child);
                    self.append_child(node, child);
                }
                node
            }
        }
    }

    pub fn snapshot(&self, id: NodeId) -> Fragment {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Element(element)) => Fragment::Element {
                tag: element.tag.clone(),
                attributes: element.attributes.clone(),
                children: self.snapshot_children(id),
                value: Some(element.value.clone()).filter(|v| !v.is_empty()),
                checked: Some(true).filter(|_| element.checked),
                properties: element
                    .properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            },
            Some(NodeKind::Text(text)) => Fragment::Text(text.clone()),
            None => Fragment::Text(String::new()),
        }
    }

    pub fn snapshot_children(&self, id: NodeId) -> Vec<Fragment> {
        self.children(id).iter().map(|c| self.snapshot(*c)).collect()
    }

    pub fn is_observed(&self, id: NodeId) -> bool {
        self.observed
            .map(|root| self.contains(root, id))
            .unwrap_or(false)
    }
}

impl MutationSource for Document {
    fn observe(&mut self, root: NodeId) {
        self.observed = Some(root);
    }

    fn disconnect(&mut self) {
        self.observed = None;
        self.records.clear();
    }

    fn is_observing(&self) -> bool {
        self.observed.is_some()
    }

    fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }
}

/// One compound selector (`li.item#first[data-x=1]`)
#[derive(Debug, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl Compound {
    fn parse(text: &str) -> Self {
        let mut compound = Compound::default();
        let mut rest = text;

        let tag_end = rest.find(['.', '#', '[']).unwrap_or(rest.len());
        let tag = &rest[..tag_end];
        if !tag.is_empty() && tag != "*" {
            compound.tag = Some(tag.to_ascii_lowercase());
        }
        rest = &rest[tag_end..];

        while let Some(first) = rest.chars().next() {
            rest = &rest[first.len_utf8()..];
            match first {
                '[' => {
                    let end = rest.find(']').unwrap_or(rest.len());
                    let inner = &rest[..end];
                    rest = rest.get(end + 1..).unwrap_or("");
                    let (name, value) = match inner.split_once('=') {
                        Some((name, value)) => (
                            name.trim(),
                            Some(value.trim().trim_matches(['"', '\'']).to_string()),
                        ),
                        None => (inner.trim(), None),
                    };
                    compound.attributes.push((name.to_string(), value));
                }
                '.' | '#' => {
                    let end = rest.find(['.', '#', '[']).unwrap_or(rest.len());
                    let name = rest[..end].to_string();
                    rest = &rest[end..];
                    if first == '.' {
                        compound.classes.push(name);
                    } else {
                        compound.id = Some(name);
                    }
                }
                _ => {}
            }
        }
        compound
    }

    fn matches(&self, document: &Document, node: NodeId) -> bool {
        let Some(element) = document.element(node) else {
            return false;
        };
        if self.tag.as_ref().is_some_and(|t| *t != element.tag) {
            return false;
        }
        if self
            .id
            .as_ref()
            .is_some_and(|id| element.attributes.get("id") != Some(id))
        {
            return false;
        }
        let classes: Vec<&str> = document.class_name(node).split_whitespace().collect();
        if !self.classes.iter().all(|c| classes.contains(&c.as_str())) {
            return false;
        }
        self.attributes
            .iter()
            .all(|(name, value)| match (element.attributes.get(name), value) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            })
    }
}
