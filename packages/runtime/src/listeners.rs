//! # Listeners
//!
//! Event listeners attached by entities, and the matching rules used when a
//! host event is dispatched.

use crate::bindings::EventKind;
use crate::dom::{Document, NodeId};
use crate::entity::EntityId;
use minibind_evaluator::builtins::object;
use minibind_evaluator::Value;

/// An event delivered by the host
#[derive(Debug, Clone, PartialEq)]
pub struct HostEvent {
    pub kind: String,
    pub target: NodeId,
    pub key: Option<String>,
    pub code: Option<String>,
    /// Control value to apply before listeners run, as typing would
    pub value: Option<String>,
    pub checked: Option<bool>,
}

impl HostEvent {
    pub fn new(kind: &str, target: NodeId) -> Self {
        Self {
            kind: kind.to_string(),
            target,
            key: None,
            code: None,
            value: None,
            checked: None,
        }
    }

    pub fn click(target: NodeId) -> Self {
        Self::new("click", target)
    }

    pub fn key_up(target: NodeId, key: &str) -> Self {
        let code = match key {
            " " => "Space".to_string(),
            key if key.chars().count() == 1 => format!("Key{}", key.to_ascii_uppercase()),
            key => key.to_string(),
        };
        Self {
            key: Some(key.to_string()),
            code: Some(code),
            ..Self::new("keyup", target)
        }
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    /// The `event` object seen by handlers
    pub fn to_value(&self) -> Value {
        let text = |v: &Option<String>| v.as_deref().map(Value::from).unwrap_or(Value::Undefined);
        object([
            ("type", Value::from(self.kind.as_str())),
            ("target", Value::Node(self.target.handle())),
            ("key", text(&self.key)),
            ("code", text(&self.code)),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerFilter {
    /// Events at the element or any descendant
    Bubbling,
    /// Events at the element itself, optionally limited to some keys
    OwnTarget { keys: Vec<String> },
    /// Events inside the observed root but outside the element
    Outside,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listener {
    pub entity: EntityId,
    pub node: NodeId,
    /// Binding attribute whose text runs when the listener fires
    pub attribute: String,
    pub event: String,
    pub filter: ListenerFilter,
}

/// Listeners an event binding needs on `node`
pub fn listeners_for(
    kind: &EventKind,
    entity: &EntityId,
    node: NodeId,
    attribute: &str,
    document: &Document,
) -> Vec<Listener> {
    let listener = |event: &str, filter: ListenerFilter| Listener {
        entity: entity.clone(),
        node,
        attribute: attribute.to_string(),
        event: event.to_string(),
        filter,
    };

    match kind {
        EventKind::Native(event) => vec![listener(event, ListenerFilter::Bubbling)],
        EventKind::Change => {
            let event = if is_toggle_control(document, node) {
                "change"
            } else {
                "input"
            };
            vec![listener(event, ListenerFilter::Bubbling)]
        }
        EventKind::ClickOut => vec![listener("click", ListenerFilter::Outside)],
        EventKind::Press => vec![
            listener(
                "keyup",
                ListenerFilter::OwnTarget {
                    keys: vec!["Enter".to_string(), "Space".to_string()],
                },
            ),
            listener("click", ListenerFilter::Bubbling),
            listener("touchstart", ListenerFilter::Bubbling),
        ],
        EventKind::KeyUp(key) => vec![listener(
            "keyup",
            ListenerFilter::OwnTarget {
                keys: vec![key.clone()],
            },
        )],
    }
}

/// Checkboxes and selects report `change`; text fields report `input`
fn is_toggle_control(document: &Document, node: NodeId) -> bool {
    match document.tag(node) {
        Some("select") => true,
        Some("input") => matches!(document.attribute(node, "type"), Some("checkbox") | Some("radio")),
        _ => false,
    }
}

#[derive(Debug, Default)]
pub struct ListenerTable {
    listeners: Vec<Listener>,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    /// Detach the listeners of one binding
    pub fn detach(&mut self, entity: &EntityId, attribute: &str) -> usize {
        let before = self.listeners.len();
        self.listeners
            .retain(|l| !(l.entity == *entity && l.attribute == attribute));
        before - self.listeners.len()
    }

    pub fn detach_entity(&mut self, entity: &EntityId) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.entity != *entity);
        before - self.listeners.len()
    }

    pub fn for_entity<'a>(&'a self, entity: &'a EntityId) -> impl Iterator<Item = &'a Listener> {
        self.listeners.iter().filter(move |l| l.entity == *entity)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Listeners `event` reaches: bubbling order from the target upward,
    /// then document-wide listeners
    pub fn matching(&self, event: &HostEvent, document: &Document, root: NodeId) -> Vec<Listener> {
        let path: Vec<NodeId> = std::iter::once(event.target)
            .chain(document.ancestors(event.target))
            .collect();

        let mut local: Vec<(usize, &Listener)> = Vec::new();
        let mut outside = Vec::new();

        for listener in self.listeners.iter().filter(|l| l.event == event.kind) {
            match &listener.filter {
                ListenerFilter::Bubbling => {
                    if let Some(depth) = path.iter().position(|n| *n == listener.node) {
                        local.push((depth, listener));
                    }
                }
                ListenerFilter::OwnTarget { keys } => {
                    let key_matches = keys.is_empty()
                        || keys.iter().any(|k| {
                            event.key.as_deref() == Some(k.as_str())
                                || event.code.as_deref() == Some(k.as_str())
                        });
                    if listener.node == event.target && key_matches {
                        local.push((0, listener));
                    }
                }
                ListenerFilter::Outside => {
                    if document.contains(root, event.target)
                        && !document.contains(listener.node, event.target)
                    {
                        outside.push(listener.clone());
                    }
                }
            }
        }

        local.sort_by_key(|(depth, _)| *depth);
        local
            .into_iter()
            .map(|(_, l)| l.clone())
            .chain(outside)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Fragment;

    fn menu() -> (Document, NodeId, NodeId, NodeId) {
        let document = Document::from_fragments(&[
            Fragment::element("div")
                .attr("id", "menu")
                .child(Fragment::element("button").attr("id", "toggle")),
            Fragment::element("p").attr("id", "elsewhere"),
        ]);
        let root = document.root();
        let menu = document.query_selector(root, "#menu").unwrap();
        let toggle = document.query_selector(root, "#toggle").unwrap();
        let elsewhere = document.query_selector(root, "#elsewhere").unwrap();
        (document, menu, toggle, elsewhere)
    }

    fn attach(table: &mut ListenerTable, document: &Document, kind: EventKind, node: NodeId, name: &str) {
        for listener in listeners_for(&kind, &EntityId::from(name), node, name, document) {
            table.attach(listener);
        }
    }

    #[test]
    fn test_bubbling_order() {
        let (document, menu, toggle, _) = menu();
        let mut table = ListenerTable::new();
        attach(&mut table, &document, EventKind::Native("click".into()), menu, "outer");
        attach(&mut table, &document, EventKind::Native("click".into()), toggle, "inner");

        let fired = table.matching(&HostEvent::click(toggle), &document, document.root());
        let names: Vec<&str> = fired.iter().map(|l| l.attribute.as_str()).collect();
        assert_eq!(names, vec!["inner", "outer"]);
    }

    #[test]
    fn test_click_outside() {
        let (document, menu, toggle, elsewhere) = menu();
        let mut table = ListenerTable::new();
        attach(&mut table, &document, EventKind::ClickOut, menu, ":clickout");

        let root = document.root();
        assert!(table.matching(&HostEvent::click(toggle), &document, root).is_empty());
        assert_eq!(table.matching(&HostEvent::click(elsewhere), &document, root).len(), 1);
    }

    #[test]
    fn test_press_and_key_filters() {
        let (document, menu, toggle, _) = menu();
        let mut table = ListenerTable::new();
        attach(&mut table, &document, EventKind::Press, toggle, ":press");
        attach(&mut table, &document, EventKind::KeyUp("ArrowUp".into()), menu, ":keyup.up");

        let root = document.root();
        assert_eq!(table.matching(&HostEvent::key_up(toggle, "Enter"), &document, root).len(), 1);
        assert_eq!(table.matching(&HostEvent::key_up(toggle, " "), &document, root).len(), 1);
        assert!(table.matching(&HostEvent::key_up(toggle, "a"), &document, root).is_empty());
        assert_eq!(table.matching(&HostEvent::new("touchstart", toggle), &document, root).len(), 1);

        // Key-up conveniences need the element itself as target
        assert!(table.matching(&HostEvent::key_up(toggle, "ArrowUp"), &document, root).is_empty());
        assert_eq!(table.matching(&HostEvent::key_up(menu, "ArrowUp"), &document, root).len(), 1);
    }

    #[test]
    fn test_change_picks_event_by_control() {
        let mut document = Document::new();
        let checkbox = document.instantiate(&Fragment::element("input").attr("type", "checkbox"));
        let text = document.instantiate(&Fragment::element("input"));
        let id = EntityId::from("E");

        assert_eq!(listeners_for(&EventKind::Change, &id, checkbox, ":change", &document)[0].event, "change");
        assert_eq!(listeners_for(&EventKind::Change, &id, text, ":change", &document)[0].event, "input");
    }

    #[test]
    fn test_detach_one_binding() {
        let (document, _, toggle, _) = menu();
        let mut table = ListenerTable::new();
        let id = EntityId::from("E");
        for kind in [EventKind::Press, EventKind::Native("blur".into())] {
            let name = if kind == EventKind::Press { ":press" } else { ":blur" };
            for listener in listeners_for(&kind, &id, toggle, name, &document) {
                table.attach(listener);
            }
        }

        assert_eq!(table.detach(&id, ":press"), 3);
        assert_eq!(table.for_entity(&id).count(), 1);
        assert_eq!(table.detach_entity(&id), 1);
        assert!(table.is_empty());
    }
}
