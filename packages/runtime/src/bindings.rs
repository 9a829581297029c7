//! Binding descriptors.
//!
//! Attribute names are classified once into a [`BindingKind`]; everything
//! downstream matches on the kind instead of inspecting name prefixes.

/// Prefix of binding attributes
pub const MARKER: char = ':';

/// Events recognized as `on<event>` attributes and `:<event>` aliases
pub const NATIVE_EVENTS: &[&str] = &[
    "click",
    "dblclick",
    "contextmenu",
    "input",
    "submit",
    "reset",
    "focus",
    "blur",
    "focusin",
    "focusout",
    "keydown",
    "keyup",
    "keypress",
    "mousedown",
    "mouseup",
    "mousemove",
    "mouseenter",
    "mouseleave",
    "mouseover",
    "mouseout",
    "touchstart",
    "touchend",
    "touchmove",
    "touchcancel",
    "scroll",
    "wheel",
    "resize",
    "select",
    "drag",
    "dragstart",
    "dragend",
    "dragover",
    "dragenter",
    "dragleave",
    "drop",
    "copy",
    "cut",
    "paste",
];

/// Content bindings in evaluation order
pub const CONTENT_BINDINGS: &[&str] = &[":value", ":checked", ":class", ":text"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Plain listener for a native event type
    Native(String),
    /// `input` for free-text fields, `change` for checkboxes and selects
    Change,
    ClickOut,
    /// Enter/Space key release, click and touch start
    Press,
    /// Key release of one key, stored as its `KeyboardEvent.key` name
    KeyUp(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Text,
    Class,
    Value,
    Checked,
    Each,
    Load,
    Scope,
    Event(EventKind),
    /// Generic binding onto the element property of this name
    Attribute(String),
}

impl BindingKind {
    pub fn is_event(&self) -> bool {
        matches!(self, BindingKind::Event(_))
    }

    /// Bindings whose result is written onto the element
    pub fn is_content(&self) -> bool {
        matches!(
            self,
            BindingKind::Text
                | BindingKind::Class
                | BindingKind::Value
                | BindingKind::Checked
                | BindingKind::Attribute(_)
        )
    }

    /// Bindings whose text contributes variables
    pub fn tracks_variables(&self) -> bool {
        !matches!(self, BindingKind::Scope)
    }
}

/// Classify an attribute name; `None` for plain attributes
pub fn classify(name: &str) -> Option<BindingKind> {
    if let Some(event) = name.strip_prefix("on") {
        return is_native_event(event).then(|| BindingKind::Event(EventKind::Native(event.to_string())));
    }

    let rest = name.strip_prefix(MARKER)?;
    let kind = match rest {
        "" => return None,
        "text" => BindingKind::Text,
        "class" => BindingKind::Class,
        "value" => BindingKind::Value,
        "checked" => BindingKind::Checked,
        "each" => BindingKind::Each,
        "load" => BindingKind::Load,
        "scope" => BindingKind::Scope,
        "change" => BindingKind::Event(EventKind::Change),
        "clickout" => BindingKind::Event(EventKind::ClickOut),
        "press" => BindingKind::Event(EventKind::Press),
        event if is_native_event(event) => BindingKind::Event(EventKind::Native(event.to_string())),
        other => match other.strip_prefix("keyup.") {
            Some(key) => BindingKind::Event(EventKind::KeyUp(key_name(key)?)),
            None => BindingKind::Attribute(other.to_string()),
        },
    };
    Some(kind)
}

pub fn is_native_event(name: &str) -> bool {
    NATIVE_EVENTS.contains(&name)
}

/// `KeyboardEvent.key` name for a `:keyup.<key>` suffix
fn key_name(suffix: &str) -> Option<String> {
    let key = match suffix {
        "up" => "ArrowUp",
        "down" => "ArrowDown",
        "left" => "ArrowLeft",
        "right" => "ArrowRight",
        "enter" => "Enter",
        "space" => "Space",
        _ => return None,
    };
    Some(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_keywords() {
        assert_eq!(classify(":text"), Some(BindingKind::Text));
        assert_eq!(classify(":each"), Some(BindingKind::Each));
        assert_eq!(classify(":scope"), Some(BindingKind::Scope));
        assert_eq!(
            classify(":change"),
            Some(BindingKind::Event(EventKind::Change))
        );
    }

    #[test]
    fn test_event_names() {
        let click = Some(BindingKind::Event(EventKind::Native("click".into())));
        assert_eq!(classify("onclick"), click);
        assert_eq!(classify(":click"), click);
        assert_eq!(classify("onion"), None);
        assert_eq!(
            classify(":keyup.enter"),
            Some(BindingKind::Event(EventKind::KeyUp("Enter".into())))
        );
        assert_eq!(
            classify(":keyup.left"),
            Some(BindingKind::Event(EventKind::KeyUp("ArrowLeft".into())))
        );
        assert_eq!(classify(":keyup.a"), None);
    }

    #[test]
    fn test_dynamic_attributes() {
        assert_eq!(
            classify(":href"),
            Some(BindingKind::Attribute("href".into()))
        );
        assert!(classify(":disabled").is_some_and(|k| k.is_content()));
        assert_eq!(classify("class"), None);
        assert_eq!(classify(":"), None);
    }
}
