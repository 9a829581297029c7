//! Scripted interaction with a bound document.
//!
//! A steps file is a JSON array replayed in order against the runtime:
//!
//! ```json
//! [
//!   { "step": "set", "name": "count", "value": 1 },
//!   { "step": "click", "selector": "#inc" },
//!   { "step": "input", "selector": "#name", "value": "Ann" },
//!   { "step": "keyUp", "selector": "#name", "key": "Enter" },
//!   { "step": "mutate", "mutation": { "type": "removeNode", "selector": "#old" } }
//! ]
//! ```

use anyhow::{anyhow, Result};
use minibind_evaluator::Value;
use minibind_runtime::{BindingReport, HostEvent, Mutation, NodeId, Runtime};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum Step {
    /// Write a global variable
    Set {
        name: String,
        value: serde_json::Value,
    },

    Click { selector: String },

    /// Type into a field, firing `input`
    Input { selector: String, value: String },

    /// Commit a form control, firing `change`
    Change {
        selector: String,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        checked: Option<bool>,
    },

    KeyUp { selector: String, key: String },

    /// Apply a tree mutation
    Mutate { mutation: Mutation },
}

fn target(rt: &Runtime, selector: &str) -> Result<NodeId> {
    let doc = rt.document();
    doc.query_selector(doc.root(), selector)
        .ok_or_else(|| anyhow!("no element matches {}", selector))
}

impl Step {
    pub fn apply(&self, rt: &mut Runtime) -> Result<BindingReport> {
        info!(step = ?self, "replaying step");
        let report = match self {
            Step::Set { name, value } => rt.set_variable(name, Value::from_json(value)),
            Step::Click { selector } => {
                let node = target(rt, selector)?;
                rt.dispatch(HostEvent::click(node))
            }
            Step::Input { selector, value } => {
                let node = target(rt, selector)?;
                rt.dispatch(HostEvent::new("input", node).with_value(value))
            }
            Step::Change {
                selector,
                value,
                checked,
            } => {
                let node = target(rt, selector)?;
                let mut event = HostEvent::new("change", node);
                if let Some(value) = value {
                    event = event.with_value(value);
                }
                if let Some(checked) = checked {
                    event = event.with_checked(*checked);
                }
                rt.dispatch(event)
            }
            Step::KeyUp { selector, key } => {
                let node = target(rt, selector)?;
                rt.dispatch(HostEvent::key_up(node, key))
            }
            Step::Mutate { mutation } => rt.apply_mutation(mutation)?,
        };
        Ok(report)
    }
}

/// Replay `steps` in order, collecting every binding failure
pub fn replay(rt: &mut Runtime, steps: &[Step]) -> Result<BindingReport> {
    let mut report = BindingReport::new();
    for step in steps {
        report.merge(step.apply(rt)?);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minibind_runtime::{Document, Fragment, RuntimeConfig};

    fn page() -> Runtime {
        let mut rt = Runtime::new(
            Document::from_fragments(&[
                Fragment::element("button")
                    .attr("id", "inc")
                    .attr("onclick", "count++"),
                Fragment::element("span").attr("id", "out").attr(":text", "count"),
            ]),
            RuntimeConfig::default(),
        );
        rt.start();
        rt
    }

    #[test]
    fn test_steps_from_json() {
        let steps: Vec<Step> = serde_json::from_str(
            r##"[
                {"step": "set", "name": "count", "value": 1},
                {"step": "click", "selector": "#inc"},
                {"step": "mutate", "mutation": {"type": "setAttribute", "selector": "#out", "name": "title", "value": "n"}}
            ]"##,
        )
        .unwrap();
        assert_eq!(
            steps[1],
            Step::Click {
                selector: "#inc".to_string()
            }
        );

        let mut rt = page();
        assert!(replay(&mut rt, &steps).unwrap().is_ok());

        let out = target(&rt, "#out").unwrap();
        assert_eq!(rt.document().text_content(out), "2");
        assert_eq!(rt.document().attribute(out, "title"), Some("n"));
    }

    #[test]
    fn test_unknown_selector_fails() {
        let mut rt = page();
        let step = Step::Click {
            selector: "#missing".to_string(),
        };
        assert!(step.apply(&mut rt).is_err());
    }
}
