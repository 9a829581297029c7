//! Evaluator host backed by the runtime's document and state store.

use crate::dom::{Document, NodeId};
use crate::scripts::{strip_block, PendingBlocks, COMPLETION_CALL};
use crate::state::StateStore;
use minibind_evaluator::{EvalError, EvalResult, Host, NodeHandle, Value};

pub(crate) struct BindingHost<'a> {
    pub document: &'a mut Document,
    pub state: &'a mut StateStore,
    pub blocks: &'a mut PendingBlocks,
    pub stamp_attribute: &'a str,
}

impl BindingHost<'_> {
    fn node(&self, handle: NodeHandle) -> EvalResult<NodeId> {
        let node = NodeId::from(handle);
        if self.document.node(node).is_some() {
            Ok(node)
        } else {
            Err(EvalError::thrown(format!("node {} does not exist", node)))
        }
    }

    fn query_all(&self, scope: NodeId, selector: &str) -> Value {
        Value::Array(
            self.document
                .query_selector_all(scope, selector)
                .into_iter()
                .map(|n| Value::Node(n.handle()))
                .collect(),
        )
    }
}

fn text_arg(args: &[Value], index: usize) -> String {
    args.get(index).map(|v| v.to_string()).unwrap_or_default()
}

impl Host for BindingHost<'_> {
    fn lookup(&mut self, name: &str) -> Option<Value> {
        self.state.get(name)
    }

    fn assign(&mut self, name: &str, value: Value) -> EvalResult<()> {
        self.state.set(name, value);
        Ok(())
    }

    fn scoped_get(&mut self, scope: &str, name: &str) -> EvalResult<Value> {
        self.state
            .scoped_get(scope, name)
            .ok_or_else(|| EvalError::thrown(format!("ScopeResolutionError: scope {} is disposed", scope)))
    }

    fn scoped_set(&mut self, scope: &str, name: &str, value: Value) -> EvalResult<()> {
        if self.state.scoped_set(scope, name, value) {
            Ok(())
        } else {
            Err(EvalError::thrown(format!(
                "ScopeResolutionError: scope {} is disposed",
                scope
            )))
        }
    }

    fn document(&mut self) -> Value {
        Value::Node(self.document.root().handle())
    }

    fn query(&mut self, selector: &str) -> EvalResult<Value> {
        Ok(self
            .document
            .query_selector(self.document.root(), selector)
            .map(|n| Value::Node(n.handle()))
            .unwrap_or(Value::Null))
    }

    fn get_property(&mut self, node: NodeHandle, name: &str) -> EvalResult<Value> {
        let node = self.node(node)?;
        Ok(self.document.property(node, name))
    }

    fn set_property(&mut self, node: NodeHandle, name: &str, value: Value) -> EvalResult<()> {
        let node = self.node(node)?;
        self.document.set_property(node, name, value);
        Ok(())
    }

    fn call_method(&mut self, node: NodeHandle, name: &str, args: Vec<Value>) -> EvalResult<Value> {
        let node = self.node(node)?;
        match name {
            "getAttribute" => Ok(self
                .document
                .attribute(node, &text_arg(&args, 0))
                .map(Value::from)
                .unwrap_or(Value::Null)),
            "setAttribute" => {
                self.document
                    .set_attribute(node, &text_arg(&args, 0), &text_arg(&args, 1));
                Ok(Value::Undefined)
            }
            "removeAttribute" => {
                self.document.remove_attribute(node, &text_arg(&args, 0));
                Ok(Value::Undefined)
            }
            "hasAttribute" => Ok(Value::Bool(
                self.document.has_attribute(node, &text_arg(&args, 0)),
            )),
            "querySelector" => Ok(self
                .document
                .query_selector(node, &text_arg(&args, 0))
                .map(|n| Value::Node(n.handle()))
                .unwrap_or(Value::Null)),
            "querySelectorAll" => Ok(self.query_all(node, &text_arg(&args, 0))),
            // No focus model; accepted as no-ops
            "focus" | "blur" => Ok(Value::Undefined),
            other => Err(EvalError::not_callable(other)),
        }
    }

    fn has_function(&self, name: &str) -> bool {
        name == COMPLETION_CALL
    }

    fn call_function(&mut self, name: &str, args: &[Value]) -> Option<EvalResult<Value>> {
        if name != COMPLETION_CALL {
            return None;
        }
        let id = text_arg(args, 0);
        if let Some(node) = self.blocks.node_of(&id) {
            strip_block(self.document, node, &id, self.stamp_attribute);
        }
        self.blocks.resolve(&id);
        Some(Ok(Value::Undefined))
    }
}
