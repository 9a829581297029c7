//! The seam between the interpreter and whatever owns state and elements.

use crate::error::{EvalError, EvalResult};
use crate::value::{NodeHandle, Value};
use std::collections::HashMap;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Log,
    Info,
    Warn,
    Error,
}

/// Name resolution and side effects for evaluated expressions.
///
/// The interpreter consults locals first and the host second; names the
/// host does not know fall through to the built-in set and then read as
/// `undefined`.
pub trait Host {
    /// Global (non-local) name lookup
    fn lookup(&mut self, name: &str) -> Option<Value>;

    fn assign(&mut self, name: &str, value: Value) -> EvalResult<()>;

    /// Read a variable of the scope with id `scope`
    fn scoped_get(&mut self, scope: &str, name: &str) -> EvalResult<Value>;

    fn scoped_set(&mut self, scope: &str, name: &str, value: Value) -> EvalResult<()>;

    /// Value of `document`
    fn document(&mut self) -> Value {
        Value::Undefined
    }

    /// `$(selector)`: first matching element or `null`
    fn query(&mut self, _selector: &str) -> EvalResult<Value> {
        Ok(Value::Null)
    }

    fn get_property(&mut self, _node: NodeHandle, _name: &str) -> EvalResult<Value> {
        Ok(Value::Undefined)
    }

    fn set_property(&mut self, _node: NodeHandle, name: &str, _value: Value) -> EvalResult<()> {
        Err(EvalError::invalid_assignment(name))
    }

    /// Element method call (`this.getAttribute('x')`)
    fn call_method(&mut self, _node: NodeHandle, name: &str, _args: Vec<Value>) -> EvalResult<Value> {
        Err(EvalError::not_callable(name))
    }

    /// Host-provided global function; `None` when the host has no such function
    fn call_function(&mut self, _name: &str, _args: &[Value]) -> Option<EvalResult<Value>> {
        None
    }

    fn has_function(&self, _name: &str) -> bool {
        false
    }

    fn log(&mut self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Log | LogLevel::Info => info!(target: "console", "{}", message),
            LogLevel::Warn => warn!(target: "console", "{}", message),
            LogLevel::Error => error!(target: "console", "{}", message),
        }
    }
}

/// Plain map-backed host with no elements
#[derive(Debug, Default)]
pub struct MemoryHost {
    pub globals: HashMap<String, Value>,
    pub scopes: HashMap<String, HashMap<String, Value>>,
    pub logs: Vec<(LogLevel, String)>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.globals.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }
}

impl Host for MemoryHost {
    fn lookup(&mut self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }

    fn assign(&mut self, name: &str, value: Value) -> EvalResult<()> {
        self.globals.insert(name.to_string(), value);
        Ok(())
    }

    fn scoped_get(&mut self, scope: &str, name: &str) -> EvalResult<Value> {
        let vars = self
            .scopes
            .get(scope)
            .ok_or_else(|| EvalError::thrown(format!("Unknown scope '{}'", scope)))?;
        Ok(vars.get(name).cloned().unwrap_or(Value::Undefined))
    }

    fn scoped_set(&mut self, scope: &str, name: &str, value: Value) -> EvalResult<()> {
        self.scopes
            .entry(scope.to_string())
            .or_default()
            .insert(name.to_string(), value);
        Ok(())
    }

    fn log(&mut self, level: LogLevel, message: &str) {
        self.logs.push((level, message.to_string()));
    }
}
