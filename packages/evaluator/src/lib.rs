//! # Minibind Evaluator
//!
//! Evaluates binding expressions against a [`Host`] that owns the variable
//! namespaces and the elements. Only a restricted built-in set is reachable
//! from expression text; everything else goes through the host.

pub mod builtins;
pub mod class_list;
pub mod collection;
pub mod error;
pub mod host;
pub mod interpreter;
pub mod value;

#[cfg(test)]
mod tests_expressions;

#[cfg(test)]
mod tests_statements;

pub use class_list::{class_candidates, evaluate_class_list, net_class_list, selected_classes};
pub use error::{EvalError, EvalResult};
pub use host::{Host, LogLevel, MemoryHost};
pub use interpreter::{evaluate, Frame, Interpreter, MAX_CALL_DEPTH};
pub use value::{Builtin, Closure, Namespace, NodeHandle, Object, Value};
