//! # Minibind Runtime
//!
//! Binds marker attributes on a document tree to shared state. Every element
//! gets an [`Entity`]; its binding expressions are analyzed for the
//! variables they read, evaluated into the element, and re-evaluated when
//! those variables change. The mutation coordinator keeps entities in step
//! with the tree as nodes and attributes come and go.

pub mod bindings;
pub mod config;
pub mod dom;
pub mod entity;
pub mod error;
mod host;
pub mod id_generator;
pub mod listeners;
pub mod mutations;
pub mod observer;
pub mod persistence;
pub mod registry;
pub mod runtime;
pub mod scripts;
pub mod state;

#[cfg(test)]
mod tests_bindings;

#[cfg(test)]
mod tests_coordinator;

pub use bindings::{classify, BindingKind, EventKind};
pub use config::RuntimeConfig;
pub use dom::{Document, Fragment, MutationRecord, MutationSource, NodeId};
pub use entity::{Entity, EntityId, EntityState};
pub use error::{BindingFailure, BindingReport, RuntimeError, RuntimeResult};
pub use listeners::HostEvent;
pub use mutations::Mutation;
pub use persistence::{DurableStore, FileStore, MemoryStore};
pub use runtime::Runtime;
pub use scripts::{BlockExecutor, BlockStatus, InterpreterExecutor};
