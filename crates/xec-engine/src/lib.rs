//! The execution engine (spec §4.8) and the deferred process handle it
//! hands back (spec §4.9): registry, default-adapter inference, per-call
//! configuration merging, and the callable façade (spec §4.10) that ties a
//! `Template` to an `Engine` and returns a `ProcessHandle`.

mod command;
mod engine;
mod facade;
mod global;
mod handle;
mod registry;

pub use command::{CommandBuilder, EngineDefaults};
pub use engine::Engine;
pub use facade::Xec;
pub use global::{default_engine, dispose_all};
pub use handle::{BufferSink, PipeSink, ProcessHandle};
pub use registry::AdapterRegistry;

#[cfg(test)]
pub(crate) mod mock;
