//! The local adapter: spawns a child process on the host (spec §4.3).
//!
//! Grounded in the teacher's process-spawning idiom: `tokio::process`,
//! byte-level (not line-buffered) reads so partial output from progress
//! bars is never lost, `kill_on_drop` as a safety net, and process-group
//! signal escalation on timeout.

mod shell;
mod spawn;

pub use shell::resolve_shell;
pub use spawn::LocalAdapter;
