//! Ambient configuration for the execution engine: serde/toml-deserializable
//! defaults (environment, timeout, retry policy, pool sizing, container CLI
//! binary) loadable from a config file and overridable by `Engine::with`
//! (spec §9 "Global state", SPEC_FULL.md §A "Configuration").
//!
//! Grounded in the teacher's `csa-config` layer: a plain-data struct with
//! `#[serde(default)]` fields, loaded with `toml::from_str`, that the
//! higher-level crate (here, `xec-engine`) turns into runtime types rather
//! than depending on `toml`/`directories` itself.

mod config;
mod paths;

pub use config::{EngineConfig, PoolConfig, RetryConfig, ShellConfig};
pub use paths::{config_file_path, default_config_dir};

#[cfg(test)]
mod tests;
