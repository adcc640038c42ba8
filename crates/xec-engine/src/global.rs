//! The process-wide default engine (spec §9 "Global state"): a lazily
//! constructed singleton, seeded from the on-disk config file the first
//! time it's touched, plus the top-level `dispose_all` that flushes every
//! adapter the default engine knows about.

use std::sync::OnceLock;

use crate::engine::Engine;

static DEFAULT_ENGINE: OnceLock<Engine> = OnceLock::new();

/// The shared default engine. Built once, on first access, from
/// `xec_config::EngineConfig::load_default` if a config file is present,
/// or from bare-bones defaults otherwise (SPEC_FULL.md §A "Configuration").
pub fn default_engine() -> Engine {
    DEFAULT_ENGINE
        .get_or_init(|| match xec_config::EngineConfig::load_default() {
            Ok(Some(config)) => Engine::from_config(&config),
            Ok(None) => Engine::new(),
            Err(e) => {
                tracing::warn!("failed to load default config, using bare engine defaults: {e}");
                Engine::new()
            }
        })
        .clone()
}

/// Flush every adapter registered on the default engine (spec §9
/// "`dispose_all` flushes every registered adapter"). A no-op if
/// [`default_engine`] was never called.
pub async fn dispose_all() {
    if let Some(engine) = DEFAULT_ENGINE.get() {
        engine.dispose_all().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Serialized: touches the process-wide `DEFAULT_ENGINE` singleton,
    /// which every other test in this crate must leave untouched.
    #[test]
    #[serial]
    fn default_engine_is_the_same_instance_across_calls() {
        let a = default_engine();
        let b = default_engine();
        assert!(a.is_command_available("sh") == b.is_command_available("sh"));
    }
}
