//! Adapter registry: name -> adapter instance (spec §4.8). Selection for an
//! unpinned command is by the `TargetSelector` discriminant's well-known
//! name; callers may additionally register adapters under custom names for
//! `Engine::with`-style pinning.

use std::collections::HashMap;
use std::sync::Arc;

use xec_adapter::Adapter;
use xec_core::{TargetSelector, XecError};

pub(crate) const LOCAL: &str = "local";
pub(crate) const SSH: &str = "ssh";
pub(crate) const CONTAINER: &str = "container";
pub(crate) const CLUSTER_POD: &str = "cluster-pod";
pub(crate) const SSH_CONTAINER: &str = "ssh+container";

/// The well-known registry key a `TargetSelector` dispatches to when the
/// engine hasn't been pinned to a specific adapter name.
pub(crate) fn default_key_for(target: &TargetSelector) -> &'static str {
    match target {
        TargetSelector::Local => LOCAL,
        TargetSelector::Ssh(_) => SSH,
        TargetSelector::Container(_) => CONTAINER,
        TargetSelector::ClusterPod(_) => CLUSTER_POD,
        TargetSelector::SshThenContainer(_, _) => SSH_CONTAINER,
    }
}

#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: Arc<std::sync::RwLock<HashMap<String, Arc<dyn Adapter>>>>,
}

impl AdapterRegistry {
    /// An empty registry with no adapters registered at all. Used by tests
    /// that want full control over which (mock) adapters are wired up.
    pub fn empty() -> Self {
        Self {
            adapters: Arc::new(std::sync::RwLock::new(HashMap::new())),
        }
    }

    /// The registry `Engine::new` starts from: local, SSH, container,
    /// cluster-pod, and ssh+container all wired to their real
    /// implementations (spec §4.8 "Holds: adapter registry").
    pub fn with_default_adapters() -> Self {
        let registry = Self::empty();
        registry.register(LOCAL, Arc::new(xec_process::LocalAdapter::new()));
        registry.register(SSH, Arc::new(xec_ssh::SshAdapter::new()));
        registry.register(CONTAINER, Arc::new(xec_container::ContainerAdapter::new()));
        registry.register(
            SSH_CONTAINER,
            Arc::new(xec_container::SshContainerAdapter::new()),
        );
        registry.register(CLUSTER_POD, Arc::new(xec_cluster::ClusterPodAdapter::new()));
        registry
    }

    pub fn register(&self, name: impl Into<String>, adapter: Arc<dyn Adapter>) {
        self.adapters
            .write()
            .expect("adapter registry lock poisoned")
            .insert(name.into(), adapter);
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters
            .write()
            .expect("adapter registry lock poisoned")
            .remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters
            .read()
            .expect("adapter registry lock poisoned")
            .get(name)
            .cloned()
    }

    pub(crate) fn resolve(&self, name: &str) -> Result<Arc<dyn Adapter>, XecError> {
        self.get(name)
            .ok_or_else(|| XecError::AdapterUnavailable(name.to_string()))
    }

    /// Release pooled resources on every registered adapter (spec §9
    /// "Global state": `dispose_all` "flushes every registered adapter").
    pub async fn dispose_all(&self) {
        let adapters: Vec<Arc<dyn Adapter>> = self
            .adapters
            .read()
            .expect("adapter registry lock poisoned")
            .values()
            .cloned()
            .collect();
        for adapter in adapters {
            adapter.dispose().await;
        }
    }
}
