//! The container adapter (spec §4.5): delegates to an external container
//! CLI binary (`docker`/`podman`) discovered on `PATH`. Composes
//! [`xec_process::LocalAdapter`] for local dispatch and [`xec_ssh::SshAdapter`]
//! for the SSH-then-container path, so neither process-spawning nor SSH
//! channel handling is duplicated here.

mod adapter;
mod argv;
mod ephemeral;
mod redis_cluster;
mod ssh_container;

pub use adapter::ContainerAdapter;
pub use ephemeral::generate_name;
pub use redis_cluster::{RedisCluster, RedisClusterConfig};
pub use ssh_container::SshContainerAdapter;
