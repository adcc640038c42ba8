//! Cluster-pod adapter (spec §4.6), interface only. `exec`/`raw`/`logs`/
//! `copyTo`/`copyFrom` shell out to a kubectl-compatible CLI the way the
//! container adapter shells out to docker/podman; `portForward`,
//! `portForwardDynamic`, and `follow` are explicit stubs returning
//! `AdapterUnavailable` -- their internals are owned by an external
//! collaborator per spec.

mod argv;
mod pod;

pub use pod::{ClusterPodAdapter, PodHandle, PortForwardHandle};
