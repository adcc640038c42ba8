//! Tests that don't require a real SSH server: adapter wiring, target
//! mismatch handling, and pool-stats plumbing. Live-connection behavior
//! (auth ordering against a real daemon, exec round-trips) is exercised by
//! the `xec-bin` manual-test CLI against a disposable container, not here.

use crate::SshAdapter;
use indexmap::IndexMap;
use xec_adapter::Adapter;
use xec_core::{Command, ProgramSource, ShellMode, TargetSelector};

fn local_command() -> Command {
    Command {
        program: ProgramSource::ShellString("echo hi".to_string()),
        shell_mode: ShellMode::Auto,
        environment: IndexMap::new(),
        working_directory: None,
        timeout: None,
        stdin: None,
        suppress_throw: false,
        target: TargetSelector::Local,
        retry_policy: None,
    }
}

#[tokio::test]
async fn executing_a_non_ssh_target_is_an_internal_error() {
    let adapter = SshAdapter::new();
    let err = adapter.execute(&local_command()).await.unwrap_err();
    assert!(matches!(err, xec_core::XecError::Internal(_)));
}

#[test]
fn fresh_adapter_has_an_empty_pool() {
    let adapter = SshAdapter::new();
    let stats = adapter.pool().stats();
    assert_eq!(stats.total_connections, 0);
}

#[tokio::test]
async fn dispose_on_an_empty_pool_is_a_noop() {
    let adapter = SshAdapter::new();
    adapter.dispose().await;
    assert_eq!(adapter.pool().stats().total_connections, 0);
}

#[test]
fn adapter_name_is_ssh() {
    let adapter = SshAdapter::new();
    assert_eq!(adapter.name(), "ssh");
}
