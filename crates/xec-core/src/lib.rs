//! Data model and error taxonomy shared by every adapter, wrapper, and the
//! engine itself: `Command`, `ExecResult`, target selectors, and `XecError`.

mod error;
mod types;

pub use error::{FailureContext, XecError};
pub use types::{
    ClusterPodConfig, Command, ContainerCliConfig, ContainerTarget, EphemeralContainerSpec,
    ExecResult, ExitStatus, HealthCheckSpec, PoolKey, ProgramSource, RetryPolicy, ShellMode,
    SignalName, SshConnectionConfig, SshCredentials, StdinPayload, SudoConfig, TargetSelector,
    signal_name_from_number,
};
