//! Argument parsing for the manual-verification CLI (SPEC_FULL.md §A "CLI
//! surface for manual verification"): `xec run -- …`, `xec ssh …`, `xec
//! docker …`, plus `xec which`. Thin and non-interactive by design -- no
//! spinner/TUI rendering, matching the Non-goals in spec.md §1.

use clap::{Parser, Subcommand};

/// Build version string combining Cargo.toml version and git describe.
fn build_version() -> &'static str {
    static VERSION: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    VERSION.get_or_init(|| {
        let cargo_ver = env!("CARGO_PKG_VERSION");
        let git_desc = env!("XEC_GIT_DESCRIBE");
        if git_desc.is_empty() {
            cargo_ver.to_string()
        } else {
            format!("{cargo_ver} ({git_desc})")
        }
    })
}

#[derive(Parser)]
#[command(name = "xec", version = build_version())]
#[command(about = "Polymorphic command execution over local, SSH, container, and cluster-pod backends")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Working directory for the dispatched command (defaults to the
    /// caller's own CWD).
    #[arg(long, global = true)]
    pub cd: Option<String>,

    /// Environment variable override, `KEY=VALUE`. Repeatable.
    #[arg(long = "env", global = true, value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Timeout in seconds before the command is killed.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Maximum retry attempts on a non-zero exit or retryable error.
    #[arg(long, global = true)]
    pub retry: Option<u32>,

    /// Suppress forwarding the child's stdout/stderr to this process's own.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Don't fail the process on a non-zero exit; print the exit code instead.
    #[arg(long, global = true)]
    pub nothrow: bool,

    /// Print the result as JSON instead of raw stdout.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a command on the local host.
    Run {
        /// Program and arguments, e.g. `xec run -- ls -la`.
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
    /// Run a command over SSH.
    Ssh {
        #[arg(long)]
        host: String,
        #[arg(long, default_value_t = 22)]
        port: u16,
        #[arg(long)]
        user: String,
        /// Path to a private key file; password auth used if omitted.
        #[arg(long)]
        identity: Option<String>,
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
    /// Run a command inside an existing named container.
    Docker {
        #[arg(long)]
        container: String,
        /// Container CLI binary (`docker`, `podman`, ...).
        #[arg(long, default_value = "docker")]
        cli: String,
        /// User to run the exec'd process as (`-u`).
        #[arg(long = "exec-user")]
        exec_user: Option<String>,
        /// Allocate a TTY for the exec'd process (`-t`).
        #[arg(long)]
        tty: bool,
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
    /// Resolve a program against `PATH`, like the shell builtin.
    Which {
        program: String,
    },
}
