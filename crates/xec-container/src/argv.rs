//! Pure argv construction for every container-CLI verb (spec §6): no I/O,
//! fully unit-testable. Shared between the plain container adapter (local
//! dispatch) and the SSH-then-container adapter (remote dispatch) so the
//! two can never drift on flag order or naming.

use xec_adapter::LogOptions;
use xec_core::{Command, EphemeralContainerSpec, ProgramSource, ShellMode};

pub fn version_args() -> Vec<String> {
    vec!["version".into(), "--format".into(), "json".into()]
}

pub fn inspect_args(container_ref: &str) -> Vec<String> {
    vec!["inspect".into(), container_ref.into()]
}

pub fn list_args(all: bool) -> Vec<String> {
    let mut args = vec!["ps".to_string()];
    if all {
        args.push("-a".into());
    }
    args.push("--format".into());
    args.push("{{.Names}}".into());
    args
}

/// `<cli> run -d --name <name> [flags…] <image> <cmd…>` (spec §6, flags
/// built from the ephemeral spec per the table in §6: `-e`, `-p`, `-v`,
/// `-w`, `-u`, `--network`, `--privileged`, `--label`, `--health-*`, all in
/// the caller's insertion order).
pub fn run_detached_args(name: &str, image: &str, spec: &EphemeralContainerSpec) -> Vec<String> {
    let mut args = vec!["run".to_string(), "-d".into(), "--name".into(), name.into()];

    for (key, value) in &spec.environment {
        args.push("-e".into());
        args.push(format!("{key}={value}"));
    }
    for (host_port, container_port) in &spec.published_ports {
        args.push("-p".into());
        args.push(format!("{host_port}:{container_port}"));
    }
    for (host_path, container_path) in &spec.volume_bindings {
        args.push("-v".into());
        args.push(format!("{host_path}:{container_path}"));
    }
    if let Some(workdir) = &spec.working_directory {
        args.push("-w".into());
        args.push(workdir.clone());
    }
    if let Some(user) = &spec.user {
        args.push("-u".into());
        args.push(user.clone());
    }
    if let Some(network) = &spec.network {
        args.push("--network".into());
        args.push(network.clone());
    }
    if spec.tty {
        args.push("-t".into());
    }
    if spec.privileged {
        args.push("--privileged".into());
    }
    for (key, value) in &spec.labels {
        args.push("--label".into());
        args.push(format!("{key}={value}"));
    }
    if let Some(health) = &spec.health_check {
        args.push("--health-cmd".into());
        args.push(health.cmd.clone());
        args.push("--health-interval".into());
        args.push(format!("{}s", health.interval.as_secs()));
        args.push("--health-timeout".into());
        args.push(format!("{}s", health.timeout.as_secs()));
        args.push("--health-retries".into());
        args.push(health.retries.to_string());
        if let Some(start_period) = health.start_period {
            args.push("--health-start-period".into());
            args.push(format!("{}s", start_period.as_secs()));
        }
    }

    args.push(image.to_string());
    if let Some(cmd) = &spec.command {
        args.extend(cmd.iter().cloned());
    }
    args
}

/// `<cli> exec [-i] [-t] [-u user] [-w workdir] [-e K=V …] <name> <shell>
/// -c "<cmdstr>"`, or (when `shell_mode` is `Disabled`) the program and
/// args passed directly with no `-c` (spec §4.5 "Exec"). `tty`/`user` come
/// from the target's own config (`ContainerTarget::Existing`'s fields or
/// `EphemeralContainerSpec::{tty,user}`) since `Command` itself carries
/// neither.
pub fn exec_args(
    name: &str,
    command: &Command,
    default_shell: &str,
    tty: bool,
    user: Option<&str>,
) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    if command.stdin.is_some() {
        args.push("-i".into());
    }
    if tty {
        args.push("-t".into());
    }
    if let Some(user) = user {
        args.push("-u".into());
        args.push(user.to_string());
    }
    if let Some(dir) = &command.working_directory {
        args.push("-w".into());
        args.push(dir.to_string_lossy().into_owned());
    }
    for (key, value) in &command.environment {
        args.push("-e".into());
        args.push(format!("{key}={value}"));
    }
    args.push(name.to_string());

    match (&command.program, &command.shell_mode) {
        (ProgramSource::Argv { program, args: a }, ShellMode::Disabled) => {
            args.push(program.clone());
            args.extend(a.iter().cloned());
        }
        (ProgramSource::ShellString(s), ShellMode::Explicit(shell)) => {
            args.push(shell.clone());
            args.push("-c".into());
            args.push(s.clone());
        }
        (ProgramSource::ShellString(s), _) => {
            args.push(default_shell.to_string());
            args.push("-c".into());
            args.push(s.clone());
        }
        (ProgramSource::Argv { program, args: a }, _) => {
            // Argv program with a shell still enabled: fold into one
            // `-c` string so quoting remains the interpolator's job.
            let mut parts = vec![xec_interp::single_quote(program)];
            parts.extend(a.iter().map(|x| xec_interp::single_quote(x)));
            args.push(default_shell.to_string());
            args.push("-c".into());
            args.push(parts.join(" "));
        }
    }
    args
}

pub fn logs_args(name: &str, opts: &LogOptions) -> Vec<String> {
    let mut args = vec!["logs".to_string()];
    if let Some(tail) = opts.tail {
        args.push("--tail".into());
        args.push(tail.to_string());
    }
    if let Some(since) = opts.since {
        let secs = since
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        args.push("--since".into());
        args.push(secs.to_string());
    }
    if opts.timestamps {
        args.push("--timestamps".into());
    }
    if opts.follow {
        args.push("-f".into());
    }
    args.push(name.to_string());
    args
}

pub fn stop_args(name: &str) -> Vec<String> {
    vec!["stop".into(), name.into()]
}

pub fn restart_args(name: &str) -> Vec<String> {
    vec!["restart".into(), name.into()]
}

pub fn remove_args(name: &str, force: bool) -> Vec<String> {
    let mut args = vec!["rm".to_string()];
    if force {
        args.push("-f".into());
    }
    args.push(name.to_string());
    args
}

pub fn copy_to_args(local: &str, name: &str, dest: &str) -> Vec<String> {
    vec!["cp".into(), local.into(), format!("{name}:{dest}")]
}

pub fn copy_from_args(name: &str, src: &str, local: &str) -> Vec<String> {
    vec!["cp".into(), format!("{name}:{src}"), local.into()]
}

pub fn network_create_args(name: &str) -> Vec<String> {
    vec!["network".into(), "create".into(), name.into()]
}

pub fn network_rm_args(name: &str) -> Vec<String> {
    vec!["network".into(), "rm".into(), name.into()]
}

pub fn network_list_args() -> Vec<String> {
    vec!["network".into(), "ls".into()]
}

pub fn volume_create_args(name: &str) -> Vec<String> {
    vec!["volume".into(), "create".into(), name.into()]
}

pub fn volume_rm_args(name: &str) -> Vec<String> {
    vec!["volume".into(), "rm".into(), name.into()]
}

pub fn volume_list_args() -> Vec<String> {
    vec!["volume".into(), "ls".into()]
}

pub fn build_args(tag: &str, dockerfile: &str, context: &str) -> Vec<String> {
    vec![
        "build".into(),
        "-t".into(),
        tag.into(),
        "-f".into(),
        dockerfile.into(),
        context.into(),
    ]
}

pub fn stats_args(name: &str) -> Vec<String> {
    vec!["stats".into(), "--no-stream".into(), "--format".into(), "{{json .}}".into(), name.into()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use std::time::Duration;
    use xec_core::{HealthCheckSpec, TargetSelector};

    #[test]
    fn run_detached_preserves_environment_insertion_order() {
        let mut spec = EphemeralContainerSpec::default();
        spec.environment.insert("B".into(), "2".into());
        spec.environment.insert("A".into(), "1".into());
        let args = run_detached_args("c1", "alpine:latest", &spec);
        let b_pos = args.iter().position(|a| a == "B=2").unwrap();
        let a_pos = args.iter().position(|a| a == "A=1").unwrap();
        assert!(b_pos < a_pos, "insertion order B before A must be preserved");
    }

    #[test]
    fn run_detached_includes_ports_volumes_and_health_flags() {
        let mut spec = EphemeralContainerSpec::default();
        spec.published_ports.push((8080, 80));
        spec.volume_bindings.push(("/host".into(), "/container".into()));
        spec.health_check = Some(HealthCheckSpec {
            cmd: "curl -f http://localhost/ || exit 1".into(),
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(2),
            retries: 3,
            start_period: Some(Duration::from_secs(10)),
        });
        let args = run_detached_args("c1", "nginx", &spec);
        assert!(args.windows(2).any(|w| w == ["-p", "8080:80"]));
        assert!(args.windows(2).any(|w| w == ["-v", "/host:/container"]));
        assert!(args.contains(&"--health-cmd".to_string()));
        assert!(args.contains(&"--health-start-period".to_string()));
        assert_eq!(args.last().unwrap(), "nginx");
    }

    fn base_command(s: &str) -> Command {
        Command {
            program: ProgramSource::ShellString(s.to_string()),
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

    #[test]
    fn exec_args_wraps_shell_string_with_dash_c() {
        let cmd = base_command("echo hi");
        let args = exec_args("web", &cmd, "/bin/sh", false, None);
        assert_eq!(args, vec!["exec", "web", "/bin/sh", "-c", "echo hi"]);
    }

    #[test]
    fn exec_args_disabled_shell_passes_argv_directly() {
        let mut cmd = base_command("unused");
        cmd.program = ProgramSource::Argv {
            program: "ls".into(),
            args: vec!["-la".into()],
        };
        cmd.shell_mode = ShellMode::Disabled;
        let args = exec_args("web", &cmd, "/bin/sh", false, None);
        assert_eq!(args, vec!["exec", "web", "ls", "-la"]);
    }

    #[test]
    fn exec_args_with_stdin_adds_interactive_flag() {
        let mut cmd = base_command("cat");
        cmd.stdin = Some(xec_core::StdinPayload::Bytes(vec![1, 2, 3]));
        let args = exec_args("web", &cmd, "/bin/sh", false, None);
        assert_eq!(args[0], "exec");
        assert_eq!(args[1], "-i");
    }

    #[test]
    fn exec_args_with_tty_and_user_adds_both_flags_in_order() {
        let cmd = base_command("echo hi");
        let args = exec_args("web", &cmd, "/bin/sh", true, Some("alice"));
        assert_eq!(
            args,
            vec!["exec", "-t", "-u", "alice", "web", "/bin/sh", "-c", "echo hi"]
        );
    }

    #[test]
    fn logs_args_build_tail_since_and_follow() {
        let opts = LogOptions {
            tail: Some(100),
            since: None,
            timestamps: true,
            follow: true,
        };
        let args = logs_args("web", &opts);
        assert_eq!(args, vec!["logs", "--tail", "100", "--timestamps", "-f", "web"]);
    }

    #[test]
    fn remove_with_force_adds_dash_f() {
        assert_eq!(remove_args("web", true), vec!["rm", "-f", "web"]);
        assert_eq!(remove_args("web", false), vec!["rm", "web"]);
    }

    #[test]
    fn copy_argv_matches_spec_table() {
        assert_eq!(
            copy_to_args("./a", "web", "/tmp/a"),
            vec!["cp", "./a", "web:/tmp/a"]
        );
        assert_eq!(
            copy_from_args("web", "/tmp/a", "./a"),
            vec!["cp", "web:/tmp/a", "./a"]
        );
    }
}
