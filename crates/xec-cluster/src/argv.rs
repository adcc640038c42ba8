//! Pure argv construction for the kubectl-compatible CLI (spec §4.6).

use xec_adapter::LogOptions;
use xec_core::{Command, ProgramSource, ShellMode};

fn namespace_flag(namespace: Option<&str>) -> Vec<String> {
    match namespace {
        Some(ns) => vec!["-n".to_string(), ns.to_string()],
        None => Vec::new(),
    }
}

pub fn exec_args(name: &str, namespace: Option<&str>, command: &Command, default_shell: &str) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    args.extend(namespace_flag(namespace));
    if command.stdin.is_some() {
        args.push("-i".into());
    }
    args.push(name.to_string());
    args.push("--".into());

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
            let mut parts = vec![xec_interp::single_quote(program)];
            parts.extend(a.iter().map(|x| xec_interp::single_quote(x)));
            args.push(default_shell.to_string());
            args.push("-c".into());
            args.push(parts.join(" "));
        }
    }
    args
}

pub fn logs_args(name: &str, namespace: Option<&str>, opts: &LogOptions) -> Vec<String> {
    let mut args = vec!["logs".to_string()];
    args.extend(namespace_flag(namespace));
    if let Some(tail) = opts.tail {
        args.push("--tail".into());
        args.push(tail.to_string());
    }
    if let Some(since) = opts.since {
        let secs = since
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        args.push("--since-time".into());
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

pub fn copy_to_args(local: &str, namespace: Option<&str>, name: &str, dest: &str) -> Vec<String> {
    let mut args = vec!["cp".to_string(), local.to_string()];
    let target = match namespace {
        Some(ns) => format!("{ns}/{name}:{dest}"),
        None => format!("{name}:{dest}"),
    };
    args.push(target);
    args
}

pub fn copy_from_args(namespace: Option<&str>, name: &str, src: &str, local: &str) -> Vec<String> {
    let source = match namespace {
        Some(ns) => format!("{ns}/{name}:{src}"),
        None => format!("{name}:{src}"),
    };
    vec!["cp".to_string(), source, local.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use xec_core::TargetSelector;

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
    fn exec_args_include_namespace_and_double_dash() {
        let cmd = base_command("echo hi");
        let args = exec_args("web-0", Some("prod"), &cmd, "/bin/sh");
        assert_eq!(
            args,
            vec!["exec", "-n", "prod", "web-0", "--", "/bin/sh", "-c", "echo hi"]
        );
    }

    #[test]
    fn exec_args_without_namespace_omit_n_flag() {
        let cmd = base_command("echo hi");
        let args = exec_args("web-0", None, &cmd, "/bin/sh");
        assert_eq!(args, vec!["exec", "web-0", "--", "/bin/sh", "-c", "echo hi"]);
    }

    #[test]
    fn copy_args_use_namespace_slash_name_colon_path_syntax() {
        assert_eq!(
            copy_to_args("./a", Some("prod"), "web-0", "/tmp/a"),
            vec!["cp", "./a", "prod/web-0:/tmp/a"]
        );
        assert_eq!(
            copy_from_args(Some("prod"), "web-0", "/tmp/a", "./a"),
            vec!["cp", "prod/web-0:/tmp/a", "./a"]
        );
    }

    #[test]
    fn logs_args_build_tail_and_follow() {
        let opts = xec_adapter::LogOptions {
            tail: Some(50),
            since: None,
            timestamps: false,
            follow: true,
        };
        let args = logs_args("web-0", None, &opts);
        assert_eq!(args, vec!["logs", "--tail", "50", "-f", "web-0"]);
    }
}
