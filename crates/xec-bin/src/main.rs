use anyhow::{Context, Result};
use clap::Parser;

mod cli;

use cli::{Cli, Commands};
use xec_core::{ContainerCliConfig, ContainerTarget, RetryPolicy, SshConnectionConfig, SshCredentials};
use xec_engine::{default_engine, Engine};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    let timeout = cli.timeout;
    let max_retries = cli.retry;
    let quiet = cli.quiet;
    let nothrow = cli.nothrow;
    let print_json = cli.json;

    let engine = engine_for(&cli)?;

    let mut argv = match cli.command {
        Commands::Run { command } => command,
        Commands::Ssh { command, .. } => command,
        Commands::Docker { command, .. } => command,
        Commands::Which { program } => {
            return match engine.which(&program) {
                Some(path) => {
                    println!("{}", path.display());
                    Ok(())
                }
                None => std::process::exit(1),
            };
        }
    };
    let program = argv.remove(0);

    let mut handle = engine.exec_argv(program, argv);
    if let Some(seconds) = timeout {
        handle = handle.timeout(std::time::Duration::from_secs(seconds));
    }
    if let Some(max_retries) = max_retries {
        handle = handle.retry(RetryPolicy {
            max_retries,
            ..RetryPolicy::default()
        });
    }
    if quiet {
        handle = handle.quiet();
    }
    if nothrow {
        handle = handle.nothrow();
    }

    match handle.wait().await {
        Ok(result) => {
            if print_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            std::process::exit(result.exit_status.numeric_code().unwrap_or(0));
        }
        Err(e) => {
            eprintln!("xec: {e}");
            std::process::exit(e.exit_code().unwrap_or(1));
        }
    }
}

fn engine_for(cli: &Cli) -> Result<Engine> {
    let mut engine = default_engine();

    if let Some(cd) = &cli.cd {
        engine = engine.cd(cd);
    }
    if !cli.env.is_empty() {
        let pairs = cli
            .env
            .iter()
            .map(|kv| parse_env_pair(kv))
            .collect::<Result<Vec<_>>>()?;
        engine = engine.env(pairs);
    }

    engine = match &cli.command {
        Commands::Ssh {
            host,
            port,
            user,
            identity,
            ..
        } => {
            let mut config = SshConnectionConfig::new(host.clone(), user.clone());
            config.port = *port;
            if let Some(identity) = identity {
                let key = std::fs::read_to_string(identity)
                    .with_context(|| format!("reading identity file {identity}"))?;
                config.credentials = SshCredentials {
                    private_key_material: Some(key),
                    ..SshCredentials::default()
                };
            }
            engine.ssh(config)
        }
        Commands::Docker {
            container,
            cli: cli_binary,
            exec_user,
            tty,
            ..
        } => engine.docker(ContainerTarget::Existing {
            name: container.clone(),
            cli: ContainerCliConfig {
                binary: cli_binary.clone(),
            },
            user: exec_user.clone(),
            tty: *tty,
        }),
        Commands::Run { .. } | Commands::Which { .. } => engine,
    };

    Ok(engine)
}

fn parse_env_pair(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    Ok((key.to_string(), value.to_string()))
}
