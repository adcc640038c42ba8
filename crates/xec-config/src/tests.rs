use super::*;
use std::io::Write;

#[test]
fn default_config_has_sane_values() {
    let cfg = EngineConfig::default();
    assert_eq!(cfg.retry.max_retries, 0);
    assert_eq!(cfg.retry.backoff_multiplier, 2.0);
    assert!(cfg.retry.jitter);
    assert_eq!(cfg.pool.max_connections, 10);
    assert_eq!(cfg.container_binary, "docker");
    assert_eq!(cfg.default_adapter, "local");
}

#[test]
fn load_returns_none_when_file_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.toml");
    assert!(EngineConfig::load(&path).unwrap().is_none());
}

#[test]
fn load_parses_partial_overrides_with_defaults_filled_in() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"
        container_binary = "podman"

        [retry]
        max_retries = 3
        "#
    )
    .unwrap();

    let cfg = EngineConfig::load(&path).unwrap().unwrap();
    assert_eq!(cfg.container_binary, "podman");
    assert_eq!(cfg.retry.max_retries, 3);
    // untouched fields keep their defaults
    assert_eq!(cfg.retry.backoff_multiplier, 2.0);
    assert_eq!(cfg.pool.max_connections, 10);
}

#[test]
fn shell_config_round_trips_through_toml() {
    let toml_text = r#"mode = "explicit"
path = "/usr/bin/fish"
"#;
    let shell: ShellConfig = toml::from_str(toml_text).unwrap();
    match shell.to_shell_mode() {
        xec_core::ShellMode::Explicit(path) => assert_eq!(path, "/usr/bin/fish"),
        other => panic!("expected Explicit, got {other:?}"),
    }
}

#[test]
fn retry_config_converts_milliseconds_to_durations() {
    let retry = RetryConfig {
        max_retries: 2,
        initial_delay_ms: 250,
        backoff_multiplier: 3.0,
        max_delay_ms: Some(5_000),
        jitter: false,
    };
    let policy = retry.to_retry_policy();
    assert_eq!(policy.initial_delay, std::time::Duration::from_millis(250));
    assert_eq!(policy.max_delay, Some(std::time::Duration::from_secs(5)));
    assert!(!policy.jitter);
}
