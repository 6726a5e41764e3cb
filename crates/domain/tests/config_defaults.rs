use ff_domain::config::{BackendTransport, Config, ConfigSeverity, FailPolicy};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn default_guard_fails_open_at_75_percent() {
    let config = Config::default();
    assert_eq!(config.guard.fail_policy, FailPolicy::Open);
    assert!((config.guard.warning_threshold - 75.0).abs() < f64::EPSILON);
}

#[test]
fn default_config_validates_with_only_warnings() {
    let issues = Config::default().validate();
    assert!(issues
        .iter()
        .all(|issue| issue.severity == ConfigSeverity::Warning));
    assert!(issues.iter().any(|issue| issue.field == "guard.fail_policy"));
}

#[test]
fn full_file_parses() {
    let toml_str = r#"
[backend]
base_url = "https://abc.backend.example"
api_key_env = "MY_KEY"
transport = "rest"
max_retries = 1

[guard]
warning_threshold = 80
default_monthly_budget_usd = 25.0
fail_policy = "closed"

[guard.downgrades.models]
"gpt-4o" = "gpt-4o-mini"

[server]
port = 9000

[observability]
log_format = "pretty"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.backend.transport, BackendTransport::Rest);
    assert_eq!(config.backend.max_retries, 1);
    assert_eq!(config.guard.fail_policy, FailPolicy::Closed);
    assert!((config.guard.warning_threshold - 80.0).abs() < f64::EPSILON);
    assert_eq!(config.server.port, 9000);
    assert!(config.validate().is_empty());
}

#[test]
fn out_of_range_threshold_is_an_error() {
    let toml_str = r#"
[guard]
warning_threshold = 120
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert!(issues.iter().any(|issue| {
        issue.field == "guard.warning_threshold" && issue.severity == ConfigSeverity::Error
    }));
}

#[test]
fn self_downgrade_is_flagged() {
    let toml_str = r#"
[guard.downgrades.models]
"gpt-4o-mini" = "gpt-4o-mini"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert!(config
        .validate()
        .iter()
        .any(|issue| issue.field == "guard.downgrades.models.gpt-4o-mini"));
}

#[test]
fn inline_api_key_wins_over_env() {
    let toml_str = r#"
[backend]
api_key = "inline"
api_key_env = "FF_TEST_UNUSED_KEY_ENV"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.backend.resolve_api_key().as_deref(), Some("inline"));
}
