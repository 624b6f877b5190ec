//! Integration tests for testhost-config

use std::io::Write;
use std::time::Duration;
use temp_env::with_vars;
use testhost_config::*;

const OVERRIDES: [&str; 5] = [
    "TESTHOST_LOG_LEVEL",
    "TESTHOST_LOG_FORMAT",
    "TESTHOST_PIPE_NAME",
    "TESTHOST_IPC_REQUEST_TIMEOUT",
    "TESTHOST_IPC_MAX_FRAME_SIZE",
];

fn without_overrides<F: FnOnce()>(f: F) {
    temp_env::with_vars_unset(OVERRIDES, f)
}

#[test]
fn test_default_config_validation() {
    let config = TestHostConfig::default();
    assert!(config.validate_all().is_ok());
}

#[test]
fn test_config_loader_from_env() {
    let vars = vec![
        ("TESTHOST_LOG_LEVEL", Some("debug")),
        ("TESTHOST_LOG_FORMAT", Some("json")),
        ("TESTHOST_PIPE_NAME", Some("ci-host")),
        ("TESTHOST_IPC_REQUEST_TIMEOUT", Some("5")),
        ("TESTHOST_IPC_MAX_FRAME_SIZE", Some("1024")),
    ];

    with_vars(vars, || {
        let config = ConfigLoader::new().from_env().unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.ipc.pipe_name.as_deref(), Some("ci-host"));
        assert_eq!(config.ipc.request_timeout, Duration::from_secs(5));
        assert_eq!(config.ipc.max_frame_size, 1024);
    });
}

#[test]
fn test_invalid_env_values() {
    with_vars([("TESTHOST_LOG_LEVEL", Some("loud"))], || {
        let err = ConfigLoader::new().from_env().unwrap_err();
        assert!(matches!(err, ConfigError::EnvError(_)));
    });

    with_vars([("TESTHOST_IPC_MAX_FRAME_SIZE", Some("0"))], || {
        let err = ConfigLoader::new().from_env().unwrap_err();
        assert!(matches!(err, ConfigError::DomainError { ref domain, .. } if domain == "ipc"));
    });
}

#[test]
fn test_custom_prefix() {
    with_vars([("CI_LOG_LEVEL", Some("trace"))], || {
        let config = ConfigLoader::with_prefix("CI").from_env().unwrap();
        assert_eq!(config.logging.level, LogLevel::Trace);
    });
}

#[test]
fn test_yaml_config_serialization() {
    let yaml = TestHostConfig::generate_sample();
    let parsed: TestHostConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed, TestHostConfig::default());
}

#[test]
fn test_load_from_file_with_overrides() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
logging:
  level: warn
  format: compact

ipc:
  pipe_name: host
  request_timeout: 45
  connect_timeout: 3

extensions:
  - uid: retry
    display_name: Retry extension
    version: 2.0.0
    options:
      - name: retries
        description: Number of retries
        min_arity: 1
        max_arity: 1
  - uid: merge
    display_name: Merge tool
    tool: merge
    options:
      - name: output
        description: Merged report path
        min_arity: 1
        max_arity: 1
      - name: internal-trace
        description: Trace merging
        hidden: true
"#
    )
    .unwrap();

    with_vars([("TESTHOST_LOG_LEVEL", Some("error"))], || {
        let config = ConfigLoader::new().load(Some(file.path())).unwrap();

        assert_eq!(config.logging.level, LogLevel::Error);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.ipc.request_timeout, Duration::from_secs(45));
        assert_eq!(config.ipc.connect_timeout, Duration::from_secs(3));

        assert_eq!(config.extensions.len(), 2);
        assert_eq!(config.extensions[0].version, "2.0.0");
        assert_eq!(config.extensions[1].tool.as_deref(), Some("merge"));
        assert!(config.extensions[1].options[1].hidden);
        assert_eq!(config.extensions[1].options[1].max_arity, None);
    });
}

#[test]
fn test_empty_and_missing_files() {
    let empty = tempfile::NamedTempFile::new().unwrap();
    without_overrides(|| {
        assert_eq!(
            ConfigLoader::new().from_file(empty.path()).unwrap(),
            TestHostConfig::default()
        );
    });

    let dir = tempfile::tempdir().unwrap();
    let err = ConfigLoader::new()
        .from_file(dir.path().join("missing.yaml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::FileReadError(_)));
}

#[test]
fn test_invalid_extension_in_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
extensions:
  - uid: retry
    display_name: ""
"#
    )
    .unwrap();

    without_overrides(|| {
        let err = ConfigLoader::new().from_file(file.path()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Domain configuration error in extensions: display_name cannot be empty"
        );
    });
}
