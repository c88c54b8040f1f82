// tests/config_loading.rs

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use featuredag::config::{load_and_validate, load_or_default, ConfigFile};
use featuredag::errors::{ErrorKind, FeaturedagError};
use featuredag::types::{ExecutionMode, WhenUnavailable};
use featuredag_test_utils::builders::ConfigFileBuilder;
use tempfile::NamedTempFile;

fn write_config(toml: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(toml.as_bytes()).unwrap();
    file
}

#[test]
fn full_config_is_parsed() {
    let file = write_config(
        r#"
[execution]
mode = "isolated"
when_unavailable = "in_process"
timeout = "90s"

[isolation]
image = "registry.local/featuredag:2"
staging_root = "/var/tmp/featuredag"
memory = "2g"
cpus = "1.5"
network = true

[interpreter]
program = "/opt/python/bin/python3"
"#,
    );

    let config = load_and_validate(file.path()).unwrap();
    assert_eq!(config.execution.mode, ExecutionMode::Isolated);
    assert_eq!(config.execution.when_unavailable, WhenUnavailable::InProcess);
    assert_eq!(config.execution.timeout, Duration::from_secs(90));
    assert_eq!(config.isolation.image, "registry.local/featuredag:2");
    assert_eq!(config.isolation.docker, "docker");
    assert_eq!(
        config.isolation.staging_root,
        Some(PathBuf::from("/var/tmp/featuredag"))
    );
    assert_eq!(config.isolation.memory.as_deref(), Some("2g"));
    assert!(config.isolation.network);
    assert_eq!(config.interpreter.program, "/opt/python/bin/python3");
}

#[test]
fn empty_file_gives_defaults() {
    let file = write_config("");
    let config = load_and_validate(file.path()).unwrap();
    assert_eq!(config, ConfigFile::default());
    assert_eq!(config.execution.mode, ExecutionMode::Auto);
    assert_eq!(config.execution.when_unavailable, WhenUnavailable::Reject);
    assert_eq!(config.execution.timeout, Duration::from_secs(300));
}

#[test]
fn builder_matches_file() {
    let root = tempfile::tempdir().unwrap();
    let file = write_config(&format!(
        "[execution]\nmode = \"in_process\"\ntimeout = \"2m\"\n\n\
         [isolation]\nstaging_root = {:?}\n",
        root.path().display().to_string()
    ));

    let built = ConfigFileBuilder::new()
        .mode(ExecutionMode::InProcess)
        .timeout("2m")
        .staging_root(root.path())
        .build();
    assert_eq!(load_and_validate(file.path()).unwrap(), built);
}

#[test]
fn bad_timeouts_are_config_errors() {
    for timeout in ["soon", "0s", "10x"] {
        let file = write_config(&format!("[execution]\ntimeout = \"{timeout}\"\n"));
        let err = load_and_validate(file.path()).unwrap_err();
        assert!(
            matches!(err, FeaturedagError::ConfigError(ref msg) if msg.contains("timeout")),
            "{timeout}: {err}"
        );
    }
}

#[test]
fn unknown_fields_are_rejected() {
    let file = write_config("[execution]\nmode = \"auto\"\nretries = 3\n");
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, FeaturedagError::TomlError(_)));
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn unknown_mode_is_rejected() {
    let file = write_config("[execution]\nmode = \"sandboxed\"\n");
    assert!(load_and_validate(file.path()).is_err());
}

#[test]
fn isolation_section_is_validated() {
    let cases = [
        ("image = \"\"", "image"),
        ("command = []", "command"),
        ("memory = \"lots\"", "memory"),
        ("cpus = \"-1\"", "cpus"),
    ];
    for (line, field) in cases {
        let file = write_config(&format!("[isolation]\n{line}\n"));
        let err = load_and_validate(file.path()).unwrap_err();
        assert!(
            matches!(err, FeaturedagError::ConfigError(ref msg) if msg.contains(field)),
            "{line}: {err}"
        );
    }
}

#[test]
fn explicit_missing_path_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_or_default(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn explicit_path_is_loaded() {
    let file = write_config("[interpreter]\nprogram = \"python3.12\"\n");
    let config = load_or_default(Some(file.path())).unwrap();
    assert_eq!(config.interpreter.program, "python3.12");
}
