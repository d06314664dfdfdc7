use std::io::Write;

use taskdeck_monitor::{ConfigError, MonitorConfig};

#[test]
fn loads_explicit_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        server = "lab"
        auto_refresh = true
        health_check_interval_ms = 10000

        [servers]
        lab = "http://192.168.1.20:5000"
        "#
    )
    .unwrap();

    let config = MonitorConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.server, "lab");
    assert!(config.auto_refresh);
    assert_eq!(config.health_check_interval_ms, 10_000);
    assert_eq!(config.auto_refresh_interval_ms, 5_000);
    assert_eq!(config.selected_target().unwrap().base_url, "http://192.168.1.20:5000");
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = MonitorConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "max_output_lines = \"many\"").unwrap();
    let err = MonitorConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn zero_output_cap_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "max_output_lines = 0").unwrap();
    let err = MonitorConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}
