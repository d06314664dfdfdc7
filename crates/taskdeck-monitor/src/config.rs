//! Monitor configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no
//! file at all) yields a working configuration pointed at the `local`
//! server target.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use taskdeck_protocol::{
    DEFAULT_AUTO_REFRESH_INTERVAL_MS, DEFAULT_HEALTH_CHECK_INTERVAL_MS, DEFAULT_MAX_OUTPUT_LINES,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS,
    DEFAULT_SERVER, DEFAULT_SERVERS,
};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "TASKDECK_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A named worker server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerTarget {
    pub name: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Tick of follow-style polling (CLI `launch --follow`, console redraw).
    pub poll_interval_ms: u64,
    /// Period of the registry auto-refresh loop.
    pub auto_refresh_interval_ms: u64,
    /// Display cap on rendered output lines.
    pub max_output_lines: usize,
    /// Period of the background health loop.
    pub health_check_interval_ms: u64,
    /// Hard timeout of every JSON API call.
    pub request_timeout_ms: u64,
    /// Timeout of the reachability probe.
    pub probe_timeout_ms: u64,
    /// Initial state of the auto-refresh toggle.
    pub auto_refresh: bool,
    /// Name of the selected server target.
    pub server: String,
    /// Known server targets, name -> base URL.
    pub servers: BTreeMap<String, String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            auto_refresh_interval_ms: DEFAULT_AUTO_REFRESH_INTERVAL_MS,
            max_output_lines: DEFAULT_MAX_OUTPUT_LINES,
            health_check_interval_ms: DEFAULT_HEALTH_CHECK_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            auto_refresh: false,
            server: DEFAULT_SERVER.to_string(),
            servers: DEFAULT_SERVERS
                .iter()
                .map(|(name, url)| (name.to_string(), url.to_string()))
                .collect(),
        }
    }
}

impl MonitorConfig {
    /// `<config dir>/taskdeck/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("taskdeck").join("config.toml"))
    }

    /// Resolve and load the config: explicit path, then `$TASKDECK_CONFIG`,
    /// then the default path if it exists, else built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), server = %config.server, "Loaded config");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("poll_interval_ms", self.poll_interval_ms),
            ("auto_refresh_interval_ms", self.auto_refresh_interval_ms),
            ("health_check_interval_ms", self.health_check_interval_ms),
            ("request_timeout_ms", self.request_timeout_ms),
            ("probe_timeout_ms", self.probe_timeout_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
            }
        }
        if self.max_output_lines == 0 {
            return Err(ConfigError::Invalid("max_output_lines must be greater than zero".into()));
        }
        if !self.servers.contains_key(&self.server) {
            return Err(ConfigError::Invalid(format!(
                "selected server '{}' is not among the configured servers",
                self.server
            )));
        }
        Ok(())
    }

    pub fn target(&self, name: &str) -> Option<ServerTarget> {
        self.servers.get(name).map(|url| ServerTarget {
            name: name.to_string(),
            base_url: url.clone(),
        })
    }

    pub fn selected_target(&self) -> Option<ServerTarget> {
        self.target(&self.server)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn auto_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.auto_refresh_interval_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = MonitorConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.max_output_lines, 500);
        assert_eq!(cfg.health_check_interval(), Duration::from_secs(30));
        assert_eq!(cfg.selected_target().unwrap().base_url, "http://127.0.0.1:5000");
        assert_eq!(cfg.servers.len(), 3);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = MonitorConfig::from_toml_str(
            r#"
            auto_refresh = true
            server = "remote"
            max_output_lines = 50
            "#,
        )
        .unwrap();
        assert!(cfg.auto_refresh);
        assert_eq!(cfg.max_output_lines, 50);
        assert_eq!(cfg.request_timeout_ms, 10_000);
        assert_eq!(cfg.selected_target().unwrap().name, "remote");
    }

    #[test]
    fn zero_interval_rejected() {
        let err = MonitorConfig::from_toml_str("auto_refresh_interval_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_server_rejected() {
        let err = MonitorConfig::from_toml_str(r#"server = "staging""#).unwrap_err();
        assert!(err.to_string().contains("staging"));
    }

    #[test]
    fn custom_servers_replace_builtin_set() {
        let cfg = MonitorConfig::from_toml_str(
            r#"
            server = "lab"
            [servers]
            lab = "http://10.0.0.8:5000"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.servers.len(), 1);
        assert_eq!(cfg.target("lab").unwrap().base_url, "http://10.0.0.8:5000");
    }
}
