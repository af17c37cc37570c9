use std::{
    env, fs,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use phytopulse_core::{DEFAULT_WINDOW_SIZE, LogSettings, diagnostics::DEFAULT_LOG_FILTER};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "phytopulse.config.toml";
pub const CONFIG_PATH_ENV: &str = "PHYTOPULSE_CONFIG_PATH";
pub const PORT_ENV: &str = "PORT";
pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpConfig,
    pub data: DataConfig,
    pub replay: ReplayConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub trace_dir: PathBuf,
    pub label_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub window_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub rust_log_filter: String,
    pub trace_file_prefix: String,
    pub logs_dir: PathBuf,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            trace_dir: PathBuf::from("data/wav_files"),
            label_dir: PathBuf::from("data/json_labels"),
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            rust_log_filter: DEFAULT_LOG_FILTER.to_string(),
            trace_file_prefix: "phytopulse-server".to_string(),
            logs_dir: PathBuf::from("logs"),
        }
    }
}

impl DiagnosticsConfig {
    #[must_use]
    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            log_dir: self.logs_dir.clone(),
            file_prefix: self.trace_file_prefix.clone(),
            filter: self.rust_log_filter.clone(),
        }
    }
}

impl HttpConfig {
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ServerConfig {
    /// Reads the config file if one is found, then applies the `PORT` override.
    pub fn load() -> Result<Self> {
        let mut config = match discover_config_path() {
            Some(path) => Self::load_from_path(&path)?,
            None => Self::default(),
        };
        config.apply_port_override(env::var(PORT_ENV).ok().as_deref())?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config TOML from {}", path.display()))
    }

    pub fn apply_port_override(&mut self, port: Option<&str>) -> Result<()> {
        let Some(port) = port.map(str::trim).filter(|value| !value.is_empty()) else {
            return Ok(());
        };
        self.server.port = port
            .parse()
            .with_context(|| format!("invalid {PORT_ENV} value '{port}'"))?;
        Ok(())
    }
}

fn discover_config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Some(path);
        }
    }

    let cwd = env::current_dir().ok()?;
    [cwd.join(CONFIG_FILE_NAME), cwd.join("..").join(CONFIG_FILE_NAME)]
        .into_iter()
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_deployment() {
        let config = ServerConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.socket_addr().to_string(), "0.0.0.0:5000");
        assert_eq!(config.data.trace_dir, Path::new("data/wav_files"));
        assert_eq!(config.replay.window_size, 100);
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_sections() {
        let temp = tempfile::tempdir().expect("tempdir should be creatable");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            "[server]\nport = 8080\n\n[data]\ntrace_dir = \"/srv/traces\"\n",
        )
        .expect("config write");

        let config = ServerConfig::load_from_path(&path).expect("config should parse");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.data.trace_dir, Path::new("/srv/traces"));
        assert_eq!(config.data.label_dir, Path::new("data/json_labels"));
        assert_eq!(config.diagnostics.logs_dir, Path::new("logs"));

        let log_settings = config.diagnostics.log_settings();
        assert_eq!(log_settings.file_prefix, "phytopulse-server");
        assert_eq!(log_settings.log_dir, Path::new("logs"));
    }

    #[test]
    fn port_override_replaces_configured_port() {
        let mut config = ServerConfig::default();
        config.apply_port_override(Some("7001")).expect("valid port");
        assert_eq!(config.server.port, 7001);

        config.apply_port_override(None).expect("no override");
        config.apply_port_override(Some("  ")).expect("blank override");
        assert_eq!(config.server.port, 7001);

        assert!(config.apply_port_override(Some("http")).is_err());
    }
}
