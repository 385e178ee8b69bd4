//! Process-wide settings: deadlines, result caps, cache capacity, default
//! language, bind address, and the package catalog to load at startup.
//!
//! Loaded the way the teacher's `octofhir-config`/`AppConfig` loader does it
//! — a TOML file layered under `TX_SERVER__*`-prefixed environment
//! variables via the `config` crate — but scoped to what a terminology
//! server needs rather than the teacher's full server/storage/auth surface.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub operation: OperationSettings,
    #[serde(default)]
    pub language: LanguageSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub packages: PackagesSettings,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.operation.timeout_ms == 0 {
            return Err("operation.timeout_ms must be > 0".into());
        }
        if self.operation.max_results == 0 {
            return Err("operation.max_results must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        let host: IpAddr = self.server.host.parse().unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

/// Mirrors `tx_operations::WorkerConfig`; kept as a separate, serde-friendly
/// struct so the wire/file shape doesn't need to track the operations
/// crate's internal type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationSettings {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_max_cache_ids")]
    pub max_cache_ids: usize,
    #[serde(default = "default_max_per_cache_id")]
    pub max_resources_per_cache_id: usize,
}

fn default_timeout_ms() -> u64 {
    30_000
}
fn default_max_results() -> usize {
    10_000
}
fn default_max_cache_ids() -> usize {
    10_000
}
fn default_max_per_cache_id() -> usize {
    500
}

impl Default for OperationSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_results: default_max_results(),
            max_cache_ids: default_max_cache_ids(),
            max_resources_per_cache_id: default_max_per_cache_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LanguageSettings {
    /// Used when neither an `Accept-Language`/`displayLanguage` parameter
    /// nor a resource's own `language` is present (spec §4.G.5).
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

/// Canonical package directory this process loads its code systems, value
/// sets, and concept maps from at startup (spec §1: package crawling itself
/// is an external collaborator; this is only the directory to read).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PackagesSettings {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    /// Loads `path` (or `tx-server.toml` in the working directory, if
    /// present), then layers `TX_SERVER__*` environment overrides on top
    /// (e.g. `TX_SERVER__SERVER__PORT=9090`), and validates the result.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                let default_path = PathBuf::from("tx-server.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        builder = builder.add_source(Environment::with_prefix("TX_SERVER").try_parsing(true).separator("__"));
        let cfg = builder.build().map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg.try_deserialize().map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }

    pub fn load_config_with_default_path<P: AsRef<Path>>(path: Option<P>) -> Result<AppConfig, String> {
        let p = path.as_ref().map(|p| p.as_ref().to_string_lossy().to_string());
        load_config(p.as_deref())
    }
}
