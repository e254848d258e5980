use crate::logging::LogConfig;
use crate::metrics::{ansible_processes, logged_in_users, passmark, performance, ssh_sessions};
use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "talos.toml";
const CONFIG_FILE_ENV: &str = "TALOS_CONFIG";
const ENV_PREFIX: &str = "TALOS_";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub server: ServerConfig,
    pub log: LogConfig,
    pub scrape: ScrapeConfig,
    pub shell: ShellConfig,
    pub collectors: Collectors,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_address: String,
    /// Optional prefix prepended to every metric name, e.g. `misc`.
    pub namespace: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:9101".to_string(),
            namespace: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub probe_timeout_ms: u64,
}

impl ScrapeConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 10_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub program: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: "bash".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Collectors {
    pub logged_in_users: logged_in_users::Config,
    pub ssh_sessions: ssh_sessions::Config,
    pub ansible_processes: ansible_processes::Config,
    pub passmark: passmark::Config,
    pub performance: performance::Config,
}

impl Configuration {
    /// Loads the configuration from defaults, the TOML file named by
    /// `TALOS_CONFIG` (or `talos.toml`), and `TALOS_*` environment variables,
    /// in increasing order of precedence.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        Self::figment(&path)
            .extract()
            .with_context(|| format!("Failed to load configuration (file: {})", path))
    }

    /// Nested keys are separated by a double underscore, e.g. `TALOS_LOG__LEVEL`.
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"))
    }
}
