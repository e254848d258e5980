use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// One of `debug`, `info`, `warn` or `error`; anything else logs errors only.
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

pub fn parse_level(level: &str) -> Level {
    match level.trim().to_ascii_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        _ => Level::ERROR,
    }
}

/// Installs the global subscriber. `RUST_LOG`, when set, takes precedence over
/// the configured level. The returned guard flushes pending records on drop.
pub fn setup_logging(config: &LogConfig) -> anyhow::Result<WorkerGuard> {
    let level = parse_level(&config.level);
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::default().add_directive(LevelFilter::from_level(level).into()),
    };

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(writer))
            .try_init()?;
    }

    tracing::debug!(level = %level, json = config.json, "Logging initialized");
    Ok(guard)
}
