use crate::domain::{Collector, Metric, Reading};
use crate::error::ProbeError;
use crate::metrics::no_operation::NoOpCollector;
use serde::{Deserialize, Serialize};

pub const NAME: &str = "ssh_sessions_count";
const HELP: &str = "How many SSH sessions there are now.";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub enabled: bool,
    pub command: String,
    pub timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "netstat -tnpa | grep 'ESTABLISHED.*sshd' | wc -l".to_string(),
            timeout_ms: 5_000,
        }
    }
}

pub trait DataSource {
    fn ssh_sessions(&self) -> impl Future<Output = Result<u64, ProbeError>> + Send;
}

pub struct SshSessions {
    config: Config,
}

impl SshSessions {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl<T> Metric<T> for SshSessions
where
    T: DataSource + Send + Sync + 'static,
{
    fn register(self, data_source: T) -> anyhow::Result<Box<dyn Collector>> {
        if !self.config.enabled {
            return Ok(Box::new(NoOpCollector::new(NAME, HELP)));
        }

        Ok(Box::new(SshSessionsCollector { data_source }))
    }
}

struct SshSessionsCollector<T> {
    data_source: T,
}

#[async_trait::async_trait]
impl<T> Collector for SshSessionsCollector<T>
where
    T: DataSource + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        NAME
    }

    fn help(&self) -> &'static str {
        HELP
    }

    async fn collect(&self) -> Result<Reading, ProbeError> {
        let sessions = self.data_source.ssh_sessions().await?;
        tracing::debug!(sessions, "Got SSH sessions");

        Ok(Reading::Value(sessions as f64))
    }
}
