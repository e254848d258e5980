use crate::domain::{Collector, Metric, Reading};
use crate::error::ProbeError;
use crate::metrics::no_operation::NoOpCollector;
use serde::{Deserialize, Serialize};

pub const NAME: &str = "logged_in_users_count";
const HELP: &str = "How many users are logged in right now.";

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
            command: "who".to_string(),
            timeout_ms: 5_000,
        }
    }
}

pub trait DataSource {
    /// Number of active login sessions. A failing session query counts as zero sessions.
    fn logged_in_users(&self) -> impl Future<Output = Result<u64, ProbeError>> + Send;
}

pub struct LoggedInUsers {
    config: Config,
}

impl LoggedInUsers {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl<T> Metric<T> for LoggedInUsers
where
    T: DataSource + Send + Sync + 'static,
{
    fn register(self, data_source: T) -> anyhow::Result<Box<dyn Collector>> {
        if !self.config.enabled {
            return Ok(Box::new(NoOpCollector::new(NAME, HELP)));
        }

        Ok(Box::new(LoggedInUsersCollector { data_source }))
    }
}

struct LoggedInUsersCollector<T> {
    data_source: T,
}

#[async_trait::async_trait]
impl<T> Collector for LoggedInUsersCollector<T>
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
        let users = self.data_source.logged_in_users().await?;
        tracing::debug!(users, "Got logged-in users");

        Ok(Reading::Value(users as f64))
    }
}
