use crate::domain::{Collector, Metric, Reading};
use crate::error::ProbeError;
use crate::metrics::no_operation::NoOpCollector;
use serde::{Deserialize, Serialize};

pub const NAME: &str = "ansible_processes_count";
const HELP: &str = "How many Ansible processes there are now.";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub enabled: bool,
    /// Substring matched against the full process listing.
    pub tool: String,
    pub timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            tool: "ansible".to_string(),
            timeout_ms: 5_000,
        }
    }
}

pub trait DataSource {
    fn ansible_processes(&self) -> impl Future<Output = Result<u64, ProbeError>> + Send;
}

pub struct AnsibleProcesses {
    config: Config,
}

impl AnsibleProcesses {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl<T> Metric<T> for AnsibleProcesses
where
    T: DataSource + Send + Sync + 'static,
{
    fn register(self, data_source: T) -> anyhow::Result<Box<dyn Collector>> {
        if !self.config.enabled {
            return Ok(Box::new(NoOpCollector::new(NAME, HELP)));
        }

        if self.config.tool.trim().is_empty() {
            anyhow::bail!("collectors.ansible_processes.tool must not be empty");
        }

        // The tool name is spliced into a shell pipeline.
        if !self.config.tool.chars().all(is_safe_tool_char) {
            anyhow::bail!(
                "collectors.ansible_processes.tool {:?} may only contain letters, digits, '.', '_' and '-'",
                self.config.tool
            );
        }

        Ok(Box::new(AnsibleProcessesCollector { data_source }))
    }
}

fn is_safe_tool_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

struct AnsibleProcessesCollector<T> {
    data_source: T,
}

#[async_trait::async_trait]
impl<T> Collector for AnsibleProcessesCollector<T>
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
        let processes = self.data_source.ansible_processes().await?;
        tracing::debug!(processes, "Got Ansible processes");

        Ok(Reading::Value(processes as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::{AnsibleProcesses, Config, DataSource};
    use crate::domain::Metric;
    use crate::error::ProbeError;

    struct Unreachable;

    impl DataSource for Unreachable {
        async fn ansible_processes(&self) -> Result<u64, ProbeError> {
            unreachable!()
        }
    }

    #[test]
    fn test_empty_tool_is_rejected() {
        let config = Config {
            tool: " ".to_string(),
            ..Config::default()
        };

        assert!(AnsibleProcesses::new(config).register(Unreachable).is_err());
    }

    #[test]
    fn test_tool_with_shell_metacharacters_is_rejected() {
        for tool in ["ansible; rm -rf /", "ansible playbook", "$(id)", "a|b", "'x'"] {
            let config = Config {
                tool: tool.to_string(),
                ..Config::default()
            };

            assert!(
                AnsibleProcesses::new(config).register(Unreachable).is_err(),
                "{tool:?} was accepted"
            );
        }
    }

    #[test]
    fn test_plain_tool_names_are_accepted() {
        for tool in ["ansible", "ansible-playbook", "salt_minion", "puppet.rb"] {
            let config = Config {
                tool: tool.to_string(),
                ..Config::default()
            };

            assert!(AnsibleProcesses::new(config).register(Unreachable).is_ok());
        }
    }
}
