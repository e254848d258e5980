use crate::datasource::{CommandRunner, parse_count};
use crate::error::ProbeError;
use crate::metrics::ansible_processes::DataSource;

/// Counts processes whose `ps -Af` line mentions the automation tool.
pub struct AnsibleProcesses<R> {
    runner: R,
    command: String,
}

impl<R> AnsibleProcesses<R>
where
    R: CommandRunner,
{
    pub fn new(runner: R, tool: &str) -> Self {
        Self {
            runner,
            command: count_processes_command(tool),
        }
    }
}

/// The trailing `grep -v grep` drops the filter's own entry from the listing.
pub fn count_processes_command(tool: &str) -> String {
    format!("ps -Af | grep {} | grep -v grep | wc -l", tool)
}

impl<R> DataSource for AnsibleProcesses<R>
where
    R: CommandRunner + Send + Sync,
{
    fn ansible_processes(&self) -> impl Future<Output = Result<u64, ProbeError>> + Send {
        async move {
            let stdout = self
                .runner
                .run(&self.command)
                .await?
                .checked_stdout(&self.command)?;

            parse_count(&stdout)
        }
    }
}
