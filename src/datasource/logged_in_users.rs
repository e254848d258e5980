use crate::datasource::CommandRunner;
use crate::error::ProbeError;
use crate::metrics::logged_in_users::DataSource;

/// Counts the lines printed by a session listing such as `who`.
pub struct LoggedInUsers<R> {
    runner: R,
    command: String,
}

impl<R> LoggedInUsers<R>
where
    R: CommandRunner,
{
    pub fn new(runner: R, command: impl Into<String>) -> Self {
        Self {
            runner,
            command: command.into(),
        }
    }
}

impl<R> DataSource for LoggedInUsers<R>
where
    R: CommandRunner + Send + Sync,
{
    fn logged_in_users(&self) -> impl Future<Output = Result<u64, ProbeError>> + Send {
        async move {
            let output = match self.runner.run(&self.command).await {
                Ok(output) => output,
                Err(e) => {
                    tracing::warn!(error = %e, "Session listing failed, counting zero sessions");
                    return Ok(0);
                }
            };

            if !output.success() || !output.stderr.is_empty() {
                tracing::warn!(
                    command = %self.command,
                    code = ?output.code,
                    stderr = %output.stderr.trim_end(),
                    "Session listing reported an error, counting the lines it printed"
                );
            }

            Ok(output.stdout.lines().count() as u64)
        }
    }
}
