use crate::datasource::{CommandRunner, parse_count};
use crate::error::ProbeError;
use crate::metrics::ssh_sessions::DataSource;

/// Runs a pipeline that counts established connections owned by `sshd`.
pub struct SshSessions<R> {
    runner: R,
    command: String,
}

impl<R> SshSessions<R>
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

impl<R> DataSource for SshSessions<R>
where
    R: CommandRunner + Send + Sync,
{
    fn ssh_sessions(&self) -> impl Future<Output = Result<u64, ProbeError>> + Send {
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
