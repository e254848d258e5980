use crate::error::ProbeError;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

pub mod ansible_processes;
pub mod logged_in_users;
pub mod passmark;
pub mod ssh_sessions;

pub trait CommandRunner {
    fn run(&self, command: &str) -> impl Future<Output = Result<CommandOutput, ProbeError>> + Send;
}

impl<R> CommandRunner for Arc<R>
where
    R: CommandRunner + Send + Sync,
{
    fn run(&self, command: &str) -> impl Future<Output = Result<CommandOutput, ProbeError>> + Send {
        (**self).run(command)
    }
}

/// Captured result of a command that was spawned and ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Returns stdout of a command that exited with status 0 and left stderr empty.
    pub fn checked_stdout(self, command: &str) -> Result<String, ProbeError> {
        if !self.success() {
            let status = match self.code {
                Some(code) => format!("exit status: {}", code),
                None => "terminated by signal".to_string(),
            };

            return Err(ProbeError::NonZeroExit {
                command: command.to_string(),
                status,
                stderr: self.stderr.trim_end().to_string(),
            });
        }

        if !self.stderr.is_empty() {
            return Err(ProbeError::Stderr {
                command: command.to_string(),
                stderr: self.stderr.trim_end().to_string(),
            });
        }

        Ok(self.stdout)
    }
}

/// Parses the single number printed by a counting pipeline such as `... | wc -l`.
pub fn parse_count(output: &str) -> Result<u64, ProbeError> {
    output
        .trim()
        .parse::<u64>()
        .map_err(|e| ProbeError::output_format(output, e))
}

/// Runs commands through `<shell> -c`, killing them once `timeout` elapses.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    timeout: Duration,
}

impl ShellRunner {
    pub fn new(shell: impl Into<String>, timeout: Duration) -> Self {
        Self {
            shell: shell.into(),
            timeout,
        }
    }
}

/// Kills the process group of a spawned pipeline when dropped, unless the
/// pipeline already ran to completion. `kill_on_drop` alone only reaches the
/// shell, not the commands it started.
#[cfg(unix)]
struct ProcessGroup {
    pgid: Option<nix::unistd::Pid>,
}

#[cfg(unix)]
impl ProcessGroup {
    fn new(leader: Option<u32>) -> Self {
        let pgid = leader
            .and_then(|pid| i32::try_from(pid).ok())
            .map(nix::unistd::Pid::from_raw);
        Self { pgid }
    }

    fn finished(mut self) {
        self.pgid = None;
    }
}

#[cfg(unix)]
impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            if let Err(e) = nix::sys::signal::killpg(pgid, nix::sys::signal::Signal::SIGKILL) {
                tracing::trace!(pgid = %pgid, error = %e, "Process group already gone");
            }
        }
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> impl Future<Output = Result<CommandOutput, ProbeError>> + Send {
        async move {
            tracing::debug!(shell = %self.shell, command, "Executing command");

            let execution_error = |e: std::io::Error| ProbeError::Execution {
                command: command.to_string(),
                reason: e.to_string(),
            };

            let mut cmd = tokio::process::Command::new(&self.shell);
            cmd.arg("-c")
                .arg(command)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            #[cfg(unix)]
            cmd.process_group(0);

            let child = cmd.spawn().map_err(execution_error)?;

            #[cfg(unix)]
            let group = ProcessGroup::new(child.id());

            let output = tokio::time::timeout(self.timeout, child.wait_with_output())
                .await
                .map_err(|_| ProbeError::timeout(format!("command `{}`", command), self.timeout))?
                .map_err(execution_error)?;

            #[cfg(unix)]
            group.finished();

            let output = CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                code: output.status.code(),
            };

            tracing::debug!(command, code = ?output.code, "Executed command");
            Ok(output)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{CommandOutput, CommandRunner, ShellRunner, parse_count};
    use crate::error::ProbeError;
    use std::collections::HashMap;
    use std::time::Duration;

    enum Canned {
        Output(CommandOutput),
        SpawnFailure,
    }

    /// Replays canned outputs keyed by the exact command string.
    #[derive(Default)]
    pub(crate) struct HardcodedRunner {
        outputs: HashMap<String, Canned>,
    }

    impl HardcodedRunner {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_output(mut self, command: &str, stdout: &str, stderr: &str, code: i32) -> Self {
            self.outputs.insert(
                command.to_string(),
                Canned::Output(CommandOutput {
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                    code: Some(code),
                }),
            );
            self
        }

        pub(crate) fn with_spawn_failure(mut self, command: &str) -> Self {
            self.outputs.insert(command.to_string(), Canned::SpawnFailure);
            self
        }
    }

    impl CommandRunner for HardcodedRunner {
        fn run(&self, command: &str) -> impl Future<Output = Result<CommandOutput, ProbeError>> + Send {
            async move {
                match self.outputs.get(command) {
                    Some(Canned::Output(output)) => Ok(output.clone()),
                    Some(Canned::SpawnFailure) | None => Err(ProbeError::Execution {
                        command: command.to_string(),
                        reason: "No such file or directory (os error 2)".to_string(),
                    }),
                }
            }
        }
    }

    fn runner() -> ShellRunner {
        ShellRunner::new("sh", Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_echo_is_captured() {
        let output = runner().run("echo 2").await.unwrap();
        assert_eq!("2\n", output.stdout);
        assert_eq!("", output.stderr);
        assert!(output.success());

        let stdout = output.checked_stdout("echo 2").unwrap();
        assert_eq!(2, parse_count(&stdout).unwrap());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_rejected() {
        let output = runner().run("exit 3").await.unwrap();
        assert_eq!(Some(3), output.code);

        let err = output.checked_stdout("exit 3").unwrap_err();
        assert!(matches!(err, ProbeError::NonZeroExit { .. }));
    }

    #[tokio::test]
    async fn test_stderr_is_rejected() {
        let output = runner().run("echo 1; echo oops >&2").await.unwrap();
        assert!(output.success());
        assert_eq!("oops\n", output.stderr);

        match output.checked_stdout("cmd").unwrap_err() {
            ProbeError::Stderr { stderr, .. } => assert_eq!("oops", stderr),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_shell_is_an_execution_error() {
        let runner = ShellRunner::new("/nonexistent/shell", Duration::from_secs(1));
        let err = runner.run("echo 1").await.unwrap_err();
        assert!(matches!(err, ProbeError::Execution { .. }));
    }

    #[tokio::test]
    async fn test_slow_command_times_out() {
        let runner = ShellRunner::new("sh", Duration::from_millis(100));
        let err = runner.run("sleep 5").await.unwrap_err();
        assert!(matches!(err, ProbeError::Timeout { .. }));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timeout_kills_background_children() {
        let pid_file = std::env::temp_dir().join(format!("talos-sleep-{}.pid", std::process::id()));
        let command = format!("sleep 30 & echo $! > {}; wait", pid_file.display());

        let runner = ShellRunner::new("sh", Duration::from_millis(300));
        let err = runner.run(&command).await.unwrap_err();
        assert!(matches!(err, ProbeError::Timeout { .. }));

        tokio::time::sleep(Duration::from_millis(200)).await;
        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let _ = std::fs::remove_file(&pid_file);

        // Gone, or a zombie waiting for its new parent to reap it.
        let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid.trim())).unwrap_or_default();
        assert!(stat.is_empty() || stat.contains(") Z "), "sleep survived: {stat}");
    }

    #[test]
    fn test_parse_count_ignores_surrounding_whitespace() {
        assert_eq!(3, parse_count("3\n").unwrap());
        assert_eq!(3, parse_count("  3 \n").unwrap());
        assert_eq!(0, parse_count("0").unwrap());
    }

    #[test]
    fn test_parse_count_rejects_garbage() {
        assert!(matches!(parse_count(""), Err(ProbeError::OutputFormat { .. })));
        assert!(matches!(parse_count("3\n4\n"), Err(ProbeError::OutputFormat { .. })));
        assert!(matches!(parse_count("-1"), Err(ProbeError::OutputFormat { .. })));
    }
}
