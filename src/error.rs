use std::time::Duration;

/// Why a probe produced no value for the current scrape.
///
/// Every variant is contained at the probe boundary: the orchestrator logs it
/// and the corresponding metric is simply absent from the scrape output.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to execute `{command}`: {reason}")]
    Execution { command: String, reason: String },

    #[error("`{command}` exited with {status}: {stderr}")]
    NonZeroExit {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{command}` wrote to stderr: {stderr}")]
    Stderr { command: String, stderr: String },

    #[error("unexpected output {output:?}: {reason}")]
    OutputFormat { output: String, reason: String },

    #[error("{0}")]
    Unavailable(String),

    #[error("failed to fetch benchmark page: {0}")]
    Fetch(String),

    #[error("GET {url} returned {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("{0}")]
    Extraction(String),

    #[error("no benchmark iteration completed within {budget:?}")]
    NoIterations { budget: Duration },

    #[error("{what} timed out after {after:?}")]
    Timeout { what: String, after: Duration },
}

impl ProbeError {
    pub fn output_format(output: &str, reason: impl ToString) -> Self {
        Self::OutputFormat {
            output: output.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn timeout(what: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            after,
        }
    }
}
