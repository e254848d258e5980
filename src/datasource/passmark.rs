use crate::error::ProbeError;
use crate::metrics::passmark::DataSource;
use anyhow::Context;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysinfo::{CpuRefreshKind, System};

/// Identifies the host CPU through sysinfo and looks it up on the PassMark site.
#[derive(Clone)]
pub struct Passmark {
    system: Arc<Mutex<System>>,
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl Passmark {
    pub fn new(
        system: Arc<Mutex<System>>,
        url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("talos/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            system,
            client,
            url: url.into(),
            timeout,
        })
    }

    fn fetch_error(&self, e: reqwest::Error) -> ProbeError {
        if e.is_timeout() {
            ProbeError::timeout(format!("GET {}", self.url), self.timeout)
        } else {
            ProbeError::Fetch(e.to_string())
        }
    }
}

impl DataSource for Passmark {
    fn cpu_model(&self) -> impl Future<Output = Result<String, ProbeError>> + Send {
        let system = self.system.clone();

        async move {
            tokio::task::spawn_blocking(move || -> Result<String, ProbeError> {
                let mut system = system.lock().map_err(|e| {
                    ProbeError::Unavailable(format!(
                        "Failed to read CPU information due to poisoned mutex: {}",
                        e
                    ))
                })?;

                system.refresh_cpu_list(CpuRefreshKind::nothing());

                // The last reported core wins; all cores of a host share one model.
                let model = system
                    .cpus()
                    .iter()
                    .map(|cpu| cpu.brand().trim())
                    .filter(|brand| !brand.is_empty())
                    .last()
                    .map(str::to_string);

                model.ok_or_else(|| {
                    ProbeError::Unavailable("host reported no CPU model name".to_string())
                })
            })
            .await
            .map_err(|e| ProbeError::Unavailable(format!("CPU information task failed: {}", e)))?
        }
    }

    fn benchmark_page(
        &self,
        cpu_model: &str,
    ) -> impl Future<Output = Result<String, ProbeError>> + Send {
        async move {
            let response = self
                .client
                .get(&self.url)
                .query(&[("cpu", cpu_model)])
                .send()
                .await
                .map_err(|e| self.fetch_error(e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ProbeError::HttpStatus {
                    url: response.url().to_string(),
                    status: status.as_u16(),
                });
            }

            let page = response.text().await.map_err(|e| self.fetch_error(e))?;
            tracing::debug!(bytes = page.len(), "Got PassMark CPU benchmark page");

            Ok(page)
        }
    }
}
