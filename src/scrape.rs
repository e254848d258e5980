use crate::domain::{Collector, Reading, Recorder};
use crate::error::ProbeError;
use futures::future::join_all;
use std::collections::HashMap;
use std::time::Duration;

/// Runs every collector for one scrape and records the values that came back.
///
/// Collectors run concurrently and each one is bounded by `probe_timeout`. A
/// failing collector is logged and its metric is left out of the scrape; it
/// never prevents the others from being recorded.
pub struct Scraper {
    collectors: Vec<Box<dyn Collector>>,
    probe_timeout: Duration,
}

impl Scraper {
    pub fn new(collectors: Vec<Box<dyn Collector>>, probe_timeout: Duration) -> Self {
        Self {
            collectors,
            probe_timeout,
        }
    }

    /// Help text of every metric this scraper can emit, keyed by metric name.
    pub fn descriptions(&self) -> HashMap<&'static str, &'static str> {
        self.collectors
            .iter()
            .map(|collector| (collector.name(), collector.help()))
            .collect()
    }

    /// Returns the number of metrics recorded.
    pub async fn scrape(&self, recorder: &mut (dyn Recorder + Send)) -> usize {
        let readings = join_all(self.collectors.iter().map(|c| self.probe(c.as_ref()))).await;

        let mut recorded = 0;
        for (collector, reading) in self.collectors.iter().zip(readings) {
            let name = collector.name();

            match reading {
                Ok(Reading::Value(value)) if value.is_finite() => {
                    recorder.record(name, value);
                    recorded += 1;
                }
                Ok(Reading::Value(value)) => {
                    tracing::warn!(metric = name, value, "Dropping non-finite value");
                }
                Ok(Reading::Skipped) => {
                    tracing::trace!(metric = name, "Collector not due this scrape");
                }
                Err(e) => {
                    tracing::warn!(metric = name, error = %e, "Collector failed, metric omitted from this scrape");
                }
            }
        }

        tracing::debug!(recorded, total = self.collectors.len(), "Scrape finished");
        recorded
    }

    async fn probe(&self, collector: &dyn Collector) -> Result<Reading, ProbeError> {
        tokio::time::timeout(self.probe_timeout, collector.collect())
            .await
            .map_err(|_| {
                ProbeError::timeout(format!("collector {}", collector.name()), self.probe_timeout)
            })?
    }
}
