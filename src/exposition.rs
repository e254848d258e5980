use crate::domain::Recorder;
use prometheus::{Gauge, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use std::sync::Arc;

/// Records one scrape into a fresh registry so that metrics which were not
/// collected this time do not show up with a stale value.
pub struct PrometheusRecorder {
    registry: Registry,
    namespace: Option<String>,
    descriptions: Arc<HashMap<&'static str, &'static str>>,
}

impl PrometheusRecorder {
    pub fn new(
        namespace: Option<&str>,
        descriptions: Arc<HashMap<&'static str, &'static str>>,
    ) -> Self {
        Self {
            registry: Registry::new(),
            namespace: namespace
                .filter(|ns| !ns.is_empty())
                .map(str::to_string),
            descriptions,
        }
    }

    fn register_gauge(&self, name: &'static str) -> prometheus::Result<Gauge> {
        let help = self.descriptions.get(name).copied().unwrap_or(name);

        let mut opts = Opts::new(name, help);
        if let Some(namespace) = &self.namespace {
            opts = opts.namespace(namespace.clone());
        }

        let gauge = Gauge::with_opts(opts)?;
        self.registry.register(Box::new(gauge.clone()))?;
        Ok(gauge)
    }

    /// Renders the recorded gauges in the Prometheus text format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let metric_families = self.registry.gather();
        let encoder = TextEncoder::new();

        Ok(encoder.encode_to_string(&metric_families)?)
    }
}

impl Recorder for PrometheusRecorder {
    fn record(&mut self, name: &'static str, value: f64) {
        match self.register_gauge(name) {
            Ok(gauge) => gauge.set(value),
            Err(e) => tracing::error!(metric = name, error = %e, "Failed to register gauge"),
        }
    }
}
