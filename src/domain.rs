use crate::error::ProbeError;

/// Outcome of a successful probe run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Value(f64),
    /// The probe was not due this scrape (disabled, or outside its window).
    Skipped,
}

pub trait Metric<T> {
    fn register(self, data_source: T) -> anyhow::Result<Box<dyn Collector>>;
}

#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    /// Name of the gauge this collector feeds.
    fn name(&self) -> &'static str;

    fn help(&self) -> &'static str;

    async fn collect(&self) -> Result<Reading, ProbeError>;
}

/// Sink for the values gathered during one scrape.
pub trait Recorder {
    fn record(&mut self, name: &'static str, value: f64);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: &'static str,
    pub value: f64,
}

#[derive(Debug, Default, Clone)]
pub struct MetricSet {
    samples: Vec<Sample>,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.samples
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.value)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Recorder for MetricSet {
    fn record(&mut self, name: &'static str, value: f64) {
        self.samples.push(Sample { name, value });
    }
}
