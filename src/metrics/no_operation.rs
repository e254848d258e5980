use crate::domain::{Collector, Reading};
use crate::error::ProbeError;

/// Stands in for a collector that was disabled in the configuration.
pub struct NoOpCollector {
    name: &'static str,
    help: &'static str,
}

impl NoOpCollector {
    pub fn new(name: &'static str, help: &'static str) -> Self {
        Self { name, help }
    }
}

#[async_trait::async_trait]
impl Collector for NoOpCollector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn help(&self) -> &'static str {
        self.help
    }

    async fn collect(&self) -> Result<Reading, ProbeError> {
        Ok(Reading::Skipped)
    }
}
