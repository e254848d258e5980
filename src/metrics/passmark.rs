use crate::domain::{Collector, Metric, Reading};
use crate::error::ProbeError;
use crate::metrics::no_operation::NoOpCollector;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

pub const NAME: &str = "passmark_singlethreadedrating";
const HELP: &str = "PassMark single-threaded rating of the local CPU model.";

const SINGLE_THREAD_RATING: &str = r"<strong>Single Thread Rating:</strong>\s*(.*?)\s*<br\s*/?>";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub enabled: bool,
    /// Lookup page; the CPU model is passed in the `cpu` query parameter.
    pub url: String,
    pub timeout_ms: u64,
    /// Keep the first successful rating for the lifetime of the process.
    pub cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://www.cpubenchmark.net/cpu.php".to_string(),
            timeout_ms: 10_000,
            cache: true,
        }
    }
}

pub trait DataSource {
    /// Model name of the host CPU, e.g. `Intel(R) Core(TM) i7-8700 CPU @ 3.20GHz`.
    fn cpu_model(&self) -> impl Future<Output = Result<String, ProbeError>> + Send;

    /// Raw body of the benchmark page for the given CPU model.
    fn benchmark_page(
        &self,
        cpu_model: &str,
    ) -> impl Future<Output = Result<String, ProbeError>> + Send;
}

/// Pulls the single-thread rating out of a PassMark CPU page.
pub struct RatingExtractor {
    pattern: Regex,
}

impl RatingExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(SINGLE_THREAD_RATING)?,
        })
    }

    pub fn extract(&self, page: &str) -> Result<u64, ProbeError> {
        let captures = self.pattern.captures(page).ok_or_else(|| {
            ProbeError::Extraction("single thread rating not found in benchmark page".to_string())
        })?;

        let value = &captures[1];
        value.parse::<u64>().map_err(|e| {
            ProbeError::Extraction(format!(
                "single thread rating {:?} is not numeric: {}",
                value, e
            ))
        })
    }
}

pub struct Passmark {
    config: Config,
}

impl Passmark {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl<T> Metric<T> for Passmark
where
    T: DataSource + Send + Sync + 'static,
{
    fn register(self, data_source: T) -> anyhow::Result<Box<dyn Collector>> {
        if !self.config.enabled {
            return Ok(Box::new(NoOpCollector::new(NAME, HELP)));
        }

        let extractor = RatingExtractor::new()?;
        let cache = self.config.cache.then(OnceCell::new);

        Ok(Box::new(PassmarkCollector {
            data_source,
            extractor,
            cache,
        }))
    }
}

struct PassmarkCollector<T> {
    data_source: T,
    extractor: RatingExtractor,
    cache: Option<OnceCell<u64>>,
}

impl<T> PassmarkCollector<T>
where
    T: DataSource + Send + Sync + 'static,
{
    async fn fetch_rating(&self) -> Result<u64, ProbeError> {
        let cpu_model = self.data_source.cpu_model().await?;
        tracing::debug!(cpu_model = %cpu_model, "Got CPU identifier");

        let page = self.data_source.benchmark_page(&cpu_model).await?;
        let rating = self.extractor.extract(&page)?;
        tracing::info!(cpu_model = %cpu_model, rating, "Extracted single-threaded rating");

        Ok(rating)
    }
}

#[async_trait::async_trait]
impl<T> Collector for PassmarkCollector<T>
where
    T: DataSource + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        NAME
    }

    fn help(&self) -> &'static str {
        HELP
    }

    async fn collect(&self) -> Result<Reading, ProbeError> {
        let rating = match &self.cache {
            Some(cache) => *cache.get_or_try_init(|| self.fetch_rating()).await?,
            None => self.fetch_rating().await?,
        };

        Ok(Reading::Value(rating as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, DataSource, Passmark, RatingExtractor};
    use crate::domain::{Metric, Reading};
    use crate::error::ProbeError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PAGE: &str = r#"<div class="right-desc"><span style="font-family: Arial, Helvetica, sans-serif;font-size: 44px;	font-weight: bold; color: #F48A18;">14573</span>
<strong>Single Thread Rating:</strong> 2500<br>
<strong>Samples:</strong> 4513*<br>"#;

    #[derive(Clone)]
    struct FakeSource {
        cpu_model: Option<&'static str>,
        page: Option<&'static str>,
        fetches: Arc<AtomicUsize>,
    }

    impl FakeSource {
        fn new(cpu_model: Option<&'static str>, page: Option<&'static str>) -> Self {
            Self {
                cpu_model,
                page,
                fetches: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl DataSource for FakeSource {
        async fn cpu_model(&self) -> Result<String, ProbeError> {
            self.cpu_model
                .map(str::to_string)
                .ok_or_else(|| ProbeError::Unavailable("no CPU information".to_string()))
        }

        async fn benchmark_page(&self, cpu_model: &str) -> Result<String, ProbeError> {
            assert_eq!(Some(cpu_model), self.cpu_model);
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.page.map(str::to_string).ok_or_else(|| ProbeError::HttpStatus {
                url: "https://www.cpubenchmark.net/cpu.php".to_string(),
                status: 503,
            })
        }
    }

    #[test]
    fn test_extract_rating() {
        let extractor = RatingExtractor::new().unwrap();
        assert_eq!(2500, extractor.extract(PAGE).unwrap());
        assert_eq!(
            2500,
            extractor
                .extract("<strong>Single Thread Rating:</strong> 2500<br>")
                .unwrap()
        );
    }

    #[test]
    fn test_missing_marker_fails() {
        let extractor = RatingExtractor::new().unwrap();
        let err = extractor.extract("<html>CPU not found</html>").unwrap_err();
        assert!(matches!(err, ProbeError::Extraction(_)));
    }

    #[test]
    fn test_non_numeric_rating_fails() {
        let extractor = RatingExtractor::new().unwrap();
        let err = extractor
            .extract("<strong>Single Thread Rating:</strong> NA<br>")
            .unwrap_err();
        assert!(matches!(err, ProbeError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_pipeline_reports_rating() {
        let source = FakeSource::new(Some("AMD Ryzen 7 5800X 8-Core Processor"), Some(PAGE));
        let collector = Passmark::new(Config::default()).register(source).unwrap();

        assert_eq!(Reading::Value(2500.0), collector.collect().await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_cpu_model_fails() {
        let source = FakeSource::new(None, Some(PAGE));
        let fetches = source.fetches.clone();
        let collector = Passmark::new(Config::default()).register(source).unwrap();

        assert!(collector.collect().await.is_err());
        assert_eq!(0, fetches.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_cached() {
        let source = FakeSource::new(Some("AMD Ryzen 7 5800X 8-Core Processor"), None);
        let fetches = source.fetches.clone();
        let collector = Passmark::new(Config::default()).register(source).unwrap();

        assert!(matches!(
            collector.collect().await,
            Err(ProbeError::HttpStatus { status: 503, .. })
        ));
        assert!(collector.collect().await.is_err());
        assert_eq!(2, fetches.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_rating_is_cached() {
        let source = FakeSource::new(Some("AMD Ryzen 7 5800X 8-Core Processor"), Some(PAGE));
        let fetches = source.fetches.clone();
        let collector = Passmark::new(Config::default()).register(source).unwrap();

        for _ in 0..3 {
            assert_eq!(Reading::Value(2500.0), collector.collect().await.unwrap());
        }
        assert_eq!(1, fetches.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_rating_is_refetched_without_cache() {
        let source = FakeSource::new(Some("AMD Ryzen 7 5800X 8-Core Processor"), Some(PAGE));
        let fetches = source.fetches.clone();
        let config = Config {
            cache: false,
            ..Config::default()
        };
        let collector = Passmark::new(config).register(source).unwrap();

        for _ in 0..3 {
            assert_eq!(Reading::Value(2500.0), collector.collect().await.unwrap());
        }
        assert_eq!(3, fetches.load(Ordering::SeqCst));
    }
}
