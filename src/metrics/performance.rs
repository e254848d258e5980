use crate::domain::{Collector, Metric, Reading};
use crate::error::ProbeError;
use crate::metrics::no_operation::NoOpCollector;
use anyhow::Context;
use chrono::{Local, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::hint::black_box;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const NAME: &str = "performance";
const HELP: &str = "Single-threaded prime sieve iterations per second, measured once a day.";

const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub enabled: bool,
    /// Local time of day (`HH:MM`) at which the benchmark window opens.
    pub window_start: String,
    pub window_minutes: u32,
    pub budget_ms: u64,
    pub max_prime: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            window_start: "06:00".to_string(),
            window_minutes: 10,
            budget_ms: 500,
            max_prime: 1000,
        }
    }
}

/// Source of the local wall-clock time used by the gate.
pub trait Clock {
    fn now(&self) -> NaiveTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveTime {
        Local::now().time()
    }
}

/// A daily window `[start, start + duration)`, possibly spanning midnight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    start: NaiveTime,
    duration: TimeDelta,
}

impl Schedule {
    pub fn new(start: NaiveTime, minutes: u32) -> anyhow::Result<Self> {
        if minutes > MINUTES_PER_DAY {
            anyhow::bail!(
                "benchmark window of {} minutes is longer than a day",
                minutes
            );
        }

        Ok(Self {
            start,
            duration: TimeDelta::minutes(i64::from(minutes)),
        })
    }

    pub fn parse(start: &str, minutes: u32) -> anyhow::Result<Self> {
        let start = NaiveTime::parse_from_str(start, "%H:%M")
            .with_context(|| format!("Invalid benchmark window start {:?}, expected HH:MM", start))?;

        Self::new(start, minutes)
    }

    pub fn is_open(&self, now: NaiveTime) -> bool {
        let mut since_start = now.signed_duration_since(self.start);
        if since_start < TimeDelta::zero() {
            since_start += TimeDelta::days(1);
        }

        since_start < self.duration
    }
}

/// Every prime up to `maximum`, by trial division against the primes found so far.
pub fn primes_up_to(maximum: u32) -> Vec<u32> {
    let mut primes: Vec<u32> = Vec::new();

    for candidate in 2..=maximum {
        if primes.iter().all(|prime| candidate % prime != 0) {
            primes.push(candidate);
        }
    }

    primes
}

#[derive(Clone, Copy, Debug)]
pub struct Throughput {
    pub iterations: u64,
    pub elapsed: Duration,
}

impl Throughput {
    pub fn per_second(&self) -> f64 {
        self.iterations as f64 / self.elapsed.as_secs_f64()
    }
}

/// Repeats the prime enumeration until `budget` has elapsed.
///
/// Fails when not a single iteration completed, or when the elapsed time is
/// too small to yield a finite rate.
pub fn run_benchmark(budget: Duration, max_prime: u32) -> Result<Throughput, ProbeError> {
    let start = Instant::now();
    let mut iterations = 0u64;

    while start.elapsed() < budget {
        black_box(primes_up_to(black_box(max_prime)));
        iterations += 1;
    }

    let throughput = Throughput {
        iterations,
        elapsed: start.elapsed(),
    };

    let rate = throughput.per_second();
    if iterations == 0 || !rate.is_finite() {
        return Err(ProbeError::NoIterations { budget });
    }

    tracing::debug!(
        iterations,
        elapsed = ?throughput.elapsed,
        per_second = rate,
        "Benchmark finished"
    );

    Ok(throughput)
}

pub struct Performance {
    config: Config,
}

impl Performance {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl<T> Metric<T> for Performance
where
    T: Clock + Send + Sync + 'static,
{
    fn register(self, clock: T) -> anyhow::Result<Box<dyn Collector>> {
        if !self.config.enabled {
            return Ok(Box::new(NoOpCollector::new(NAME, HELP)));
        }

        let schedule = Schedule::parse(&self.config.window_start, self.config.window_minutes)?;

        Ok(Box::new(PerformanceCollector {
            clock,
            schedule,
            budget: Duration::from_millis(self.config.budget_ms),
            max_prime: self.config.max_prime,
            in_flight: Arc::new(tokio::sync::Mutex::new(())),
        }))
    }
}

struct PerformanceCollector<T> {
    clock: T,
    schedule: Schedule,
    budget: Duration,
    max_prime: u32,
    /// Held by the blocking benchmark itself, so a cancelled scrape cannot
    /// release it while the measurement is still running.
    in_flight: Arc<tokio::sync::Mutex<()>>,
}

#[async_trait::async_trait]
impl<T> Collector for PerformanceCollector<T>
where
    T: Clock + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        NAME
    }

    fn help(&self) -> &'static str {
        HELP
    }

    async fn collect(&self) -> Result<Reading, ProbeError> {
        let now = self.clock.now();
        if !self.schedule.is_open(now) {
            tracing::trace!(%now, "Outside the benchmark window");
            return Ok(Reading::Skipped);
        }

        let running = self.in_flight.clone().lock_owned().await;

        let budget = self.budget;
        let max_prime = self.max_prime;
        let throughput = tokio::task::spawn_blocking(move || {
            let _running = running;
            run_benchmark(budget, max_prime)
        })
        .await
        .map_err(|e| ProbeError::Unavailable(format!("benchmark task failed: {}", e)))??;

        Ok(Reading::Value(throughput.per_second()))
    }
}
