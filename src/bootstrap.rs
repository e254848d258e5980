use crate::config::Configuration;
use crate::datasource::ShellRunner;
use crate::domain::{Collector, Metric};
use crate::{datasource, metrics};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysinfo::System;

/// A collector whose own deadline outlives the per-probe timeout would be cut
/// off by the scraper before it can finish, and its metric would vanish.
fn ensure_within_probe_timeout(key: &str, millis: u64, config: &Configuration) -> anyhow::Result<()> {
    let limit = config.scrape.probe_timeout_ms;
    if millis >= limit {
        anyhow::bail!(
            "{} ({} ms) must be shorter than scrape.probe_timeout_ms ({} ms)",
            key,
            millis,
            limit
        );
    }

    Ok(())
}

fn validate(config: &Configuration) -> anyhow::Result<()> {
    let collectors = &config.collectors;

    if collectors.logged_in_users.enabled {
        let key = "collectors.logged_in_users.timeout_ms";
        ensure_within_probe_timeout(key, collectors.logged_in_users.timeout_ms, config)?;
    }
    if collectors.ssh_sessions.enabled {
        let key = "collectors.ssh_sessions.timeout_ms";
        ensure_within_probe_timeout(key, collectors.ssh_sessions.timeout_ms, config)?;
    }
    if collectors.ansible_processes.enabled {
        let key = "collectors.ansible_processes.timeout_ms";
        ensure_within_probe_timeout(key, collectors.ansible_processes.timeout_ms, config)?;
    }
    if collectors.performance.enabled {
        let key = "collectors.performance.budget_ms";
        ensure_within_probe_timeout(key, collectors.performance.budget_ms, config)?;
    }

    Ok(())
}

pub fn init_collectors(config: &Configuration) -> anyhow::Result<Vec<Box<dyn Collector>>> {
    validate(config)?;

    let collectors = &config.collectors;
    let shell = |timeout_ms: u64| {
        ShellRunner::new(
            config.shell.program.clone(),
            Duration::from_millis(timeout_ms),
        )
    };

    let mut registered = vec![];

    let cfg = &collectors.logged_in_users;
    let data_source =
        datasource::logged_in_users::LoggedInUsers::new(shell(cfg.timeout_ms), cfg.command.clone());
    let metric = metrics::logged_in_users::LoggedInUsers::new(cfg.clone());
    registered.push(metric.register(data_source)?);

    let cfg = &collectors.ssh_sessions;
    let data_source =
        datasource::ssh_sessions::SshSessions::new(shell(cfg.timeout_ms), cfg.command.clone());
    let metric = metrics::ssh_sessions::SshSessions::new(cfg.clone());
    registered.push(metric.register(data_source)?);

    let cfg = &collectors.ansible_processes;
    let data_source =
        datasource::ansible_processes::AnsibleProcesses::new(shell(cfg.timeout_ms), &cfg.tool);
    let metric = metrics::ansible_processes::AnsibleProcesses::new(cfg.clone());
    registered.push(metric.register(data_source)?);

    let cfg = &collectors.passmark;
    let system = Arc::new(Mutex::new(System::new()));
    let data_source = datasource::passmark::Passmark::new(
        system,
        cfg.url.clone(),
        Duration::from_millis(cfg.timeout_ms),
    )?;
    let metric = metrics::passmark::Passmark::new(cfg.clone());
    registered.push(metric.register(data_source)?);

    let cfg = &collectors.performance;
    let metric = metrics::performance::Performance::new(cfg.clone());
    registered.push(metric.register(metrics::performance::LocalClock)?);

    for collector in &registered {
        tracing::debug!(metric = collector.name(), "Registered collector");
    }

    Ok(registered)
}
