use std::sync::Arc;
use talos::bootstrap::init_collectors;
use talos::config::Configuration;
use talos::logging::setup_logging;
use talos::scrape::Scraper;
use talos::server::start_server;
use talos::server::state::AppState;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let configuration = Arc::new(Configuration::load()?);
    let _guard = setup_logging(&configuration.log)?;

    tracing::info!("Starting Talos");

    let collectors = init_collectors(&configuration)?;
    let scraper = Arc::new(Scraper::new(
        collectors,
        configuration.scrape.probe_timeout(),
    ));

    let state = AppState::new(configuration, scraper);

    start_server(state).await?;
    tracing::info!("Bye!");

    Ok(())
}
