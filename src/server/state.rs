use crate::config::Configuration;
use crate::scrape::Scraper;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub configuration: Arc<Configuration>,
    pub scraper: Arc<Scraper>,
    pub descriptions: Arc<HashMap<&'static str, &'static str>>,
}

impl AppState {
    pub fn new(configuration: Arc<Configuration>, scraper: Arc<Scraper>) -> Self {
        let descriptions = Arc::new(scraper.descriptions());

        Self {
            configuration,
            scraper,
            descriptions,
        }
    }
}
