pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod llm;
pub mod media;
pub mod pipeline;

use std::sync::Arc;
use config::Config;
use pipeline::Pipeline;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(config: Config) -> error::Result<Self> {
        let pipeline = Pipeline::from_config(&config)?;
        Ok(AppState {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        })
    }
}
