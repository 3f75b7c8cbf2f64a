//! Shared application state.

use std::sync::Arc;
use std::time::Instant;

use seqgen_engine::SequenceEngine;

use crate::config::AppConfig;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Sequence engine configured from the application limits
    pub engine: Arc<SequenceEngine>,

    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let engine = SequenceEngine::new(config.engine_config());
        Self {
            engine: Arc::new(engine),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
