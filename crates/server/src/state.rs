//! # Application State
//!
//! This module defines the shared application state (`AppState`) and the logic
//! for building it at startup. The state holds the orchestrator, which in turn
//! owns the cached assistant and the result cache.

use crate::config::Config;
use sqlchat::{
    AssistantFactory, CachePolicy, CacheSettings, CloudAssistantFactory, Orchestrator,
};
use std::{sync::Arc, time::Duration};
use tracing::info;

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Builds state around any assistant factory. Used directly by tests.
    pub fn from_factory(factory: Arc<dyn AssistantFactory>, settings: CacheSettings) -> Self {
        Self {
            orchestrator: Arc::new(Orchestrator::new(factory, settings)),
        }
    }
}

/// Builds the shared application state from the configuration.
///
/// The configuration is validated here, so a server with missing settings fails
/// at startup. Adapters are not built, and nothing remote is contacted, until the
/// first request needs the assistant.
pub async fn build_app_state(config: Config) -> anyhow::Result<AppState> {
    let app_config = config.app_config();
    let settings = CacheSettings {
        assistant_ttl: Duration::from_secs(app_config.assistant.assistant_ttl_secs),
        result_policy: CachePolicy::forever(),
    };
    info!(
        assistant_ttl_secs = app_config.assistant.assistant_ttl_secs,
        "Building application state."
    );
    let factory = CloudAssistantFactory::new(app_config)?;
    Ok(AppState::from_factory(Arc::new(factory), settings))
}
