//! Application state and configuration.

use std::sync::Arc;

use chatbot_engine::ModelLoader;

use crate::config::ServerConfig;
use crate::gateway::ModelGateway;
use crate::history::HistoryStore;
use crate::session_manager::SessionManager;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Lazily loaded model/tokenizer pair.
    pub gateway: Arc<ModelGateway>,
    /// Conversation histories (shared and per-session).
    pub histories: Arc<HistoryStore>,
    /// In-flight generations (concurrency + cancellation).
    pub sessions: Arc<SessionManager>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, loader: Arc<dyn ModelLoader>) -> Self {
        let gateway = ModelGateway::new(config.model_name.clone(), loader, config.max_length);
        Self::with_gateway(config, gateway)
    }

    /// Build state around a preconfigured gateway (custom telemetry, tests).
    pub fn with_gateway(config: ServerConfig, gateway: ModelGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
            histories: Arc::new(HistoryStore::new(
                config.history_max_len,
                config.max_sessions,
            )),
            sessions: SessionManager::new(config.max_concurrent_generations),
            config: Arc::new(config),
        }
    }
}
