use chatbot_runtime::BuiltinLoader;
use chatbot_server::{run_server, AppState, ServerConfig};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();
    config.validate()?;

    let addr = config.socket_addr();
    tracing::info!(
        model = %config.model_name,
        history_max_len = config.history_max_len,
        "starting chatbot server"
    );
    if !BuiltinLoader::supports(&config.model_name) {
        tracing::warn!(
            model = %config.model_name,
            known = ?BuiltinLoader::known_models(),
            "no built-in backend for this model; chat requests will answer 500"
        );
    }

    let state = AppState::new(config, Arc::new(BuiltinLoader::new()));
    run_server(state, addr).await
}
