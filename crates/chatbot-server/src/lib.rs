//! # chatbot-server
//!
//! HTTP chat endpoint over a pretrained sequence-to-sequence model.
//!
//! `POST /chatbot` answers with the full reply as plain text;
//! `POST /chatbot/stream` relays the reply chunk by chunk as Server-Sent
//! Events. Both feed and update a bounded conversation history.

pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod history;
pub mod models;
pub mod prompt;
pub mod server;
pub mod session_manager;
pub mod state;
pub mod streaming;

pub use config::{ConfigError, ServerConfig};
pub use error::ServerError;
pub use gateway::ModelGateway;
pub use history::{History, HistoryStore};
pub use server::{create_router, run_server};
pub use session_manager::SessionManager;
pub use state::AppState;
