//! HTTP request handlers.

pub mod chatbot;
pub mod health;

pub use chatbot::{handle_chatbot, handle_chatbot_stream};
pub use health::handle_health;
