//! Server configuration, read from command-line flags or the environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use chatbot_engine::DEFAULT_MAX_LENGTH;
use clap::Parser;

/// Checkpoint requested when `MODEL_NAME` is unset.
pub const DEFAULT_MODEL_NAME: &str = "facebook/blenderbot-400M-distill";
pub const DEFAULT_HISTORY_MAX_LEN: usize = 20;
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_CONCURRENT_GENERATIONS: usize = 64;
pub const DEFAULT_MAX_SESSIONS: usize = 256;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be at least 1")]
    Zero(&'static str),
}

/// Chat endpoint over a pretrained seq2seq model.
#[derive(Debug, Clone, Parser)]
#[command(name = "chatbot-server", version)]
pub struct ServerConfig {
    /// Model identifier handed to the model loader. Use `builtin/echo` for the
    /// bundled deterministic backend; the default has no built-in backend.
    #[arg(long, env = "MODEL_NAME", default_value = DEFAULT_MODEL_NAME)]
    pub model_name: String,

    /// Conversation history capacity, in entries (a prompt and a reply are two entries).
    #[arg(long, env = "HISTORY_MAX_LEN", default_value_t = DEFAULT_HISTORY_MAX_LEN)]
    pub history_max_len: usize,

    /// Address to bind.
    #[arg(long, env = "CHATBOT_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Port to bind.
    #[arg(long, env = "CHATBOT_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Maximum generated length, in tokens.
    #[arg(long, env = "MAX_LENGTH", default_value_t = DEFAULT_MAX_LENGTH)]
    pub max_length: usize,

    /// Generations allowed to run at once; extra requests get 503.
    #[arg(long, env = "MAX_CONCURRENT_GENERATIONS", default_value_t = DEFAULT_MAX_CONCURRENT_GENERATIONS)]
    pub max_concurrent_generations: usize,

    /// Per-session histories kept before the oldest is dropped.
    #[arg(long, env = "MAX_SESSIONS", default_value_t = DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,

    /// Load the model at startup instead of on the first request.
    #[arg(long, env = "PRELOAD_MODEL")]
    pub preload_model: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            history_max_len: DEFAULT_HISTORY_MAX_LEN,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            max_length: DEFAULT_MAX_LENGTH,
            max_concurrent_generations: DEFAULT_MAX_CONCURRENT_GENERATIONS,
            max_sessions: DEFAULT_MAX_SESSIONS,
            preload_model: false,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("history_max_len", self.history_max_len),
            ("max_length", self.max_length),
            ("max_concurrent_generations", self.max_concurrent_generations),
            ("max_sessions", self.max_sessions),
        ];
        match limits.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(ConfigError::Zero(*name)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::try_parse_from(["chatbot-server"]).unwrap();
        assert_eq!(config.history_max_len, 20);
        assert_eq!(config.max_length, 60);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:5000");
        assert!(!config.preload_model);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn flags_override_defaults() {
        let config = ServerConfig::try_parse_from([
            "chatbot-server",
            "--model-name",
            "builtin/echo",
            "--history-max-len",
            "4",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--preload-model",
        ])
        .unwrap();
        assert_eq!(config.model_name, "builtin/echo");
        assert_eq!(config.history_max_len, 4);
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert!(config.preload_model);
    }

    #[test]
    fn model_name_help_points_to_echo_backend() {
        use clap::CommandFactory;
        let help = ServerConfig::command().render_help().to_string();
        assert!(help.contains("builtin/echo"), "{help}");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = ServerConfig {
            history_max_len: 0,
            ..ServerConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero("history_max_len"))
        );
    }
}
