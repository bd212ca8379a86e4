//! # chatbot-runtime
//!
//! Built-in backends for the chatbot service. Provides the reference
//! whitespace tokenizer, a deterministic echo model, the [`BuiltinLoader`]
//! registry that resolves model identifiers, and telemetry hooks
//! (time to first token, tok/s) around generation runs.

pub mod echo;
pub mod loader;
pub mod telemetry;
pub mod tokenizer;

pub use echo::EchoModel;
pub use loader::{BuiltinLoader, ECHO_MODEL_ID};
pub use telemetry::{
    GenerationMetrics, GenerationTimer, LogTelemetry, NoopTelemetry, ReplyMode, TelemetryHook,
};
pub use tokenizer::WhitespaceTokenizer;
