//! Model identifier registry.

use std::sync::Arc;

use chatbot_engine::{LoadedModel, ModelError, ModelLoader, Result};

use crate::echo::EchoModel;
use crate::tokenizer::WhitespaceTokenizer;

/// Identifier of the deterministic echo backend.
pub const ECHO_MODEL_ID: &str = "builtin/echo";

/// Resolves model identifiers to the backends compiled into this crate.
///
/// Identifiers without a registered backend fail with
/// [`ModelError::ModelLoad`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLoader;

impl BuiltinLoader {
    pub fn new() -> Self {
        Self
    }

    /// Identifiers this loader can construct.
    pub fn known_models() -> &'static [&'static str] {
        &[ECHO_MODEL_ID]
    }

    pub fn supports(model_id: &str) -> bool {
        Self::known_models().contains(&model_id.trim())
    }
}

impl ModelLoader for BuiltinLoader {
    fn load(&self, model_id: &str) -> Result<LoadedModel> {
        match model_id.trim() {
            ECHO_MODEL_ID => Ok(LoadedModel::new(
                Arc::new(EchoModel::new()),
                Arc::new(WhitespaceTokenizer::new()),
            )),
            other => Err(ModelError::ModelLoad(format!(
                "no backend registered for model '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_echo_backend() {
        assert!(BuiltinLoader::new().load(ECHO_MODEL_ID).is_ok());
        assert!(BuiltinLoader::supports(ECHO_MODEL_ID));
        assert!(BuiltinLoader::supports(" builtin/echo "));
    }

    #[test]
    fn unknown_model_fails_to_load() {
        let err = BuiltinLoader::new()
            .load("facebook/blenderbot-400M-distill")
            .unwrap_err();
        assert!(matches!(err, ModelError::ModelLoad(_)));
        assert!(err.to_string().contains("blenderbot"));
        assert!(!BuiltinLoader::supports("facebook/blenderbot-400M-distill"));
    }
}
