//! # chatbot-engine
//!
//! The "narrow waist" of the chatbot stack. Defines the [`Seq2SeqModel`],
//! [`Tokenizer`] and [`ModelLoader`] traits the HTTP layer talks to, plus the
//! generation parameters passed across them. Backends can be swapped without
//! touching request handling.
//!
//! ## Design Notes
//!
//! ### Interior Mutability
//! Trait methods take `&self` (not `&mut self`) so a single loaded model can
//! serve concurrent requests. Backends that keep mutable state (vocabulary
//! growth, caches) are responsible for their own synchronization.
//!
//! ### Token Type
//! `TokenId` is aliased as `i32`, matching the reference tokenizer. Token IDs
//! are logically non-negative.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, ModelError>;

/// Token ID type (logically non-negative).
pub type TokenId = i32;

/// Maximum output length used when none is configured.
pub const DEFAULT_MAX_LENGTH: usize = 60;

/// Top-level error type for all model operations.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model loading failed: {0}")]
    ModelLoad(String),
    #[error("tokenization failed: {0}")]
    Tokenization(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("generation cancelled")]
    Cancelled,
}

/// Decoding parameters handed to [`Seq2SeqModel::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Upper bound on generated tokens, including the end-of-sequence token.
    pub max_length: usize,
    /// Beam count. Only single-beam decoding is ever requested.
    pub num_beams: usize,
    /// Whether the backend should sample instead of decoding greedily.
    pub do_sample: bool,
}

impl GenerationConfig {
    /// Greedy single-beam decoding for request/reply generation.
    pub fn blocking(max_length: usize) -> Self {
        Self {
            max_length,
            num_beams: 1,
            do_sample: false,
        }
    }

    /// Single-beam sampling, required for token-by-token streaming.
    pub fn streaming(max_length: usize) -> Self {
        Self {
            max_length,
            num_beams: 1,
            do_sample: true,
        }
    }

    /// Reject parameters no backend can honor.
    pub fn validate(&self) -> Result<()> {
        if self.max_length == 0 {
            return Err(ModelError::Generation(
                "max_length must be at least 1".to_string(),
            ));
        }
        if self.num_beams != 1 {
            return Err(ModelError::Generation(format!(
                "only single-beam decoding is supported (got {} beams)",
                self.num_beams
            )));
        }
        Ok(())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::blocking(DEFAULT_MAX_LENGTH)
    }
}

/// Tokenized model input for an encoded (history, prompt) pair.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedInput {
    pub input_ids: Vec<TokenId>,
    pub attention_mask: Vec<u8>,
}

impl EncodedInput {
    /// Build an input with every position attended.
    pub fn new(input_ids: Vec<TokenId>) -> Self {
        let attention_mask = vec![1; input_ids.len()];
        Self {
            input_ids,
            attention_mask,
        }
    }

    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// Streaming decode state carried across [`Tokenizer::decode_token`] calls.
#[derive(Debug, Clone, Default)]
pub struct DecodingState {
    buffer: String,
    emitted_any: bool,
}

impl DecodingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text emitted so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Whether any text has been emitted yet.
    pub fn emitted_any(&self) -> bool {
        self.emitted_any
    }

    /// Record an emitted chunk.
    pub fn push(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.buffer.push_str(chunk);
        self.emitted_any = true;
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.emitted_any = false;
    }
}

/// Core tokenizer trait. Implementations can be swapped without changing app code.
pub trait Tokenizer: Send + Sync {
    /// Encode a text pair (conversation history, prompt) into one model input.
    fn encode_pair(&self, first: &str, second: &str) -> Result<EncodedInput>;

    /// Decode a complete token sequence.
    fn decode(&self, tokens: &[TokenId], skip_special_tokens: bool) -> Result<String>;

    /// Decode one token for streaming output. Special tokens decode to `""`.
    fn decode_token(&self, token: TokenId, state: &mut DecodingState) -> Result<String>;

    /// Whether `token` is a control token (padding, separator, end of sequence).
    fn is_special(&self, token: TokenId) -> bool;
}

/// The generation trait. The model is an opaque collaborator: given tokenized
/// input it returns tokenized output within `config.max_length`.
pub trait Seq2SeqModel: Send + Sync {
    /// Generate output tokens for `input`.
    ///
    /// `on_token` is invoked with every token as it is produced. When it
    /// returns [`ControlFlow::Break`] the backend stops and returns the tokens
    /// generated so far.
    fn generate(
        &self,
        input: &EncodedInput,
        config: &GenerationConfig,
        on_token: &mut dyn FnMut(TokenId) -> ControlFlow<()>,
    ) -> Result<Vec<TokenId>>;
}

/// A constructed model and its matching tokenizer.
#[derive(Clone)]
pub struct LoadedModel {
    pub model: Arc<dyn Seq2SeqModel>,
    pub tokenizer: Arc<dyn Tokenizer>,
}

impl LoadedModel {
    pub fn new(model: Arc<dyn Seq2SeqModel>, tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { model, tokenizer }
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel").finish_non_exhaustive()
    }
}

/// Constructs a [`LoadedModel`] from a model identifier.
pub trait ModelLoader: Send + Sync {
    fn load(&self, model_id: &str) -> Result<LoadedModel>;
}
