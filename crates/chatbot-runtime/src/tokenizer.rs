//! Reference whitespace tokenizer.
//!
//! - Splits on whitespace, growing the vocabulary on first sight of a word
//! - Encodes a (history, prompt) pair as `history <sep> prompt </s>`
//! - Deterministic; used by the echo backend and in tests

use std::collections::HashMap;
use std::sync::RwLock;

use chatbot_engine::{DecodingState, EncodedInput, ModelError, Result, TokenId, Tokenizer};

/// Padding token.
pub const PAD_TOKEN: TokenId = 0;
/// End-of-sequence token.
pub const EOS_TOKEN: TokenId = 1;
/// Separator between the two halves of an encoded pair.
pub const SEP_TOKEN: TokenId = 2;

const FIRST_WORD_ID: TokenId = 3;

pub struct WhitespaceTokenizer {
    state: RwLock<VocabState>,
}

#[derive(Debug)]
struct VocabState {
    vocab: HashMap<TokenId, String>,
    reverse_vocab: HashMap<String, TokenId>,
    next_id: TokenId,
}

impl Default for VocabState {
    fn default() -> Self {
        Self {
            vocab: HashMap::new(),
            reverse_vocab: HashMap::new(),
            next_id: FIRST_WORD_ID,
        }
    }
}

impl WhitespaceTokenizer {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(VocabState::default()),
        }
    }

    /// Number of words learned so far (special tokens excluded).
    pub fn vocab_size(&self) -> usize {
        self.state.read().map(|s| s.vocab.len()).unwrap_or(0)
    }

    fn encode_words(state: &mut VocabState, text: &str, ids: &mut Vec<TokenId>) {
        for word in text.split_whitespace() {
            let id = match state.reverse_vocab.get(word) {
                Some(id) => *id,
                None => {
                    let id = state.next_id;
                    state.next_id += 1;
                    state.reverse_vocab.insert(word.to_string(), id);
                    state.vocab.insert(id, word.to_string());
                    id
                }
            };
            ids.push(id);
        }
    }

    fn special_text(token: TokenId) -> Option<&'static str> {
        match token {
            PAD_TOKEN => Some("<pad>"),
            EOS_TOKEN => Some("</s>"),
            SEP_TOKEN => Some("<sep>"),
            _ => None,
        }
    }

    fn decode_id(&self, token: TokenId) -> Result<String> {
        if let Some(text) = Self::special_text(token) {
            return Ok(text.to_string());
        }
        let state = self
            .state
            .read()
            .map_err(|_| ModelError::Tokenization("tokenizer lock poisoned".to_string()))?;

        state
            .vocab
            .get(&token)
            .cloned()
            .ok_or_else(|| ModelError::Tokenization(format!("invalid token id {token}")))
    }
}

impl Default for WhitespaceTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn encode_pair(&self, first: &str, second: &str) -> Result<EncodedInput> {
        let mut state = self
            .state
            .write()
            .map_err(|_| ModelError::Tokenization("tokenizer lock poisoned".to_string()))?;

        let mut ids = Vec::new();
        Self::encode_words(&mut state, first, &mut ids);
        if !ids.is_empty() {
            ids.push(SEP_TOKEN);
        }
        Self::encode_words(&mut state, second, &mut ids);
        ids.push(EOS_TOKEN);

        Ok(EncodedInput::new(ids))
    }

    fn decode(&self, tokens: &[TokenId], skip_special_tokens: bool) -> Result<String> {
        let mut words = Vec::with_capacity(tokens.len());
        for &id in tokens {
            if skip_special_tokens && self.is_special(id) {
                continue;
            }
            words.push(self.decode_id(id)?);
        }
        Ok(words.join(" "))
    }

    fn decode_token(&self, token: TokenId, state: &mut DecodingState) -> Result<String> {
        if self.is_special(token) {
            return Ok(String::new());
        }
        let word = self.decode_id(token)?;
        let emitted = if state.emitted_any() {
            format!(" {word}")
        } else {
            word
        };
        state.push(&emitted);
        Ok(emitted)
    }

    fn is_special(&self, token: TokenId) -> bool {
        Self::special_text(token).is_some()
    }
}
