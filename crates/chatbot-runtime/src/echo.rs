//! Deterministic echo backend.
//!
//! Replies with the prompt half of the encoded pair, word for word, followed
//! by end-of-sequence. Useful for wiring checks and demos: the output is a
//! pure function of the input, so blocking and streamed replies agree.

use std::ops::ControlFlow;

use chatbot_engine::{EncodedInput, GenerationConfig, Result, Seq2SeqModel, TokenId};

use crate::tokenizer::{EOS_TOKEN, PAD_TOKEN, SEP_TOKEN};

#[derive(Debug, Clone, Copy, Default)]
pub struct EchoModel;

impl EchoModel {
    pub fn new() -> Self {
        Self
    }

    /// The prompt half of `input`: everything after the last separator,
    /// minus padding and end-of-sequence.
    fn prompt_tokens(input: &EncodedInput) -> impl Iterator<Item = TokenId> + '_ {
        let start = input
            .input_ids
            .iter()
            .rposition(|&t| t == SEP_TOKEN)
            .map_or(0, |pos| pos + 1);
        input.input_ids[start..]
            .iter()
            .copied()
            .filter(|&t| t != EOS_TOKEN && t != PAD_TOKEN)
    }
}

impl Seq2SeqModel for EchoModel {
    fn generate(
        &self,
        input: &EncodedInput,
        config: &GenerationConfig,
        on_token: &mut dyn FnMut(TokenId) -> ControlFlow<()>,
    ) -> Result<Vec<TokenId>> {
        config.validate()?;

        let mut output = Vec::new();
        for token in Self::prompt_tokens(input).chain(std::iter::once(EOS_TOKEN)) {
            // Always leave room for end-of-sequence.
            let token = if output.len() + 1 == config.max_length {
                EOS_TOKEN
            } else {
                token
            };
            output.push(token);
            if on_token(token).is_break() || token == EOS_TOKEN {
                break;
            }
        }

        tracing::trace!(generated = output.len(), "echo generation finished");
        Ok(output)
    }
}
