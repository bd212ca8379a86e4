//! Built-in backends driven through the engine traits only, the way the
//! server's model gateway uses them.

use chatbot_engine::{DecodingState, GenerationConfig, ModelLoader, TokenId};
use chatbot_runtime::{BuiltinLoader, ECHO_MODEL_ID};
use std::ops::ControlFlow;

#[test]
fn blocking_and_streamed_decodes_agree() {
    let loaded = BuiltinLoader::new().load(ECHO_MODEL_ID).unwrap();
    let input = loaded
        .tokenizer
        .encode_pair("hello\nhi there", "how are you today")
        .unwrap();

    let tokens = loaded
        .model
        .generate(&input, &GenerationConfig::blocking(60), &mut |_: TokenId| {
            ControlFlow::Continue(())
        })
        .unwrap();
    let blocking = loaded.tokenizer.decode(&tokens, true).unwrap();

    let tokenizer = loaded.tokenizer.clone();
    let mut state = DecodingState::new();
    let mut chunks = Vec::new();
    loaded
        .model
        .generate(&input, &GenerationConfig::streaming(60), &mut |t: TokenId| {
            let chunk = tokenizer.decode_token(t, &mut state).unwrap();
            if !chunk.is_empty() {
                chunks.push(chunk);
            }
            ControlFlow::Continue(())
        })
        .unwrap();

    assert_eq!(blocking, "how are you today");
    assert_eq!(chunks.concat().trim(), blocking);
    assert_eq!(chunks.len(), 4);
}

#[test]
fn loaded_pairs_are_independent() {
    let loader = BuiltinLoader::new();
    let a = loader.load(ECHO_MODEL_ID).unwrap();
    let b = loader.load(ECHO_MODEL_ID).unwrap();
    let ia = a.tokenizer.encode_pair("", "x y").unwrap();
    let ib = b.tokenizer.encode_pair("", "y").unwrap();
    // Each tokenizer grows its own vocabulary.
    assert_eq!(ia.input_ids[0], ib.input_ids[0]);
}

#[test]
fn stopping_early_truncates_output() {
    let loaded = BuiltinLoader::new().load(ECHO_MODEL_ID).unwrap();
    let input = loaded.tokenizer.encode_pair("", "a b c d").unwrap();
    let out = loaded
        .model
        .generate(&input, &GenerationConfig::streaming(60), &mut |_: TokenId| {
            ControlFlow::Break(())
        })
        .unwrap();
    assert_eq!(out.len(), 1);
}
