use serde::Deserialize;
use voxterm_core::{SttError, Token, TranscriptUpdate};

/// One inbound backend message: a token batch, or a fatal error.
#[derive(Debug, Deserialize)]
pub(crate) struct ServerMessage {
    #[serde(default)]
    pub tokens: Vec<Token>,
    pub error_message: Option<String>,
}

/// Session-scoped transcript accumulator.
///
/// `finalized` only ever grows within a session; `interim` is the backend's
/// current best guess and is replaced wholesale on every message. The full
/// transcript is always `finalized + interim`.
#[derive(Debug, Default)]
pub struct TranscriptState {
    finalized: String,
    interim: String,
}

impl TranscriptState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one token batch into the state. Final tokens append to the
    /// finalized text in arrival order; non-final tokens replace the
    /// interim text for this update.
    pub fn apply(&mut self, tokens: &[Token]) -> TranscriptUpdate {
        let mut final_text = String::new();
        let mut interim_text = String::new();

        for token in tokens {
            if token.is_final {
                final_text.push_str(&token.text);
            } else {
                interim_text.push_str(&token.text);
            }
        }

        let has_final = !final_text.is_empty();
        if has_final {
            self.finalized.push_str(&final_text);
        }
        self.interim = interim_text;

        TranscriptUpdate {
            transcript: self.full_transcript(),
            has_final,
        }
    }

    /// Parse one raw backend message and fold it in. A present
    /// `error_message` terminates the session with a backend error.
    pub(crate) fn apply_message(&mut self, raw: &str) -> Result<TranscriptUpdate, SttError> {
        let msg: ServerMessage =
            serde_json::from_str(raw).map_err(|e| SttError::Protocol(e.to_string()))?;

        if let Some(error) = msg.error_message {
            return Err(SttError::Backend(error));
        }

        Ok(self.apply(&msg.tokens))
    }

    pub fn full_transcript(&self) -> String {
        format!("{}{}", self.finalized, self.interim)
    }

    pub fn finalized(&self) -> &str {
        &self.finalized
    }

    pub fn interim(&self) -> &str {
        &self.interim
    }

    pub fn reset(&mut self) {
        self.finalized.clear();
        self.interim.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, is_final: bool) -> Token {
        Token {
            text: text.to_string(),
            is_final,
        }
    }

    #[test]
    fn test_final_tokens_append_in_arrival_order() {
        let mut state = TranscriptState::new();
        state.apply(&[token("turn ", true), token("off ", true)]);
        let update = state.apply(&[token("the lights", true)]);
        assert_eq!(state.finalized(), "turn off the lights");
        assert_eq!(update.transcript, "turn off the lights");
        assert!(update.has_final);
    }

    #[test]
    fn test_interim_replaced_wholesale() {
        let mut state = TranscriptState::new();
        state.apply(&[token("turn of", false)]);
        assert_eq!(state.interim(), "turn of");

        // Backend revises its hypothesis; previous interim disappears
        state.apply(&[token("turn off", false)]);
        assert_eq!(state.interim(), "turn off");
        assert_eq!(state.full_transcript(), "turn off");
    }

    #[test]
    fn test_interim_cleared_by_batch_without_interim_tokens() {
        let mut state = TranscriptState::new();
        state.apply(&[token("maybe", false)]);
        let update = state.apply(&[token("confirmed", true)]);
        assert_eq!(state.interim(), "");
        assert_eq!(update.transcript, "confirmed");
    }

    #[test]
    fn test_mixed_batch_splits_final_and_interim() {
        let mut state = TranscriptState::new();
        let update = state.apply(&[
            token("hello ", true),
            token("wor", false),
            token("world", false),
        ]);
        assert_eq!(state.finalized(), "hello ");
        assert_eq!(state.interim(), "worworld");
        assert_eq!(update.transcript, "hello worworld");
        assert!(update.has_final);
    }

    #[test]
    fn test_accumulation_invariant_across_batches() {
        // finalized == concatenation of all is_final texts across batches;
        // interim == non-final texts of the most recent batch only.
        let mut state = TranscriptState::new();
        state.apply(&[token("a", true), token("x", false)]);
        state.apply(&[token("b", true), token("y", false)]);
        state.apply(&[token("c", true)]);
        assert_eq!(state.finalized(), "abc");
        assert_eq!(state.interim(), "");
        assert_eq!(state.full_transcript(), "abc");
    }

    #[test]
    fn test_empty_batch_yields_no_final_update() {
        let mut state = TranscriptState::new();
        let update = state.apply(&[]);
        assert!(!update.has_final);
        assert_eq!(update.transcript, "");
    }

    #[test]
    fn test_reset_clears_all_state() {
        let mut state = TranscriptState::new();
        state.apply(&[token("leftover", true), token("tail", false)]);
        state.reset();
        assert_eq!(state.full_transcript(), "");
        assert_eq!(state.finalized(), "");
        assert_eq!(state.interim(), "");
    }

    #[test]
    fn test_apply_message_parses_wire_shape() {
        let mut state = TranscriptState::new();
        let update = state
            .apply_message(
                r#"{"tokens": [{"text": "ls ", "is_final": true}, {"text": "-la", "is_final": false}]}"#,
            )
            .unwrap();
        assert_eq!(update.transcript, "ls -la");
        assert!(update.has_final);
        assert_eq!(state.finalized(), "ls ");
    }

    #[test]
    fn test_apply_message_missing_tokens_field() {
        let mut state = TranscriptState::new();
        let update = state.apply_message("{}").unwrap();
        assert!(!update.has_final);
        assert_eq!(update.transcript, "");
    }

    #[test]
    fn test_apply_message_error_message_is_backend_error() {
        let mut state = TranscriptState::new();
        let result = state.apply_message(r#"{"error_message": "invalid api key"}"#);
        match result {
            Err(SttError::Backend(msg)) => assert_eq!(msg, "invalid api key"),
            other => panic!("expected Backend error, got {:?}", other),
        }
    }

    #[test]
    fn test_apply_message_malformed_json_is_protocol_error() {
        let mut state = TranscriptState::new();
        match state.apply_message("not json") {
            Err(SttError::Protocol(_)) => {}
            other => panic!("expected Protocol error, got {:?}", other),
        }
    }
}
