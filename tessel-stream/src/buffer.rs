use std::collections::VecDeque;

use tessel_core::{DeserializeError, Token, TokenSource};

/// An in-memory token tape.
///
/// Produced by [`Decoder::decode_buffer`](tessel_core::Decoder::decode_buffer)
/// and handy for replaying recorded tokens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenBuffer {
    tokens: VecDeque<Token>,
}

impl TokenBuffer {
    /// Wrap a recorded token sequence.
    pub fn new(tokens: impl Into<VecDeque<Token>>) -> Self {
        Self {
            tokens: tokens.into(),
        }
    }

    /// Tokens not yet read.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether every token has been read.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl From<Vec<Token>> for TokenBuffer {
    fn from(tokens: Vec<Token>) -> Self {
        Self::new(tokens)
    }
}

impl TokenSource for TokenBuffer {
    fn next_token(&mut self) -> Result<Option<Token>, DeserializeError> {
        Ok(self.tokens.pop_front())
    }
}
