use num_bigint::BigInt;
use rust_decimal::Decimal;
use tessel_core::{Encoder, Limits, Number, Path, PathStep, SerializeError, Token};

use crate::tracing_macros::trace;

#[derive(Debug)]
enum Scope {
    Array { index: usize },
    Object { keyed: bool, awaiting_value: bool },
}

/// An [`Encoder`] that records the token stream it is fed.
///
/// Useful as the back end of in-memory conversions and as a tokenizer-free
/// test double. Enforces the same depth budget as the decoders.
#[derive(Debug, Default)]
pub struct TokenEncoder {
    tokens: Vec<Token>,
    limits: Limits,
    scopes: Vec<Scope>,
    path: Path,
}

impl TokenEncoder {
    /// An encoder with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// An encoder with the given limits.
    pub fn with_limits(limits: Limits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// The tokens recorded so far.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Consume the encoder, returning the recorded tokens.
    ///
    /// # Panics
    ///
    /// Panics if a structure is still open.
    pub fn into_tokens(self) -> Vec<Token> {
        assert!(
            self.scopes.is_empty(),
            "{} structure(s) still open",
            self.scopes.len()
        );
        self.tokens
    }

    fn before_value(&mut self) {
        if let Some(Scope::Object { awaiting_value, .. }) = self.scopes.last_mut() {
            assert!(
                *awaiting_value,
                "value written in object at {} without a key",
                self.path
            );
            *awaiting_value = false;
        }
    }

    fn after_value(&mut self) {
        if let Some(Scope::Array { index }) = self.scopes.last_mut() {
            *index += 1;
            self.path.replace_last(PathStep::Index(*index));
        }
    }

    fn scalar(&mut self, token: Token) -> Result<(), SerializeError> {
        self.before_value();
        self.tokens.push(token);
        self.after_value();
        Ok(())
    }

    fn open(&mut self, scope: Scope, token: Token) -> Result<(), SerializeError> {
        self.before_value();
        if !self.limits.enter() {
            return Err(SerializeError::DepthExceeded {
                limit: self.limits.maximum_depth(),
                path: self.path.to_string(),
            });
        }
        trace!("open {:?} at {}", scope, self.path);
        if matches!(scope, Scope::Array { .. }) {
            self.path.push(PathStep::Index(0));
        }
        self.scopes.push(scope);
        self.tokens.push(token);
        Ok(())
    }
}

impl Encoder for TokenEncoder {
    fn encode_array(&mut self) -> Result<&mut dyn Encoder, SerializeError> {
        self.open(Scope::Array { index: 0 }, Token::StartArray)?;
        Ok(self)
    }

    fn encode_object(&mut self) -> Result<&mut dyn Encoder, SerializeError> {
        self.open(
            Scope::Object {
                keyed: false,
                awaiting_value: false,
            },
            Token::StartObject,
        )?;
        Ok(self)
    }

    fn finish_structure(&mut self) -> Result<(), SerializeError> {
        let token = match self.scopes.pop() {
            Some(Scope::Array { .. }) => {
                self.path.pop();
                Token::EndArray
            }
            Some(Scope::Object {
                keyed,
                awaiting_value,
            }) => {
                assert!(
                    !awaiting_value,
                    "object at {} closed after a key without a value",
                    self.path
                );
                if keyed {
                    self.path.pop();
                }
                Token::EndObject
            }
            None => panic!("finish_structure called with no open structure"),
        };
        self.limits.leave();
        self.tokens.push(token);
        self.after_value();
        Ok(())
    }

    fn encode_key(&mut self, key: &str) -> Result<(), SerializeError> {
        match self.scopes.last_mut() {
            Some(Scope::Object {
                keyed,
                awaiting_value,
            }) => {
                assert!(!*awaiting_value, "key {key:?} written while a value is pending");
                *awaiting_value = true;
                if *keyed {
                    self.path.replace_last(PathStep::Key(key.to_owned()));
                } else {
                    *keyed = true;
                    self.path.push(PathStep::Key(key.to_owned()));
                }
            }
            _ => panic!("encode_key called outside of an object"),
        }
        self.tokens.push(Token::Key(key.to_owned()));
        Ok(())
    }

    fn encode_string(&mut self, value: &str) -> Result<(), SerializeError> {
        self.scalar(Token::String(value.to_owned()))
    }

    fn encode_bool(&mut self, value: bool) -> Result<(), SerializeError> {
        self.scalar(Token::Boolean(value))
    }

    fn encode_i64(&mut self, value: i64) -> Result<(), SerializeError> {
        self.scalar(Token::Number(Number::I64(value)))
    }

    fn encode_u64(&mut self, value: u64) -> Result<(), SerializeError> {
        self.scalar(Token::Number(Number::from(value)))
    }

    fn encode_f64(&mut self, value: f64) -> Result<(), SerializeError> {
        self.scalar(Token::Number(Number::F64(value)))
    }

    fn encode_big_int(&mut self, value: &BigInt) -> Result<(), SerializeError> {
        self.scalar(Token::Number(Number::BigInt(value.clone())))
    }

    fn encode_decimal(&mut self, value: &Decimal) -> Result<(), SerializeError> {
        self.scalar(Token::Number(Number::Decimal(*value)))
    }

    fn encode_null(&mut self) -> Result<(), SerializeError> {
        self.scalar(Token::Null)
    }

    fn current_path(&self) -> String {
        self.path.to_string()
    }
}
