use indexmap::IndexMap;
use num_bigint::BigInt;
use rust_decimal::Decimal;
use tessel_core::{
    Decoder, DeserializeError, DeserializeErrorKind, Limits, Path, PathStep, Token, TokenSource,
    Value,
};

use crate::buffer::TokenBuffer;
use crate::coercion::{self, Coerced};
use crate::tracing_macros::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StructureKind {
    Array,
    Object,
}

impl StructureKind {
    fn end_token(self) -> Token {
        match self {
            StructureKind::Array => Token::EndArray,
            StructureKind::Object => Token::EndObject,
        }
    }

    fn end_name(self) -> &'static str {
        match self {
            StructureKind::Array => "end of array",
            StructureKind::Object => "end of object",
        }
    }
}

#[derive(Debug)]
struct Structure {
    kind: StructureKind,
    /// Array elements consumed so far.
    index: usize,
    /// Whether a key step has been pushed onto the path for this object.
    keyed: bool,
}

/// Partially built container of [`Decoder::decode_arbitrary`].
enum Frame {
    List(Vec<Value>),
    Map {
        map: IndexMap<String, Value>,
        key: Option<String>,
    },
}

impl Frame {
    fn into_value(self) -> Value {
        match self {
            Frame::List(items) => Value::Array(items),
            Frame::Map { map, .. } => Value::Object(map),
        }
    }
}

/// A [`Decoder`] pulling tokens from a [`TokenSource`].
///
/// Child structures reuse this decoder: entering an array or object pushes a
/// frame onto an internal stack and consumes one level of the depth budget,
/// and [`Decoder::finish_structure`] pops it again.
pub struct StreamDecoder<S> {
    source: S,
    current: Option<Token>,
    limits: Limits,
    structures: Vec<Structure>,
    /// Set while decoding the single element of a `[value]` scalar.
    unwrapping: bool,
    path: Path,
}

impl<S: TokenSource> StreamDecoder<S> {
    /// Create a decoder with the default limits, reading the first token.
    pub fn new(source: S) -> Result<Self, DeserializeError> {
        Self::with_limits(source, Limits::default())
    }

    /// Create a decoder with the given limits, reading the first token.
    pub fn with_limits(mut source: S, limits: Limits) -> Result<Self, DeserializeError> {
        let current = source.next_token()?;
        trace!("first token: {:?}", current);
        Ok(Self {
            source,
            current,
            limits,
            structures: Vec::new(),
            unwrapping: false,
            path: Path::new(),
        })
    }

    /// The token at the current position, if any.
    pub fn peek(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// The depth budget left.
    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Check that the whole input was consumed.
    pub fn end(&self) -> Result<(), DeserializeError> {
        match &self.current {
            None if self.structures.is_empty() => Ok(()),
            None => Err(self.eof(self.structures_end_name())),
            Some(token) => Err(self.unexpected("end of input", token)),
        }
    }

    /// Consume the decoder, returning the token source.
    pub fn into_source(self) -> S {
        self.source
    }

    fn structures_end_name(&self) -> &'static str {
        self.structures
            .last()
            .map_or("end of input", |s| s.kind.end_name())
    }

    fn advance(&mut self) -> Result<(), DeserializeError> {
        self.current = self
            .source
            .next_token()
            .map_err(|e| e.with_path(&self.path))?;
        trace!("next token: {:?}", self.current);
        Ok(())
    }

    fn current_token(&self, expected: &'static str) -> Result<&Token, DeserializeError> {
        self.current.as_ref().ok_or_else(|| self.eof(expected))
    }

    fn eof(&self, expected: &'static str) -> DeserializeError {
        DeserializeError::new(DeserializeErrorKind::UnexpectedEof { expected }).with_path(&self.path)
    }

    fn unexpected(&self, expected: &'static str, got: &Token) -> DeserializeError {
        DeserializeError::new(DeserializeErrorKind::UnexpectedToken {
            expected,
            got: got.to_string(),
        })
        .with_path(&self.path)
    }

    fn unexpected_current(&self, expected: &'static str) -> DeserializeError {
        match &self.current {
            Some(token) => self.unexpected(expected, token),
            None => self.eof(expected),
        }
    }

    /// A value may only be decoded once its key has been consumed.
    fn pre_decode_value(&self) {
        if let Some(Token::Key(key)) = &self.current {
            panic!("Haven't parsed field name yet: decode the key {key:?} before its value");
        }
    }

    /// Bookkeeping after a complete value: advance the array index.
    fn value_consumed(&mut self) {
        if self.unwrapping {
            return;
        }
        if let Some(top) = self.structures.last_mut()
            && top.kind == StructureKind::Array
        {
            top.index += 1;
            self.path.replace_last(PathStep::Index(top.index));
        }
    }

    fn begin(&mut self, kind: StructureKind) -> Result<(), DeserializeError> {
        self.pre_decode_value();
        let (start, expected) = match kind {
            StructureKind::Array => (Token::StartArray, "array"),
            StructureKind::Object => (Token::StartObject, "object"),
        };
        if self.current.as_ref() != Some(&start) {
            return Err(self.unexpected_current(expected));
        }
        if !self.limits.enter() {
            debug!("depth limit reached at {}", self.path);
            return Err(DeserializeError::new(DeserializeErrorKind::DepthExceeded {
                limit: self.limits.maximum_depth(),
            })
            .with_path(&self.path));
        }
        trace!("enter {:?} at {}", kind, self.path);
        self.structures.push(Structure {
            kind,
            index: 0,
            keyed: false,
        });
        if kind == StructureKind::Array {
            self.path.push(PathStep::Index(0));
        }
        self.advance()
    }

    /// Decode a scalar through `coerce`, unwrapping `[value]` once.
    fn decode_scalar<T>(
        &mut self,
        expected: &'static str,
        coerce: fn(&Token) -> Coerced<T>,
    ) -> Result<T, DeserializeError> {
        self.pre_decode_value();
        let outcome = coerce(self.current_token(expected)?);
        match outcome {
            Ok(Some(value)) => {
                self.advance()?;
                self.value_consumed();
                Ok(value)
            }
            Err(failure) => Err(DeserializeError::from(failure).with_path(&self.path)),
            Ok(None) => {
                if !self.unwrapping && self.current == Some(Token::StartArray) {
                    self.decode_unwrapped(expected, coerce)
                } else {
                    Err(self.unexpected_current(expected))
                }
            }
        }
    }

    fn decode_unwrapped<T>(
        &mut self,
        expected: &'static str,
        coerce: fn(&Token) -> Coerced<T>,
    ) -> Result<T, DeserializeError> {
        trace!("unwrapping single element array for {}", expected);
        self.advance()?;
        self.unwrapping = true;
        let result = self.decode_scalar(expected, coerce);
        self.unwrapping = false;
        let value = result?;
        match &self.current {
            Some(Token::EndArray) => {
                self.advance()?;
                self.value_consumed();
                Ok(value)
            }
            Some(_) => Err(
                DeserializeError::new(DeserializeErrorKind::MultipleValues { expected })
                    .with_path(&self.path),
            ),
            None => Err(self.eof("end of array")),
        }
    }

    /// Read the next key of the innermost object, or `None` at its end.
    /// A stray value token is reported as malformed input.
    fn next_key(&mut self) -> Result<Option<String>, DeserializeError> {
        let key = match self.current.take() {
            Some(Token::Key(key)) => key,
            Some(Token::EndObject) => {
                self.current = Some(Token::EndObject);
                return Ok(None);
            }
            None => return Err(self.eof("key")),
            Some(other) => {
                let err = self.unexpected("key", &other);
                self.current = Some(other);
                return Err(err);
            }
        };
        if let Some(top) = self.structures.last_mut() {
            if top.keyed {
                self.path.replace_last(PathStep::Key(key.clone()));
            } else {
                top.keyed = true;
                self.path.push(PathStep::Key(key.clone()));
            }
        }
        self.advance()?;
        Ok(Some(key))
    }

    fn take_scalar(&mut self) -> Result<Value, DeserializeError> {
        let value = match self.current.take() {
            Some(Token::Null) => Value::Null,
            Some(Token::Boolean(b)) => Value::Bool(b),
            Some(Token::Number(n)) => Value::Number(n),
            Some(Token::String(s)) => Value::String(s),
            other => {
                let err = match &other {
                    Some(token) => self.unexpected("value", token),
                    None => self.eof("value"),
                };
                self.current = other;
                return Err(err);
            }
        };
        self.advance()?;
        self.value_consumed();
        Ok(value)
    }
}

impl<S: TokenSource> Decoder for StreamDecoder<S> {
    fn decode_array(&mut self) -> Result<&mut dyn Decoder, DeserializeError> {
        self.begin(StructureKind::Array)?;
        Ok(self)
    }

    fn decode_object(&mut self) -> Result<&mut dyn Decoder, DeserializeError> {
        self.begin(StructureKind::Object)?;
        Ok(self)
    }

    fn has_next_array_value(&mut self) -> bool {
        !matches!(self.current, Some(Token::EndArray) | None)
    }

    fn decode_key(&mut self) -> Result<Option<String>, DeserializeError> {
        let Some(top) = self.structures.last() else {
            panic!("decode_key called outside of an object");
        };
        assert!(
            top.kind == StructureKind::Object,
            "decode_key called inside an array"
        );
        if let Some(token) = &self.current
            && !matches!(token, Token::Key(_) | Token::EndObject)
        {
            panic!("Expected a key but found {token}: the previous value was not consumed");
        }
        self.next_key()
    }

    fn decode_string(&mut self) -> Result<String, DeserializeError> {
        self.decode_scalar("string", coercion::to_string)
    }

    fn decode_bool(&mut self) -> Result<bool, DeserializeError> {
        self.decode_scalar("boolean", coercion::to_bool)
    }

    fn decode_i8(&mut self) -> Result<i8, DeserializeError> {
        self.decode_scalar("byte", coercion::to_i8)
    }

    fn decode_i16(&mut self) -> Result<i16, DeserializeError> {
        self.decode_scalar("short", coercion::to_i16)
    }

    fn decode_char(&mut self) -> Result<char, DeserializeError> {
        self.decode_scalar("char", coercion::to_char)
    }

    fn decode_i32(&mut self) -> Result<i32, DeserializeError> {
        self.decode_scalar("integer", coercion::to_i32)
    }

    fn decode_i64(&mut self) -> Result<i64, DeserializeError> {
        self.decode_scalar("long", coercion::to_i64)
    }

    fn decode_u64(&mut self) -> Result<u64, DeserializeError> {
        self.decode_scalar("unsigned long", coercion::to_u64)
    }

    fn decode_f32(&mut self) -> Result<f32, DeserializeError> {
        self.decode_scalar("float", coercion::to_f32)
    }

    fn decode_f64(&mut self) -> Result<f64, DeserializeError> {
        self.decode_scalar("double", coercion::to_f64)
    }

    fn decode_big_int(&mut self) -> Result<BigInt, DeserializeError> {
        self.decode_scalar("big integer", coercion::to_big_int)
    }

    fn decode_decimal(&mut self) -> Result<Decimal, DeserializeError> {
        self.decode_scalar("big decimal", coercion::to_decimal)
    }

    fn decode_null(&mut self) -> Result<bool, DeserializeError> {
        self.pre_decode_value();
        if self.current == Some(Token::Null) {
            self.advance()?;
            self.value_consumed();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn decode_arbitrary(&mut self) -> Result<Value, DeserializeError> {
        enum Step {
            Close,
            Value,
        }

        self.pre_decode_value();
        let mut stack: Vec<Frame> = Vec::new();
        loop {
            let step = match stack.last_mut() {
                Some(Frame::Map { key, .. }) if key.is_none() => match self.next_key()? {
                    Some(k) => {
                        *key = Some(k);
                        continue;
                    }
                    None => Step::Close,
                },
                Some(Frame::List(_)) if !self.has_next_array_value() => Step::Close,
                _ => Step::Value,
            };

            let completed = match step {
                Step::Close => {
                    self.finish_structure(false)?;
                    match stack.pop() {
                        Some(frame) => frame.into_value(),
                        None => unreachable!("closing a structure with no open frame"),
                    }
                }
                Step::Value => match self.current_token("value")? {
                    Token::StartArray => {
                        self.begin(StructureKind::Array)?;
                        stack.push(Frame::List(Vec::new()));
                        continue;
                    }
                    Token::StartObject => {
                        self.begin(StructureKind::Object)?;
                        stack.push(Frame::Map {
                            map: IndexMap::new(),
                            key: None,
                        });
                        continue;
                    }
                    _ => self.take_scalar()?,
                },
            };

            match stack.last_mut() {
                None => return Ok(completed),
                Some(Frame::List(items)) => items.push(completed),
                Some(Frame::Map { map, key }) => {
                    if let Some(key) = key.take() {
                        map.insert(key, completed);
                    }
                }
            }
        }
    }

    fn decode_buffer(&mut self) -> Result<Box<dyn Decoder>, DeserializeError> {
        self.pre_decode_value();
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        loop {
            let token = match self.current.take() {
                Some(token) => token,
                None => return Err(self.eof("value")),
            };
            match &token {
                Token::StartArray | Token::StartObject => depth += 1,
                Token::EndArray | Token::EndObject if depth == 0 => {
                    let err = self.unexpected("value", &token);
                    self.current = Some(token);
                    return Err(err);
                }
                Token::EndArray | Token::EndObject => depth -= 1,
                _ => {}
            }
            tokens.push(token);
            self.advance()?;
            if depth == 0 {
                break;
            }
        }
        trace!("buffered {} tokens at {}", tokens.len(), self.path);

        let mut buffered = StreamDecoder::with_limits(TokenBuffer::new(tokens), self.limits)?;
        buffered.path = self.path.clone();
        self.value_consumed();
        Ok(Box::new(buffered))
    }

    fn skip_value(&mut self) -> Result<(), DeserializeError> {
        self.pre_decode_value();
        let mut depth = 0usize;
        loop {
            match self.current_token("value")? {
                Token::StartArray | Token::StartObject => depth += 1,
                Token::EndArray | Token::EndObject if depth == 0 => {
                    return Err(self.unexpected_current("value"));
                }
                Token::EndArray | Token::EndObject => depth -= 1,
                _ => {}
            }
            self.advance()?;
            if depth == 0 {
                break;
            }
        }
        self.value_consumed();
        Ok(())
    }

    fn finish_structure(&mut self, consume_left_elements: bool) -> Result<(), DeserializeError> {
        let Some(kind) = self.structures.last().map(|s| s.kind) else {
            panic!("finish_structure called with no open structure");
        };

        if consume_left_elements {
            match kind {
                StructureKind::Array => {
                    while self.has_next_array_value() {
                        self.skip_value()?;
                    }
                }
                StructureKind::Object => {
                    while self.next_key()?.is_some() {
                        trace!("skipping left over value at {}", self.path);
                        self.skip_value()?;
                    }
                }
            }
        }

        match &self.current {
            Some(token) if *token == kind.end_token() => {}
            None => return Err(self.eof(kind.end_name())),
            Some(token) => panic!(
                "Not all elements have been consumed yet: expected {} but found {token}",
                kind.end_name()
            ),
        }

        if let Some(structure) = self.structures.pop()
            && (structure.kind == StructureKind::Array || structure.keyed)
        {
            self.path.pop();
        }
        self.limits.leave();
        trace!("leave {:?} at {}", kind, self.path);
        self.advance()?;
        self.value_consumed();
        Ok(())
    }

    fn create_deserialization_error(
        &self,
        message: &str,
        invalid_value: Option<&str>,
    ) -> DeserializeError {
        let err = DeserializeError::custom(message).with_path(&self.path);
        match invalid_value {
            Some(value) => err.with_invalid_value(value),
            None => err,
        }
    }

    fn current_path(&self) -> String {
        self.path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_core::{IterSource, Number};
    use tessel_testhelpers::test;

    fn decoder(tokens: Vec<Token>) -> StreamDecoder<IterSource<std::vec::IntoIter<Token>>> {
        StreamDecoder::new(IterSource::new(tokens)).unwrap()
    }

    fn int(v: i64) -> Token {
        Token::Number(Number::I64(v))
    }

    #[test]
    fn key_sentinel_does_not_advance() {
        let mut d = decoder(vec![Token::StartObject, Token::EndObject]);
        let obj = d.decode_object().unwrap();
        assert_eq!(obj.decode_key().unwrap(), None);
        assert_eq!(obj.decode_key().unwrap(), None);
        obj.finish_structure(false).unwrap();
        d.end().unwrap();
    }

    #[test]
    #[should_panic(expected = "Haven't parsed field name yet")]
    fn value_before_key_panics() {
        let mut d = decoder(vec![
            Token::StartObject,
            Token::Key("a".into()),
            int(1),
            Token::EndObject,
        ]);
        let obj = d.decode_object().unwrap();
        let _ = obj.decode_i32();
    }

    #[test]
    #[should_panic(expected = "Not all elements have been consumed yet")]
    fn finish_with_leftovers_panics() {
        let mut d = decoder(vec![Token::StartArray, int(1), Token::EndArray]);
        let arr = d.decode_array().unwrap();
        let _ = arr.finish_structure(false);
    }

    #[test]
    fn finish_can_drain() {
        let mut d = decoder(vec![
            Token::StartObject,
            Token::Key("a".into()),
            Token::StartArray,
            int(1),
            Token::StartObject,
            Token::EndObject,
            Token::EndArray,
            Token::Key("b".into()),
            int(2),
            Token::EndObject,
        ]);
        let obj = d.decode_object().unwrap();
        obj.finish_structure(true).unwrap();
        d.end().unwrap();
        assert_eq!(d.limits().remaining_depth(), d.limits().maximum_depth());
    }

    #[test]
    fn path_tracks_keys_and_indices() {
        let mut d = decoder(vec![
            Token::StartObject,
            Token::Key("items".into()),
            Token::StartArray,
            int(1),
            Token::String("x".into()),
            Token::EndArray,
            Token::EndObject,
        ]);
        let obj = d.decode_object().unwrap();
        obj.decode_key().unwrap();
        let arr = obj.decode_array().unwrap();
        assert_eq!(arr.current_path(), "$.items[0]");
        arr.decode_i32().unwrap();
        assert_eq!(arr.current_path(), "$.items[1]");
        let err = arr.decode_i32().unwrap_err();
        assert_eq!(err.path.as_deref(), Some("$.items[1]"));
    }

    #[test]
    fn unwrap_restores_state() {
        let mut d = decoder(vec![
            Token::StartArray,
            Token::StartArray,
            int(5),
            Token::EndArray,
            int(6),
            Token::EndArray,
        ]);
        let arr = d.decode_array().unwrap();
        assert_eq!(arr.decode_i32().unwrap(), 5);
        assert_eq!(arr.current_path(), "$[1]");
        assert_eq!(arr.decode_i32().unwrap(), 6);
        arr.finish_structure(false).unwrap();
    }

    #[test]
    fn arbitrary_keeps_order_and_kinds() {
        let mut d = decoder(vec![
            Token::StartObject,
            Token::Key("z".into()),
            int(1),
            Token::Key("a".into()),
            Token::StartArray,
            Token::Null,
            Token::Boolean(true),
            Token::EndArray,
            Token::EndObject,
        ]);
        let value = d.decode_arbitrary().unwrap();
        assert_eq!(value.to_string(), r#"{"z":1,"a":[null,true]}"#);
        d.end().unwrap();
    }

    #[test]
    fn arbitrary_rejects_other_tokens() {
        let mut d = decoder(vec![Token::Other("0x1F".into())]);
        let err = d.decode_arbitrary().unwrap_err();
        assert_eq!(
            err.kind,
            DeserializeErrorKind::UnexpectedToken {
                expected: "value",
                got: "other \"0x1F\"".into()
            }
        );
    }

    #[test]
    fn stray_values_in_key_position_are_errors() {
        let mut d = decoder(vec![Token::StartObject, int(1), Token::EndObject]);
        let err = d.decode_arbitrary().unwrap_err();
        assert_eq!(
            err.kind,
            DeserializeErrorKind::UnexpectedToken {
                expected: "key",
                got: "number 1".into()
            }
        );

        let mut d = decoder(vec![
            Token::StartObject,
            Token::Key("a".into()),
            int(1),
            int(2),
            Token::EndObject,
        ]);
        let obj = d.decode_object().unwrap();
        let err = obj.finish_structure(true).unwrap_err();
        assert!(matches!(
            err.kind,
            DeserializeErrorKind::UnexpectedToken { expected: "key", .. }
        ));
        assert_eq!(err.path.as_deref(), Some("$.a"));
    }

    #[test]
    #[should_panic(expected = "the previous value was not consumed")]
    fn key_before_value_is_consumed_panics() {
        let mut d = decoder(vec![
            Token::StartObject,
            Token::Key("a".into()),
            int(1),
            Token::EndObject,
        ]);
        let obj = d.decode_object().unwrap();
        obj.decode_key().unwrap();
        let _ = obj.decode_key();
    }
}
