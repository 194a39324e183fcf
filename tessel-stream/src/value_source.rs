use tessel_core::{DeserializeError, Token, TokenSource, Value};

enum Pending {
    Value(Value),
    Array(std::vec::IntoIter<Value>),
    Object(indexmap::map::IntoIter<String, Value>),
}

/// Replays a [`Value`] tree as tokens, without recursion.
pub struct ValueSource {
    stack: Vec<Pending>,
}

impl ValueSource {
    /// Tokens for `value`.
    pub fn new(value: Value) -> Self {
        Self {
            stack: vec![Pending::Value(value)],
        }
    }
}

impl TokenSource for ValueSource {
    fn next_token(&mut self) -> Result<Option<Token>, DeserializeError> {
        let token = match self.stack.pop() {
            None => return Ok(None),
            Some(Pending::Value(value)) => match value {
                Value::Null => Token::Null,
                Value::Bool(b) => Token::Boolean(b),
                Value::Number(n) => Token::Number(n),
                Value::String(s) => Token::String(s),
                Value::Array(items) => {
                    self.stack.push(Pending::Array(items.into_iter()));
                    Token::StartArray
                }
                Value::Object(map) => {
                    self.stack.push(Pending::Object(map.into_iter()));
                    Token::StartObject
                }
            },
            Some(Pending::Array(mut items)) => match items.next() {
                Some(item) => {
                    self.stack.push(Pending::Array(items));
                    self.stack.push(Pending::Value(item));
                    return self.next_token();
                }
                None => Token::EndArray,
            },
            Some(Pending::Object(mut members)) => match members.next() {
                Some((key, item)) => {
                    self.stack.push(Pending::Object(members));
                    self.stack.push(Pending::Value(item));
                    Token::Key(key)
                }
                None => Token::EndObject,
            },
        };
        Ok(Some(token))
    }
}
