use num_bigint::BigInt;
use rust_decimal::Decimal;

use crate::{Number, SerializeError, Value};

/// Push-style encoding contract that serializers program against.
///
/// Structures are written through a child scope borrowed from the parent, and
/// closed with [`finish_structure`](Encoder::finish_structure). Writing a
/// value in object context before its key is a caller bug and may panic.
pub trait Encoder {
    /// Open an array.
    fn encode_array(&mut self) -> Result<&mut dyn Encoder, SerializeError>;

    /// Open an object.
    fn encode_object(&mut self) -> Result<&mut dyn Encoder, SerializeError>;

    /// Close the innermost open structure.
    fn finish_structure(&mut self) -> Result<(), SerializeError>;

    /// Write an object key.
    fn encode_key(&mut self, key: &str) -> Result<(), SerializeError>;

    /// Write a string.
    fn encode_string(&mut self, value: &str) -> Result<(), SerializeError>;

    /// Write a boolean.
    fn encode_bool(&mut self, value: bool) -> Result<(), SerializeError>;

    /// Write an 8-bit integer.
    fn encode_i8(&mut self, value: i8) -> Result<(), SerializeError> {
        self.encode_i64(value.into())
    }

    /// Write a 16-bit integer.
    fn encode_i16(&mut self, value: i16) -> Result<(), SerializeError> {
        self.encode_i64(value.into())
    }

    /// Write a character.
    fn encode_char(&mut self, value: char) -> Result<(), SerializeError> {
        let mut buf = [0u8; 4];
        self.encode_string(value.encode_utf8(&mut buf))
    }

    /// Write a 32-bit integer.
    fn encode_i32(&mut self, value: i32) -> Result<(), SerializeError> {
        self.encode_i64(value.into())
    }

    /// Write a 64-bit integer.
    fn encode_i64(&mut self, value: i64) -> Result<(), SerializeError>;

    /// Write an unsigned 64-bit integer.
    fn encode_u64(&mut self, value: u64) -> Result<(), SerializeError>;

    /// Write a single-precision float.
    fn encode_f32(&mut self, value: f32) -> Result<(), SerializeError> {
        self.encode_f64(value.into())
    }

    /// Write a double-precision float.
    fn encode_f64(&mut self, value: f64) -> Result<(), SerializeError>;

    /// Write an arbitrary precision integer.
    fn encode_big_int(&mut self, value: &BigInt) -> Result<(), SerializeError>;

    /// Write an arbitrary precision decimal.
    fn encode_decimal(&mut self, value: &Decimal) -> Result<(), SerializeError>;

    /// Write `null`.
    fn encode_null(&mut self) -> Result<(), SerializeError>;

    /// The current position, rendered like `$.a[2]`.
    fn current_path(&self) -> String;

    /// Write a dynamic value. Nesting is bounded by the encoder's own depth
    /// limit.
    fn encode_value(&mut self, value: &Value) -> Result<(), SerializeError> {
        match value {
            Value::Null => self.encode_null(),
            Value::Bool(b) => self.encode_bool(*b),
            Value::Number(n) => encode_number(self, n),
            Value::String(s) => self.encode_string(s),
            Value::Array(items) => {
                let array = self.encode_array()?;
                for item in items {
                    array.encode_value(item)?;
                }
                array.finish_structure()
            }
            Value::Object(map) => {
                let object = self.encode_object()?;
                for (key, item) in map {
                    object.encode_key(key)?;
                    object.encode_value(item)?;
                }
                object.finish_structure()
            }
        }
    }
}

fn encode_number<E: Encoder + ?Sized>(encoder: &mut E, n: &Number) -> Result<(), SerializeError> {
    match n {
        Number::I64(v) => encoder.encode_i64(*v),
        Number::U64(v) => encoder.encode_u64(*v),
        Number::F64(v) => encoder.encode_f64(*v),
        Number::BigInt(v) => encoder.encode_big_int(v),
        Number::Decimal(v) => encoder.encode_decimal(v),
    }
}
