use num_bigint::BigInt;
use rust_decimal::Decimal;

use crate::{DeserializeError, Value};

/// Pull-style decoding contract that deserializers program against.
///
/// Structures are decoded through a child scope borrowed from the parent:
/// [`decode_array`](Decoder::decode_array) and
/// [`decode_object`](Decoder::decode_object) return a `&mut dyn Decoder` that
/// must be closed with [`finish_structure`](Decoder::finish_structure) before
/// the parent is used again. The borrow checker enforces the "no parent use
/// while a child is open" rule; the remaining state rules (no value decode
/// before the key is consumed, no finish with undrained elements) panic when
/// broken, since they indicate a bug in the caller rather than bad input.
///
/// Every scalar decoder accepts the value wrapped in a one-element array
/// (`[5]` for `5`), but not `[null]`, not nested arrays and not arrays of more
/// than one element.
pub trait Decoder {
    /// Enter the array at the current position.
    fn decode_array(&mut self) -> Result<&mut dyn Decoder, DeserializeError>;

    /// Enter the object at the current position.
    fn decode_object(&mut self) -> Result<&mut dyn Decoder, DeserializeError>;

    /// Whether the current array has another element.
    fn has_next_array_value(&mut self) -> bool;

    /// The next key of the current object, or `None` once the end of the
    /// object is reached. The end token itself is left for
    /// [`finish_structure`](Decoder::finish_structure).
    fn decode_key(&mut self) -> Result<Option<String>, DeserializeError>;

    /// Decode a string. Numbers, booleans and format-specific scalars are
    /// rendered to their textual form.
    fn decode_string(&mut self) -> Result<String, DeserializeError>;

    /// Decode a boolean.
    fn decode_bool(&mut self) -> Result<bool, DeserializeError>;

    /// Decode an 8-bit integer.
    fn decode_i8(&mut self) -> Result<i8, DeserializeError>;

    /// Decode a 16-bit integer.
    fn decode_i16(&mut self) -> Result<i16, DeserializeError>;

    /// Decode a character.
    fn decode_char(&mut self) -> Result<char, DeserializeError>;

    /// Decode a 32-bit integer.
    fn decode_i32(&mut self) -> Result<i32, DeserializeError>;

    /// Decode a 64-bit integer.
    fn decode_i64(&mut self) -> Result<i64, DeserializeError>;

    /// Decode an unsigned 64-bit integer.
    fn decode_u64(&mut self) -> Result<u64, DeserializeError>;

    /// Decode a single-precision float.
    fn decode_f32(&mut self) -> Result<f32, DeserializeError>;

    /// Decode a double-precision float.
    fn decode_f64(&mut self) -> Result<f64, DeserializeError>;

    /// Decode an arbitrary precision integer. Unparseable strings yield zero.
    fn decode_big_int(&mut self) -> Result<BigInt, DeserializeError>;

    /// Decode an arbitrary precision decimal. Unparseable strings yield zero;
    /// numbers a [`Decimal`] cannot hold are an error.
    fn decode_decimal(&mut self) -> Result<Decimal, DeserializeError>;

    /// Consume a `null` if there is one. Never unwraps `[null]`.
    fn decode_null(&mut self) -> Result<bool, DeserializeError>;

    /// Decode whatever value is at the current position.
    fn decode_arbitrary(&mut self) -> Result<Value, DeserializeError>;

    /// Materialize the current value into memory and return an independent
    /// decoder over the copy. This decoder moves past the value.
    fn decode_buffer(&mut self) -> Result<Box<dyn Decoder>, DeserializeError>;

    /// Skip the value at the current position, including nested structures.
    fn skip_value(&mut self) -> Result<(), DeserializeError>;

    /// Close the current structure. With `consume_left_elements` the
    /// remaining elements are skipped first; without it the structure must
    /// already be drained.
    fn finish_structure(&mut self, consume_left_elements: bool) -> Result<(), DeserializeError>;

    /// Build an error located at the current position.
    fn create_deserialization_error(
        &self,
        message: &str,
        invalid_value: Option<&str>,
    ) -> DeserializeError;

    /// The current position, rendered like `$.a[2]`.
    fn current_path(&self) -> String;
}
