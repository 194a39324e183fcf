//! Serializer and deserializer traits, type-erased over `dyn Any`.

use core::any::{Any, type_name};
use core::marker::PhantomData;

use tessel_core::{Decoder, DeserializeError, Encoder, SerializeError};

use crate::{DecoderContext, EncoderContext};

/// Writes values of one type through an [`Encoder`].
pub trait Serializer: Send + Sync {
    /// Write `value`, which is of the type this serializer was registered
    /// for.
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        context: &mut EncoderContext<'_>,
        value: &dyn Any,
    ) -> Result<(), SerializeError>;

    /// Whether `value` counts as empty for [`Include::NonEmpty`](crate::Include::NonEmpty).
    fn is_empty(&self, context: &EncoderContext<'_>, value: &dyn Any) -> bool {
        let _ = (context, value);
        false
    }

    /// Whether `value` counts as absent for [`Include::NonAbsent`](crate::Include::NonAbsent).
    fn is_absent(&self, context: &EncoderContext<'_>, value: &dyn Any) -> bool {
        let _ = (context, value);
        false
    }
}

/// Reads values of one type from a [`Decoder`].
pub trait Deserializer: Send + Sync {
    /// Read one value. The result is boxed as the type this deserializer was
    /// registered for.
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        context: &mut DecoderContext<'_>,
    ) -> Result<Box<dyn Any>, DeserializeError>;

    /// Read one value, reporting a literal `null` as `None`.
    fn deserialize_nullable(
        &self,
        decoder: &mut dyn Decoder,
        context: &mut DecoderContext<'_>,
    ) -> Result<Option<Box<dyn Any>>, DeserializeError> {
        if decoder.decode_null()? {
            return Ok(None);
        }
        self.deserialize(decoder, context).map(Some)
    }
}

/// View `value` as a `T`, failing with the encoder's current path.
pub fn downcast<'a, T: Any>(
    value: &'a dyn Any,
    encoder: &dyn Encoder,
) -> Result<&'a T, SerializeError> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| SerializeError::TypeMismatch {
            expected: type_name::<T>(),
            path: encoder.current_path(),
        })
}

/// Take a deserialized value back out of its box.
pub fn unbox<T: Any>(value: Box<dyn Any>) -> Result<T, DeserializeError> {
    value.downcast::<T>().map(|v| *v).map_err(|_| {
        DeserializeError::custom(format!(
            "deserializer registered for {} produced a value of another type",
            type_name::<T>()
        ))
    })
}

/// A [`Serializer`] built from a typed closure.
pub struct FnSerializer<T, F> {
    write: F,
    is_empty: Option<fn(&T) -> bool>,
}

impl<T, F> FnSerializer<T, F>
where
    T: Any,
    F: Fn(&mut dyn Encoder, &mut EncoderContext<'_>, &T) -> Result<(), SerializeError>
        + Send
        + Sync,
{
    /// Wrap `write`.
    pub fn new(write: F) -> Self {
        Self {
            write,
            is_empty: None,
        }
    }

    /// Report emptiness for inclusion checks.
    pub fn with_is_empty(mut self, is_empty: fn(&T) -> bool) -> Self {
        self.is_empty = Some(is_empty);
        self
    }
}

impl<T, F> Serializer for FnSerializer<T, F>
where
    T: Any,
    F: Fn(&mut dyn Encoder, &mut EncoderContext<'_>, &T) -> Result<(), SerializeError>
        + Send
        + Sync,
{
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        context: &mut EncoderContext<'_>,
        value: &dyn Any,
    ) -> Result<(), SerializeError> {
        let value = downcast::<T>(value, encoder)?;
        (self.write)(encoder, context, value)
    }

    fn is_empty(&self, _context: &EncoderContext<'_>, value: &dyn Any) -> bool {
        match (self.is_empty, value.downcast_ref::<T>()) {
            (Some(is_empty), Some(value)) => is_empty(value),
            _ => false,
        }
    }
}

/// A [`Deserializer`] built from a typed closure.
pub struct FnDeserializer<T, F> {
    read: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> FnDeserializer<T, F>
where
    T: Any,
    F: Fn(&mut dyn Decoder, &mut DecoderContext<'_>) -> Result<T, DeserializeError> + Send + Sync,
{
    /// Wrap `read`.
    pub fn new(read: F) -> Self {
        Self {
            read,
            _marker: PhantomData,
        }
    }
}

impl<T, F> Deserializer for FnDeserializer<T, F>
where
    T: Any,
    F: Fn(&mut dyn Decoder, &mut DecoderContext<'_>) -> Result<T, DeserializeError> + Send + Sync,
{
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        context: &mut DecoderContext<'_>,
    ) -> Result<Box<dyn Any>, DeserializeError> {
        Ok(Box::new((self.read)(decoder, context)?))
    }
}
