#![allow(dead_code)]

use core::any::Any;

use tessel_bean::{DecoderContext, DefaultRegistry, Deserializer, EncoderContext, Registry, Serializer, TypeKey, unbox};
use tessel_core::{Decoder, DeserializeError, IterSource, SerializeError, Token};
use tessel_stream::{StreamDecoder, TokenEncoder};
use tessel_testhelpers::tokens;

/// Serialize `value` and render the result as compact JSON.
pub fn write<T: Any>(registry: &DefaultRegistry, value: &T) -> Result<String, SerializeError> {
    write_in(registry, EncoderContext::new(registry), value)
}

/// Like [`write`], with a prepared context.
pub fn write_in<T: Any>(
    registry: &DefaultRegistry,
    mut context: EncoderContext<'_>,
    value: &T,
) -> Result<String, SerializeError> {
    let serializer = registry.find_serializer(TypeKey::of::<T>())?;
    let mut encoder = TokenEncoder::with_limits(registry.config().limits());
    serializer.serialize(&mut encoder, &mut context, value)?;
    let mut decoder = StreamDecoder::new(IterSource::new(encoder.into_tokens()))
        .expect("recorded tokens start a value");
    let value = decoder
        .decode_arbitrary()
        .expect("recorded tokens form a value");
    Ok(value.to_string())
}

/// Deserialize exactly one `T` from JSON text.
pub fn read<T: Any>(registry: &DefaultRegistry, json: &str) -> Result<T, DeserializeError> {
    read_tokens(registry, tokens(json))
}

/// Deserialize exactly one `T` from a token stream.
pub fn read_tokens<T: Any>(
    registry: &DefaultRegistry,
    tokens: Vec<Token>,
) -> Result<T, DeserializeError> {
    let deserializer = registry.find_deserializer(TypeKey::of::<T>())?;
    let mut decoder =
        StreamDecoder::with_limits(IterSource::new(tokens), registry.config().limits())?;
    let mut context = DecoderContext::new(registry);
    let value = deserializer.deserialize(&mut decoder, &mut context)?;
    decoder.end()?;
    unbox(value)
}
