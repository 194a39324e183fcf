//! Serdes for scalars and the standard containers.

use core::any::{Any, type_name};
use core::marker::PhantomData;
use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexMap;
use num_bigint::BigInt;
use rust_decimal::Decimal;
use tessel_core::{
    Decoder, DeserializeError, DeserializeErrorKind, Encoder, SerializeError, Value,
};

use crate::codec::{downcast, unbox};
use crate::{DecoderContext, DefaultRegistry, Deserializer, EncoderContext, Serializer, TypeKey};

/// A scalar handled by two plain functions.
struct ScalarSerde<T> {
    encode: fn(&mut dyn Encoder, &T) -> Result<(), SerializeError>,
    decode: fn(&mut dyn Decoder) -> Result<T, DeserializeError>,
    is_empty: fn(&T) -> bool,
}

impl<T: Any> Serializer for ScalarSerde<T> {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        _context: &mut EncoderContext<'_>,
        value: &dyn Any,
    ) -> Result<(), SerializeError> {
        let value = downcast::<T>(value, encoder)?;
        (self.encode)(encoder, value)
    }

    fn is_empty(&self, _context: &EncoderContext<'_>, value: &dyn Any) -> bool {
        value.downcast_ref::<T>().is_some_and(self.is_empty)
    }
}

impl<T: Any> Deserializer for ScalarSerde<T> {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        _context: &mut DecoderContext<'_>,
    ) -> Result<Box<dyn Any>, DeserializeError> {
        Ok(Box::new((self.decode)(decoder)?))
    }
}

fn scalar<T: Any>(
    registry: &DefaultRegistry,
    encode: fn(&mut dyn Encoder, &T) -> Result<(), SerializeError>,
    decode: fn(&mut dyn Decoder) -> Result<T, DeserializeError>,
) {
    registry.register_serde::<T, _>(ScalarSerde {
        encode,
        decode,
        is_empty: |_| false,
    });
}

fn unsigned<T: TryFrom<u64>>(decoder: &mut dyn Decoder) -> Result<T, DeserializeError> {
    let value = decoder.decode_u64()?;
    T::try_from(value).map_err(|_| {
        decoder.create_deserialization_error(
            &format!("Value out of range for {}", type_name::<T>()),
            Some(&value.to_string()),
        )
    })
}

/// The `Value` serde: nulls count as absent, empty containers as empty.
struct ValueSerde;

impl Serializer for ValueSerde {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        _context: &mut EncoderContext<'_>,
        value: &dyn Any,
    ) -> Result<(), SerializeError> {
        let value = downcast::<Value>(value, encoder)?;
        encoder.encode_value(value)
    }

    fn is_empty(&self, _context: &EncoderContext<'_>, value: &dyn Any) -> bool {
        value.downcast_ref::<Value>().is_some_and(Value::is_empty)
    }

    fn is_absent(&self, _context: &EncoderContext<'_>, value: &dyn Any) -> bool {
        value.downcast_ref::<Value>().is_some_and(Value::is_null)
    }
}

impl Deserializer for ValueSerde {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        _context: &mut DecoderContext<'_>,
    ) -> Result<Box<dyn Any>, DeserializeError> {
        Ok(Box::new(decoder.decode_arbitrary()?))
    }

    fn deserialize_nullable(
        &self,
        decoder: &mut dyn Decoder,
        context: &mut DecoderContext<'_>,
    ) -> Result<Option<Box<dyn Any>>, DeserializeError> {
        self.deserialize(decoder, context).map(Some)
    }
}

pub(crate) fn install(registry: &DefaultRegistry) {
    scalar::<bool>(registry, |e, v| e.encode_bool(*v), |d| d.decode_bool());
    scalar::<i8>(registry, |e, v| e.encode_i8(*v), |d| d.decode_i8());
    scalar::<i16>(registry, |e, v| e.encode_i16(*v), |d| d.decode_i16());
    scalar::<i32>(registry, |e, v| e.encode_i32(*v), |d| d.decode_i32());
    scalar::<i64>(registry, |e, v| e.encode_i64(*v), |d| d.decode_i64());
    scalar::<u8>(registry, |e, v| e.encode_u64((*v).into()), unsigned::<u8>);
    scalar::<u16>(registry, |e, v| e.encode_u64((*v).into()), unsigned::<u16>);
    scalar::<u32>(registry, |e, v| e.encode_u64((*v).into()), unsigned::<u32>);
    scalar::<u64>(registry, |e, v| e.encode_u64(*v), |d| d.decode_u64());
    scalar::<usize>(registry, |e, v| e.encode_u64(*v as u64), unsigned::<usize>);
    scalar::<f32>(registry, |e, v| e.encode_f32(*v), |d| d.decode_f32());
    scalar::<f64>(registry, |e, v| e.encode_f64(*v), |d| d.decode_f64());
    scalar::<char>(registry, |e, v| e.encode_char(*v), |d| d.decode_char());
    scalar::<BigInt>(registry, |e, v| e.encode_big_int(v), |d| d.decode_big_int());
    scalar::<Decimal>(registry, |e, v| e.encode_decimal(v), |d| d.decode_decimal());
    registry.register_serde::<String, _>(ScalarSerde::<String> {
        encode: |e, v| e.encode_string(v),
        decode: |d| d.decode_string(),
        is_empty: String::is_empty,
    });
    registry.register_serde::<Value, _>(ValueSerde);
    registry.register_map::<Value>();
    registry.register_list::<Value>();
}

fn null_element<T>(decoder: &dyn Decoder) -> DeserializeError {
    DeserializeError::new(DeserializeErrorKind::UnexpectedNull {
        type_name: type_name::<T>(),
    })
    .with_path(decoder.current_path())
}

/// `Vec<T>` as an array.
pub(crate) struct ListSerde<T>(PhantomData<fn() -> T>);

impl<T> ListSerde<T> {
    pub(crate) fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: Any> Serializer for ListSerde<T> {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        context: &mut EncoderContext<'_>,
        value: &dyn Any,
    ) -> Result<(), SerializeError> {
        let items = downcast::<Vec<T>>(value, encoder)?;
        let element = context.registry().find_serializer(TypeKey::of::<T>())?;
        let array = encoder.encode_array()?;
        for item in items {
            element.serialize(array, context, item)?;
        }
        array.finish_structure()
    }

    fn is_empty(&self, _context: &EncoderContext<'_>, value: &dyn Any) -> bool {
        value.downcast_ref::<Vec<T>>().is_some_and(Vec::is_empty)
    }
}

impl<T: Any> Deserializer for ListSerde<T> {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        context: &mut DecoderContext<'_>,
    ) -> Result<Box<dyn Any>, DeserializeError> {
        let element = context.registry().find_deserializer(TypeKey::of::<T>())?;
        let threshold = context.config().array_size_threshold.max(1);
        let array = decoder.decode_array()?;
        let mut items: Vec<T> = Vec::new();
        while array.has_next_array_value() {
            if items.len() == items.capacity() {
                items.reserve(items.len().clamp(1, threshold));
            }
            match element.deserialize_nullable(array, context)? {
                Some(item) => items.push(unbox::<T>(item)?),
                None => return Err(null_element::<T>(array)),
            }
        }
        array.finish_structure(false)?;
        Ok(Box::new(items))
    }
}

/// A map keyed by strings.
pub(crate) trait StringMap: Any + Default {
    type Item: Any;

    fn entries(&self) -> impl Iterator<Item = (&String, &Self::Item)>;

    fn insert_entry(&mut self, key: String, value: Self::Item);

    fn is_empty(&self) -> bool;
}

impl<V: Any> StringMap for IndexMap<String, V> {
    type Item = V;

    fn entries(&self) -> impl Iterator<Item = (&String, &V)> {
        self.iter()
    }

    fn insert_entry(&mut self, key: String, value: V) {
        self.insert(key, value);
    }

    fn is_empty(&self) -> bool {
        IndexMap::is_empty(self)
    }
}

impl<V: Any> StringMap for BTreeMap<String, V> {
    type Item = V;

    fn entries(&self) -> impl Iterator<Item = (&String, &V)> {
        self.iter()
    }

    fn insert_entry(&mut self, key: String, value: V) {
        self.insert(key, value);
    }

    fn is_empty(&self) -> bool {
        BTreeMap::is_empty(self)
    }
}

/// A string-keyed map as an object.
pub(crate) struct MapSerde<M>(PhantomData<fn() -> M>);

impl<M> MapSerde<M> {
    pub(crate) fn new() -> Self {
        Self(PhantomData)
    }
}

impl<M: StringMap> Serializer for MapSerde<M> {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        context: &mut EncoderContext<'_>,
        value: &dyn Any,
    ) -> Result<(), SerializeError> {
        let map = downcast::<M>(value, encoder)?;
        let item = context.registry().find_serializer(TypeKey::of::<M::Item>())?;
        let object = encoder.encode_object()?;
        for (key, value) in map.entries() {
            object.encode_key(key)?;
            item.serialize(object, context, value)?;
        }
        object.finish_structure()
    }

    fn is_empty(&self, _context: &EncoderContext<'_>, value: &dyn Any) -> bool {
        value.downcast_ref::<M>().is_some_and(StringMap::is_empty)
    }
}

impl<M: StringMap> Deserializer for MapSerde<M> {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        context: &mut DecoderContext<'_>,
    ) -> Result<Box<dyn Any>, DeserializeError> {
        let item = context.registry().find_deserializer(TypeKey::of::<M::Item>())?;
        let object = decoder.decode_object()?;
        let mut map = M::default();
        while let Some(key) = object.decode_key()? {
            match item.deserialize_nullable(object, context)? {
                Some(value) => map.insert_entry(key, unbox::<M::Item>(value)?),
                None => return Err(null_element::<M::Item>(object)),
            }
        }
        object.finish_structure(false)?;
        Ok(Box::new(map))
    }
}

/// `Option<T>`: `None` is written as `null`.
pub(crate) struct OptionSerde<T>(PhantomData<fn() -> T>);

impl<T> OptionSerde<T> {
    pub(crate) fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: Any> Serializer for OptionSerde<T> {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        context: &mut EncoderContext<'_>,
        value: &dyn Any,
    ) -> Result<(), SerializeError> {
        match downcast::<Option<T>>(value, encoder)? {
            Some(inner) => context
                .registry()
                .find_serializer(TypeKey::of::<T>())?
                .serialize(encoder, context, inner),
            None => encoder.encode_null(),
        }
    }

    fn is_empty(&self, context: &EncoderContext<'_>, value: &dyn Any) -> bool {
        match value.downcast_ref::<Option<T>>() {
            Some(Some(inner)) => context
                .registry()
                .find_serializer(TypeKey::of::<T>())
                .is_ok_and(|serializer| serializer.is_empty(context, inner)),
            Some(None) => true,
            None => false,
        }
    }

    fn is_absent(&self, _context: &EncoderContext<'_>, value: &dyn Any) -> bool {
        matches!(value.downcast_ref::<Option<T>>(), Some(None))
    }
}

impl<T: Any> Deserializer for OptionSerde<T> {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        context: &mut DecoderContext<'_>,
    ) -> Result<Box<dyn Any>, DeserializeError> {
        if decoder.decode_null()? {
            return Ok(Box::new(None::<T>));
        }
        let inner = context.registry().find_deserializer(TypeKey::of::<T>())?;
        let value = unbox::<T>(inner.deserialize(decoder, context)?)?;
        Ok(Box::new(Some(value)))
    }

    fn deserialize_nullable(
        &self,
        decoder: &mut dyn Decoder,
        context: &mut DecoderContext<'_>,
    ) -> Result<Option<Box<dyn Any>>, DeserializeError> {
        self.deserialize(decoder, context).map(Some)
    }
}

/// An owning pointer written as its target.
pub(crate) trait Pointer: Any {
    type Target: Any;

    fn target(&self) -> &Self::Target;

    fn wrap(target: Self::Target) -> Self;
}

impl<T: Any> Pointer for Box<T> {
    type Target = T;

    fn target(&self) -> &T {
        self
    }

    fn wrap(target: T) -> Self {
        Box::new(target)
    }
}

impl<T: Any> Pointer for Arc<T> {
    type Target = T;

    fn target(&self) -> &T {
        self
    }

    fn wrap(target: T) -> Self {
        Arc::new(target)
    }
}

pub(crate) struct BoxSerde<P>(PhantomData<fn() -> P>);

impl<P> BoxSerde<P> {
    pub(crate) fn new() -> Self {
        Self(PhantomData)
    }
}

impl<P: Pointer> Serializer for BoxSerde<P> {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        context: &mut EncoderContext<'_>,
        value: &dyn Any,
    ) -> Result<(), SerializeError> {
        let pointer = downcast::<P>(value, encoder)?;
        context
            .registry()
            .find_serializer(TypeKey::of::<P::Target>())?
            .serialize(encoder, context, pointer.target())
    }

    fn is_empty(&self, context: &EncoderContext<'_>, value: &dyn Any) -> bool {
        let Some(pointer) = value.downcast_ref::<P>() else {
            return false;
        };
        context
            .registry()
            .find_serializer(TypeKey::of::<P::Target>())
            .is_ok_and(|serializer| serializer.is_empty(context, pointer.target()))
    }
}

impl<P: Pointer> Deserializer for BoxSerde<P> {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        context: &mut DecoderContext<'_>,
    ) -> Result<Box<dyn Any>, DeserializeError> {
        let inner = context
            .registry()
            .find_deserializer(TypeKey::of::<P::Target>())?;
        let target = unbox::<P::Target>(inner.deserialize(decoder, context)?)?;
        Ok(Box::new(P::wrap(target)))
    }
}
