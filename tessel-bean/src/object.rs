//! The generic bean engines: [`ObjectSerializer`] and [`ObjectDeserializer`]
//! walk a bean's model and drive an encoder or decoder.

use core::any::Any;

use tessel_core::{
    Decoder, DeserializeError, DeserializeErrorKind, Encoder, SerializeError,
};

use crate::model::WriteProperty;
use crate::tracing_macros::trace;
use crate::{DecoderContext, DeserBean, Deserializer, EncoderContext, SerBean, Serializer, TypeKey};

/// Run `f` on a fresh stack segment when the current one runs low, so deep
/// but legal nesting does not overflow.
#[cfg(feature = "stacker")]
pub(crate) fn grow<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(64 * 1024, 1024 * 1024, f)
}

#[cfg(not(feature = "stacker"))]
pub(crate) fn grow<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// Serializes a registered bean through its [`SerBean`].
pub struct ObjectSerializer {
    type_key: TypeKey,
}

impl ObjectSerializer {
    /// The serializer for the bean `type_key`. The model is resolved on
    /// first use, so self-referential beans can be registered.
    pub fn new(type_key: TypeKey) -> Self {
        Self { type_key }
    }
}

impl Serializer for ObjectSerializer {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        context: &mut EncoderContext<'_>,
        value: &dyn Any,
    ) -> Result<(), SerializeError> {
        let bean = context.registry().ser_bean(self.type_key)?;
        grow(|| write_bean(&bean, encoder, context, value)).map_err(|error| match error {
            // The nesting budget only runs out this deep on a graph that
            // refers back to itself
            SerializeError::DepthExceeded { path, .. } => {
                trace!("infinite recursion in {} at {}", self.type_key.name(), path);
                SerializeError::InfiniteRecursion {
                    type_name: self.type_key.name(),
                    path,
                }
            }
            other => other,
        })
    }
}

fn mismatch(bean: &SerBean, encoder: &dyn Encoder) -> SerializeError {
    SerializeError::TypeMismatch {
        expected: bean.type_key().name(),
        path: encoder.current_path(),
    }
}

/// Wrap failures that do not already say where they happened.
fn annotate(error: SerializeError, property: &WriteProperty, encoder: &dyn Encoder) -> SerializeError {
    match error {
        SerializeError::Custom(_)
        | SerializeError::TypeMismatch { .. }
        | SerializeError::Introspection(_) => SerializeError::Property {
            property: property.name().to_owned(),
            path: encoder.current_path(),
            source: Box::new(error),
        },
        other => other,
    }
}

fn write_bean(
    bean: &SerBean,
    encoder: &mut dyn Encoder,
    context: &mut EncoderContext<'_>,
    value: &dyn Any,
) -> Result<(), SerializeError> {
    if let Some(delegate) = &bean.json_value {
        let current = delegate.read(value).ok_or_else(|| mismatch(bean, encoder))?;
        let written = match current.as_any() {
            Some(inner) => delegate.serializer.serialize(encoder, context, inner),
            None => encoder.encode_null(),
        };
        return written.map_err(|error| annotate(error, delegate, encoder));
    }

    match &bean.wrapper {
        Some(wrapper) => {
            let envelope = encoder.encode_object()?;
            envelope.encode_key(wrapper)?;
            write_object(bean, envelope, context, value)?;
            envelope.finish_structure()
        }
        None => write_object(bean, encoder, context, value),
    }
}

fn write_object(
    bean: &SerBean,
    encoder: &mut dyn Encoder,
    context: &mut EncoderContext<'_>,
    value: &dyn Any,
) -> Result<(), SerializeError> {
    let object = encoder.encode_object()?;
    for property in &bean.properties {
        write_property(bean, property, object, context, value)
            .map_err(|error| annotate(error, property, object))?;
    }

    if let Some(any_getter) = &bean.any_getter {
        let extra = any_getter(value).ok_or_else(|| mismatch(bean, object))?;
        for (key, item) in extra {
            object.encode_key(key)?;
            object.encode_value(item)?;
        }
    }
    object.finish_structure()
}

fn write_property(
    bean: &SerBean,
    property: &WriteProperty,
    object: &mut dyn Encoder,
    context: &mut EncoderContext<'_>,
    value: &dyn Any,
) -> Result<(), SerializeError> {
    let simple = bean.is_simple_bean();
    if !simple {
        if let Some(name) = property.back_ref() {
            if context.resolve_back_ref(name) {
                trace!("suppressing back reference {} of {}", property.name(), name);
                return Ok(());
            }
        }
        if !property.in_view(context.view()) {
            return Ok(());
        }
    }

    let current = property.read(value).ok_or_else(|| mismatch(bean, object))?;

    if !simple {
        let include = match &bean.filter {
            Some(filter) => filter.should_include(value, property.name(), current.as_any()),
            None => property.should_include(context, &current),
        };
        if !include {
            return Ok(());
        }
    }

    object.encode_key(property.name())?;
    let Some(inner) = current.as_any() else {
        return object.encode_null();
    };
    match property.managed_ref() {
        Some(name) => context.with_managed_ref(name, |context| {
            property.serializer.serialize(object, context, inner)
        }),
        None => property.serializer.serialize(object, context, inner),
    }
}

/// Deserializes a registered bean through its [`DeserBean`].
pub struct ObjectDeserializer {
    type_key: TypeKey,
}

impl ObjectDeserializer {
    /// The deserializer for the bean `type_key`. The model is resolved on
    /// first use.
    pub fn new(type_key: TypeKey) -> Self {
        Self { type_key }
    }
}

impl Deserializer for ObjectDeserializer {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        context: &mut DecoderContext<'_>,
    ) -> Result<Box<dyn Any>, DeserializeError> {
        let bean = context.registry().deser_bean(self.type_key)?;
        grow(|| match &bean.wrapper {
            Some(wrapper) => read_wrapped(&bean, wrapper, decoder, context),
            None => read_object(&bean, decoder, context),
        })
    }
}

fn read_wrapped(
    bean: &DeserBean,
    wrapper: &str,
    decoder: &mut dyn Decoder,
    context: &mut DecoderContext<'_>,
) -> Result<Box<dyn Any>, DeserializeError> {
    let envelope = decoder.decode_object()?;
    let mut instance = None;
    while let Some(key) = envelope.decode_key()? {
        if key == wrapper && instance.is_none() {
            instance = Some(read_object(bean, envelope, context)?);
        } else {
            envelope.skip_value()?;
        }
    }
    let missing = instance.is_none().then(|| envelope.current_path());
    envelope.finish_structure(false)?;
    match (instance, missing) {
        (Some(instance), _) => Ok(instance),
        (None, path) => Err(DeserializeError::new(DeserializeErrorKind::MissingProperty {
            property: wrapper.to_owned(),
            type_name: bean.type_key().name(),
        })
        .with_path(path.unwrap_or_default())),
    }
}

fn read_object(
    bean: &DeserBean,
    decoder: &mut dyn Decoder,
    context: &mut DecoderContext<'_>,
) -> Result<Box<dyn Any>, DeserializeError> {
    let mut instance = bean.instantiate();
    let ignore_unknown = bean.ignore_unknown.unwrap_or(context.ignore_unknown());
    let mut seen = vec![false; bean.properties.len()];

    let object = decoder.decode_object()?;
    while let Some(key) = object.decode_key()? {
        if let Some(index) = bean.find(&key, context.case_insensitive()) {
            let property = &bean.properties[index];
            let value = match property.deserializer.deserialize_nullable(object, context)? {
                Some(value) => Some(value),
                None if property.is_nullable() => None,
                None => {
                    return Err(DeserializeError::new(DeserializeErrorKind::UnexpectedNull {
                        type_name: property.value_type().name(),
                    })
                    .with_path(object.current_path()));
                }
            };
            property
                .write(&mut *instance, value)
                .map_err(|error| error.with_path(object.current_path()))?;
            seen[index] = true;
        } else if bean.is_skipped(&key) {
            object.skip_value()?;
        } else if let Some(any_setter) = &bean.any_setter {
            let value = object.decode_arbitrary()?;
            any_setter(&mut *instance, key, value)?;
        } else if ignore_unknown {
            trace!("skipping unknown property {} of {}", key, bean.type_key().name());
            object.skip_value()?;
        } else {
            return Err(DeserializeError::new(DeserializeErrorKind::UnknownProperty {
                property: key,
                type_name: bean.type_key().name(),
            })
            .with_path(object.current_path()));
        }
    }

    let missing = bean
        .properties
        .iter()
        .zip(&seen)
        .find(|(property, was_seen)| property.is_required() && !**was_seen)
        .map(|(property, _)| property.name().to_owned());
    let path = object.current_path();
    object.finish_structure(false)?;

    match missing {
        Some(property) => Err(DeserializeError::new(DeserializeErrorKind::MissingProperty {
            property,
            type_name: bean.type_key().name(),
        })
        .with_path(path)),
        None => Ok(instance),
    }
}
