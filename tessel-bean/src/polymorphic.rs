//! Subtype dispatch for polymorphic values.
//!
//! A base type (an enum, or a `Box<dyn Trait>`) is registered together with
//! its concrete subtypes. Writing dispatches on the runtime [`TypeId`] of the
//! concrete value and lets the subtype's own serializer write the
//! discriminator. Reading buffers the object, scans one copy of the buffer for
//! the discriminator and replays the other into the matching subtype's
//! deserializer.

use core::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tessel_core::{
    Decoder, DeserializeError, DeserializeErrorKind, Encoder, IntrospectionError,
    SerializeError, Value,
};

use crate::codec::{downcast, unbox};
use crate::tracing_macros::trace;
use crate::{DecoderContext, Deserializer, EncoderContext, Registry, Serializer, TypeInfo, TypeKey};

type IntoBaseFn<Base> = dyn Fn(Box<dyn Any>) -> Result<Base, DeserializeError> + Send + Sync;
type AsAnyFn<Base> = dyn (Fn(&Base) -> &dyn Any) + Send + Sync;

/// One concrete subtype of `Base`.
pub struct Variant<Base> {
    key: TypeKey,
    names: Vec<String>,
    into_base: Box<IntoBaseFn<Base>>,
}

impl<Base> Variant<Base> {
    /// The concrete type.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// The name written as discriminator.
    pub fn name(&self) -> &str {
        &self.names[0]
    }

    /// Every name accepted when reading.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// The subtypes of a polymorphic base type.
///
/// ```
/// use std::any::Any;
/// use tessel_bean::Subtypes;
///
/// struct Dog;
/// struct Cat;
///
/// enum Animal {
///     Dog(Dog),
///     Cat(Cat),
/// }
///
/// fn concrete(animal: &Animal) -> &dyn Any {
///     match animal {
///         Animal::Dog(dog) => dog,
///         Animal::Cat(cat) => cat,
///     }
/// }
///
/// let subtypes = Subtypes::new(concrete)
///     .property("kind")
///     .subtype(Animal::Dog)
///     .named_subtype(&["cat", "kitty"], Animal::Cat);
/// assert_eq!(subtypes.variants().len(), 2);
/// ```
pub struct Subtypes<Base> {
    property: String,
    as_any: Box<AsAnyFn<Base>>,
    variants: Vec<Variant<Base>>,
    default: Option<usize>,
}

impl<Base: Any> Subtypes<Base> {
    /// Subtypes of `Base`. `as_any` exposes the concrete value inside a base
    /// value.
    pub fn new(as_any: impl (Fn(&Base) -> &dyn Any) + Send + Sync + 'static) -> Self {
        Self {
            property: TypeInfo::DEFAULT_PROPERTY.to_owned(),
            as_any: Box::new(as_any),
            variants: Vec::new(),
            default: None,
        }
    }

    /// Write and read the discriminator under `property` instead of `@type`.
    pub fn property(mut self, property: impl Into<String>) -> Self {
        self.property = property.into();
        self
    }

    /// Add `T`, named by its simple type name.
    pub fn subtype<T: Any>(self, into_base: impl Fn(T) -> Base + Send + Sync + 'static) -> Self {
        let name = TypeKey::of::<T>().simple_name();
        self.named_subtype(&[name], into_base)
    }

    /// Add `T` under `names`. The first name is written, all of them are
    /// accepted.
    pub fn named_subtype<T: Any>(
        mut self,
        names: &[&str],
        into_base: impl Fn(T) -> Base + Send + Sync + 'static,
    ) -> Self {
        let key = TypeKey::of::<T>();
        let mut names: Vec<String> = names.iter().map(|n| (*n).to_owned()).collect();
        if names.is_empty() {
            names.push(key.simple_name().to_owned());
        }
        self.variants.push(Variant {
            key,
            names,
            into_base: Box::new(move |value| Ok(into_base(unbox::<T>(value)?))),
        });
        self
    }

    /// Add `T` and read objects without a discriminator as `T`.
    pub fn default_subtype<T: Any>(
        mut self,
        into_base: impl Fn(T) -> Base + Send + Sync + 'static,
    ) -> Self {
        self = self.subtype(into_base);
        self.default = Some(self.variants.len() - 1);
        self
    }

    /// The discriminator property.
    pub fn property_name(&self) -> &str {
        &self.property
    }

    /// Registered subtypes in registration order.
    pub fn variants(&self) -> &[Variant<Base>] {
        &self.variants
    }

    fn by_id(&self, id: TypeId) -> Option<&Variant<Base>> {
        self.variants.iter().find(|v| v.key.id() == id)
    }

    fn by_name(&self, name: &str) -> Option<&Variant<Base>> {
        self.variants
            .iter()
            .find(|v| v.names.iter().any(|n| n == name))
    }

    fn default_variant(&self) -> Option<&Variant<Base>> {
        self.default.map(|index| &self.variants[index])
    }
}

/// Writes a base value as its concrete subtype.
pub struct PolymorphicSerializer<Base> {
    subtypes: Arc<Subtypes<Base>>,
    resolved: RwLock<HashMap<TypeId, Arc<dyn Serializer>>>,
}

impl<Base: Any> PolymorphicSerializer<Base> {
    /// Dispatch over `subtypes`.
    pub fn new(subtypes: Arc<Subtypes<Base>>) -> Self {
        Self {
            subtypes,
            resolved: RwLock::new(HashMap::new()),
        }
    }

    fn resolve(
        &self,
        registry: &dyn Registry,
        id: TypeId,
    ) -> Result<Arc<dyn Serializer>, IntrospectionError> {
        if let Some(serializer) = self.resolved.read().get(&id) {
            return Ok(serializer.clone());
        }
        let variant = self
            .subtypes
            .by_id(id)
            .ok_or(IntrospectionError::NoSerializer {
                type_name: type_name::<Base>(),
            })?;
        trace!("resolving subtype {} of {}", variant.key.name(), type_name::<Base>());
        let serializer = registry.find_serializer(variant.key)?;
        self.resolved.write().insert(id, serializer.clone());
        Ok(serializer)
    }
}

impl<Base: Any> Serializer for PolymorphicSerializer<Base> {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        context: &mut EncoderContext<'_>,
        value: &dyn Any,
    ) -> Result<(), SerializeError> {
        let base = downcast::<Base>(value, encoder)?;
        let concrete = (self.subtypes.as_any)(base);
        let serializer = self.resolve(context.registry(), concrete.type_id())?;
        serializer.serialize(encoder, context, concrete)
    }
}

/// Reads a base value by looking ahead for its discriminator.
pub struct PolymorphicDeserializer<Base> {
    subtypes: Arc<Subtypes<Base>>,
}

impl<Base: Any> PolymorphicDeserializer<Base> {
    /// Dispatch over `subtypes`.
    pub fn new(subtypes: Arc<Subtypes<Base>>) -> Self {
        Self { subtypes }
    }

    /// Scan an object for the discriminator, skipping everything else.
    fn discriminator(
        &self,
        lookahead: &mut dyn Decoder,
    ) -> Result<Option<Value>, DeserializeError> {
        let property = self.subtypes.property_name();
        let object = lookahead.decode_object()?;
        let mut found = None;
        while let Some(key) = object.decode_key()? {
            if found.is_none() && key == property {
                found = Some(object.decode_arbitrary()?);
            } else {
                object.skip_value()?;
            }
        }
        object.finish_structure(false)?;
        Ok(found)
    }
}

impl<Base: Any> Deserializer for PolymorphicDeserializer<Base> {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        context: &mut DecoderContext<'_>,
    ) -> Result<Box<dyn Any>, DeserializeError> {
        let path = decoder.current_path();
        let mut lookahead = decoder.decode_buffer()?;
        let mut replay = lookahead.decode_buffer()?;
        let property = self.subtypes.property_name();

        let variant = match self.discriminator(lookahead.as_mut())? {
            Some(Value::String(name)) => self.subtypes.by_name(&name).ok_or_else(|| {
                DeserializeError::custom(format!(
                    "Unknown subtype [{name}] of type: {}",
                    type_name::<Base>()
                ))
                .with_path(&path)
                .with_invalid_value(name.clone())
            })?,
            Some(other) => {
                return Err(DeserializeError::custom(format!(
                    "Discriminator [{property}] of type {} must be a string",
                    type_name::<Base>()
                ))
                .with_path(&path)
                .with_invalid_value(other.to_string()));
            }
            None => self.subtypes.default_variant().ok_or_else(|| {
                DeserializeError::new(DeserializeErrorKind::MissingProperty {
                    property: property.to_owned(),
                    type_name: type_name::<Base>(),
                })
                .with_path(&path)
            })?,
        };
        trace!("replaying {} as {}", type_name::<Base>(), variant.key.name());

        let deserializer = context.registry().find_deserializer(variant.key)?;
        let concrete = deserializer.deserialize(replay.as_mut(), context)?;
        let base = (variant.into_base)(concrete)?;
        Ok(Box::new(base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_testhelpers::test;

    struct Circle;
    struct Square;

    enum Shape {
        Circle(Circle),
        Square(Square),
    }

    fn concrete(shape: &Shape) -> &dyn Any {
        match shape {
            Shape::Circle(circle) => circle,
            Shape::Square(square) => square,
        }
    }

    fn shareable<T: Send + Sync>(_: &T) {}

    #[test]
    fn dispatchers_are_shareable() {
        let subtypes = Arc::new(
            Subtypes::new(concrete)
                .subtype(Shape::Circle)
                .named_subtype(&["box"], Shape::Square),
        );
        shareable(&*subtypes);
        shareable(&PolymorphicSerializer::new(subtypes.clone()));
        shareable(&PolymorphicDeserializer::new(subtypes.clone()));

        let square = Shape::Square(Square);
        assert_eq!((subtypes.as_any)(&square).type_id(), TypeId::of::<Square>());
        assert_eq!(subtypes.by_name("box").map(Variant::key), Some(TypeKey::of::<Square>()));
        assert_eq!(subtypes.by_name("Circle").map(Variant::name), Some("Circle"));
    }
}
