//! Type to serializer lookup.

use core::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tessel_core::IntrospectionError;

use crate::builtins::{self, BoxSerde, ListSerde, MapSerde, OptionSerde};
use crate::tracing_macros::debug;
use crate::{
    BeanDescriptor, DeserBean, Deserializer, ModelCache, NamingStrategy, ObjectDeserializer,
    ObjectSerializer, PolymorphicDeserializer, PolymorphicSerializer, PropertyNaming, SerBean,
    SerdeConfig, Serializer, Subtypes, TypeInfo, TypeKey,
};

/// Resolves serializers, deserializers, naming strategies and bean models by
/// type.
///
/// Lookups may cache; a missing entry is an [`IntrospectionError`], never a
/// panic.
pub trait Registry: Send + Sync {
    /// The engine configuration.
    fn config(&self) -> &SerdeConfig;

    /// The serializer for values of `key`.
    fn find_serializer(&self, key: TypeKey) -> Result<Arc<dyn Serializer>, IntrospectionError>;

    /// The deserializer for values of `key`.
    fn find_deserializer(&self, key: TypeKey)
    -> Result<Arc<dyn Deserializer>, IntrospectionError>;

    /// A naming strategy by name: a built-in constant name or a registered
    /// custom one.
    fn find_naming_strategy(&self, name: &str)
    -> Result<Arc<dyn PropertyNaming>, IntrospectionError>;

    /// The bean descriptor registered for `key`.
    fn introspection(&self, key: TypeKey) -> Result<Arc<BeanDescriptor>, IntrospectionError>;

    /// The memoized write model for `key`.
    fn ser_bean(&self, key: TypeKey) -> Result<Arc<SerBean>, IntrospectionError>;

    /// The memoized read model for `key`.
    fn deser_bean(&self, key: TypeKey) -> Result<Arc<DeserBean>, IntrospectionError>;

    /// The discriminator `key` is written with as a registered subtype.
    fn type_discriminator(&self, key: TypeKey) -> Option<TypeInfo>;
}

/// The stock [`Registry`]: built-in scalars, registered beans and whatever
/// else was registered by hand.
///
/// Registration takes `&self` so a shared registry can be extended, but the
/// models are memoized on first use; register everything before encoding or
/// decoding the types involved.
pub struct DefaultRegistry {
    config: SerdeConfig,
    serializers: RwLock<HashMap<TypeId, Arc<dyn Serializer>>>,
    deserializers: RwLock<HashMap<TypeId, Arc<dyn Deserializer>>>,
    beans: RwLock<HashMap<TypeId, Arc<BeanDescriptor>>>,
    naming: RwLock<HashMap<String, Arc<dyn PropertyNaming>>>,
    discriminators: RwLock<HashMap<TypeId, TypeInfo>>,
    ser_beans: ModelCache<SerBean>,
    deser_beans: ModelCache<DeserBean>,
}

impl DefaultRegistry {
    /// A registry with the built-in scalar serdes installed.
    pub fn new(config: SerdeConfig) -> Self {
        let registry = Self {
            config,
            serializers: RwLock::new(HashMap::new()),
            deserializers: RwLock::new(HashMap::new()),
            beans: RwLock::new(HashMap::new()),
            naming: RwLock::new(HashMap::new()),
            discriminators: RwLock::new(HashMap::new()),
            ser_beans: ModelCache::new(),
            deser_beans: ModelCache::new(),
        };
        builtins::install(&registry);
        registry
    }

    /// Register a bean. Its serializer and deserializer are created on first
    /// lookup.
    pub fn register_bean(&self, descriptor: BeanDescriptor) -> &Self {
        debug!("registering bean {}", descriptor.type_key().name());
        self.beans
            .write()
            .insert(descriptor.type_key().id(), Arc::new(descriptor));
        self
    }

    /// Use `serializer` for values of `T`.
    pub fn register_serializer<T: Any>(&self, serializer: impl Serializer + 'static) -> &Self {
        self.serializers
            .write()
            .insert(TypeId::of::<T>(), Arc::new(serializer));
        self
    }

    /// Use `deserializer` for values of `T`.
    pub fn register_deserializer<T: Any>(
        &self,
        deserializer: impl Deserializer + 'static,
    ) -> &Self {
        self.deserializers
            .write()
            .insert(TypeId::of::<T>(), Arc::new(deserializer));
        self
    }

    /// Register both directions at once.
    pub fn register_serde<T: Any, S>(&self, serde: S) -> &Self
    where
        S: Serializer + Deserializer + 'static,
    {
        let serde = Arc::new(serde);
        self.serializers
            .write()
            .insert(TypeId::of::<T>(), serde.clone());
        self.deserializers.write().insert(TypeId::of::<T>(), serde);
        self
    }

    /// Handle `Vec<T>` as an array of `T`.
    pub fn register_list<T: Any>(&self) -> &Self {
        self.register_serde::<Vec<T>, _>(ListSerde::<T>::new())
    }

    /// Handle `IndexMap<String, V>` and `BTreeMap<String, V>` as objects of
    /// `V`.
    pub fn register_map<V: Any>(&self) -> &Self {
        self.register_serde::<IndexMap<String, V>, _>(MapSerde::<IndexMap<String, V>>::new());
        self.register_serde::<BTreeMap<String, V>, _>(MapSerde::<BTreeMap<String, V>>::new())
    }

    /// Handle `Option<T>`: `None` is `null`, and absent for inclusion checks.
    pub fn register_option<T: Any>(&self) -> &Self {
        self.register_serde::<Option<T>, _>(OptionSerde::<T>::new())
    }

    /// Handle `Box<T>` and `Arc<T>` as `T`.
    pub fn register_box<T: Any + Send + Sync>(&self) -> &Self {
        self.register_serde::<Box<T>, _>(BoxSerde::<Box<T>>::new());
        self.register_serde::<Arc<T>, _>(BoxSerde::<Arc<T>>::new())
    }

    /// Handle `Base` polymorphically through its registered subtypes. Each
    /// subtype is written with the discriminator property first.
    pub fn register_subtypes<Base: Any>(&self, subtypes: Subtypes<Base>) -> &Self {
        let subtypes = Arc::new(subtypes);
        {
            let mut discriminators = self.discriminators.write();
            for variant in subtypes.variants() {
                discriminators.insert(
                    variant.key().id(),
                    TypeInfo {
                        property: subtypes.property_name().to_owned(),
                        value: Some(variant.name().to_owned()),
                    },
                );
            }
        }
        self.serializers.write().insert(
            TypeId::of::<Base>(),
            Arc::new(PolymorphicSerializer::new(subtypes.clone())),
        );
        self.deserializers.write().insert(
            TypeId::of::<Base>(),
            Arc::new(PolymorphicDeserializer::new(subtypes)),
        );
        self
    }

    /// Make `naming` available to [`Naming::Named`](crate::Naming::Named)
    /// under `name`.
    pub fn register_naming_strategy(
        &self,
        name: impl Into<String>,
        naming: impl PropertyNaming + 'static,
    ) -> &Self {
        self.naming.write().insert(name.into(), Arc::new(naming));
        self
    }

    fn bean(&self, key: TypeKey) -> Option<Arc<BeanDescriptor>> {
        self.beans.read().get(&key.id()).cloned()
    }
}

impl Default for DefaultRegistry {
    fn default() -> Self {
        Self::new(SerdeConfig::default())
    }
}

impl Registry for DefaultRegistry {
    fn config(&self) -> &SerdeConfig {
        &self.config
    }

    fn find_serializer(&self, key: TypeKey) -> Result<Arc<dyn Serializer>, IntrospectionError> {
        if let Some(serializer) = self.serializers.read().get(&key.id()) {
            return Ok(serializer.clone());
        }
        if self.bean(key).is_none() {
            return Err(IntrospectionError::NoSerializer {
                type_name: key.name(),
            });
        }
        let mut serializers = self.serializers.write();
        let serializer = serializers
            .entry(key.id())
            .or_insert_with(|| Arc::new(ObjectSerializer::new(key)));
        Ok(serializer.clone())
    }

    fn find_deserializer(
        &self,
        key: TypeKey,
    ) -> Result<Arc<dyn Deserializer>, IntrospectionError> {
        if let Some(deserializer) = self.deserializers.read().get(&key.id()) {
            return Ok(deserializer.clone());
        }
        if self.bean(key).is_none() {
            return Err(IntrospectionError::NoDeserializer {
                type_name: key.name(),
            });
        }
        let mut deserializers = self.deserializers.write();
        let deserializer = deserializers
            .entry(key.id())
            .or_insert_with(|| Arc::new(ObjectDeserializer::new(key)));
        Ok(deserializer.clone())
    }

    fn find_naming_strategy(
        &self,
        name: &str,
    ) -> Result<Arc<dyn PropertyNaming>, IntrospectionError> {
        if let Some(naming) = self.naming.read().get(name) {
            return Ok(naming.clone());
        }
        NamingStrategy::for_name(name)
            .map(|strategy| Arc::new(strategy) as Arc<dyn PropertyNaming>)
            .ok_or_else(|| IntrospectionError::UnknownNamingStrategy {
                name: name.to_owned(),
            })
    }

    fn introspection(&self, key: TypeKey) -> Result<Arc<BeanDescriptor>, IntrospectionError> {
        self.bean(key).ok_or(IntrospectionError::NotIntrospected {
            type_name: key.name(),
        })
    }

    fn ser_bean(&self, key: TypeKey) -> Result<Arc<SerBean>, IntrospectionError> {
        self.ser_beans.get_or_build(key, || SerBean::build(self, key))
    }

    fn deser_bean(&self, key: TypeKey) -> Result<Arc<DeserBean>, IntrospectionError> {
        self.deser_beans
            .get_or_build(key, || DeserBean::build(self, key))
    }

    fn type_discriminator(&self, key: TypeKey) -> Option<TypeInfo> {
        self.discriminators.read().get(&key.id()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PropertyDescriptor;
    use tessel_testhelpers::test;

    #[derive(Default)]
    struct Unregistered;

    #[derive(Default)]
    struct Tag {
        label: String,
    }

    #[test]
    fn missing_types_are_errors() {
        let registry = DefaultRegistry::default();
        assert_eq!(
            registry.find_serializer(TypeKey::of::<Unregistered>()).err(),
            Some(IntrospectionError::NoSerializer {
                type_name: TypeKey::of::<Unregistered>().name()
            })
        );
        assert!(matches!(
            registry.ser_bean(TypeKey::of::<Unregistered>()),
            Err(IntrospectionError::NotIntrospected { .. })
        ));
        assert!(matches!(
            registry.find_naming_strategy("NO_SUCH_CASE"),
            Err(IntrospectionError::UnknownNamingStrategy { .. })
        ));
    }

    #[test]
    fn bean_serializers_are_created_once() {
        let registry = DefaultRegistry::default();
        registry.register_bean(
            BeanDescriptor::of::<Tag>().property(
                PropertyDescriptor::field("label", |t: &Tag| &t.label)
                    .with_setter(|t: &mut Tag, v: String| t.label = v),
            ),
        );
        let first = registry.find_serializer(TypeKey::of::<Tag>()).unwrap();
        let second = registry.find_serializer(TypeKey::of::<Tag>()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let first = registry.ser_bean(TypeKey::of::<Tag>()).unwrap();
        let second = registry.ser_bean(TypeKey::of::<Tag>()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.properties().len(), 1);
    }

    #[test]
    fn custom_naming_strategies_by_name() {
        let registry = DefaultRegistry::default();
        registry.register_naming_strategy("SHOUT", |name: &str| format!("{}!", name.to_uppercase()));
        let naming = registry.find_naming_strategy("SHOUT").unwrap();
        assert_eq!(naming.translate("hey"), "HEY!");
        let builtin = registry.find_naming_strategy("KEBAB_CASE").unwrap();
        assert_eq!(builtin.translate("fooBar"), "foo-bar");
    }
}
