//! The per-type property models: [`SerBean`] for writing and [`DeserBean`]
//! for reading.
//!
//! Both are derived from a [`BeanDescriptor`] once and never change
//! afterwards; the registry caches them per concrete type.

use core::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tessel_core::{DeserializeError, IntrospectionError};

use crate::descriptor::{
    AnyGetFn, AnyRole, AnySetFn, FieldFn, FieldMutFn, Getter, InstantiateFn, PropertyValue, SetFn,
};
use crate::tracing_macros::debug;
use crate::{
    BeanDescriptor, Deserializer, EncoderContext, Include, Naming, PropertyDescriptor,
    PropertyFilter, PropertyNaming, Registry, Serializer, TypeKey, Unwrapped,
};

/// Naming and filtering inherited by the properties of an unwrapped child.
struct Scope<L: ?Sized> {
    through: Vec<Arc<L>>,
    prefix: String,
    suffix: String,
    ignored: Vec<String>,
}

impl<L: ?Sized> Scope<L> {
    fn root() -> Self {
        Self {
            through: Vec::new(),
            prefix: String::new(),
            suffix: String::new(),
            ignored: Vec::new(),
        }
    }

    fn child(&self, link: Arc<L>, unwrapped: &Unwrapped) -> Self {
        let mut through = self.through.clone();
        through.push(link);
        Self {
            through,
            prefix: format!("{}{}", self.prefix, unwrapped.prefix),
            suffix: format!("{}{}", unwrapped.suffix, self.suffix),
            ignored: unwrapped.ignored.clone(),
        }
    }

    fn excludes(&self, name: &str) -> bool {
        self.ignored.iter().any(|n| n == name)
    }
}

pub(crate) fn resolve_naming(
    registry: &dyn Registry,
    naming: &Naming,
) -> Result<Arc<dyn PropertyNaming>, IntrospectionError> {
    match naming {
        Naming::Strategy(strategy) => Ok(Arc::new(*strategy)),
        Naming::Named(name) => registry.find_naming_strategy(name),
        Naming::Custom(custom) => Ok(custom.clone()),
    }
}

/// The bean's own strategy, else the configured default.
fn bean_naming(
    registry: &dyn Registry,
    descriptor: &BeanDescriptor,
) -> Result<Option<Arc<dyn PropertyNaming>>, IntrospectionError> {
    match &descriptor.naming {
        Some(naming) => resolve_naming(registry, naming).map(Some),
        None => Ok(registry
            .config()
            .naming_strategy
            .map(|strategy| Arc::new(strategy) as Arc<dyn PropertyNaming>)),
    }
}

/// Explicit rename, then the property's strategy, then the bean's, then the
/// declared name.
fn serialized_name(
    registry: &dyn Registry,
    property: &PropertyDescriptor,
    bean_naming: Option<&Arc<dyn PropertyNaming>>,
) -> Result<String, IntrospectionError> {
    if let Some(rename) = &property.rename {
        return Ok(rename.clone());
    }
    let naming = match &property.naming {
        Some(naming) => Some(resolve_naming(registry, naming)?),
        None => bean_naming.cloned(),
    };
    Ok(match naming {
        Some(naming) => naming.translate(&property.name),
        None => property.name.clone(),
    })
}

/// Where a written value comes from.
pub(crate) enum WriteSource {
    Getter(Getter),
    Literal(String),
}

/// One property in write order, fully resolved.
pub struct WriteProperty {
    name: String,
    through: Vec<Arc<FieldFn>>,
    source: WriteSource,
    value_type: TypeKey,
    pub(crate) serializer: Arc<dyn Serializer>,
    include: Include,
    views: Vec<String>,
    managed_ref: Option<String>,
    back_ref: Option<String>,
}

impl WriteProperty {
    /// The serialized name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared value type.
    pub fn value_type(&self) -> TypeKey {
        self.value_type
    }

    /// The resolved inclusion policy.
    pub fn include(&self) -> Include {
        self.include
    }

    /// Views the property is restricted to. Empty means every view.
    pub fn views(&self) -> &[String] {
        &self.views
    }

    /// The managed reference name, if this is the forward side of a link.
    pub fn managed_ref(&self) -> Option<&str> {
        self.managed_ref.as_deref()
    }

    /// The back reference name, if this is the backward side of a link.
    pub fn back_ref(&self) -> Option<&str> {
        self.back_ref.as_deref()
    }

    /// Whether this is a synthesized type discriminator.
    pub fn is_discriminator(&self) -> bool {
        matches!(self.source, WriteSource::Literal(_))
    }

    /// Read the value from `bean`, following unwrapped parents. `None` when
    /// `bean` is of the wrong type.
    pub(crate) fn read<'a>(&'a self, bean: &'a dyn Any) -> Option<PropertyValue<'a>> {
        let mut target = bean;
        for link in &self.through {
            match link(target)? {
                Some(next) => target = next,
                None => return Some(PropertyValue::Null),
            }
        }
        match &self.source {
            WriteSource::Getter(getter) => getter.read(target),
            WriteSource::Literal(literal) => Some(PropertyValue::Borrowed(literal)),
        }
    }

    pub(crate) fn in_view(&self, view: Option<&str>) -> bool {
        self.views.is_empty() || view.is_some_and(|view| self.views.iter().any(|v| v == view))
    }

    /// Evaluate the inclusion policy for one value.
    pub(crate) fn should_include(&self, context: &EncoderContext<'_>, value: &PropertyValue<'_>) -> bool {
        let Some(value) = value.as_any() else {
            return self.include == Include::Always;
        };
        match self.include {
            Include::Always | Include::NonNull => true,
            Include::NonAbsent => !self.serializer.is_absent(context, value),
            Include::NonEmpty => {
                !self.serializer.is_absent(context, value) && !self.serializer.is_empty(context, value)
            }
            Include::Never => false,
        }
    }

    fn is_plain(&self) -> bool {
        self.include == Include::Always
            && self.views.is_empty()
            && self.managed_ref.is_none()
            && self.back_ref.is_none()
    }
}

/// The write model of a bean.
pub struct SerBean {
    type_key: TypeKey,
    pub(crate) json_value: Option<WriteProperty>,
    pub(crate) properties: Vec<WriteProperty>,
    pub(crate) any_getter: Option<Arc<AnyGetFn>>,
    pub(crate) wrapper: Option<String>,
    pub(crate) filter: Option<Arc<dyn PropertyFilter>>,
    simple_bean: bool,
}

impl SerBean {
    /// Build the write model for `type_key` from its registered descriptor.
    pub fn build(registry: &dyn Registry, type_key: TypeKey) -> Result<Self, IntrospectionError> {
        debug!("building write model for {}", type_key.name());
        let descriptor = registry.introspection(type_key)?;
        let bean_naming = bean_naming(registry, &descriptor)?;

        let mut delegates = descriptor
            .properties
            .iter()
            .filter(|p| p.json_value && p.is_readable() && !descriptor.is_ignored(&p.name));
        if let Some(delegate) = delegates.next() {
            if delegates.next().is_some() {
                return Err(IntrospectionError::MultipleJsonValues {
                    type_name: type_key.name(),
                });
            }
            let json_value = write_property(
                registry,
                &descriptor,
                delegate,
                delegate.name.clone(),
                &Scope::root(),
            )?;
            return Ok(Self {
                type_key,
                json_value,
                properties: Vec::new(),
                any_getter: None,
                wrapper: None,
                filter: None,
                simple_bean: false,
            });
        }

        let mut properties = Vec::new();
        collect_write(registry, &descriptor, bean_naming.as_ref(), &Scope::root(), &mut properties)?;

        if let Some(info) = descriptor
            .type_info
            .clone()
            .or_else(|| registry.type_discriminator(type_key))
        {
            let literal = info
                .value
                .unwrap_or_else(|| type_key.simple_name().to_owned());
            properties.insert(
                0,
                WriteProperty {
                    name: info.property,
                    through: Vec::new(),
                    source: WriteSource::Literal(literal),
                    value_type: TypeKey::of::<String>(),
                    serializer: registry.find_serializer(TypeKey::of::<String>())?,
                    include: Include::Always,
                    views: Vec::new(),
                    managed_ref: None,
                    back_ref: None,
                },
            );
        }

        let any_getter = descriptor.properties.iter().find_map(|p| match &p.any {
            Some(AnyRole::Getter(get)) if !p.ignored => Some(get.clone()),
            _ => None,
        });

        let simple_bean = any_getter.is_none()
            && descriptor.wrapper.is_none()
            && descriptor.filter.is_none()
            && properties.iter().all(WriteProperty::is_plain);

        Ok(Self {
            type_key,
            json_value: None,
            properties,
            any_getter,
            wrapper: descriptor.wrapper.clone(),
            filter: descriptor.filter.clone(),
            simple_bean,
        })
    }

    /// The bean type.
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// Properties in write order. Empty when a json value delegate is set.
    pub fn properties(&self) -> &[WriteProperty] {
        &self.properties
    }

    /// The property that replaces the whole bean, if any.
    pub fn json_value(&self) -> Option<&WriteProperty> {
        self.json_value.as_ref()
    }

    /// The single-key envelope, if any.
    pub fn wrapper(&self) -> Option<&str> {
        self.wrapper.as_deref()
    }

    /// Whether the bean splats a dynamic map after its properties.
    pub fn has_any_getter(&self) -> bool {
        self.any_getter.is_some()
    }

    /// Whether every property is written unconditionally, letting the
    /// serializer skip per-property checks.
    pub fn is_simple_bean(&self) -> bool {
        self.simple_bean
    }
}

fn write_property(
    registry: &dyn Registry,
    descriptor: &BeanDescriptor,
    property: &PropertyDescriptor,
    name: String,
    scope: &Scope<FieldFn>,
) -> Result<Option<WriteProperty>, IntrospectionError> {
    let Some(getter) = &property.getter else {
        return Ok(None);
    };
    let serializer = match &property.serializer {
        Some(serializer) => serializer.clone(),
        None => registry.find_serializer(property.value_type)?,
    };
    let include = property
        .include
        .or(descriptor.include)
        .unwrap_or(registry.config().inclusion);
    Ok(Some(WriteProperty {
        name,
        through: scope.through.clone(),
        source: WriteSource::Getter(getter.clone()),
        value_type: property.value_type,
        serializer,
        include,
        views: property.views.clone(),
        managed_ref: property.managed_ref.clone(),
        back_ref: property.back_ref.clone(),
    }))
}

fn collect_write(
    registry: &dyn Registry,
    descriptor: &BeanDescriptor,
    bean_naming: Option<&Arc<dyn PropertyNaming>>,
    scope: &Scope<FieldFn>,
    out: &mut Vec<WriteProperty>,
) -> Result<(), IntrospectionError> {
    let mut candidates: Vec<&PropertyDescriptor> = descriptor
        .properties
        .iter()
        .filter(|p| p.is_readable() && !descriptor.is_ignored(&p.name) && !scope.excludes(&p.name))
        .collect();
    candidates.sort_by_key(|p| p.order.unwrap_or(0));

    for property in candidates {
        if let Some(unwrapped) = &property.unwrapped {
            let Some(Getter::Field(link)) = &property.getter else {
                return Err(IntrospectionError::UnwrappedMethod {
                    type_name: descriptor.type_key.name(),
                    property: property.name.clone(),
                });
            };
            let child = registry.introspection(property.value_type)?;
            let child_naming = match &child.naming {
                Some(naming) => Some(resolve_naming(registry, naming)?),
                None => bean_naming.cloned(),
            };
            let child_scope = scope.child(link.clone(), unwrapped);
            collect_write(registry, &child, child_naming.as_ref(), &child_scope, out)?;
            continue;
        }

        let name = format!(
            "{}{}{}",
            scope.prefix,
            serialized_name(registry, property, bean_naming)?,
            scope.suffix
        );
        if let Some(write) = write_property(registry, descriptor, property, name, scope)? {
            out.push(write);
        }
    }
    Ok(())
}

/// One property as read, fully resolved.
pub struct ReadProperty {
    name: String,
    through: Vec<Arc<FieldMutFn>>,
    setter: Arc<SetFn>,
    pub(crate) deserializer: Arc<dyn Deserializer>,
    value_type: TypeKey,
    nullable: bool,
    required: bool,
}

impl ReadProperty {
    /// The serialized name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared value type.
    pub fn value_type(&self) -> TypeKey {
        self.value_type
    }

    /// Whether `null` is accepted.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether the property must be present.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Store `value` into `bean`, following unwrapped parents.
    pub(crate) fn write(
        &self,
        bean: &mut dyn Any,
        value: Option<Box<dyn Any>>,
    ) -> Result<(), DeserializeError> {
        let mut target = bean;
        for link in &self.through {
            target = match link(target) {
                Some(next) => next,
                None => {
                    return Err(DeserializeError::custom(format!(
                        "unwrapped parent of property [{}] is not of the declared type",
                        self.name
                    )));
                }
            };
        }
        (self.setter)(target, value)
    }
}

/// The read model of a bean.
pub struct DeserBean {
    type_key: TypeKey,
    instantiate: Arc<InstantiateFn>,
    pub(crate) properties: Vec<ReadProperty>,
    by_name: HashMap<String, usize>,
    by_lowercase: HashMap<String, usize>,
    pub(crate) any_setter: Option<Arc<AnySetFn>>,
    pub(crate) ignore_unknown: Option<bool>,
    pub(crate) wrapper: Option<String>,
    skipped: HashSet<String>,
}

impl DeserBean {
    /// Build the read model for `type_key` from its registered descriptor.
    pub fn build(registry: &dyn Registry, type_key: TypeKey) -> Result<Self, IntrospectionError> {
        debug!("building read model for {}", type_key.name());
        let descriptor = registry.introspection(type_key)?;
        let instantiate = descriptor
            .instantiate
            .clone()
            .ok_or(IntrospectionError::NoInstantiator {
                type_name: type_key.name(),
            })?;
        let bean_naming = bean_naming(registry, &descriptor)?;

        let mut bean = Self {
            type_key,
            instantiate,
            properties: Vec::new(),
            by_name: HashMap::new(),
            by_lowercase: HashMap::new(),
            any_setter: None,
            ignore_unknown: descriptor.ignore_unknown,
            wrapper: descriptor.wrapper.clone(),
            skipped: descriptor.ignored.iter().cloned().collect(),
        };

        let mut aliases = Vec::new();
        collect_read(
            registry,
            &descriptor,
            bean_naming.as_ref(),
            &Scope::root(),
            &mut bean,
            &mut aliases,
        )?;

        for (index, property) in bean.properties.iter().enumerate() {
            bean.by_name.entry(property.name.clone()).or_insert(index);
        }
        for (alias, index) in aliases {
            bean.by_name.entry(alias).or_insert(index);
        }
        for (name, index) in &bean.by_name {
            bean.by_lowercase.entry(name.to_lowercase()).or_insert(*index);
        }

        if let Some(info) = descriptor
            .type_info
            .clone()
            .or_else(|| registry.type_discriminator(type_key))
        {
            bean.skipped.insert(info.property);
        }

        bean.any_setter = descriptor.properties.iter().find_map(|p| match &p.any {
            Some(AnyRole::Setter(set)) if !p.ignored => Some(set.clone()),
            _ => None,
        });

        Ok(bean)
    }

    /// The bean type.
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// Readable properties, unwrapped children included.
    pub fn properties(&self) -> &[ReadProperty] {
        &self.properties
    }

    /// A fresh, empty instance.
    pub(crate) fn instantiate(&self) -> Box<dyn Any> {
        (self.instantiate)()
    }

    /// Index of the property matching `key`, by name or alias.
    pub fn find(&self, key: &str, case_insensitive: bool) -> Option<usize> {
        self.by_name.get(key).copied().or_else(|| {
            if case_insensitive {
                self.by_lowercase.get(&key.to_lowercase()).copied()
            } else {
                None
            }
        })
    }

    /// Whether `key` is known but never read, such as a back reference or a
    /// type discriminator.
    pub fn is_skipped(&self, key: &str) -> bool {
        self.skipped.contains(key)
    }
}

fn collect_read(
    registry: &dyn Registry,
    descriptor: &BeanDescriptor,
    bean_naming: Option<&Arc<dyn PropertyNaming>>,
    scope: &Scope<FieldMutFn>,
    bean: &mut DeserBean,
    aliases: &mut Vec<(String, usize)>,
) -> Result<(), IntrospectionError> {
    for property in &descriptor.properties {
        if property.any.is_some() || scope.excludes(&property.name) {
            continue;
        }
        if descriptor.is_ignored(&property.name) || property.ignored {
            bean.skipped.insert(property.name.clone());
            continue;
        }

        if let Some(unwrapped) = &property.unwrapped {
            let Some(link) = &property.field_mut else {
                return Err(IntrospectionError::UnwrappedMethod {
                    type_name: descriptor.type_key.name(),
                    property: property.name.clone(),
                });
            };
            let child = registry.introspection(property.value_type)?;
            let child_naming = match &child.naming {
                Some(naming) => Some(resolve_naming(registry, naming)?),
                None => bean_naming.cloned(),
            };
            let child_scope = scope.child(link.clone(), unwrapped);
            collect_read(registry, &child, child_naming.as_ref(), &child_scope, bean, aliases)?;
            continue;
        }

        let name = format!(
            "{}{}{}",
            scope.prefix,
            serialized_name(registry, property, bean_naming)?,
            scope.suffix
        );

        let setter = match &property.setter {
            Some(setter) if property.is_writable() && property.back_ref.is_none() => setter.clone(),
            _ => {
                bean.skipped.insert(name);
                continue;
            }
        };
        let deserializer = match &property.deserializer {
            Some(deserializer) => deserializer.clone(),
            None => registry.find_deserializer(property.value_type)?,
        };

        let index = bean.properties.len();
        aliases.extend(property.aliases.iter().map(|alias| (alias.clone(), index)));
        bean.properties.push(ReadProperty {
            name,
            through: scope.through.clone(),
            setter,
            deserializer,
            value_type: property.value_type,
            nullable: property.nullable,
            required: property.required,
        });
    }
    Ok(())
}
