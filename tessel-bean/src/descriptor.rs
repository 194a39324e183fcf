//! Introspection input: what a bean looks like and how to reach its
//! properties.
//!
//! Descriptors are built once per type, usually next to the type itself, and
//! handed to [`DefaultRegistry::register_bean`](crate::DefaultRegistry::register_bean).
//! The typed constructors erase the accessors to `dyn Any` so the models can
//! walk any bean without knowing its type.
//!
//! ```
//! use tessel_bean::{BeanDescriptor, PropertyDescriptor};
//!
//! #[derive(Default)]
//! struct Book {
//!     title: String,
//!     subtitle: Option<String>,
//! }
//!
//! let descriptor = BeanDescriptor::of::<Book>()
//!     .property(
//!         PropertyDescriptor::field("title", |b: &Book| &b.title)
//!             .with_setter(|b: &mut Book, v: String| b.title = v)
//!             .required(),
//!     )
//!     .property(
//!         PropertyDescriptor::nullable("subtitle", |b: &Book| b.subtitle.as_ref())
//!             .with_nullable_setter(|b: &mut Book, v: Option<String>| b.subtitle = v),
//!     );
//! assert_eq!(descriptor.properties().len(), 2);
//! ```

use core::any::{Any, type_name};
use core::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tessel_core::{DeserializeError, DeserializeErrorKind, Value};

use crate::codec::unbox;
use crate::{Deserializer, Include, Naming, PropertyFilter, Serializer, TypeKey};

pub(crate) type FieldFn =
    dyn for<'a> Fn(&'a dyn Any) -> Option<Option<&'a dyn Any>> + Send + Sync;
pub(crate) type MethodFn = dyn Fn(&dyn Any) -> Option<Option<Box<dyn Any>>> + Send + Sync;
pub(crate) type FieldMutFn = dyn for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync;
pub(crate) type SetFn =
    dyn Fn(&mut dyn Any, Option<Box<dyn Any>>) -> Result<(), DeserializeError> + Send + Sync;
pub(crate) type AnyGetFn =
    dyn for<'a> Fn(&'a dyn Any) -> Option<&'a IndexMap<String, Value>> + Send + Sync;
pub(crate) type AnySetFn =
    dyn Fn(&mut dyn Any, String, Value) -> Result<(), DeserializeError> + Send + Sync;
pub(crate) type InstantiateFn = dyn Fn() -> Box<dyn Any> + Send + Sync;

fn field_fn<F>(f: F) -> Arc<FieldFn>
where
    F: for<'a> Fn(&'a dyn Any) -> Option<Option<&'a dyn Any>> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn field_mut_fn<F>(f: F) -> Arc<FieldMutFn>
where
    F: for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn any_get_fn<F>(f: F) -> Arc<AnyGetFn>
where
    F: for<'a> Fn(&'a dyn Any) -> Option<&'a IndexMap<String, Value>> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn bean_mismatch<B>() -> DeserializeError {
    DeserializeError::custom(format!(
        "property accessor for {} was handed another type",
        type_name::<B>()
    ))
}

/// How a property's value is read from its bean.
#[derive(Clone)]
pub(crate) enum Getter {
    /// Borrowed from the bean; `Some(None)` is null.
    Field(Arc<FieldFn>),
    /// Computed on every read.
    Method(Arc<MethodFn>),
}

/// One property value read from a bean.
pub(crate) enum PropertyValue<'a> {
    Null,
    Borrowed(&'a dyn Any),
    Owned(Box<dyn Any>),
}

impl PropertyValue<'_> {
    pub(crate) fn as_any(&self) -> Option<&dyn Any> {
        match self {
            PropertyValue::Null => None,
            PropertyValue::Borrowed(value) => Some(*value),
            PropertyValue::Owned(value) => Some(value.as_ref()),
        }
    }
}

impl Getter {
    /// `None` when `bean` is not of the declaring type.
    pub(crate) fn read<'a>(&self, bean: &'a dyn Any) -> Option<PropertyValue<'a>> {
        match self {
            Getter::Field(get) => {
                get(bean).map(|value| value.map_or(PropertyValue::Null, PropertyValue::Borrowed))
            }
            Getter::Method(get) => {
                get(bean).map(|value| value.map_or(PropertyValue::Null, PropertyValue::Owned))
            }
        }
    }
}

/// Flattening of a nested bean into its parent's key space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unwrapped {
    /// Prepended to every flattened name.
    pub prefix: String,
    /// Appended to every flattened name.
    pub suffix: String,
    /// Child properties to leave out, by declared name.
    pub ignored: Vec<String>,
}

/// Where a dynamic map is spliced into the bean's key space.
#[derive(Clone)]
pub(crate) enum AnyRole {
    Getter(Arc<AnyGetFn>),
    Setter(Arc<AnySetFn>),
}

/// One declared property of a bean and every annotation fact about it.
#[derive(Clone)]
pub struct PropertyDescriptor {
    pub(crate) name: String,
    pub(crate) value_type: TypeKey,
    pub(crate) getter: Option<Getter>,
    pub(crate) setter: Option<Arc<SetFn>>,
    pub(crate) field_mut: Option<Arc<FieldMutFn>>,
    pub(crate) nullable: bool,
    pub(crate) any: Option<AnyRole>,
    pub(crate) ignored: bool,
    pub(crate) read_only: bool,
    pub(crate) write_only: bool,
    pub(crate) rename: Option<String>,
    pub(crate) naming: Option<Naming>,
    pub(crate) include: Option<Include>,
    pub(crate) serializer: Option<Arc<dyn Serializer>>,
    pub(crate) deserializer: Option<Arc<dyn Deserializer>>,
    pub(crate) unwrapped: Option<Unwrapped>,
    pub(crate) managed_ref: Option<String>,
    pub(crate) back_ref: Option<String>,
    pub(crate) json_value: bool,
    pub(crate) views: Vec<String>,
    pub(crate) order: Option<i32>,
    pub(crate) aliases: Vec<String>,
    pub(crate) required: bool,
}

impl PropertyDescriptor {
    fn bare<P: Any>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type: TypeKey::of::<P>(),
            getter: None,
            setter: None,
            field_mut: None,
            nullable: false,
            any: None,
            ignored: false,
            read_only: false,
            write_only: false,
            rename: None,
            naming: None,
            include: None,
            serializer: None,
            deserializer: None,
            unwrapped: None,
            managed_ref: None,
            back_ref: None,
            json_value: false,
            views: Vec::new(),
            order: None,
            aliases: Vec::new(),
            required: false,
        }
    }

    /// A property stored in the bean and read by reference.
    pub fn field<B: Any, P: Any>(
        name: impl Into<String>,
        get: impl for<'a> Fn(&'a B) -> &'a P + Send + Sync + 'static,
    ) -> Self {
        let read = field_fn(move |bean| {
            bean.downcast_ref::<B>()
                .map(|bean| Some(get(bean) as &dyn Any))
        });
        Self {
            getter: Some(Getter::Field(read)),
            ..Self::bare::<P>(name)
        }
    }

    /// A property that may be null, typically an `Option<P>` field read with
    /// `as_ref()`.
    pub fn nullable<B: Any, P: Any>(
        name: impl Into<String>,
        get: impl for<'a> Fn(&'a B) -> Option<&'a P> + Send + Sync + 'static,
    ) -> Self {
        let read = field_fn(move |bean| {
            bean.downcast_ref::<B>()
                .map(|bean| get(bean).map(|value| value as &dyn Any))
        });
        Self {
            getter: Some(Getter::Field(read)),
            nullable: true,
            ..Self::bare::<P>(name)
        }
    }

    /// A computed property, evaluated on every write.
    pub fn method<B: Any, P: Any>(
        name: impl Into<String>,
        get: impl Fn(&B) -> P + Send + Sync + 'static,
    ) -> Self {
        let read: Arc<MethodFn> = Arc::new(move |bean: &dyn Any| {
            bean.downcast_ref::<B>()
                .map(|bean| Some(Box::new(get(bean)) as Box<dyn Any>))
        });
        Self {
            getter: Some(Getter::Method(read)),
            ..Self::bare::<P>(name)
        }
    }

    /// A property that can only be written, such as a constructor-only input.
    pub fn setter<B: Any, P: Any>(
        name: impl Into<String>,
        set: impl Fn(&mut B, P) + Send + Sync + 'static,
    ) -> Self {
        Self::bare::<P>(name).with_setter(set)
    }

    /// A dynamic map whose entries are written as extra keys of the bean.
    pub fn any_getter<B: Any>(
        name: impl Into<String>,
        get: impl for<'a> Fn(&'a B) -> &'a IndexMap<String, Value> + Send + Sync + 'static,
    ) -> Self {
        let read = any_get_fn(move |bean| bean.downcast_ref::<B>().map(|bean| get(bean)));
        Self {
            any: Some(AnyRole::Getter(read)),
            ..Self::bare::<IndexMap<String, Value>>(name)
        }
    }

    /// Collects every key the bean does not declare.
    pub fn any_setter<B: Any>(
        name: impl Into<String>,
        set: impl Fn(&mut B, String, Value) + Send + Sync + 'static,
    ) -> Self {
        let write: Arc<AnySetFn> = Arc::new(move |bean: &mut dyn Any, key: String, value: Value| -> Result<(), DeserializeError> {
            let bean = bean.downcast_mut::<B>().ok_or_else(bean_mismatch::<B>)?;
            set(bean, key, value);
            Ok(())
        });
        Self {
            any: Some(AnyRole::Setter(write)),
            ..Self::bare::<IndexMap<String, Value>>(name)
        }
    }

    /// Write decoded values with `set`. A `null` in the input is rejected.
    pub fn with_setter<B: Any, P: Any>(
        mut self,
        set: impl Fn(&mut B, P) + Send + Sync + 'static,
    ) -> Self {
        self.setter = Some(Arc::new(
            move |bean: &mut dyn Any, value: Option<Box<dyn Any>>| -> Result<(), DeserializeError> {
                let bean = bean.downcast_mut::<B>().ok_or_else(bean_mismatch::<B>)?;
                match value {
                    Some(value) => {
                        set(bean, unbox::<P>(value)?);
                        Ok(())
                    }
                    None => Err(DeserializeError::new(DeserializeErrorKind::UnexpectedNull {
                        type_name: type_name::<P>(),
                    })),
                }
            },
        ));
        self
    }

    /// Write decoded values with `set`, passing `None` for `null`.
    pub fn with_nullable_setter<B: Any, P: Any>(
        mut self,
        set: impl Fn(&mut B, Option<P>) + Send + Sync + 'static,
    ) -> Self {
        self.setter = Some(Arc::new(
            move |bean: &mut dyn Any, value: Option<Box<dyn Any>>| -> Result<(), DeserializeError> {
                let bean = bean.downcast_mut::<B>().ok_or_else(bean_mismatch::<B>)?;
                set(bean, value.map(unbox::<P>).transpose()?);
                Ok(())
            },
        ));
        self.nullable = true;
        self
    }

    /// Mutable access to the field, needed to decode unwrapped properties.
    pub fn with_field_mut<B: Any, P: Any>(
        mut self,
        get: impl for<'a> Fn(&'a mut B) -> &'a mut P + Send + Sync + 'static,
    ) -> Self {
        self.field_mut = Some(field_mut_fn(move |bean| {
            bean.downcast_mut::<B>()
                .map(|bean| get(bean) as &mut dyn Any)
        }));
        self
    }

    /// Leave the property out entirely.
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Write the property but never read it.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Read the property but never write it.
    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    /// Serialize under `name`, regardless of naming strategies.
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(name.into());
        self
    }

    /// Override the bean's naming strategy for this property.
    pub fn naming(mut self, naming: impl Into<Naming>) -> Self {
        self.naming = Some(naming.into());
        self
    }

    /// Override the inclusion policy for this property.
    pub fn include(mut self, include: Include) -> Self {
        self.include = Some(include);
        self
    }

    /// Serialize with `serializer` instead of the registered one.
    pub fn serializer(mut self, serializer: impl Serializer + 'static) -> Self {
        self.serializer = Some(Arc::new(serializer));
        self
    }

    /// Deserialize with `deserializer` instead of the registered one.
    pub fn deserializer(mut self, deserializer: impl Deserializer + 'static) -> Self {
        self.deserializer = Some(Arc::new(deserializer));
        self
    }

    /// Flatten the nested bean into this bean's key space.
    pub fn unwrapped(mut self) -> Self {
        self.unwrapped = Some(Unwrapped::default());
        self
    }

    /// Flatten with a name prefix, suffix and child properties to drop.
    pub fn unwrapped_with(mut self, unwrapped: Unwrapped) -> Self {
        self.unwrapped = Some(unwrapped);
        self
    }

    /// The forward side of a parent/child link named `name`.
    pub fn managed_ref(mut self, name: impl Into<String>) -> Self {
        self.managed_ref = Some(name.into());
        self
    }

    /// The backward side of a parent/child link named `name`. Suppressed
    /// while the matching managed reference is being written.
    pub fn back_ref(mut self, name: impl Into<String>) -> Self {
        self.back_ref = Some(name.into());
        self
    }

    /// This property is the whole serialized form of the bean.
    pub fn json_value(mut self) -> Self {
        self.json_value = true;
        self
    }

    /// Only write the property while one of `views` is active.
    pub fn views<I, S>(mut self, views: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.views = views.into_iter().map(Into::into).collect();
        self
    }

    /// Explicit write position. Properties without one count as `0`, and
    /// ties keep declaration order.
    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// Extra names accepted when decoding.
    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// Fail decoding when the property is absent.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// The declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared value type.
    pub fn value_type(&self) -> TypeKey {
        self.value_type
    }

    /// Whether the property can be written.
    pub fn is_readable(&self) -> bool {
        self.getter.is_some() && !self.ignored && !self.write_only
    }

    /// Whether the property can be read from input.
    pub fn is_writable(&self) -> bool {
        self.setter.is_some() && !self.ignored && !self.read_only
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("value_type", &self.value_type.name())
            .field("readable", &self.is_readable())
            .field("writable", &self.is_writable())
            .finish_non_exhaustive()
    }
}

/// A polymorphic type discriminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// The key the discriminator is written under.
    pub property: String,
    /// The literal written, or the simple type name when `None`.
    pub value: Option<String>,
}

impl TypeInfo {
    /// The key used when none is configured.
    pub const DEFAULT_PROPERTY: &'static str = "@type";
}

/// The complete description of one bean type.
#[derive(Clone)]
pub struct BeanDescriptor {
    pub(crate) type_key: TypeKey,
    pub(crate) instantiate: Option<Arc<InstantiateFn>>,
    pub(crate) properties: Vec<PropertyDescriptor>,
    pub(crate) naming: Option<Naming>,
    pub(crate) include: Option<Include>,
    pub(crate) wrapper: Option<String>,
    pub(crate) type_info: Option<TypeInfo>,
    pub(crate) ignore_unknown: Option<bool>,
    pub(crate) ignored: Vec<String>,
    pub(crate) filter: Option<Arc<dyn PropertyFilter>>,
}

impl BeanDescriptor {
    /// A descriptor for `B` that can only be serialized until an
    /// instantiator is supplied.
    pub fn new<B: Any>() -> Self {
        Self {
            type_key: TypeKey::of::<B>(),
            instantiate: None,
            properties: Vec::new(),
            naming: None,
            include: None,
            wrapper: None,
            type_info: None,
            ignore_unknown: None,
            ignored: Vec::new(),
            filter: None,
        }
    }

    /// A descriptor for `B`, decoded into `B::default()`.
    pub fn of<B: Any + Default>() -> Self {
        Self::new::<B>().instantiate_with(B::default)
    }

    /// Create empty instances with `create`.
    pub fn instantiate_with<B: Any>(mut self, create: impl Fn() -> B + Send + Sync + 'static) -> Self {
        self.instantiate = Some(Arc::new(move || Box::new(create()) as Box<dyn Any>));
        self
    }

    /// Append a property.
    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    /// Naming strategy for properties that do not declare one.
    pub fn naming(mut self, naming: impl Into<Naming>) -> Self {
        self.naming = Some(naming.into());
        self
    }

    /// Inclusion policy for properties that do not declare one.
    pub fn include(mut self, include: Include) -> Self {
        self.include = Some(include);
        self
    }

    /// Nest the whole object under a single key.
    pub fn wrapper(mut self, name: impl Into<String>) -> Self {
        self.wrapper = Some(name.into());
        self
    }

    /// Write a discriminator under `property`: `value`, or the simple type
    /// name when `value` is `None`.
    pub fn type_property(mut self, property: impl Into<String>, value: Option<&str>) -> Self {
        self.type_info = Some(TypeInfo {
            property: property.into(),
            value: value.map(str::to_owned),
        });
        self
    }

    /// Override the unknown property policy for this bean.
    pub fn ignore_unknown(mut self, ignore: bool) -> Self {
        self.ignore_unknown = Some(ignore);
        self
    }

    /// Names that are neither written nor read. Input keys with these names
    /// are skipped silently.
    pub fn ignored<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored.extend(names.into_iter().map(Into::into));
        self
    }

    /// Decide inclusion per value with `filter`, overriding every policy.
    pub fn property_filter(mut self, filter: impl PropertyFilter + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// The described type.
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// Declared properties, in declaration order.
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub(crate) fn is_ignored(&self, name: &str) -> bool {
        self.ignored.iter().any(|n| n == name)
    }
}

impl fmt::Debug for BeanDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDescriptor")
            .field("type", &self.type_key.name())
            .field("properties", &self.properties)
            .field("wrapper", &self.wrapper)
            .field("type_info", &self.type_info)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_testhelpers::test;

    #[derive(Default)]
    struct Point {
        x: i32,
        label: Option<String>,
    }

    #[test]
    fn erased_accessors() {
        let x = PropertyDescriptor::field("x", |p: &Point| &p.x)
            .with_setter(|p: &mut Point, v: i32| p.x = v);
        let label = PropertyDescriptor::nullable("label", |p: &Point| p.label.as_ref())
            .with_nullable_setter(|p: &mut Point, v: Option<String>| p.label = v);

        let mut point = Point::default();
        let setter = x.setter.clone().unwrap();
        setter(&mut point, Some(Box::new(7_i32))).unwrap();
        assert_eq!(point.x, 7);

        let err = setter(&mut point, None).unwrap_err();
        assert!(matches!(err.kind, DeserializeErrorKind::UnexpectedNull { .. }));

        let read = x.getter.as_ref().unwrap().read(&point).unwrap();
        assert_eq!(read.as_any().and_then(|v| v.downcast_ref::<i32>()), Some(&7));

        let read = label.getter.as_ref().unwrap().read(&point).unwrap();
        assert!(read.as_any().is_none());

        (label.setter.clone().unwrap())(&mut point, None).unwrap();
        assert!(label.nullable);
        assert!(x.getter.as_ref().unwrap().read(&42_u8).is_none());
    }

    #[test]
    fn method_getter_owns_its_result() {
        let double = PropertyDescriptor::method("double", |p: &Point| p.x * 2);
        let point = Point {
            x: 21,
            label: None,
        };
        let value = double.getter.as_ref().unwrap().read(&point).unwrap();
        assert!(matches!(value, PropertyValue::Owned(_)));
        assert_eq!(value.as_any().and_then(|v| v.downcast_ref::<i32>()), Some(&42));
        assert!(double.is_readable());
        assert!(!double.is_writable());
    }
}
