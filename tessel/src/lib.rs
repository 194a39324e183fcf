#![deny(unsafe_code)]
#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

//! Reflection-free bean serialization.
//!
//! Describe a type once with a [`BeanDescriptor`], register it with a
//! [`Tessel`] and convert values to and from token streams or dynamic
//! [`Value`]s. Any format that can produce [`Token`]s through a
//! [`TokenSource`] plugs into the same decoder.
//!
//! ```
//! use tessel::{BeanDescriptor, PropertyDescriptor, SerdeConfig, Tessel};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Book {
//!     title: String,
//!     pages: u32,
//! }
//!
//! let tessel = Tessel::new(SerdeConfig::default());
//! tessel.registry().register_bean(
//!     BeanDescriptor::of::<Book>()
//!         .property(
//!             PropertyDescriptor::field("title", |b: &Book| &b.title)
//!                 .with_setter(|b: &mut Book, v: String| b.title = v),
//!         )
//!         .property(
//!             PropertyDescriptor::field("pages", |b: &Book| &b.pages)
//!                 .with_setter(|b: &mut Book, v: u32| b.pages = v),
//!         ),
//! );
//!
//! let book = Book { title: "Dune".into(), pages: 412 };
//! let value = tessel.to_value(&book).unwrap();
//! assert_eq!(value.to_string(), r#"{"title":"Dune","pages":412}"#);
//! assert_eq!(tessel.from_value::<Book>(value).unwrap(), book);
//! ```

use core::any::{Any, type_name};
use std::sync::Arc;

/// Trace-level logging macro that forwards to `tracing::trace!` when the `tracing` feature is enabled.
#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {
        ::tracing::trace!($($arg)*)
    };
}

/// Trace-level logging macro (no-op when `tracing` feature is disabled).
#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

pub use tessel_bean::{
    BeanDescriptor, DecoderContext, DefaultRegistry, DeserBean, Deserializer, EncoderContext,
    FnDeserializer, FnSerializer, Include, Naming, NamingStrategy, PropertyDescriptor,
    PropertyFilter, PropertyNaming, Registry, SerBean, SerdeConfig, Serializer, Subtypes, TypeInfo,
    TypeKey, Unwrapped, downcast, unbox,
};
pub use tessel_core::{
    BigInt, Decimal, Decoder, DeserializeError, DeserializeErrorKind, Encoder, IntrospectionError,
    IterSource, Limits, Number, SerializeError, Token, TokenSource, Value,
};
pub use tessel_stream::{StreamDecoder, TokenBuffer, TokenEncoder, ValueSource};

/// Entry point: a registry plus the configuration it was built with.
///
/// Cloning is cheap and clones share the registry.
#[derive(Clone)]
pub struct Tessel {
    registry: Arc<DefaultRegistry>,
}

impl Default for Tessel {
    fn default() -> Self {
        Self::new(SerdeConfig::default())
    }
}

impl Tessel {
    /// A fresh registry with the built-in serializers and `config`.
    pub fn new(config: SerdeConfig) -> Self {
        Self::with_registry(Arc::new(DefaultRegistry::new(config)))
    }

    /// Use an existing registry.
    pub fn with_registry(registry: Arc<DefaultRegistry>) -> Self {
        Self { registry }
    }

    /// The registry, for registering beans and serializers.
    pub fn registry(&self) -> &DefaultRegistry {
        &self.registry
    }

    /// The configuration every operation runs with.
    pub fn config(&self) -> &SerdeConfig {
        self.registry.config()
    }

    /// Write `value` through `encoder`.
    pub fn serialize_into<T: Any>(
        &self,
        encoder: &mut dyn Encoder,
        value: &T,
    ) -> Result<(), SerializeError> {
        let serializer = self.registry.find_serializer(TypeKey::of::<T>())?;
        let mut context = EncoderContext::new(&*self.registry);
        serializer.serialize(encoder, &mut context, value)
    }

    /// Read one `T` from `decoder`. Trailing input is left for the caller.
    pub fn deserialize_from<T: Any>(&self, decoder: &mut dyn Decoder) -> Result<T, DeserializeError> {
        let deserializer = self.registry.find_deserializer(TypeKey::of::<T>())?;
        let mut context = DecoderContext::new(&*self.registry);
        match deserializer.deserialize_nullable(decoder, &mut context)? {
            Some(value) => unbox(value),
            None => Err(DeserializeError::new(DeserializeErrorKind::UnexpectedNull {
                type_name: type_name::<T>(),
            })
            .with_path(decoder.current_path())),
        }
    }

    /// Read exactly one `T` from `source`.
    pub fn deserialize_source<T: Any>(&self, source: impl TokenSource) -> Result<T, DeserializeError> {
        let mut decoder = StreamDecoder::with_limits(source, self.config().limits())?;
        let value = self.deserialize_from(&mut decoder)?;
        decoder.end()?;
        Ok(value)
    }

    /// Serialize `value` into tokens.
    pub fn to_tokens<T: Any>(&self, value: &T) -> Result<Vec<Token>, SerializeError> {
        let mut encoder = TokenEncoder::with_limits(self.config().limits());
        self.serialize_into(&mut encoder, value)?;
        let tokens = encoder.into_tokens();
        trace!("{} serialized to {} tokens", type_name::<T>(), tokens.len());
        Ok(tokens)
    }

    /// Deserialize exactly one `T` from `tokens`.
    pub fn from_tokens<T: Any>(
        &self,
        tokens: impl IntoIterator<Item = Token>,
    ) -> Result<T, DeserializeError> {
        self.deserialize_source(IterSource::new(tokens))
    }

    /// Serialize `value` into a dynamic [`Value`].
    pub fn to_value<T: Any>(&self, value: &T) -> Result<Value, SerializeError> {
        let tokens = self.to_tokens(value)?;
        let limits = self.config().limits();
        StreamDecoder::with_limits(IterSource::new(tokens), limits)
            .and_then(|mut decoder| decoder.decode_arbitrary())
            .map_err(|error| SerializeError::custom(error.to_string()))
    }

    /// Deserialize exactly one `T` from a dynamic [`Value`].
    pub fn from_value<T: Any>(&self, value: Value) -> Result<T, DeserializeError> {
        self.deserialize_source(ValueSource::new(value))
    }
}
