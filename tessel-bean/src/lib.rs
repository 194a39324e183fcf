#![deny(unsafe_code)]
#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

//! Bean serialization for tessel.
//!
//! Types are described once with a [`BeanDescriptor`] and registered in a
//! [`DefaultRegistry`]. The registry turns descriptors into memoized
//! [`SerBean`] and [`DeserBean`] models, which [`ObjectSerializer`] and
//! [`ObjectDeserializer`] walk to drive any [`Encoder`](tessel_core::Encoder)
//! or [`Decoder`](tessel_core::Decoder).
//!
//! ```
//! use tessel_bean::{BeanDescriptor, DefaultRegistry, EncoderContext, PropertyDescriptor, Registry, TypeKey};
//! use tessel_stream::TokenEncoder;
//!
//! #[derive(Default)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! let registry = DefaultRegistry::default();
//! registry.register_bean(
//!     BeanDescriptor::of::<Point>()
//!         .property(PropertyDescriptor::field("x", |p: &Point| &p.x).with_setter(|p: &mut Point, v: i32| p.x = v))
//!         .property(PropertyDescriptor::field("y", |p: &Point| &p.y).with_setter(|p: &mut Point, v: i32| p.y = v)),
//! );
//!
//! let serializer = registry.find_serializer(TypeKey::of::<Point>()).unwrap();
//! let mut encoder = TokenEncoder::new();
//! let mut context = EncoderContext::new(&registry);
//! serializer
//!     .serialize(&mut encoder, &mut context, &Point { x: 1, y: 2 })
//!     .unwrap();
//! assert_eq!(encoder.tokens().len(), 6);
//! ```

mod builtins;
mod cache;
mod codec;
mod config;
mod context;
mod descriptor;
mod include;
mod model;
mod naming;
mod object;
mod polymorphic;
mod registry;
mod tracing_macros;
mod type_key;

pub use cache::ModelCache;
pub use codec::{Deserializer, FnDeserializer, FnSerializer, Serializer, downcast, unbox};
pub use config::SerdeConfig;
pub use context::{DecoderContext, EncoderContext};
pub use descriptor::{BeanDescriptor, PropertyDescriptor, TypeInfo, Unwrapped};
pub use include::{Include, PropertyFilter};
pub use model::{DeserBean, ReadProperty, SerBean, WriteProperty};
pub use naming::{Naming, NamingStrategy, PropertyNaming};
pub use object::{ObjectDeserializer, ObjectSerializer};
pub use polymorphic::{PolymorphicDeserializer, PolymorphicSerializer, Subtypes, Variant};
pub use registry::{DefaultRegistry, Registry};
pub use type_key::TypeKey;
