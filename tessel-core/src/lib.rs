#![deny(unsafe_code)]
#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

//! Token model and encoder/decoder contracts shared by every tessel crate.
//!
//! A format tokenizer produces [`Token`]s through a [`TokenSource`]; decoders
//! built on top of it implement [`Decoder`], and serializers write through an
//! [`Encoder`]. Neither side knows about the concrete wire format.

mod decoder;
mod encoder;
mod error;
mod limits;
mod path;
mod source;
mod token;
mod value;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{DeserializeError, DeserializeErrorKind, IntrospectionError, SerializeError};
pub use limits::{DEFAULT_MAXIMUM_DEPTH, Limits};
pub use path::{Path, PathStep};
pub use source::{IterSource, TokenSource};
pub use token::{Number, Token};
pub use value::Value;

// Re-exported so downstream crates agree on the big number types.
pub use num_bigint::BigInt;
pub use rust_decimal::Decimal;
