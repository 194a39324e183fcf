#![deny(unsafe_code)]
#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

//! Streaming decoder for tessel.
//!
//! [`StreamDecoder`] turns any [`TokenSource`](tessel_core::TokenSource) into
//! a [`Decoder`](tessel_core::Decoder): structural traversal, scalar coercion
//! with single-element array unwrapping, iterative arbitrary-value decoding,
//! buffering and depth limits. [`TokenEncoder`] is the matching in-memory
//! [`Encoder`](tessel_core::Encoder).

mod buffer;
pub mod coercion;
mod decoder;
mod encoder;
mod tracing_macros;
mod value_source;

pub use buffer::TokenBuffer;
pub use coercion::CoercionFailure;
pub use decoder::StreamDecoder;
pub use encoder::TokenEncoder;
pub use value_source::ValueSource;
