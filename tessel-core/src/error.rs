//! Error taxonomy.
//!
//! Data problems surface as [`DeserializeError`] or [`SerializeError`]. Types
//! that cannot be handled at all surface as [`IntrospectionError`]. Calling an
//! encoder or decoder in the wrong state is a bug in the caller and panics.

use core::fmt;

/// A type lacks the metadata it needs to be serialized or deserialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntrospectionError {
    /// No bean descriptor was registered for the type.
    NotIntrospected {
        /// The type in question.
        type_name: &'static str,
    },
    /// No serializer is known for the type.
    NoSerializer {
        /// The type in question.
        type_name: &'static str,
    },
    /// No deserializer is known for the type.
    NoDeserializer {
        /// The type in question.
        type_name: &'static str,
    },
    /// More than one property or method claims to be the json value.
    MultipleJsonValues {
        /// The offending bean.
        type_name: &'static str,
    },
    /// A naming strategy name did not resolve.
    UnknownNamingStrategy {
        /// The name that was looked up.
        name: String,
    },
    /// An unwrapped property must be read through a field accessor.
    UnwrappedMethod {
        /// The offending bean.
        type_name: &'static str,
        /// The unwrapped property.
        property: String,
    },
    /// The bean has no way to create an empty instance.
    NoInstantiator {
        /// The offending bean.
        type_name: &'static str,
    },
}

impl fmt::Display for IntrospectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntrospectionError::NotIntrospected { type_name } => write!(
                f,
                "No bean introspection available for type [{type_name}]. Register a bean descriptor for it"
            ),
            IntrospectionError::NoSerializer { type_name } => {
                write!(f, "No serializer found for type: {type_name}")
            }
            IntrospectionError::NoDeserializer { type_name } => {
                write!(f, "No deserializer found for type: {type_name}")
            }
            IntrospectionError::MultipleJsonValues { type_name } => write!(
                f,
                "Type [{type_name}] declares more than one json value property or method"
            ),
            IntrospectionError::UnknownNamingStrategy { name } => {
                write!(f, "Unknown naming strategy: {name}")
            }
            IntrospectionError::UnwrappedMethod {
                type_name,
                property,
            } => write!(
                f,
                "Unwrapped property [{property}] of type [{type_name}] must be read through a field accessor"
            ),
            IntrospectionError::NoInstantiator { type_name } => {
                write!(f, "Type [{type_name}] cannot be instantiated")
            }
        }
    }
}

impl core::error::Error for IntrospectionError {}

/// What went wrong while decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum DeserializeErrorKind {
    /// A token of the wrong kind was found.
    UnexpectedToken {
        /// What the decoder was looking for.
        expected: &'static str,
        /// What it found instead.
        got: String,
    },
    /// The token source ran dry in the middle of a value.
    UnexpectedEof {
        /// What the decoder was looking for.
        expected: &'static str,
    },
    /// A string could not be parsed into the requested scalar.
    Coercion {
        /// The scalar being decoded.
        target: &'static str,
    },
    /// A well-formed number does not fit the requested scalar.
    OutOfRange {
        /// The scalar being decoded.
        target: &'static str,
    },
    /// A scalar was given as an array of more than one element.
    MultipleValues {
        /// The scalar being decoded.
        expected: &'static str,
    },
    /// The nesting budget was exhausted.
    DepthExceeded {
        /// The configured maximum.
        limit: usize,
    },
    /// An undeclared key was found and unknown keys are not ignored.
    UnknownProperty {
        /// The key.
        property: String,
        /// The bean being decoded.
        type_name: &'static str,
    },
    /// A required property was absent.
    MissingProperty {
        /// The serialized name of the property.
        property: String,
        /// The bean being decoded.
        type_name: &'static str,
    },
    /// `null` was found where the target cannot hold it.
    UnexpectedNull {
        /// The target type.
        type_name: &'static str,
    },
    /// The target type cannot be decoded at all.
    Introspection(IntrospectionError),
    /// Free-form message from a hand-written deserializer.
    Custom(String),
}

impl fmt::Display for DeserializeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeserializeErrorKind::UnexpectedToken { expected, got } => {
                write!(f, "Unexpected token {got}, expected {expected}")
            }
            DeserializeErrorKind::UnexpectedEof { expected } => {
                write!(f, "Unexpected end of input, expected {expected}")
            }
            DeserializeErrorKind::Coercion { target } => {
                write!(f, "Unable to coerce string to {target}")
            }
            DeserializeErrorKind::OutOfRange { target } => {
                write!(f, "Number out of range for {target}")
            }
            DeserializeErrorKind::MultipleValues { expected } => {
                write!(f, "Expected one {expected}, but got array of multiple values")
            }
            DeserializeErrorKind::DepthExceeded { limit } => write!(
                f,
                "Maximum depth of {limit} exceeded while deserializing. The maximum nesting depth can be increased, if necessary"
            ),
            DeserializeErrorKind::UnknownProperty {
                property,
                type_name,
            } => write!(
                f,
                "Unknown property [{property}] encountered during deserialization of type: {type_name}"
            ),
            DeserializeErrorKind::MissingProperty {
                property,
                type_name,
            } => write!(
                f,
                "Missing required property [{property}] for type: {type_name}"
            ),
            DeserializeErrorKind::UnexpectedNull { type_name } => {
                write!(f, "Unexpected null value for non-nullable type: {type_name}")
            }
            DeserializeErrorKind::Introspection(error) => write!(f, "{error}"),
            DeserializeErrorKind::Custom(message) => f.write_str(message),
        }
    }
}

/// A recoverable decoding failure caused by the input.
#[derive(Debug, Clone, PartialEq)]
pub struct DeserializeError {
    /// What went wrong.
    pub kind: DeserializeErrorKind,
    /// Where it went wrong, if known.
    pub path: Option<String>,
    /// The raw offending value, if there was one.
    pub invalid_value: Option<String>,
}

impl DeserializeError {
    /// An error of the given kind with no location.
    pub const fn new(kind: DeserializeErrorKind) -> Self {
        Self {
            kind,
            path: None,
            invalid_value: None,
        }
    }

    /// A free-form error.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::new(DeserializeErrorKind::Custom(message.into()))
    }

    /// Attach a path unless one is already recorded.
    pub fn with_path(mut self, path: impl fmt::Display) -> Self {
        if self.path.is_none() {
            self.path = Some(path.to_string());
        }
        self
    }

    /// Attach the raw offending value.
    pub fn with_invalid_value(mut self, value: impl Into<String>) -> Self {
        self.invalid_value = Some(value.into());
        self
    }
}

impl From<DeserializeErrorKind> for DeserializeError {
    fn from(kind: DeserializeErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<IntrospectionError> for DeserializeError {
    fn from(error: IntrospectionError) -> Self {
        Self::new(DeserializeErrorKind::Introspection(error))
    }
}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(path) = &self.path {
            write!(f, " at {path}")?;
        }
        if let Some(value) = &self.invalid_value {
            write!(f, " (invalid value: {value})")?;
        }
        Ok(())
    }
}

impl core::error::Error for DeserializeError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match &self.kind {
            DeserializeErrorKind::Introspection(error) => Some(error),
            _ => None,
        }
    }
}

/// A failure while encoding a value.
#[derive(Debug, Clone, PartialEq)]
pub enum SerializeError {
    /// The nesting budget was exhausted.
    DepthExceeded {
        /// The configured maximum.
        limit: usize,
        /// Where the limit was hit.
        path: String,
    },
    /// A self-referential graph without cycle breaking was encountered.
    InfiniteRecursion {
        /// The bean whose serialization ran away.
        type_name: &'static str,
        /// Where the runaway was detected.
        path: String,
    },
    /// Serializing one property failed.
    Property {
        /// The serialized name of the property.
        property: String,
        /// Where the property lives.
        path: String,
        /// The underlying failure.
        source: Box<SerializeError>,
    },
    /// The value cannot be serialized at all.
    Introspection(IntrospectionError),
    /// A serializer was handed a value of the wrong type.
    TypeMismatch {
        /// The type the serializer handles.
        expected: &'static str,
        /// Where the value was found.
        path: String,
    },
    /// Free-form message from a hand-written serializer.
    Custom(String),
}

impl SerializeError {
    /// A free-form error.
    pub fn custom(message: impl Into<String>) -> Self {
        SerializeError::Custom(message.into())
    }

    /// The innermost error, looking through property wrappers.
    pub fn root_cause(&self) -> &SerializeError {
        let mut current = self;
        while let SerializeError::Property { source, .. } = current {
            current = source;
        }
        current
    }
}

impl From<IntrospectionError> for SerializeError {
    fn from(error: IntrospectionError) -> Self {
        SerializeError::Introspection(error)
    }
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializeError::DepthExceeded { limit, path } => write!(
                f,
                "Maximum depth of {limit} exceeded while serializing at {path}. The maximum nesting depth can be increased, if necessary"
            ),
            SerializeError::InfiniteRecursion { type_name, path } => {
                write!(f, "Infinite recursion serializing type: {type_name} at path {path}")
            }
            SerializeError::Property {
                property,
                path,
                source,
            } => write!(
                f,
                "Error serializing property [{property}] at path {path}: {source}"
            ),
            SerializeError::Introspection(error) => {
                write!(f, "Error serializing value: {error}")
            }
            SerializeError::TypeMismatch { expected, path } => {
                write!(f, "Value at path {path} is not a {expected}")
            }
            SerializeError::Custom(message) => f.write_str(message),
        }
    }
}

impl core::error::Error for SerializeError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            SerializeError::Property { source, .. } => Some(source.as_ref()),
            SerializeError::Introspection(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_testhelpers::test;

    #[test]
    fn deserialize_error_display() {
        let err = DeserializeError::new(DeserializeErrorKind::Coercion { target: "integer" })
            .with_path("$.age")
            .with_invalid_value("abc");
        assert_eq!(
            err.to_string(),
            "Unable to coerce string to integer at $.age (invalid value: abc)"
        );
    }

    #[test]
    fn first_path_wins() {
        let err = DeserializeError::custom("boom").with_path("$.a").with_path("$");
        assert_eq!(err.path.as_deref(), Some("$.a"));
    }

    #[test]
    fn root_cause_looks_through_properties() {
        let inner = SerializeError::InfiniteRecursion {
            type_name: "Node",
            path: "$.next".into(),
        };
        let err = SerializeError::Property {
            property: "next".into(),
            path: "$".into(),
            source: Box::new(inner.clone()),
        };
        assert_eq!(err.root_cause(), &inner);
    }
}
