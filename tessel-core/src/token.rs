use core::fmt;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};
use rust_decimal::Decimal;

/// Numeric payload of a [`Token::Number`].
///
/// Tokenizers report the narrowest representation they can produce without
/// loss; the decoder converts between kinds on demand.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 64-bit integer that does not fit an `i64`.
    U64(u64),
    /// Floating point literal.
    F64(f64),
    /// Integer literal outside the 64-bit range.
    BigInt(BigInt),
    /// Decimal literal that must not lose precision.
    Decimal(Decimal),
}

impl Number {
    /// Convert to `i64`, saturating out-of-range floats and big numbers and
    /// wrapping `u64` (a primitive cast).
    pub fn to_i64_lossy(&self) -> i64 {
        match self {
            Number::I64(v) => *v,
            Number::U64(v) => *v as i64,
            Number::F64(v) => *v as i64,
            Number::BigInt(v) => v.to_i64().unwrap_or(if v.is_negative() {
                i64::MIN
            } else {
                i64::MAX
            }),
            Number::Decimal(v) => v.to_i64().unwrap_or(if v.is_sign_negative() {
                i64::MIN
            } else {
                i64::MAX
            }),
        }
    }

    /// Convert to `u64` with the same cast rules as [`Number::to_i64_lossy`].
    pub fn to_u64_lossy(&self) -> u64 {
        match self {
            Number::I64(v) => *v as u64,
            Number::U64(v) => *v,
            Number::F64(v) => *v as u64,
            Number::BigInt(v) => v
                .to_u64()
                .unwrap_or(if v.is_negative() { 0 } else { u64::MAX }),
            Number::Decimal(v) => v
                .to_u64()
                .unwrap_or(if v.is_sign_negative() { 0 } else { u64::MAX }),
        }
    }

    /// Widen to `f64`.
    pub fn to_f64(&self) -> f64 {
        match self {
            Number::I64(v) => *v as f64,
            Number::U64(v) => *v as f64,
            Number::F64(v) => *v,
            Number::BigInt(v) => v.to_f64().unwrap_or(f64::NAN),
            Number::Decimal(v) => v.to_f64().unwrap_or(f64::NAN),
        }
    }

    /// Exact conversion to a big integer; fractions are truncated.
    ///
    /// Returns `None` for non-finite floats.
    pub fn to_big_int(&self) -> Option<BigInt> {
        match self {
            Number::I64(v) => Some(BigInt::from(*v)),
            Number::U64(v) => Some(BigInt::from(*v)),
            Number::F64(v) => BigInt::from_f64(*v),
            Number::BigInt(v) => Some(v.clone()),
            Number::Decimal(v) => v.trunc().normalize().to_string().parse().ok(),
        }
    }

    /// Exact conversion to a decimal.
    ///
    /// Returns `None` for non-finite floats and integers beyond 96 bits.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Number::I64(v) => Some(Decimal::from(*v)),
            Number::U64(v) => Some(Decimal::from(*v)),
            Number::F64(v) => Decimal::try_from(*v).ok(),
            Number::BigInt(v) => Decimal::from_str_exact(&v.to_string()).ok(),
            Number::Decimal(v) => Some(*v),
        }
    }

    /// Whether the number compares equal to zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Number::I64(v) => *v == 0,
            Number::U64(v) => *v == 0,
            Number::F64(v) => *v == 0.0,
            Number::BigInt(v) => v.is_zero(),
            Number::Decimal(v) => v.is_zero(),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::I64(v) => write!(f, "{v}"),
            Number::U64(v) => write!(f, "{v}"),
            Number::F64(v) => write!(f, "{v}"),
            Number::BigInt(v) => write!(f, "{v}"),
            Number::Decimal(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::I64(value)
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => Number::I64(v),
            Err(_) => Number::U64(value),
        }
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::F64(value)
    }
}

/// One lexical event produced by a tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `[`
    StartArray,
    /// `]`
    EndArray,
    /// `{`
    StartObject,
    /// `}`
    EndObject,
    /// An object key. Always followed by exactly one value.
    Key(String),
    /// Numeric scalar.
    Number(Number),
    /// String scalar.
    String(String),
    /// Boolean scalar.
    Boolean(bool),
    /// Null literal.
    Null,
    /// Format-specific scalar with no direct equivalent (dates, binary, ...),
    /// carried as its textual form.
    Other(String),
}

impl Token {
    /// Short human-readable description used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Token::StartArray => "start of array",
            Token::EndArray => "end of array",
            Token::StartObject => "start of object",
            Token::EndObject => "end of object",
            Token::Key(_) => "key",
            Token::Number(_) => "number",
            Token::String(_) => "string",
            Token::Boolean(_) => "boolean",
            Token::Null => "null",
            Token::Other(_) => "other",
        }
    }

    /// Whether this token opens an array or object.
    pub fn is_structure_start(&self) -> bool {
        matches!(self, Token::StartArray | Token::StartObject)
    }

    /// Whether this token closes an array or object.
    pub fn is_structure_end(&self) -> bool {
        matches!(self, Token::EndArray | Token::EndObject)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Key(key) => write!(f, "key {key:?}"),
            Token::Number(n) => write!(f, "number {n}"),
            Token::String(s) => write!(f, "string {s:?}"),
            Token::Boolean(b) => write!(f, "boolean {b}"),
            Token::Other(s) => write!(f, "other {s:?}"),
            other => f.write_str(other.describe()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_testhelpers::test;

    #[test]
    fn lossy_integer_casts() {
        assert_eq!(Number::F64(42.9).to_i64_lossy(), 42);
        assert_eq!(Number::F64(f64::INFINITY).to_i64_lossy(), i64::MAX);
        assert_eq!(Number::U64(u64::MAX).to_i64_lossy(), -1);
        let big: BigInt = "-100000000000000000000000".parse().unwrap();
        assert_eq!(Number::BigInt(big).to_i64_lossy(), i64::MIN);
    }

    #[test]
    fn exact_big_conversions() {
        let d: Decimal = "12.75".parse().unwrap();
        assert_eq!(Number::Decimal(d).to_big_int(), Some(BigInt::from(12)));
        assert_eq!(Number::F64(f64::NAN).to_big_int(), None);
        assert_eq!(
            Number::I64(7).to_decimal(),
            Some(Decimal::from(7)),
        );
    }

    #[test]
    fn u64_prefers_i64_when_it_fits() {
        assert_eq!(Number::from(5u64), Number::I64(5));
        assert_eq!(Number::from(u64::MAX), Number::U64(u64::MAX));
    }
}
