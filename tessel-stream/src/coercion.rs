//! Scalar coercion rules.
//!
//! Each rule looks at one token and answers with `Ok(Some(value))` when the
//! token maps to the target (directly or by coercion), `Ok(None)` when the
//! token kind does not apply, and `Err` when a string could not be parsed and
//! the policy for the target makes that fatal.
//!
//! | token   | bool          | integers        | floats        | big numbers         |
//! |---------|---------------|-----------------|---------------|---------------------|
//! | string  | `"true"` only | parse, fatal    | parse, fatal  | parse, zero on fail |
//! | number  | non-zero      | cast            | widen         | exact               |
//! | boolean | direct        | 1 / 0           | 1.0 / 0.0     | 1 / 0               |
//!
//! Numbers, and numeric strings, that a big number type cannot hold are
//! reported as out of range.

use core::fmt;

use num_bigint::BigInt;
use num_traits::{One, Zero};
use rust_decimal::Decimal;
use tessel_core::{DeserializeError, DeserializeErrorKind, Token};

/// A token that could not be turned into the requested scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionFailure {
    /// The scalar being decoded, as named in error messages.
    pub target: &'static str,
    /// The offending text.
    pub value: String,
    /// The value is a well-formed number that does not fit the target.
    pub out_of_range: bool,
}

impl CoercionFailure {
    fn new(target: &'static str, value: &str) -> Self {
        Self {
            target,
            value: value.to_owned(),
            out_of_range: false,
        }
    }

    fn out_of_range(target: &'static str, value: impl fmt::Display) -> Self {
        Self {
            target,
            value: value.to_string(),
            out_of_range: true,
        }
    }
}

impl fmt::Display for CoercionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.out_of_range {
            write!(f, "Number out of range for {}: {}", self.target, self.value)
        } else {
            write!(f, "Unable to coerce string to {}: {}", self.target, self.value)
        }
    }
}

impl From<CoercionFailure> for DeserializeError {
    fn from(failure: CoercionFailure) -> Self {
        let kind = if failure.out_of_range {
            DeserializeErrorKind::OutOfRange {
                target: failure.target,
            }
        } else {
            DeserializeErrorKind::Coercion {
                target: failure.target,
            }
        };
        DeserializeError::new(kind).with_invalid_value(failure.value)
    }
}

/// Outcome of a coercion rule.
pub type Coerced<T> = Result<Option<T>, CoercionFailure>;

/// Strings render to themselves; numbers, booleans and format-specific
/// scalars render to their textual form.
pub fn to_string(token: &Token) -> Coerced<String> {
    Ok(match token {
        Token::String(s) | Token::Other(s) => Some(s.clone()),
        Token::Number(n) => Some(n.to_string()),
        Token::Boolean(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Only the exact string `"true"` is true; any other string is false.
pub fn to_bool(token: &Token) -> Coerced<bool> {
    Ok(match token {
        Token::Boolean(b) => Some(*b),
        Token::String(s) => Some(s == "true"),
        Token::Number(n) => Some(!n.is_zero()),
        _ => None,
    })
}

/// Narrow integers parse strings as 32-bit and wrap, like a primitive cast.
pub fn to_i8(token: &Token) -> Coerced<i8> {
    Ok(to_i32_with(token, "byte")?.map(|v| v as i8))
}

/// See [`to_i8`].
pub fn to_i16(token: &Token) -> Coerced<i16> {
    Ok(to_i32_with(token, "short")?.map(|v| v as i16))
}

/// Strings must parse as a 32-bit integer. Surrounding whitespace is not
/// allowed.
pub fn to_i32(token: &Token) -> Coerced<i32> {
    to_i32_with(token, "integer")
}

fn to_i32_with(token: &Token, target: &'static str) -> Coerced<i32> {
    Ok(match token {
        Token::Number(n) => Some(n.to_i64_lossy() as i32),
        Token::String(s) => Some(
            s.parse::<i32>()
                .map_err(|_| CoercionFailure::new(target, s))?,
        ),
        Token::Boolean(b) => Some(i32::from(*b)),
        _ => None,
    })
}

/// Strings must parse as a 64-bit integer.
pub fn to_i64(token: &Token) -> Coerced<i64> {
    Ok(match token {
        Token::Number(n) => Some(n.to_i64_lossy()),
        Token::String(s) => Some(
            s.parse::<i64>()
                .map_err(|_| CoercionFailure::new("long", s))?,
        ),
        Token::Boolean(b) => Some(i64::from(*b)),
        _ => None,
    })
}

/// Strings must parse as an unsigned 64-bit integer.
pub fn to_u64(token: &Token) -> Coerced<u64> {
    Ok(match token {
        Token::Number(n) => Some(n.to_u64_lossy()),
        Token::String(s) => Some(
            s.parse::<u64>()
                .map_err(|_| CoercionFailure::new("unsigned long", s))?,
        ),
        Token::Boolean(b) => Some(u64::from(*b)),
        _ => None,
    })
}

/// Strings must parse as a float, ignoring surrounding whitespace.
pub fn to_f32(token: &Token) -> Coerced<f32> {
    Ok(match token {
        Token::Number(n) => Some(n.to_f64() as f32),
        Token::String(s) => Some(
            s.trim()
                .parse::<f32>()
                .map_err(|_| CoercionFailure::new("float", s))?,
        ),
        Token::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    })
}

/// Strings must parse as a double, ignoring surrounding whitespace.
pub fn to_f64(token: &Token) -> Coerced<f64> {
    Ok(match token {
        Token::Number(n) => Some(n.to_f64()),
        Token::String(s) => Some(
            s.trim()
                .parse::<f64>()
                .map_err(|_| CoercionFailure::new("double", s))?,
        ),
        Token::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    })
}

/// Strings must hold exactly one character; numbers are code points and
/// booleans are `1` / `0`.
pub fn to_char(token: &Token) -> Coerced<char> {
    Ok(match token {
        Token::String(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => return Err(CoercionFailure::new("char", s)),
            }
        }
        Token::Number(n) => {
            let code = n.to_u64_lossy();
            let c = u32::try_from(code).ok().and_then(char::from_u32);
            Some(c.ok_or_else(|| CoercionFailure::new("char", &n.to_string()))?)
        }
        Token::Boolean(b) => Some(char::from(u8::from(*b))),
        _ => None,
    })
}

/// Unparseable strings yield zero. Non-finite floats are out of range.
pub fn to_big_int(token: &Token) -> Coerced<BigInt> {
    Ok(match token {
        Token::Number(n) => Some(
            n.to_big_int()
                .ok_or_else(|| CoercionFailure::out_of_range("big integer", n))?,
        ),
        Token::String(s) => Some(s.parse::<BigInt>().unwrap_or_else(|_| BigInt::zero())),
        Token::Boolean(b) => Some(if *b { BigInt::one() } else { BigInt::zero() }),
        _ => None,
    })
}

/// Unparseable strings yield zero. Numbers, and numeric strings, beyond
/// what a [`Decimal`] holds are out of range.
pub fn to_decimal(token: &Token) -> Coerced<Decimal> {
    Ok(match token {
        Token::Number(n) => Some(
            n.to_decimal()
                .ok_or_else(|| CoercionFailure::out_of_range("big decimal", n))?,
        ),
        Token::String(s) => Some(parse_decimal(s)?),
        Token::Boolean(b) => Some(if *b { Decimal::ONE } else { Decimal::ZERO }),
        _ => None,
    })
}

fn parse_decimal(s: &str) -> Result<Decimal, CoercionFailure> {
    if let Ok(v) = s.parse::<Decimal>().or_else(|_| Decimal::from_scientific(s)) {
        return Ok(v);
    }
    if is_numeric(s) {
        Err(CoercionFailure::out_of_range("big decimal", s))
    } else {
        Ok(Decimal::ZERO)
    }
}

/// Plain decimal syntax: sign, digits with an optional fraction, and an
/// optional exponent.
fn is_numeric(s: &str) -> bool {
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (unsigned, None),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    let mantissa_ok = !(whole.is_empty() && fraction.is_empty()) && digits(whole) && digits(fraction);
    let exponent_ok = exponent.is_none_or(|e| {
        let e = e.strip_prefix(['+', '-']).unwrap_or(e);
        !e.is_empty() && digits(e)
    });
    mantissa_ok && exponent_ok
}
