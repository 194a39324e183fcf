use core::fmt::Debug;

use num_bigint::BigInt;
use rust_decimal::Decimal;
use tessel_core::{Decoder, DeserializeError, Encoder, IterSource, SerializeError, Token};
use tessel_stream::{StreamDecoder, TokenEncoder};
use tessel_testhelpers::{test, tokens};

type Decoded = StreamDecoder<IterSource<std::vec::IntoIter<Token>>>;

fn through_tokens<T>(
    value: T,
    encode: impl FnOnce(&mut dyn Encoder, T) -> Result<(), SerializeError>,
    decode: impl FnOnce(&mut Decoded) -> Result<T, DeserializeError>,
) -> T {
    let mut encoder = TokenEncoder::new();
    encode(&mut encoder, value).unwrap();
    let mut decoder = StreamDecoder::new(IterSource::new(encoder.into_tokens())).unwrap();
    let decoded = decode(&mut decoder).unwrap();
    decoder.end().unwrap();
    decoded
}

fn assert_round_trips<T: PartialEq + Debug + Clone>(
    values: &[T],
    encode: impl Fn(&mut dyn Encoder, T) -> Result<(), SerializeError>,
    decode: impl Fn(&mut Decoded) -> Result<T, DeserializeError>,
) {
    for value in values {
        let decoded = through_tokens(value.clone(), &encode, &decode);
        assert_eq!(&decoded, value);
    }
}

#[test]
fn integers_round_trip() {
    assert_round_trips(
        &[i8::MIN, -1, 0, i8::MAX],
        |e, v| e.encode_i8(v),
        |d| d.decode_i8(),
    );
    assert_round_trips(
        &[i16::MIN, -300, 0, i16::MAX],
        |e, v| e.encode_i16(v),
        |d| d.decode_i16(),
    );
    assert_round_trips(
        &[i32::MIN, -70_000, 0, i32::MAX],
        |e, v| e.encode_i32(v),
        |d| d.decode_i32(),
    );
    assert_round_trips(
        &[i64::MIN, -5_000_000_000, 0, i64::MAX],
        |e, v| e.encode_i64(v),
        |d| d.decode_i64(),
    );
    assert_round_trips(
        &[0, 1 << 40, u64::MAX],
        |e, v| e.encode_u64(v),
        |d| d.decode_u64(),
    );
}

#[test]
fn floats_round_trip_bit_for_bit() {
    for value in [0.1f32, -1.5, -0.0, f32::MIN_POSITIVE, f32::MAX, f32::EPSILON] {
        let decoded = through_tokens(value, |e, v| e.encode_f32(v), |d| d.decode_f32());
        assert_eq!(decoded.to_bits(), value.to_bits(), "{value}");
    }
    for value in [0.1f64, -0.0, 5e-324, f64::MIN_POSITIVE, f64::MAX, -1.0 / 3.0] {
        let decoded = through_tokens(value, |e, v| e.encode_f64(v), |d| d.decode_f64());
        assert_eq!(decoded.to_bits(), value.to_bits(), "{value}");
    }
}

#[test]
fn non_finite_floats_survive_tokens() {
    let nan = through_tokens(f64::NAN, |e, v| e.encode_f64(v), |d| d.decode_f64());
    assert!(nan.is_nan());
    for value in [f64::INFINITY, f64::NEG_INFINITY] {
        assert_eq!(through_tokens(value, |e, v| e.encode_f64(v), |d| d.decode_f64()), value);
    }
    let nan = through_tokens(f32::NAN, |e, v| e.encode_f32(v), |d| d.decode_f32());
    assert!(nan.is_nan());
    assert_eq!(
        through_tokens(f32::NEG_INFINITY, |e, v| e.encode_f32(v), |d| d.decode_f32()),
        f32::NEG_INFINITY
    );
}

#[test]
fn non_finite_floats_render_as_strings_and_read_back() {
    let mut encoder = TokenEncoder::new();
    let array = encoder.encode_array().unwrap();
    array.encode_f64(f64::NAN).unwrap();
    array.encode_f64(f64::INFINITY).unwrap();
    array.encode_f64(f64::NEG_INFINITY).unwrap();
    array.finish_structure().unwrap();

    let mut decoder = StreamDecoder::new(IterSource::new(encoder.into_tokens())).unwrap();
    let json = decoder.decode_arbitrary().unwrap().to_string();
    assert_eq!(json, r#"["NaN","Infinity","-Infinity"]"#);

    let mut decoder = StreamDecoder::new(IterSource::new(tokens(&json))).unwrap();
    let array = decoder.decode_array().unwrap();
    assert!(array.decode_f64().unwrap().is_nan());
    assert_eq!(array.decode_f64().unwrap(), f64::INFINITY);
    assert_eq!(array.decode_f64().unwrap(), f64::NEG_INFINITY);
    array.finish_structure(false).unwrap();
}

#[test]
fn chars_round_trip() {
    assert_round_trips(
        &['a', '\0', 'é', '\u{1F980}'],
        |e, v| e.encode_char(v),
        |d| d.decode_char(),
    );
}

#[test]
fn big_numbers_round_trip_exactly() {
    let huge: BigInt = "-123456789012345678901234567890123456789".parse().unwrap();
    assert_round_trips(
        &[BigInt::from(0), huge],
        |e, v| e.encode_big_int(&v),
        |d| d.decode_big_int(),
    );

    let values = [Decimal::MAX, Decimal::MIN, Decimal::new(-12_345, 3), Decimal::new(100, 2)];
    for value in values {
        let decoded = through_tokens(value, |e, v| e.encode_decimal(&v), |d| d.decode_decimal());
        assert_eq!(decoded, value);
        assert_eq!(decoded.scale(), value.scale());
    }
}

#[test]
fn strings_and_booleans_round_trip() {
    assert_round_trips(
        &[String::new(), "tessel".to_owned(), "line\nbreak \"quoted\"".to_owned()],
        |e, v| e.encode_string(&v),
        |d| d.decode_string(),
    );
    assert_round_trips(&[true, false], |e, v| e.encode_bool(v), |d| d.decode_bool());
}
