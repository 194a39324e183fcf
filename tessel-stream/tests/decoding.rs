use tessel_core::{
    Decoder, DeserializeErrorKind, Encoder, IterSource, Limits, Number, Token, Value,
};
use tessel_stream::{StreamDecoder, TokenEncoder, ValueSource};
use tessel_testhelpers::{nested_arrays, test, tokens};

fn decoder(tokens: Vec<Token>) -> StreamDecoder<IterSource<std::vec::IntoIter<Token>>> {
    StreamDecoder::new(IterSource::new(tokens)).unwrap()
}

fn deep_decoder(
    tokens: Vec<Token>,
    depth: usize,
) -> StreamDecoder<IterSource<std::vec::IntoIter<Token>>> {
    StreamDecoder::with_limits(IterSource::new(tokens), Limits::new(depth)).unwrap()
}

fn innermost(mut value: &Value) -> (usize, &Value) {
    let mut depth = 0;
    while let Some([only]) = value.as_array().map(Vec::as_slice) {
        value = only;
        depth += 1;
    }
    (depth, value)
}

#[test]
fn deep_arbitrary_values_decode_without_recursion() {
    let depth = 5_000;
    let mut d = deep_decoder(nested_arrays(depth), depth);
    let value = d.decode_arbitrary().unwrap();
    d.end().unwrap();
    let (found, leaf) = innermost(&value);
    assert_eq!(found, depth);
    assert_eq!(leaf, &Value::Number(Number::I64(0)));
    assert_eq!(d.limits().remaining_depth(), depth);
}

#[test]
fn depth_limit_is_exact() {
    let mut d = deep_decoder(nested_arrays(64), 64);
    assert!(d.decode_arbitrary().is_ok());

    let mut d = deep_decoder(nested_arrays(65), 64);
    let err = d.decode_arbitrary().unwrap_err();
    assert_eq!(err.kind, DeserializeErrorKind::DepthExceeded { limit: 64 });
    assert_eq!(err.path.as_deref(), Some(format!("${}", "[0]".repeat(64)).as_str()));
}

#[test]
fn skipping_ignores_nesting_depth() {
    let mut input = vec![Token::StartObject, Token::Key("deep".into())];
    input.extend(nested_arrays(5_000));
    input.push(Token::Key("next".into()));
    input.push(Token::Number(Number::I64(7)));
    input.push(Token::EndObject);

    let mut d = deep_decoder(input, 8);
    let obj = d.decode_object().unwrap();
    assert_eq!(obj.decode_key().unwrap().as_deref(), Some("deep"));
    obj.skip_value().unwrap();
    assert_eq!(obj.decode_key().unwrap().as_deref(), Some("next"));
    assert_eq!(obj.decode_i64().unwrap(), 7);
    assert_eq!(obj.decode_key().unwrap(), None);
    obj.finish_structure(false).unwrap();
    d.end().unwrap();
}

#[test]
fn buffered_values_keep_their_path() {
    let mut d = decoder(tokens(r#"{"a":{"b":[1,"x"]},"c":3}"#));
    let obj = d.decode_object().unwrap();
    obj.decode_key().unwrap();
    let mut buffered = obj.decode_buffer().unwrap();

    // the outer decoder has moved past the buffered value
    assert_eq!(obj.decode_key().unwrap().as_deref(), Some("c"));
    assert_eq!(obj.decode_i32().unwrap(), 3);
    obj.finish_structure(true).unwrap();
    d.end().unwrap();

    let inner = buffered.decode_object().unwrap();
    assert_eq!(inner.decode_key().unwrap().as_deref(), Some("b"));
    let items = inner.decode_array().unwrap();
    assert_eq!(items.decode_i32().unwrap(), 1);
    let err = items.decode_i32().unwrap_err();
    assert_eq!(err.kind, DeserializeErrorKind::Coercion { target: "integer" });
    assert_eq!(err.path.as_deref(), Some("$.a.b[1]"));
}

#[test]
fn scalars_unwrap_one_array_level() {
    let mut d = decoder(tokens(r#"[[7],["8"],[true,false]]"#));
    let arr = d.decode_array().unwrap();
    assert_eq!(arr.decode_i64().unwrap(), 7);
    assert_eq!(arr.decode_i64().unwrap(), 8);
    let err = arr.decode_bool().unwrap_err();
    assert!(matches!(err.kind, DeserializeErrorKind::MultipleValues { expected: "boolean" }));
}

#[test]
fn unclosed_structures_are_reported() {
    let mut d = decoder(vec![Token::StartArray, Token::Number(Number::I64(1))]);
    let arr = d.decode_array().unwrap();
    assert_eq!(arr.decode_i32().unwrap(), 1);
    assert!(!arr.has_next_array_value());
    let err = arr.finish_structure(false).unwrap_err();
    assert!(matches!(err.kind, DeserializeErrorKind::UnexpectedEof { .. }));

    let d = decoder(vec![Token::Null, Token::Null]);
    assert!(matches!(
        d.end().unwrap_err().kind,
        DeserializeErrorKind::UnexpectedToken { .. }
    ));
}

#[test]
fn values_replay_through_the_same_decoder() {
    let value = {
        let mut d = decoder(tokens(r#"{"name":"tessel","sizes":[1,2.5],"meta":{"ok":true,"none":null}}"#));
        d.decode_arbitrary().unwrap()
    };

    let mut encoder = TokenEncoder::new();
    encoder.encode_value(&value).unwrap();
    let mut from_tokens = decoder(encoder.into_tokens());
    assert_eq!(from_tokens.decode_arbitrary().unwrap(), value);

    let mut replay = StreamDecoder::new(ValueSource::new(value)).unwrap();
    let mut replayed = Vec::new();
    let obj = replay.decode_object().unwrap();
    while let Some(key) = obj.decode_key().unwrap() {
        replayed.push(key);
        obj.skip_value().unwrap();
    }
    obj.finish_structure(false).unwrap();
    replay.end().unwrap();
    assert_eq!(replayed, ["name", "sizes", "meta"]);
}
