#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Test helpers for the tessel workspace.
//!
//! Tests import the shadowing attribute with `use tessel_testhelpers::test;`
//! so every test gets a tracing subscriber (filtered by `TESSEL_LOG`) and
//! colour backtraces, installed once per process.

pub use tessel_testhelpers_macros::test;

use std::sync::LazyLock;
use std::time::Instant;

use tessel_core::{Number, Token};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Seconds since the first test started.
struct Uptime;

impl FormatTime for Uptime {
    fn format_time(&self, w: &mut Writer<'_>) -> core::fmt::Result {
        let elapsed = START_TIME.elapsed();
        write!(w, "{:4}.{:03}s", elapsed.as_secs(), elapsed.subsec_millis())
    }
}

fn is_harness_frame(name: &str) -> bool {
    const NOISE: &[&str] = &[
        "test::run_test",
        "test::__rust_begin_short_backtrace",
        "std::panicking::",
        "std::panic::",
        "core::panicking::",
        "std::sys::",
        "std::thread::Builder::spawn_unchecked_",
        "core::ops::function::FnOnce::call_once",
        "<alloc::boxed::Box<F,A> as core::ops::function::FnOnce<Args>>::call_once",
        "<core::panic::unwind_safe::AssertUnwindSafe<F> as core::ops::function::FnOnce<()>>::call_once",
        "__pthread",
    ];
    NOISE.iter().any(|prefix| name.starts_with(prefix))
}

static SUBSCRIBER_INIT: LazyLock<()> = LazyLock::new(|| {
    let _ = *START_TIME;

    color_backtrace::BacktracePrinter::new()
        .verbosity(color_backtrace::Verbosity::Full)
        .add_frame_filter(Box::new(|frames| {
            frames.retain(|frame| frame.name.as_deref().is_none_or(|name| !is_harness_frame(name)))
        }))
        .install(Box::new(termcolor::StandardStream::stderr(
            termcolor::ColorChoice::AlwaysAnsi,
        )));

    let filter = std::env::var("TESSEL_LOG")
        .ok()
        .and_then(|s| s.parse::<Targets>().ok())
        .unwrap_or_else(|| Targets::new().with_default(tracing::Level::TRACE));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_timer(Uptime)
                .with_target(false)
                .with_level(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .with(filter)
        .try_init()
        .ok();
});

/// Install the test subscriber and panic printer. Idempotent.
pub fn setup() {
    #[allow(clippy::let_unit_value)]
    let _ = *SUBSCRIBER_INIT;
}

/// Tokenize JSON text, keeping object keys in document order.
///
/// Integers that fit an `i64` become [`Number::I64`], larger ones
/// [`Number::U64`], everything else [`Number::F64`].
///
/// # Panics
///
/// Panics on invalid JSON.
pub fn tokens(json: &str) -> Vec<Token> {
    let value: serde_json::Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(err) => panic!("invalid JSON fixture {json:?}: {err}"),
    };
    let mut out = Vec::new();
    push_tokens(&value, &mut out);
    out
}

fn push_tokens(value: &serde_json::Value, out: &mut Vec<Token>) {
    use serde_json::Value as Json;
    match value {
        Json::Null => out.push(Token::Null),
        Json::Bool(b) => out.push(Token::Boolean(*b)),
        Json::Number(n) => out.push(Token::Number(if let Some(i) = n.as_i64() {
            Number::I64(i)
        } else if let Some(u) = n.as_u64() {
            Number::U64(u)
        } else {
            Number::F64(n.as_f64().unwrap_or(f64::NAN))
        })),
        Json::String(s) => out.push(Token::String(s.clone())),
        Json::Array(items) => {
            out.push(Token::StartArray);
            for item in items {
                push_tokens(item, out);
            }
            out.push(Token::EndArray);
        }
        Json::Object(map) => {
            out.push(Token::StartObject);
            for (key, item) in map {
                out.push(Token::Key(key.clone()));
                push_tokens(item, out);
            }
            out.push(Token::EndObject);
        }
    }
}

/// Tokens for `depth` nested arrays around `0`.
pub fn nested_arrays(depth: usize) -> Vec<Token> {
    let mut out = Vec::with_capacity(depth * 2 + 1);
    out.extend(std::iter::repeat_n(Token::StartArray, depth));
    out.push(Token::Number(Number::I64(0)));
    out.extend(std::iter::repeat_n(Token::EndArray, depth));
    out
}

/// An error type that panics when it's built, so tests can use `?` on any
/// error and still get a backtrace pointing at the failing call.
#[derive(Debug)]
pub struct IPanic;

impl<E> From<E> for IPanic
where
    E: core::error::Error + Send + Sync,
{
    #[track_caller]
    fn from(value: E) -> Self {
        panic!("from: {}: {value}", core::panic::Location::caller())
    }
}
