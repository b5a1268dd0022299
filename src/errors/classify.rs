//! Normalization of arbitrary failures into [`AppError`].
//!
//! # Responsibilities
//! - Represent "anything an operation can fail with" as one sum type
//! - Map every such value onto a preset, without ever failing
//!
//! # Design Decisions
//! - Already-classified errors pass through untouched
//! - Native error kinds (reqwest, io) are matched before message heuristics
//! - Unrecognised failures become INTERNAL, keeping the original text

use serde_json::{json, Value};
use std::error::Error as StdError;
use std::fmt;
use std::io;

use crate::errors::{presets, AppError};

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Anything an operation can fail with.
#[derive(Debug)]
pub enum Failure {
    /// Already classified.
    App(AppError),
    /// The attempt was aborted (timer or cancellation won the race).
    Aborted,
    /// A native error value.
    Error(BoxError),
    /// A bare message with no error type behind it.
    Message(String),
    /// Failed without any value at all.
    Empty,
}

impl Failure {
    pub fn from_error<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Failure::Error(Box::new(err))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::App(e) => write!(f, "{e}"),
            Failure::Aborted => f.write_str("aborted"),
            Failure::Error(e) => write!(f, "{e}"),
            Failure::Message(m) => f.write_str(m),
            Failure::Empty => f.write_str("unknown failure"),
        }
    }
}

impl From<AppError> for Failure {
    fn from(err: AppError) -> Self {
        Failure::App(err)
    }
}

impl From<reqwest::Error> for Failure {
    fn from(err: reqwest::Error) -> Self {
        Failure::from_error(err)
    }
}

impl From<io::Error> for Failure {
    fn from(err: io::Error) -> Self {
        Failure::from_error(err)
    }
}

impl From<url::ParseError> for Failure {
    fn from(err: url::ParseError) -> Self {
        Failure::from_error(err)
    }
}

impl From<tokio::time::error::Elapsed> for Failure {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Failure::Aborted
    }
}

impl From<BoxError> for Failure {
    fn from(err: BoxError) -> Self {
        Failure::Error(err)
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Failure::Message(message)
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Failure::Message(message.to_string())
    }
}

/// Normalize any failure into an [`AppError`]. Total: never fails, never panics.
pub fn classify(failure: Failure) -> AppError {
    match failure {
        Failure::App(err) => err,
        Failure::Aborted => presets::timeout(),
        Failure::Error(err) => classify_error(err.as_ref()),
        Failure::Message(message) => classify_message(&message, None),
        Failure::Empty => presets::internal(""),
    }
}

fn classify_error(err: &(dyn StdError + 'static)) -> AppError {
    // An AppError anywhere in the chain was classified at its origin.
    let mut cursor = Some(err);
    while let Some(current) = cursor {
        if let Some(app) = current.downcast_ref::<AppError>() {
            return app.clone();
        }
        cursor = current.source();
    }

    if let Some(http) = err.downcast_ref::<reqwest::Error>() {
        if http.is_timeout() {
            return presets::timeout();
        }
        if let Some(status) = http.status() {
            return presets::from_http_status(status.as_u16(), None);
        }
        if http.is_connect() || http.is_request() || http.is_body() || http.is_decode() {
            return presets::network_error(http.to_string());
        }
    }

    if let Some(io_err) = err.downcast_ref::<io::Error>() {
        match io_err.kind() {
            io::ErrorKind::TimedOut => return presets::timeout(),
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => return presets::network_error(io_err.to_string()),
            _ => {}
        }
    }

    classify_message(&err.to_string(), Some(error_chain(err)))
}

fn classify_message(message: &str, chain: Option<Value>) -> AppError {
    if looks_like_network_failure(message) {
        return presets::network_error(message);
    }

    let details = chain.unwrap_or_else(|| json!([message]));
    presets::internal(message).with_details(json!({ "chain": details }))
}

fn looks_like_network_failure(message: &str) -> bool {
    const HINTS: [&str; 7] = [
        "fetch",
        "network",
        "connection",
        "connect",
        "dns",
        "unreachable",
        "socket",
    ];
    let lower = message.to_ascii_lowercase();
    HINTS.iter().any(|hint| lower.contains(hint))
}

fn error_chain(err: &(dyn StdError + 'static)) -> Value {
    let mut chain = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    json!(chain)
}
