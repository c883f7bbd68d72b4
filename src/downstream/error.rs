//! Result type and failure classification for downstream calls.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::config::ValidationError;

/// Outcome of one downstream fetch: the raw body, or a classified failure.
pub type FetchResult = Result<String, FetchError>;

/// Failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The configured deadline elapsed.
    Timeout,
    /// Transport failed before a status was received, or no pool slot freed up.
    ConnectionFailure,
    /// Downstream answered outside [200, 300).
    NonSuccessStatus(u16),
    /// The caller cancelled the call.
    Interrupted,
    Unknown,
}

impl ErrorKind {
    /// Stable label for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::ConnectionFailure => "connection_failure",
            ErrorKind::NonSuccessStatus(_) => "non_success_status",
            ErrorKind::Interrupted => "interrupted",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NonSuccessStatus(code) => write!(f, "non_success_status({})", code),
            other => f.write_str(other.as_str()),
        }
    }
}

/// A classified downstream failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    kind: ErrorKind,
    message: String,
}

impl FetchError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Downstream answered with a status outside [200, 300).
    pub fn status(code: u16) -> Self {
        Self::new(
            ErrorKind::NonSuccessStatus(code),
            format!("downstream returned status {}", code),
        )
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("downstream did not respond within {:?}", limit),
        )
    }

    pub fn connect_timeout(limit: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("timed out connecting to downstream after {:?}", limit),
        )
    }

    /// No pool slot became free within the connect timeout.
    pub fn pool_saturated(waited: Duration) -> Self {
        Self::new(
            ErrorKind::ConnectionFailure,
            format!("no pooled connection available within {:?}", waited),
        )
    }

    pub fn interrupted() -> Self {
        Self::new(
            ErrorKind::Interrupted,
            "interrupted while calling downstream",
        )
    }

    /// Classify a socket-level error raised while establishing a connection.
    pub fn connect(err: io::Error) -> Self {
        let kind = if err.kind() == io::ErrorKind::TimedOut {
            ErrorKind::Timeout
        } else {
            ErrorKind::ConnectionFailure
        };
        Self::new(kind, format!("failed to connect to downstream: {}", err))
    }
}

impl From<hyper::Error> for FetchError {
    fn from(err: hyper::Error) -> Self {
        let kind = classify_hyper(&err).unwrap_or_else(|| classify_chain(&err));
        Self::new(kind, format!("failed to call downstream: {}", describe(&err)))
    }
}

impl From<hyper_util::client::legacy::Error> for FetchError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        if err.is_connect() {
            let kind = match classify_chain(&err) {
                ErrorKind::Timeout => ErrorKind::Timeout,
                _ => ErrorKind::ConnectionFailure,
            };
            return Self::new(
                kind,
                format!("failed to connect to downstream: {}", describe(&err)),
            );
        }
        Self::new(
            classify_chain(&err),
            format!("failed to call downstream: {}", describe(&err)),
        )
    }
}

impl From<http::Error> for FetchError {
    fn from(err: http::Error) -> Self {
        Self::new(
            ErrorKind::Unknown,
            format!("failed to build downstream request: {}", err),
        )
    }
}

/// Error raised when a client cannot be built from its configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid client configuration: {}", join(.0))]
    Invalid(Vec<ValidationError>),

    #[error("invalid target uri: {0}")]
    Uri(#[from] http::uri::InvalidUri),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn classify_hyper(err: &hyper::Error) -> Option<ErrorKind> {
    if err.is_timeout() {
        Some(ErrorKind::Timeout)
    } else if err.is_closed() || err.is_incomplete_message() || err.is_canceled() {
        Some(ErrorKind::ConnectionFailure)
    } else {
        None
    }
}

fn classify_io(err: &io::Error) -> Option<ErrorKind> {
    match err.kind() {
        io::ErrorKind::TimedOut => Some(ErrorKind::Timeout),
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::UnexpectedEof => Some(ErrorKind::ConnectionFailure),
        _ => None,
    }
}

/// Walk the source chain and return the first recognisable category.
fn classify_chain(err: &(dyn StdError + 'static)) -> ErrorKind {
    for cause in std::iter::successors(Some(err), |&e| e.source()) {
        if let Some(io) = cause.downcast_ref::<io::Error>() {
            if let Some(kind) = classify_io(io) {
                return kind;
            }
        }
        if let Some(hyper) = cause.downcast_ref::<hyper::Error>() {
            if let Some(kind) = classify_hyper(hyper) {
                return kind;
            }
        }
    }
    ErrorKind::Unknown
}

/// Render an error together with its sources, "outer: inner: root".
fn describe(err: &(dyn StdError + 'static)) -> String {
    std::iter::successors(Some(err), |&e| e.source())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}
