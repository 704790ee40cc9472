//! Error types for request validation, platform fetches, configuration and output.
//!
//! Only [`ValidationError`] stops a run. A [`FetchError`] is scoped to one
//! platform and ends up in that platform's diagnostics, never in the results.

use crate::models::PlatformId;
use std::error::Error as StdError;
use std::fmt;
use std::io::ErrorKind;
use thiserror::Error;

/// The request itself is unusable; raised before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("keyword must not be empty")]
    EmptyKeyword,
    #[error("unknown platform '{0}' (expected one of: toutiao, google, bing)")]
    UnknownPlatform(String),
}

/// Categories of fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The per-request timeout elapsed.
    Timeout,
    /// Connection refused, reset, or DNS failure.
    Connect,
    /// A non-2xx response status.
    Status(u16),
    /// The connection dropped while the body was being read.
    Interrupted,
    /// The body could not be decoded.
    Body,
    /// The endpoint template produced an unusable URL.
    InvalidUrl,
    /// The overall run deadline elapsed before the platform finished.
    Deadline,
}

impl FetchErrorKind {
    /// Timeouts and connection failures are worth one more attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchErrorKind::Timeout | FetchErrorKind::Connect | FetchErrorKind::Interrupted
        )
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::Timeout => f.write_str("timeout"),
            FetchErrorKind::Connect => f.write_str("connection error"),
            FetchErrorKind::Status(code) => write!(f, "HTTP status {}", code),
            FetchErrorKind::Interrupted => f.write_str("connection interrupted"),
            FetchErrorKind::Body => f.write_str("body decode error"),
            FetchErrorKind::InvalidUrl => f.write_str("invalid URL"),
            FetchErrorKind::Deadline => f.write_str("run deadline exceeded"),
        }
    }
}

/// A failed fetch against one platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{platform}: {kind}: {message}")]
pub struct FetchError {
    pub platform: PlatformId,
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(platform: PlatformId, kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            platform,
            kind,
            message: message.into(),
        }
    }

    /// Classify a `reqwest` error raised while sending or reading a request.
    pub fn from_reqwest(platform: PlatformId, err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FetchErrorKind::Timeout
        } else if let Some(status) = err.status() {
            FetchErrorKind::Status(status.as_u16())
        } else if err.is_connect() || err.is_request() {
            FetchErrorKind::Connect
        } else if is_interrupted(err) {
            FetchErrorKind::Interrupted
        } else if err.is_body() || err.is_decode() {
            FetchErrorKind::Body
        } else if err.is_builder() {
            FetchErrorKind::InvalidUrl
        } else {
            FetchErrorKind::Connect
        };
        Self::new(platform, kind, err.to_string())
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// Whether a body failure came from the transport (reset, truncated stream)
/// rather than from decoding bytes that did arrive.
///
/// Decoder errors wrap the underlying body error, sometimes through an
/// `io::Error`, so the whole source chain is inspected.
fn is_interrupted(err: &reqwest::Error) -> bool {
    if err.is_body() {
        return true;
    }
    let mut source = err.source();
    while let Some(e) = source {
        if e.downcast_ref::<reqwest::Error>().is_some_and(|inner| inner.is_body()) {
            return true;
        }
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::UnexpectedEof
                    | ErrorKind::BrokenPipe
            ) {
                return true;
            }
            if io
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
                .is_some_and(|inner| inner.is_body())
            {
                return true;
            }
        }
        source = e.source();
    }
    false
}

/// The settings file could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("endpoint template for {platform} must contain {{keyword}}: {template}")]
    Template { platform: PlatformId, template: String },
}

/// The result document could not be written.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to serialize result document: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
