//! Wrapper around transport failures to facilitate exclusive matching. Reqwest
//! errors are classified by their predicates; other transports construct an
//! [`Error`] directly from a kind and a message.

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConnectFailed,
    DecodingFailed,
    RedirectPolicyViolated,
    TimedOut,
    Unknown,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_decode() {
            ErrorKind::DecodingFailed
        } else if err.is_timeout() {
            ErrorKind::TimedOut
        } else if err.is_redirect() {
            ErrorKind::RedirectPolicyViolated
        } else if err.is_connect() {
            ErrorKind::ConnectFailed
        } else {
            ErrorKind::Unknown
        };

        Error {
            kind,
            source: Some(Box::new(err)),
        }
    }
}

impl Error {
    pub fn new<E>(kind: ErrorKind, source: E) -> Error
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Error {
            kind,
            source: Some(source.into()),
        }
    }

    pub fn from_kind(kind: ErrorKind) -> Error {
        Error { kind, source: None }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match &self.kind {
            ErrorKind::ConnectFailed => "connection failed",
            ErrorKind::DecodingFailed => "decoding failed",
            ErrorKind::RedirectPolicyViolated => "redirect policy violated",
            ErrorKind::TimedOut => "timed out",
            ErrorKind::Unknown => "request failed",
        };

        match &self.source {
            Some(source) => write!(f, "{}: {}", what, source),
            None => write!(f, "{}", what),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| &**e as _)
    }
}
