//! Conversions between transport failures and provider error categories

use crate::providers::apireq::{EventStreamError, TransportError, TransportErrorKind};
use crate::providers::ErrorKind;

impl From<TransportErrorKind> for ErrorKind {
    fn from(value: TransportErrorKind) -> Self {
        match value {
            TransportErrorKind::ConnectFailed => ErrorKind::Connection,
            TransportErrorKind::DecodingFailed | TransportErrorKind::RedirectPolicyViolated => {
                ErrorKind::UnexpectedResponse
            }
            TransportErrorKind::TimedOut => ErrorKind::TimedOut,
            TransportErrorKind::Unknown => ErrorKind::UnspecifiedError,
        }
    }
}

impl From<&TransportError> for ErrorKind {
    fn from(value: &TransportError) -> Self {
        value.kind().into()
    }
}

impl From<&EventStreamError> for ErrorKind {
    fn from(value: &EventStreamError) -> Self {
        match value {
            EventStreamError::ResponseExceededBuffer(_) => ErrorKind::UnexpectedResponse,
            EventStreamError::StreamFailed(err) => err.into(),
        }
    }
}
