//! A utility module with helpers for making API requests and decoding their responses.

mod error;
mod event_stream;
mod provider;
mod transport;

pub use error::{Error as TransportError, ErrorKind as TransportErrorKind};
pub use event_stream::{aggregate, Error as EventStreamError, EventStreamAggregator};
pub use transport::{ByteStream, HttpRequest, HttpResponse, ReqwestTransport, Transport};

#[cfg(test)]
pub(crate) use transport::mock;
