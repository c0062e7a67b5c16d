//! The seam between adapters and the network. Adapters describe a request as an
//! [`HttpRequest`]; a [`Transport`] sends it and hands back the status and the
//! body as a stream of byte chunks.

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::{Client, Url};
use std::pin::Pin;

use super::TransportError;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// A JSON POST request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    pub body: serde_json::Value,
}

impl HttpRequest {
    pub fn post(url: Url, body: serde_json::Value) -> HttpRequest {
        HttpRequest {
            url,
            headers: Vec::new(),
            body,
        }
    }

    pub fn header<S: Into<String>>(mut self, name: &'static str, value: S) -> HttpRequest {
        self.headers.push((name, value.into()));
        self
    }

    pub fn bearer_auth(self, token: &str) -> HttpRequest {
        self.header("Authorization", format!("Bearer {}", token))
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The URL without its query string, which may carry a key.
    pub fn redacted_url(&self) -> String {
        let mut url = self.url.clone();
        url.set_query(None);
        url.to_string()
    }
}

pub struct HttpResponse {
    status: u16,
    body: ByteStream,
}

impl HttpResponse {
    pub fn new(status: u16, body: ByteStream) -> HttpResponse {
        HttpResponse { status, body }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Read the whole body.
    pub async fn bytes(mut self) -> Result<Vec<u8>, TransportError> {
        let mut buf = Vec::new();

        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }

        Ok(buf)
    }

    pub fn into_stream(self) -> ByteStream {
        self.body
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// The production transport. Each dispatch issues exactly one request; there is
/// no retry.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> ReqwestTransport {
        ReqwestTransport {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> ReqwestTransport {
        ReqwestTransport { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.post(request.url).json(&request.body);

        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }

        let res = builder.send().await?;

        let status = res.status().as_u16();
        let body = res.bytes_stream().map(|chunk| chunk.map_err(TransportError::from));

        Ok(HttpResponse::new(status, Box::pin(body)))
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! A transport which never touches the network. It counts calls, records the
    //! requests it receives and replays a canned response split into chunks.

    use super::*;
    use crate::providers::apireq::TransportErrorKind;
    use futures_util::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub(crate) struct MockTransport {
        calls: AtomicUsize,
        requests: Mutex<Vec<HttpRequest>>,
        status: u16,
        chunks: Vec<Bytes>,
        failure: Option<TransportErrorKind>,
        body_failure: Option<TransportErrorKind>,
    }

    impl MockTransport {
        pub(crate) fn respond(status: u16, body: &str) -> MockTransport {
            Self::respond_chunked(status, body, body.len().max(1))
        }

        pub(crate) fn respond_chunked(status: u16, body: &str, chunk_size: usize) -> MockTransport {
            let chunks = body
                .as_bytes()
                .chunks(chunk_size)
                .map(|c| Bytes::from(c.to_owned()))
                .collect();

            MockTransport {
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                status,
                chunks,
                failure: None,
                body_failure: None,
            }
        }

        pub(crate) fn fail(kind: TransportErrorKind) -> MockTransport {
            MockTransport {
                failure: Some(kind),
                ..Self::respond(200, "")
            }
        }

        /// Replies with `status`, but the body breaks off after its first chunk.
        pub(crate) fn respond_broken(
            status: u16,
            body: &str,
            kind: TransportErrorKind,
        ) -> MockTransport {
            MockTransport {
                body_failure: Some(kind),
                ..Self::respond(status, body)
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub(crate) fn last_request(&self) -> Option<HttpRequest> {
            self.requests.lock().unwrap().last().cloned()
        }

        pub(crate) fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);

            if let Some(kind) = self.failure {
                return Err(TransportError::new(kind, "mock transport failure"));
            }

            let mut chunks: Vec<Result<Bytes, TransportError>> =
                self.chunks.iter().cloned().map(Ok).collect();

            if let Some(kind) = self.body_failure {
                chunks.truncate(1);
                chunks.push(Err(TransportError::new(kind, "mock body failure")));
            }

            Ok(HttpResponse::new(self.status, Box::pin(stream::iter(chunks))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[test]
    fn test_request_builder() {
        let url = Url::parse("https://api.test/v1/models/x:generate?key=secret").unwrap();

        let req = HttpRequest::post(url, serde_json::json!({}))
            .bearer_auth("tok")
            .header("Accept", "text/event-stream");

        assert_eq!(req.header_value("authorization"), Some("Bearer tok"));
        assert_eq!(req.header_value("ACCEPT"), Some("text/event-stream"));
        assert_eq!(req.header_value("x-missing"), None);
        assert_eq!(req.redacted_url(), "https://api.test/v1/models/x:generate");
    }

    #[tokio::test]
    async fn test_response_bytes() {
        let chunks: Vec<Result<Bytes, TransportError>> =
            vec![Ok(Bytes::from("hel")), Ok(Bytes::from("lo"))];

        let res = HttpResponse::new(201, Box::pin(stream::iter(chunks)));

        assert!(res.is_success());
        assert_eq!(res.status(), 201);
        assert_eq!(res.bytes().await.unwrap(), b"hello");

        let res = HttpResponse::new(404, Box::pin(stream::iter(Vec::<Result<Bytes, TransportError>>::new())));
        assert!(!res.is_success());
    }
}
