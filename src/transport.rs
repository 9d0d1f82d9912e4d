use std::collections::BTreeMap;
use std::fmt::Display;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::trace;

/// Error returned by a transport,
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Server responded w/ a non-success http status,
    ///
    Status(u16),
    /// Request did not produce a response, e.g. aborted or unreachable,
    ///
    Network(String),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Status(status) => write!(f, "http status {status}"),
            TransportError::Network(reason) => write!(f, "network error: {reason}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Fetches the body of a url,
///
/// Only used to fetch fragments when the environment cannot import them natively.
///
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches url and returns the response body,
    ///
    async fn fetch(&self, url: &str) -> Result<Bytes, TransportError>;
}

/// Transport serving fixed responses,
///
/// Urls w/o a route fail w/ a network error.
///
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    routes: BTreeMap<String, Result<Bytes, TransportError>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves body for url,
    ///
    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.routes.insert(url.into(), Ok(body.into()));
        self
    }

    /// Fails url w/ an http status,
    ///
    pub fn with_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.routes
            .insert(url.into(), Err(TransportError::Status(status)));
        self
    }

    /// Fails url w/ a network error,
    ///
    pub fn with_network_error(mut self, url: impl Into<String>, reason: impl Into<String>) -> Self {
        self.routes
            .insert(url.into(), Err(TransportError::Network(reason.into())));
        self
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn fetch(&self, url: &str) -> Result<Bytes, TransportError> {
        trace!("Fetching {url}");
        self.routes
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::Network(format!("no route for {url}"))))
    }
}

#[allow(unused)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_transport() {
        let transport = MemoryTransport::new()
            .with_body("a.html", "<p>a</p>")
            .with_status("missing.html", 404)
            .with_network_error("aborted.html", "aborted");

        assert_eq!(
            Bytes::from_static(b"<p>a</p>"),
            transport.fetch("a.html").await.unwrap()
        );
        assert_eq!(
            Err(TransportError::Status(404)),
            transport.fetch("missing.html").await
        );
        assert!(matches!(
            transport.fetch("aborted.html").await,
            Err(TransportError::Network(_))
        ));
        assert!(matches!(
            transport.fetch("unknown.html").await,
            Err(TransportError::Network(_))
        ));
    }
}
