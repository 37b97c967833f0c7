//! Network-call capability.
//!
//! # Responsibilities
//! - Perform one GET-style round trip and hand back the unread response
//! - Hide client specifics (pooling, connect timeouts) from the dispatcher
//!
//! # Design Decisions
//! - The body is returned unread so the caller can release its slot first
//! - Cancellation is applied by the caller through `RequestContext::run`
//! - Implementations must be safe for concurrent reuse

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};
use thiserror::Error;

use crate::config::TimeoutConfig;
use crate::dispatch::context::ContextError;

/// Failure before a response status was received.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request aborted: {0}")]
    Cancelled(ContextError),
    #[error(transparent)]
    Client(#[from] hyper_util::client::legacy::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Performs a single request/response round trip.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn round_trip(&self, request: Request<Body>) -> Result<Response<Body>, TransportError>;
}

/// Pooled HTTP/1.1 + HTTP/2 client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
}

impl HyperTransport {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
            .build(connector);

        Self { client }
    }
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl HttpTransport for HyperTransport {
    async fn round_trip(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
        let response = self.client.request(request).await?;
        Ok(response.map(Body::new))
    }
}
