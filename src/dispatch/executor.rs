//! Single-try request execution.
//!
//! # Responsibilities
//! - Build the request URL and headers for one replica
//! - Hold one limiter slot for the duration of the round trip
//! - Classify the outcome (transport / not found / fetch failed / read)
//!
//! # Design Decisions
//! - Exactly one attempt against exactly one replica; no retry logic here
//! - The slot is released before the body is read
//! - Every suspension point is bounded by the request context

use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};

use crate::dispatch::context::RequestContext;
use crate::dispatch::errors::DispatchError;
use crate::dispatch::transport::{HttpTransport, TransportError};
use crate::dispatch::ServerResponse;
use crate::limiter::ServerLimiter;
use crate::observability::metrics;

/// Issues one request against one replica of a group.
pub struct RequestExecutor {
    group: String,
    encoding: HeaderValue,
    limiter: Arc<dyn ServerLimiter>,
    transport: Arc<dyn HttpTransport>,
}

impl RequestExecutor {
    pub fn new(
        group: impl Into<String>,
        encoding: HeaderValue,
        limiter: Arc<dyn ServerLimiter>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            group: group.into(),
            encoding,
            limiter,
            transport,
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    fn build_request(
        &self,
        ctx: &RequestContext,
        url: &str,
        body: Option<Bytes>,
    ) -> Result<Request<Body>, DispatchError> {
        let mut builder = Request::builder()
            .method(Method::GET)
            .uri(url)
            .header(header::ACCEPT, self.encoding.clone());
        if let Some(headers) = builder.headers_mut() {
            ctx.propagate(headers);
        }

        let body = match body {
            Some(bytes) => Body::from(bytes),
            None => Body::empty(),
        };
        Ok(builder.body(body)?)
    }

    /// Perform one try against `server`.
    pub async fn fetch(
        &self,
        ctx: &RequestContext,
        server: &str,
        uri: &str,
        body: Option<Bytes>,
    ) -> Result<ServerResponse, DispatchError> {
        let raw = format!("{}{}", server, uri);
        let url = url::Url::parse(&raw).map_err(|source| DispatchError::InvalidUrl {
            url: raw.clone(),
            source,
        })?;
        let request = self.build_request(ctx, url.as_str(), body)?;

        tracing::debug!(
            request_id = %ctx.request_id(),
            group = %self.group,
            uri = %url,
            "trying to get slot"
        );

        let wait_started = Instant::now();
        let slot = match self.limiter.enter(ctx, &self.group).await {
            Ok(slot) => slot,
            Err(source) => {
                tracing::debug!(group = %self.group, error = %source, "timeout waiting for a slot");
                return Err(DispatchError::Admission {
                    group: self.group.clone(),
                    source,
                });
            }
        };
        metrics::record_slot_wait(&self.group, wait_started);
        tracing::debug!(group = %self.group, "got slot");

        let result = ctx.run(self.transport.round_trip(request)).await;
        slot.leave();

        let response = match result {
            Ok(Ok(response)) => response,
            Ok(Err(source)) => {
                tracing::error!(
                    group = %self.group,
                    server = %server,
                    error = %source,
                    "error fetching result"
                );
                return Err(DispatchError::Transport {
                    server: server.to_string(),
                    source,
                });
            }
            Err(cause) => {
                tracing::warn!(
                    group = %self.group,
                    server = %server,
                    error = %cause,
                    "request aborted"
                );
                return Err(DispatchError::Transport {
                    server: server.to_string(),
                    source: TransportError::Cancelled(cause),
                });
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(
                group = %self.group,
                server = %server,
                status_code = status.as_u16(),
                "status not ok, not found"
            );
            return Err(DispatchError::NotFound {
                server: server.to_string(),
            });
        }
        if status != StatusCode::OK {
            tracing::error!(
                group = %self.group,
                server = %server,
                status_code = status.as_u16(),
                "status not ok"
            );
            return Err(DispatchError::FetchFailed {
                group: self.group.clone(),
                server: server.to_string(),
                status: status.as_u16(),
            });
        }

        match ctx.run(axum::body::to_bytes(response.into_body(), usize::MAX)).await {
            Ok(Ok(payload)) => Ok(ServerResponse {
                server: server.to_string(),
                response: payload,
            }),
            Ok(Err(source)) => {
                tracing::error!(
                    group = %self.group,
                    server = %server,
                    error = %source,
                    "error reading body"
                );
                Err(DispatchError::Read {
                    server: server.to_string(),
                    source,
                })
            }
            Err(cause) => Err(DispatchError::Transport {
                server: server.to_string(),
                source: TransportError::Cancelled(cause),
            }),
        }
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("group", &self.group)
            .field("encoding", &self.encoding)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::context::ContextError;
    use crate::dispatch::test_utils::{refused, status, Reply, ScriptedTransport};
    use crate::limiter::{BoundedLimiter, LimiterError, NoopLimiter};
    use futures_util::stream;
    use std::time::Duration;

    fn executor(
        limiter: Arc<dyn ServerLimiter>,
        transport: Arc<ScriptedTransport>,
    ) -> RequestExecutor {
        RequestExecutor::new(
            "cache",
            HeaderValue::from_static("application/x-protobuf"),
            limiter,
            transport,
        )
    }

    #[tokio::test]
    async fn test_request_shape() {
        let transport = Arc::new(ScriptedTransport::new(|_, _| status(200, "payload")));
        let exec = executor(Arc::new(NoopLimiter::new()), transport.clone());
        let ctx = RequestContext::new()
            .with_request_id("req-1")
            .with_metadata("carbonapi-uuid", "abc");

        let res = exec
            .fetch(
                &ctx,
                "http://10.0.0.1:8080",
                "/render/?target=a.b",
                Some(Bytes::from_static(b"q")),
            )
            .await
            .unwrap();
        assert_eq!(res.server, "http://10.0.0.1:8080");
        assert_eq!(&res.response[..], b"payload");

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.method, Method::GET);
        assert_eq!(call.uri, "http://10.0.0.1:8080/render/?target=a.b");
        assert_eq!(call.headers.get(header::ACCEPT).unwrap(), "application/x-protobuf");
        assert_eq!(call.headers.get("x-request-id").unwrap(), "req-1");
        assert_eq!(call.headers.get("x-ctx-carbonapi-uuid").unwrap(), "abc");
        assert_eq!(&call.body[..], b"q");
    }

    #[tokio::test]
    async fn test_status_classification() {
        let transport = Arc::new(ScriptedTransport::new(|n, _| match n {
            0 => status(404, ""),
            1 => status(500, "boom"),
            _ => refused(),
        }));
        let exec = executor(Arc::new(NoopLimiter::new()), transport);
        let ctx = RequestContext::new();

        let err = exec.fetch(&ctx, "http://a", "/x", None).await.unwrap_err();
        assert!(matches!(err, DispatchError::NotFound { ref server } if server == "http://a"));

        let err = exec.fetch(&ctx, "http://a", "/x", None).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::FetchFailed { status: 500, ref group, .. } if group == "cache"
        ));

        let err = exec.fetch(&ctx, "http://a", "/x", None).await.unwrap_err();
        assert!(matches!(err, DispatchError::Transport { source: TransportError::Io(_), .. }));
    }

    #[tokio::test]
    async fn test_body_read_failure() {
        let transport = Arc::new(ScriptedTransport::new(|_, _| {
            let chunks = vec![
                Ok(Bytes::from_static(b"partial")),
                Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            ];
            let body = Body::from_stream(stream::iter(chunks));
            Reply::Ready(Ok(axum::http::Response::new(body)))
        }));
        let exec = executor(Arc::new(NoopLimiter::new()), transport);

        let err = exec
            .fetch(&RequestContext::new(), "http://a", "/x", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Read { .. }));
    }

    #[tokio::test]
    async fn test_admission_failure_skips_network() {
        let limiter = Arc::new(BoundedLimiter::new(1));
        let _held = limiter.enter(&RequestContext::new(), "cache").await.unwrap();

        let transport = Arc::new(ScriptedTransport::new(|_, _| status(200, "unused")));
        let exec = executor(limiter.clone(), transport.clone());

        let ctx = RequestContext::new().with_timeout(Duration::from_millis(20));
        let err = exec.fetch(&ctx, "http://a", "/x", None).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Admission {
                source: LimiterError::Cancelled(ContextError::DeadlineExceeded),
                ..
            }
        ));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_slot_released_before_body_read() {
        let limiter = Arc::new(BoundedLimiter::new(2));
        let observer = limiter.clone();
        let transport = Arc::new(ScriptedTransport::new(move |_, _| {
            let observer = observer.clone();
            let body = stream::once(async move {
                let in_flight = observer.in_flight("cache");
                Ok::<_, std::io::Error>(Bytes::from(in_flight.to_string()))
            });
            Reply::Ready(Ok(axum::http::Response::new(Body::from_stream(body))))
        }));
        let exec = executor(limiter.clone(), transport);

        let res = exec.fetch(&RequestContext::new(), "http://a", "/x", None).await.unwrap();
        assert_eq!(&res.response[..], b"0");
        assert_eq!(limiter.in_flight("cache"), 0);
    }

    #[tokio::test]
    async fn test_in_flight_call_aborted_by_cancel() {
        let limiter = Arc::new(BoundedLimiter::new(1));
        let transport = Arc::new(ScriptedTransport::new(|_, _| Reply::Hang));
        let exec = executor(limiter.clone(), transport);

        let ctx = RequestContext::new().with_timeout(Duration::from_millis(20));
        let err = exec.fetch(&ctx, "http://a", "/x", None).await.unwrap_err();
        assert_eq!(err.context_error(), Some(ContextError::DeadlineExceeded));
        assert_eq!(limiter.in_flight("cache"), 0);
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let transport = Arc::new(ScriptedTransport::new(|_, _| status(200, "")));
        let exec = executor(Arc::new(NoopLimiter::new()), transport.clone());
        let err = exec
            .fetch(&RequestContext::new(), "not a url", "/x", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidUrl { .. }));
        assert!(transport.calls().is_empty());
    }
}
