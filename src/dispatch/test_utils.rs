//! Test doubles for the dispatch layer.

use std::sync::Mutex;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, Response, StatusCode};

use crate::dispatch::transport::{HttpTransport, TransportError};

/// What a scripted round trip does.
pub enum Reply {
    Ready(Result<Response<Body>, TransportError>),
    /// Never completes; only the request context can end it.
    Hang,
}

/// A request as seen by the transport.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

type Script = dyn Fn(usize, &RecordedRequest) -> Reply + Send + Sync;

/// Transport whose replies come from a closure keyed by call number.
pub struct ScriptedTransport {
    calls: Mutex<Vec<RecordedRequest>>,
    script: Box<Script>,
}

impl ScriptedTransport {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(usize, &RecordedRequest) -> Reply + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            script: Box::new(script),
        }
    }

    pub fn calls(&self) -> Vec<RecordedRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Hosts contacted, in call order.
    pub fn hosts(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| {
                let url = url::Url::parse(&c.uri).unwrap();
                format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default())
            })
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn round_trip(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
        let recorded = RecordedRequest {
            method: parts.method,
            uri: parts.uri.to_string(),
            headers: parts.headers,
            body,
        };

        let reply = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.len();
            calls.push(recorded.clone());
            (self.script)(n, &recorded)
        };

        match reply {
            Reply::Ready(res) => res,
            Reply::Hang => std::future::pending().await,
        }
    }
}

pub fn status(code: u16, body: &'static str) -> Reply {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::from_u16(code).unwrap();
    Reply::Ready(Ok(response))
}

pub fn refused() -> Reply {
    Reply::Ready(Err(TransportError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "connection refused",
    ))))
}
