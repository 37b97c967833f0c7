//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the query handler
//! - Wire up middleware (request ID, tracing)
//! - Build a request context per inbound call and dispatch it to a group
//! - Map dispatch outcomes to HTTP responses

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ZipperConfig;
use crate::dispatch::context::{RequestContext, CTX_HEADER_PREFIX, X_REQUEST_ID};
use crate::dispatch::{BackendGroups, BuildError, Errors, HttpTransport, HyperTransport};
use crate::limiter::{self, ServerLimiter};

/// Header naming the replica that served a response.
pub const X_SERVED_BY: &str = "x-served-by";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub groups: Arc<BackendGroups>,
    pub request_timeout: Duration,
}

/// HTTP front end of the zipper.
pub struct HttpServer {
    router: Router,
    config: ZipperConfig,
}

impl HttpServer {
    /// Create a server with the configured limiter and a pooled hyper transport.
    pub fn new(config: ZipperConfig) -> Result<Self, BuildError> {
        let limiter = limiter::from_config(&config.limiter);
        let transport = Arc::new(HyperTransport::new(&config.timeouts));
        Self::with_parts(config, limiter, transport)
    }

    /// Create a server around caller-supplied limiter and transport.
    pub fn with_parts(
        config: ZipperConfig,
        limiter: Arc<dyn ServerLimiter>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, BuildError> {
        let groups = Arc::new(BackendGroups::from_config(&config, limiter, transport)?);
        let state = AppState {
            groups,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };

        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{group}/{*path}", get(query_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ZipperConfig {
        &self.config
    }
}

fn request_context(headers: &HeaderMap, timeout: Duration) -> RequestContext {
    let mut ctx = RequestContext::new().with_timeout(timeout);
    if let Some(id) = headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok()) {
        ctx = ctx.with_request_id(id);
    }
    for (name, value) in headers {
        let Some(key) = name.as_str().strip_prefix(CTX_HEADER_PREFIX) else {
            continue;
        };
        if let Ok(value) = value.to_str() {
            ctx = ctx.with_metadata(key, value);
        }
    }
    ctx
}

fn error_status(errors: &Errors) -> StatusCode {
    if errors.all_not_found() {
        StatusCode::NOT_FOUND
    } else if errors.was_cancelled().is_some() {
        StatusCode::GATEWAY_TIMEOUT
    } else {
        StatusCode::BAD_GATEWAY
    }
}

/// Strip the leading `/{group}` segment from the raw request target.
///
/// Works on the undecoded path so escapes like `%3F` reach the backend as sent.
fn backend_target(uri: &Uri) -> String {
    let path = uri.path();
    let rest = path
        .get(1..)
        .and_then(|p| p.find('/').map(|i| &p[i..]))
        .unwrap_or("/");
    match uri.query() {
        Some(q) => format!("{}?{}", rest, q),
        None => rest.to_string(),
    }
}

/// Dispatch `/{group}/{path}?{query}` to the group as `/{path}?{query}`.
async fn query_handler(
    State(state): State<AppState>,
    Path((group, _)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = request_context(&headers, state.request_timeout);

    let Some(query) = state.groups.get(&group) else {
        tracing::warn!(request_id = %ctx.request_id(), group = %group, "Unknown group");
        let body = json!({
            "group": group,
            "request_id": ctx.request_id(),
            "errors": ["unknown group"],
        });
        return (StatusCode::NOT_FOUND, Json(body)).into_response();
    };

    let target = backend_target(&uri);
    let body = if body.is_empty() { None } else { Some(body) };

    tracing::debug!(
        request_id = %ctx.request_id(),
        group = %group,
        uri = %target,
        "Dispatching query"
    );

    match query.do_query(&ctx, &target, body).await {
        Ok(res) => (StatusCode::OK, [(X_SERVED_BY, res.server)], res.response).into_response(),
        Err(errors) => {
            let status = error_status(&errors);
            tracing::warn!(
                request_id = %ctx.request_id(),
                group = %group,
                status = status.as_u16(),
                errors = %errors,
                "Query failed"
            );
            let body = json!({
                "group": group,
                "request_id": ctx.request_id(),
                "errors": errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
            });
            (status, Json(body)).into_response()
        }
    }
}
