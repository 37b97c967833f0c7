//! Retry/failover controller for one backend group.
//!
//! # State Machine
//! ```text
//! Initial: max_tries = max(configured, replicas)
//! Trying:  pick replica → execute
//!     success            → Done (response, errors dropped)
//!     failure            → record; ctx done? → Aborted
//!                                   else   → Trying (next replica)
//! Exhausted: record MaxTriesExceeded → Done (errors)
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::http::HeaderValue;

use crate::dispatch::context::RequestContext;
use crate::dispatch::errors::{BuildError, DispatchError, Errors};
use crate::dispatch::executor::RequestExecutor;
use crate::dispatch::transport::HttpTransport;
use crate::dispatch::ServerResponse;
use crate::limiter::ServerLimiter;
use crate::load_balancer::RoundRobin;
use crate::observability::metrics;

/// Dispatcher for one backend group. Shared by all concurrent callers.
#[derive(Debug)]
pub struct HttpQuery {
    picker: RoundRobin,
    max_tries: usize,
    executor: RequestExecutor,
}

impl HttpQuery {
    pub fn new(
        group: &str,
        servers: Vec<String>,
        max_tries: usize,
        limiter: Arc<dyn ServerLimiter>,
        transport: Arc<dyn HttpTransport>,
        encoding: &str,
    ) -> Result<Self, BuildError> {
        let picker =
            RoundRobin::new(servers).ok_or_else(|| BuildError::EmptyGroup(group.to_string()))?;
        let encoding =
            HeaderValue::from_str(encoding).map_err(|source| BuildError::InvalidEncoding {
                encoding: encoding.to_string(),
                source,
            })?;

        Ok(Self {
            picker,
            max_tries,
            executor: RequestExecutor::new(group, encoding, limiter, transport),
        })
    }

    pub fn group(&self) -> &str {
        self.executor.group()
    }

    pub fn servers(&self) -> &[String] {
        self.picker.servers()
    }

    /// Every replica gets at least one try.
    pub fn effective_max_tries(&self) -> usize {
        self.max_tries.max(self.picker.len())
    }

    /// Send `uri` to the group, failing over across replicas.
    ///
    /// Returns the first successful response, or every failure observed in
    /// order. The aggregate ends with `MaxTriesExceeded` when the try budget
    /// ran out, and with the cancelled try when the context finished early.
    pub async fn do_query(
        &self,
        ctx: &RequestContext,
        uri: &str,
        body: Option<Bytes>,
    ) -> Result<ServerResponse, Errors> {
        let started = Instant::now();
        let max_tries = self.effective_max_tries();
        let mut errors = Errors::new();

        for attempt in 0..max_tries {
            let server = self.picker.pick();
            match self.executor.fetch(ctx, server, uri, body.clone()).await {
                Ok(response) => {
                    metrics::record_try(self.group(), "ok");
                    metrics::record_query(self.group(), "ok", started);
                    return Ok(response);
                }
                Err(err) => {
                    metrics::record_try(self.group(), err.kind());
                    tracing::debug!(
                        request_id = %ctx.request_id(),
                        group = %self.group(),
                        server = %server,
                        attempt,
                        max_tries,
                        error = %err,
                        "try failed"
                    );
                    errors.add(err);

                    if let Some(cause) = ctx.err() {
                        tracing::warn!(
                            request_id = %ctx.request_id(),
                            group = %self.group(),
                            attempts = attempt + 1,
                            error = %cause,
                            "query aborted"
                        );
                        metrics::record_query(self.group(), "aborted", started);
                        return Err(errors);
                    }
                }
            }
        }

        tracing::warn!(
            request_id = %ctx.request_id(),
            group = %self.group(),
            max_tries,
            errors = %errors,
            "max tries exceeded"
        );
        errors.add(DispatchError::MaxTriesExceeded);
        metrics::record_query(self.group(), "exhausted", started);
        Err(errors)
    }
}
