//! Backend query dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Caller (ctx, uri, body)
//!     → groups.rs (look up the group's HttpQuery)
//!     → query.rs (retry/failover loop, error aggregation)
//!         → load_balancer::RoundRobin (next replica)
//!         → executor.rs (one try)
//!             → limiter (slot for the group)
//!             → transport.rs (round trip)
//!             → classify status, read body
//!     → ServerResponse | Errors
//! ```
//!
//! # Design Decisions
//! - Payload-agnostic: bodies are opaque bytes in both directions
//! - One HttpQuery per group, shared by all callers; only the picker counter
//!   and limiter slots are mutable
//! - Errors are accumulated and returned, never logged-and-dropped

pub mod context;
pub mod errors;
pub mod executor;
pub mod groups;
pub mod query;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_utils;

use axum::body::Bytes;

pub use context::{ContextError, RequestContext};
pub use errors::{BuildError, DispatchError, Errors};
pub use groups::BackendGroups;
pub use query::HttpQuery;
pub use transport::{HttpTransport, HyperTransport, TransportError};

/// Payload returned by the replica that answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResponse {
    /// Replica address that served the request.
    pub server: String,
    /// Raw response body.
    pub response: Bytes,
}
