//! Backend query dispatcher for a metrics fan-out service.
//!
//! A request for a backend group is sent to one replica at a time, in
//! round-robin order, behind a per-group concurrency ceiling. Failures are
//! retried against the other replicas and reported together when no replica
//! answers.

pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod limiter;
pub mod load_balancer;
pub mod observability;

pub use config::ZipperConfig;
pub use dispatch::{BackendGroups, DispatchError, Errors, HttpQuery, RequestContext, ServerResponse};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
