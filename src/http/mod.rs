//! HTTP front end.
//!
//! # Data Flow
//! ```text
//! GET /{group}/{*path}?query
//!     → server.rs (request id, trace span, build RequestContext)
//!     → dispatch::BackendGroups (look up group)
//!     → HttpQuery::do_query
//!     → 200 + payload, or JSON error report
//! ```

pub mod server;

pub use server::HttpServer;
