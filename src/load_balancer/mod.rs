//! Replica selection subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch try starts
//!     → round_robin.rs (next replica of the group, in list order)
//!     → replica address handed to the request executor
//! ```
//!
//! # Design Decisions
//! - Replica list is static and supplied by configuration
//! - No health filtering: a failing replica is skipped by the retry loop, not removed
//! - Counter is owned by the picker instance, never process-global

pub mod round_robin;

pub use round_robin::RoundRobin;
