//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → trigger() → server stops accepting → in-flight calls drain → exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
