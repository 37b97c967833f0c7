//! Per-group admission control.
//!
//! # Data Flow
//! ```text
//! Executor about to call a replica
//!     → ServerLimiter::enter(ctx, group)
//!         - noop.rs: admit immediately
//!         - bounded.rs: wait for one of N slots (or ctx done)
//!     → LimiterSlot held for the round trip only
//!     → slot dropped / leave() → capacity returned
//! ```
//!
//! # Design Decisions
//! - One limiter instance is shared by every dispatcher in the process
//! - Slots are RAII guards so every exit path releases exactly once
//! - Variant is chosen from configuration at construction time

pub mod bounded;
pub mod noop;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::OwnedSemaphorePermit;

use crate::config::LimiterConfig;
use crate::dispatch::context::{ContextError, RequestContext};

pub use bounded::BoundedLimiter;
pub use noop::NoopLimiter;

/// Admission failure.
#[derive(Debug, Error)]
pub enum LimiterError {
    #[error("timeout waiting for a slot: {0}")]
    Cancelled(#[from] ContextError),
    #[error("limiter closed")]
    Closed,
}

/// Admission gate bounding in-flight requests per backend group.
#[async_trait]
pub trait ServerLimiter: Send + Sync + std::fmt::Debug {
    /// Wait for a slot in `group`. Acquires nothing when the context finishes first.
    async fn enter(&self, ctx: &RequestContext, group: &str) -> Result<LimiterSlot, LimiterError>;

    /// Slot count for `group`, `None` when unbounded.
    fn capacity(&self, group: &str) -> Option<usize>;
}

/// A held admission slot. Released on `leave()` or drop.
#[derive(Debug)]
#[must_use = "dropping a slot releases it immediately"]
pub struct LimiterSlot {
    permit: Option<OwnedSemaphorePermit>,
}

impl LimiterSlot {
    pub(crate) fn unbounded() -> Self {
        Self { permit: None }
    }

    pub(crate) fn bounded(permit: OwnedSemaphorePermit) -> Self {
        Self { permit: Some(permit) }
    }

    /// Release the slot.
    pub fn leave(self) {
        drop(self);
    }

    /// True when this slot counts against a capacity.
    pub fn is_bounded(&self) -> bool {
        self.permit.is_some()
    }
}

/// Build the limiter described by configuration.
pub fn from_config(config: &LimiterConfig) -> Arc<dyn ServerLimiter> {
    if config.max_concurrent_per_group == 0 {
        tracing::info!("No concurrency ceiling configured, using unbounded limiter");
        return Arc::new(NoopLimiter::new());
    }

    let mut limiter = BoundedLimiter::new(config.max_concurrent_per_group);
    for o in &config.overrides {
        limiter = limiter.with_group_capacity(&o.group, o.capacity);
    }
    tracing::info!(
        capacity = config.max_concurrent_per_group,
        overrides = config.overrides.len(),
        "Using bounded limiter"
    );
    Arc::new(limiter)
}
