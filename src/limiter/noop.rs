//! Unbounded limiter used when no ceiling is configured.

use async_trait::async_trait;

use crate::dispatch::context::RequestContext;
use crate::limiter::{LimiterError, LimiterSlot, ServerLimiter};

/// Admits every request immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLimiter;

impl NoopLimiter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ServerLimiter for NoopLimiter {
    async fn enter(
        &self,
        _ctx: &RequestContext,
        _group: &str,
    ) -> Result<LimiterSlot, LimiterError> {
        Ok(LimiterSlot::unbounded())
    }

    fn capacity(&self, _group: &str) -> Option<usize> {
        None
    }
}
