//! Capacity-bounded limiter.
//!
//! # Responsibilities
//! - Hold a fixed number of slots per group name
//! - Block `enter` until a slot frees up or the request context is done
//! - Report current in-flight counts for metrics and tests
//!
//! # Design Decisions
//! - One tokio `Semaphore` per group, created on first use
//! - Semaphore fairness is FIFO, but callers should not rely on ordering

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Semaphore;

use crate::dispatch::context::RequestContext;
use crate::limiter::{LimiterError, LimiterSlot, ServerLimiter};

/// Fixed slot count per group, shared across all dispatchers of that group.
#[derive(Debug)]
pub struct BoundedLimiter {
    default_capacity: usize,
    overrides: HashMap<String, usize>,
    slots: DashMap<String, Arc<Semaphore>>,
}

impl BoundedLimiter {
    /// Create a limiter granting `capacity` slots to every group.
    pub fn new(capacity: usize) -> Self {
        Self {
            default_capacity: capacity,
            overrides: HashMap::new(),
            slots: DashMap::new(),
        }
    }

    /// Give `group` its own slot count.
    pub fn with_group_capacity(mut self, group: &str, capacity: usize) -> Self {
        self.overrides.insert(group.to_string(), capacity);
        self
    }

    fn capacity_for(&self, group: &str) -> usize {
        self.overrides.get(group).copied().unwrap_or(self.default_capacity)
    }

    fn semaphore(&self, group: &str) -> Arc<Semaphore> {
        if let Some(sem) = self.slots.get(group) {
            return sem.value().clone();
        }
        self.slots
            .entry(group.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.capacity_for(group))))
            .value()
            .clone()
    }

    /// Number of slots currently held for `group`.
    pub fn in_flight(&self, group: &str) -> usize {
        match self.slots.get(group) {
            Some(sem) => self.capacity_for(group).saturating_sub(sem.available_permits()),
            None => 0,
        }
    }
}

#[async_trait]
impl ServerLimiter for BoundedLimiter {
    async fn enter(&self, ctx: &RequestContext, group: &str) -> Result<LimiterSlot, LimiterError> {
        let sem = self.semaphore(group);
        let permit = ctx
            .run(sem.acquire_owned())
            .await?
            .map_err(|_| LimiterError::Closed)?;
        Ok(LimiterSlot::bounded(permit))
    }

    fn capacity(&self, group: &str) -> Option<usize> {
        Some(self.capacity_for(group))
    }
}
