//! Round-robin replica picker.

use std::sync::atomic::{AtomicU64, Ordering};

/// Rotates through a fixed replica list.
/// Stores an internal counter so concurrent callers never share a slot.
#[derive(Debug)]
pub struct RoundRobin {
    servers: Vec<String>,
    counter: AtomicU64,
}

impl RoundRobin {
    /// Create a picker. Returns `None` for an empty replica list.
    pub fn new(servers: Vec<String>) -> Option<Self> {
        if servers.is_empty() {
            return None;
        }
        Some(Self {
            servers,
            counter: AtomicU64::new(0),
        })
    }

    /// Return the next replica address.
    pub fn pick(&self) -> &str {
        if self.servers.len() == 1 {
            // Nothing to rotate; skip the atomic.
            return &self.servers[0];
        }

        let counter = self.counter.fetch_add(1, Ordering::Relaxed);
        let idx = (counter % self.servers.len() as u64) as usize;
        let server = &self.servers[idx];
        tracing::trace!(counter, idx, server = %server, "picked");
        server
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Number of rotations handed out so far.
    pub fn picks(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}
