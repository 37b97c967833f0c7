//! Backend group registry.
//!
//! # Responsibilities
//! - Build one dispatcher per configured group
//! - Share a single limiter and transport across all of them
//! - Look dispatchers up by group name

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ZipperConfig;
use crate::dispatch::errors::BuildError;
use crate::dispatch::query::HttpQuery;
use crate::dispatch::transport::HttpTransport;
use crate::limiter::ServerLimiter;

/// Map of group name -> dispatcher.
#[derive(Debug, Default)]
pub struct BackendGroups {
    groups: HashMap<String, Arc<HttpQuery>>,
}

impl BackendGroups {
    /// Create dispatchers for every group in the configuration.
    pub fn from_config(
        config: &ZipperConfig,
        limiter: Arc<dyn ServerLimiter>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, BuildError> {
        let mut groups = HashMap::new();

        for group in &config.groups {
            if groups.contains_key(&group.name) {
                return Err(BuildError::DuplicateGroup(group.name.clone()));
            }
            let query = HttpQuery::new(
                &group.name,
                group.servers.clone(),
                group.max_tries,
                limiter.clone(),
                transport.clone(),
                &config.encoding,
            )?;
            tracing::info!(
                group = %group.name,
                servers = group.servers.len(),
                max_tries = query.effective_max_tries(),
                capacity = ?limiter.capacity(&group.name),
                "Backend group registered"
            );
            groups.insert(group.name.clone(), Arc::new(query));
        }

        Ok(Self { groups })
    }

    /// Dispatcher for `name`.
    pub fn get(&self, name: &str) -> Option<Arc<HttpQuery>> {
        let found = self.groups.get(name).cloned();
        if found.is_none() {
            tracing::debug!(group = %name, "Group not found");
        }
        found
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.groups.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
