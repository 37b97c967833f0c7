//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (limiter overrides reference existing groups)
//! - Validate value ranges and formats (URLs, header values, log settings)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ZipperConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use axum::http::HeaderValue;
use tokio::sync::Semaphore;

use crate::config::schema::ZipperConfig;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a parsed configuration, collecting every error.
pub fn validate_config(config: &ZipperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if HeaderValue::from_str(&config.encoding).is_err() {
        errors.push(ValidationError::new("encoding", "not a valid header value"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let mut seen = HashSet::new();
    for (i, group) in config.groups.iter().enumerate() {
        let field = format!("groups[{}]", i);
        if group.name.is_empty() {
            errors.push(ValidationError::new(format!("{}.name", field), "must not be empty"));
        } else if !seen.insert(group.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", field),
                format!("duplicate group {:?}", group.name),
            ));
        }

        if group.servers.is_empty() {
            errors.push(ValidationError::new(
                format!("{}.servers", field),
                "must list at least one server",
            ));
        }
        for (j, server) in group.servers.iter().enumerate() {
            match url::Url::parse(server) {
                Ok(u) if u.scheme() == "http" => {}
                Ok(u) => errors.push(ValidationError::new(
                    format!("{}.servers[{}]", field, j),
                    format!("unsupported scheme {:?}", u.scheme()),
                )),
                Err(e) => errors.push(ValidationError::new(
                    format!("{}.servers[{}]", field, j),
                    format!("invalid url {:?}: {}", server, e),
                )),
            }
        }
    }

    if config.limiter.max_concurrent_per_group > Semaphore::MAX_PERMITS {
        errors.push(ValidationError::new(
            "limiter.max_concurrent_per_group",
            format!("must not exceed {}", Semaphore::MAX_PERMITS),
        ));
    }

    for (i, o) in config.limiter.overrides.iter().enumerate() {
        if !seen.contains(o.group.as_str()) {
            errors.push(ValidationError::new(
                format!("limiter.overrides[{}].group", i),
                format!("unknown group {:?}", o.group),
            ));
        }
        if o.capacity == 0 {
            errors.push(ValidationError::new(
                format!("limiter.overrides[{}].capacity", i),
                "must be greater than 0",
            ));
        } else if o.capacity > Semaphore::MAX_PERMITS {
            errors.push(ValidationError::new(
                format!("limiter.overrides[{}].capacity", i),
                format!("must not exceed {}", Semaphore::MAX_PERMITS),
            ));
        }
    }

    if let Err(e) = config.logging.check() {
        errors.push(ValidationError::new("logging", e.to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
