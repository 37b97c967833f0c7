//! Dispatch error taxonomy and the per-call aggregate.

use std::fmt;

use axum::http::header::InvalidHeaderValue;
use thiserror::Error;

use crate::dispatch::context::ContextError;
use crate::dispatch::transport::TransportError;
use crate::limiter::LimiterError;

/// Failure of a single try against a single replica.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Slot wait aborted; no network call was made.
    #[error("group {group}: {source}")]
    Admission {
        group: String,
        #[source]
        source: LimiterError,
    },

    /// Connect, timeout or cancellation during the round trip.
    #[error("error fetching result from {server}: {source}")]
    Transport {
        server: String,
        #[source]
        source: TransportError,
    },

    /// The replica does not hold the requested data.
    #[error("not found on {server}")]
    NotFound { server: String },

    #[error("failed to fetch data from server/group {group}, code {status}")]
    FetchFailed {
        group: String,
        server: String,
        status: u16,
    },

    /// Success status, but the body could not be read.
    #[error("error reading body from {server}: {source}")]
    Read {
        server: String,
        #[source]
        source: axum::Error,
    },

    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("max tries exceeded")]
    MaxTriesExceeded,
}

impl DispatchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DispatchError::NotFound { .. })
    }

    /// The context cause, when this try ended because the request was cancelled or timed out.
    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            DispatchError::Admission {
                source: LimiterError::Cancelled(e),
                ..
            } => Some(*e),
            DispatchError::Transport {
                source: TransportError::Cancelled(e),
                ..
            } => Some(*e),
            _ => None,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Admission { .. } => "admission_cancelled",
            DispatchError::Transport { .. } => "transport",
            DispatchError::NotFound { .. } => "not_found",
            DispatchError::FetchFailed { .. } => "fetch_failed",
            DispatchError::Read { .. } => "read",
            DispatchError::InvalidUrl { .. } | DispatchError::Request(_) => "bad_request",
            DispatchError::MaxTriesExceeded => "max_tries_exceeded",
        }
    }
}

/// Ordered, append-only list of failures from one dispatch call.
#[derive(Debug, Default)]
pub struct Errors {
    errors: Vec<DispatchError>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, err: DispatchError) {
        self.errors.push(err);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DispatchError> {
        self.errors.iter()
    }

    pub fn into_vec(self) -> Vec<DispatchError> {
        self.errors
    }

    /// True when every try reported NotFound (the sentinel is ignored).
    pub fn all_not_found(&self) -> bool {
        let mut tries = self
            .errors
            .iter()
            .filter(|e| !matches!(e, DispatchError::MaxTriesExceeded))
            .peekable();
        tries.peek().is_some() && tries.all(DispatchError::is_not_found)
    }

    /// The cancellation cause, if the call was cut short by its context.
    pub fn was_cancelled(&self) -> Option<ContextError> {
        self.errors.iter().rev().find_map(DispatchError::context_error)
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a DispatchError;
    type IntoIter = std::slice::Iter<'a, DispatchError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Failure to construct a dispatcher.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("group {0} has no servers")]
    EmptyGroup(String),
    #[error("invalid encoding {encoding:?}: {source}")]
    InvalidEncoding {
        encoding: String,
        #[source]
        source: InvalidHeaderValue,
    },
    #[error("duplicate group {0}")]
    DuplicateGroup(String),
}
