//! # Service Configuration
//!
//! Typed configuration for a broker instance. Everything has a sensible
//! default; most callers only override the worker count and, in tests, the
//! front endpoint.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::transport::DEFAULT_QUEUE_DEPTH;

/// Configuration surface for one service and its worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Client-facing endpoint. `None` generates a unique local endpoint at
    /// plug time.
    pub endpoint: Option<String>,

    /// Worker pool size.
    pub workers: usize,

    /// Bounded queue depth (high-water mark) applied to every channel the
    /// service binds or connects.
    pub queue_depth: usize,

    /// Bounded wait used by the service's polling loop; also the longest the
    /// stop flag can go unchecked under no traffic.
    pub poll_interval: Duration,

    /// Join budget applied per thread while stopping the pool and the
    /// service itself.
    pub stop_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            workers: 1,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            poll_interval: Duration::from_millis(100),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

impl ServiceConfig {
    /// Configuration with `workers` pool threads and defaults elsewhere.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    /// Builder-style front endpoint override.
    pub fn at_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}
