//! # Transport Context
//!
//! The endpoint registry that lets sockets find each other by name. A
//! [`Context`] is a cheap cloneable handle; [`Context::instance`] hands out
//! the process-wide default so independently constructed components share
//! one namespace.

use crossbeam::channel::{bounded, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

use super::errors::TransportError;
use super::socket::{DealerSocket, Frame, RouterSocket};
use super::Identity;

static INSTANCE: OnceLock<Context> = OnceLock::new();

/// Handle to an endpoint registry.
#[derive(Clone, Default, Debug)]
pub struct Context {
    inner: Arc<Inner>,
}

#[derive(Default, Debug)]
struct Inner {
    endpoints: Mutex<HashMap<String, Sender<Frame>>>,
}

impl Context {
    /// Create a fresh, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default context.
    pub fn instance() -> Self {
        INSTANCE.get_or_init(Self::new).clone()
    }

    /// Generate a unique in-process endpoint name.
    pub fn unique_endpoint() -> String {
        format!("inproc://pipe-{}", Uuid::new_v4().simple())
    }

    /// Bind a router at `endpoint` with a bounded inbound queue of `depth`.
    pub fn bind(&self, endpoint: &str, depth: usize) -> Result<RouterSocket, TransportError> {
        let (tx, rx) = bounded(depth);
        let mut endpoints = self.inner.endpoints.lock();
        if endpoints.contains_key(endpoint) {
            return Err(TransportError::endpoint_in_use(endpoint));
        }
        endpoints.insert(endpoint.to_string(), tx);
        drop(endpoints);
        Ok(RouterSocket::new(self.clone(), endpoint.to_string(), rx))
    }

    /// Connect a dealer tagged with `identity` to the router at `endpoint`.
    ///
    /// The dealer's inbox is a bounded queue of `depth`; the attach frame is
    /// delivered through the router's normal inbound queue, so the router
    /// learns about the peer strictly before any of its payload frames.
    pub fn connect(
        &self,
        endpoint: &str,
        identity: Identity,
        depth: usize,
    ) -> Result<DealerSocket, TransportError> {
        let to_router = {
            let endpoints = self.inner.endpoints.lock();
            endpoints
                .get(endpoint)
                .cloned()
                .ok_or_else(|| TransportError::unknown_endpoint(endpoint))?
        };
        let (inbox_tx, inbox_rx) = bounded(depth);
        to_router
            .send(Frame::Attach {
                identity: identity.clone(),
                tx: inbox_tx,
            })
            .map_err(|_| TransportError::closed(format!("router at {endpoint} is gone")))?;
        Ok(DealerSocket::new(identity, to_router, inbox_rx))
    }

    /// Remove a bound endpoint. Called when its router is dropped.
    pub(crate) fn unbind(&self, endpoint: &str) {
        self.inner.endpoints.lock().remove(endpoint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_rejects_duplicate_endpoint() {
        let ctx = Context::new();
        let _router = ctx.bind("inproc://dup", 8).expect("first bind");
        let err = ctx.bind("inproc://dup", 8).expect_err("second bind");
        assert!(matches!(err, TransportError::EndpointInUse { .. }));
    }

    #[test]
    fn test_connect_requires_listener() {
        let ctx = Context::new();
        let err = ctx
            .connect("inproc://nowhere", Identity::random(), 8)
            .expect_err("connect without bind");
        assert!(matches!(err, TransportError::UnknownEndpoint { .. }));
    }

    #[test]
    fn test_endpoint_is_released_on_drop() {
        let ctx = Context::new();
        {
            let _router = ctx.bind("inproc://transient", 8).expect("bind");
        }
        let _router = ctx.bind("inproc://transient", 8).expect("rebind after drop");
    }

    #[test]
    fn test_unique_endpoints_do_not_collide() {
        let a = Context::unique_endpoint();
        let b = Context::unique_endpoint();
        assert_ne!(a, b);
        assert!(a.starts_with("inproc://pipe-"));
    }
}
