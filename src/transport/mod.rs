//! # In-Process Messaging Transport
//!
//! Addressable, identity-tagged, message-oriented channels built on
//! `crossbeam` bounded channels. This is the collaborator layer the broker
//! core is written against: it provides bind/connect by endpoint name,
//! tagged send/receive of [`Message`](crate::message::Message) frames, and a
//! bounded multiplexed wait, and nothing else.
//!
//! ## Channel kinds
//!
//! - [`RouterSocket`]: many-to-one, identity-routed. Used for the worker
//!   proxy channel, the client-facing front channel, and the control channel.
//! - [`DealerSocket`]: the connecting side. Every outbound frame is tagged
//!   with the socket's identity so the router can attribute and route it.
//!
//! ## Context
//!
//! Endpoint names resolve through a [`Context`], a cloneable handle to an
//! endpoint registry. [`Context::instance`] returns the process-wide default,
//! which is what lets independently constructed components find each other,
//! mirroring the one-context-per-process rule of the underlying model. The
//! registry mutex lives entirely inside this module; broker, pool, and worker
//! state is never shared across threads.

pub mod context;
pub mod errors;
pub mod socket;

pub use context::Context;
pub use errors::TransportError;
pub use socket::{DealerSocket, RouterSocket};

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Default bounded queue depth (high-water mark) for a channel.
pub const DEFAULT_QUEUE_DEPTH: usize = 1000;

/// Opaque token naming one logical endpoint on a many-to-one channel.
///
/// Identities route proxied frames to the correct worker thread and attribute
/// client traffic on the front channel. They are unique within one router's
/// peer registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Generate a fresh random identity.
    pub fn random() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// View the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
