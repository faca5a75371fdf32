//! # Transport Error Types

use thiserror::Error;

/// Failures at the channel layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// `bind` was asked for an endpoint that already has a listener.
    #[error("endpoint already bound: {endpoint}")]
    EndpointInUse { endpoint: String },

    /// `connect` was asked for an endpoint nothing is bound to.
    #[error("no listener bound at endpoint: {endpoint}")]
    UnknownEndpoint { endpoint: String },

    /// A router was asked to route to an identity that never attached.
    #[error("no connected peer with identity: {identity}")]
    UnknownPeer { identity: String },

    /// The other side of a channel is gone.
    #[error("channel closed: {context}")]
    Closed { context: String },
}

impl TransportError {
    /// Create an endpoint-in-use error.
    pub fn endpoint_in_use(endpoint: impl Into<String>) -> Self {
        Self::EndpointInUse {
            endpoint: endpoint.into(),
        }
    }

    /// Create an unknown-endpoint error.
    pub fn unknown_endpoint(endpoint: impl Into<String>) -> Self {
        Self::UnknownEndpoint {
            endpoint: endpoint.into(),
        }
    }

    /// Create an unknown-peer error.
    pub fn unknown_peer(identity: impl Into<String>) -> Self {
        Self::UnknownPeer {
            identity: identity.into(),
        }
    }

    /// Create a closed-channel error.
    pub fn closed(context: impl Into<String>) -> Self {
        Self::Closed {
            context: context.into(),
        }
    }
}
