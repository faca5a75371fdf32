//! # Router and Dealer Sockets
//!
//! A [`RouterSocket`] merges frames from any number of connected peers into
//! one bounded queue and routes outbound frames back by identity. A
//! [`DealerSocket`] is one peer's end: a sender into the router's queue plus
//! a private bounded inbox.
//!
//! Peers announce themselves with an `Attach` frame carrying their inbox
//! sender. Attach frames travel through the same queue as payload frames, so
//! the router always learns a peer before seeing its traffic; the receive
//! path absorbs them transparently.

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};
use tracing::trace;

use super::context::Context;
use super::errors::TransportError;
use super::Identity;
use crate::message::Message;

/// A frame on a router's inbound queue.
pub(crate) enum Frame {
    /// A peer announcing itself and handing over its inbox sender.
    Attach {
        identity: Identity,
        tx: Sender<Delivery>,
    },
    /// An identity-tagged payload. `peer` is an opaque passthrough token the
    /// application interprets: the originating client on proxied traffic,
    /// the control-peer marker on handshakes.
    Payload {
        identity: Identity,
        peer: Identity,
        message: Message,
    },
}

/// A frame delivered into a dealer's inbox.
pub(crate) struct Delivery {
    pub(crate) peer: Identity,
    pub(crate) message: Message,
}

/// Many-to-one, identity-routed channel endpoint. Owned by exactly one thread.
#[derive(Debug)]
pub struct RouterSocket {
    ctx: Context,
    endpoint: String,
    rx: Receiver<Frame>,
    peers: std::collections::HashMap<Identity, Sender<Delivery>>,
}

impl RouterSocket {
    pub(crate) fn new(ctx: Context, endpoint: String, rx: Receiver<Frame>) -> Self {
        Self {
            ctx,
            endpoint,
            rx,
            peers: std::collections::HashMap::new(),
        }
    }

    /// The endpoint this router is bound at.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// True when unread frames are queued. A readiness poll, not a read.
    pub fn has_input(&self) -> bool {
        !self.rx.is_empty()
    }

    pub(crate) fn receiver(&self) -> &Receiver<Frame> {
        &self.rx
    }

    fn absorb(&mut self, frame: Frame) -> Option<(Identity, Identity, Message)> {
        match frame {
            Frame::Attach { identity, tx } => {
                trace!(identity = %identity, endpoint = %self.endpoint, "peer attached");
                self.peers.insert(identity, tx);
                None
            }
            Frame::Payload {
                identity,
                peer,
                message,
            } => Some((identity, peer, message)),
        }
    }

    /// Block until a payload frame arrives.
    pub fn recv(&mut self) -> Result<(Identity, Identity, Message), TransportError> {
        loop {
            let frame = self
                .rx
                .recv()
                .map_err(|_| TransportError::closed(format!("router at {}", self.endpoint)))?;
            if let Some(triple) = self.absorb(frame) {
                return Ok(triple);
            }
        }
    }

    /// Wait up to `timeout` for a payload frame. `None` on expiry.
    pub fn recv_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<(Identity, Identity, Message)>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(frame) => {
                    if let Some(triple) = self.absorb(frame) {
                        return Ok(Some(triple));
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(TransportError::closed(format!(
                        "router at {}",
                        self.endpoint
                    )))
                }
            }
        }
    }

    /// Non-blocking receive. `None` when no payload frame is queued.
    pub fn try_recv(&mut self) -> Result<Option<(Identity, Identity, Message)>, TransportError> {
        loop {
            match self.rx.try_recv() {
                Ok(frame) => {
                    if let Some(triple) = self.absorb(frame) {
                        return Ok(Some(triple));
                    }
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => {
                    return Err(TransportError::closed(format!(
                        "router at {}",
                        self.endpoint
                    )))
                }
            }
        }
    }

    /// Route a frame to the attached peer `identity`, tagged with `peer`.
    ///
    /// Blocks when the peer's inbox is at its high-water mark.
    pub fn send(
        &mut self,
        identity: &Identity,
        peer: &Identity,
        message: Message,
    ) -> Result<(), TransportError> {
        let delivered = self
            .peers
            .get(identity)
            .ok_or_else(|| TransportError::unknown_peer(identity.as_str()))?
            .send(Delivery {
                peer: peer.clone(),
                message,
            });
        if delivered.is_err() {
            self.peers.remove(identity);
            return Err(TransportError::closed(format!(
                "peer {identity} disconnected"
            )));
        }
        Ok(())
    }
}

impl Drop for RouterSocket {
    fn drop(&mut self) {
        self.ctx.unbind(&self.endpoint);
    }
}

/// One peer's end of a many-to-one channel. Owned by exactly one thread.
#[derive(Debug)]
pub struct DealerSocket {
    identity: Identity,
    to_router: Sender<Frame>,
    inbox: Receiver<Delivery>,
}

impl DealerSocket {
    pub(crate) fn new(identity: Identity, to_router: Sender<Frame>, inbox: Receiver<Delivery>) -> Self {
        Self {
            identity,
            to_router,
            inbox,
        }
    }

    /// The identity this socket tags onto every outbound frame.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub(crate) fn receiver(&self) -> &Receiver<Delivery> {
        &self.inbox
    }

    /// Send a frame to the router, tagged with this socket's identity and the
    /// passthrough token `peer`. Blocks at the router's high-water mark.
    pub fn send(&self, peer: &Identity, message: Message) -> Result<(), TransportError> {
        self.to_router
            .send(Frame::Payload {
                identity: self.identity.clone(),
                peer: peer.clone(),
                message,
            })
            .map_err(|_| TransportError::closed("router is gone".to_string()))
    }

    /// Block until a frame arrives.
    pub fn recv(&self) -> Result<(Identity, Message), TransportError> {
        let delivery = self
            .inbox
            .recv()
            .map_err(|_| TransportError::closed(format!("inbox of {}", self.identity)))?;
        Ok((delivery.peer, delivery.message))
    }

    /// Wait up to `timeout` for a frame. `None` on expiry.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<(Identity, Message)>, TransportError> {
        match self.inbox.recv_timeout(timeout) {
            Ok(delivery) => Ok(Some((delivery.peer, delivery.message))),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::closed(format!(
                "inbox of {}",
                self.identity
            ))),
        }
    }

    /// Non-blocking receive. `None` when the inbox is empty.
    pub fn try_recv(&self) -> Result<Option<(Identity, Message)>, TransportError> {
        match self.inbox.try_recv() {
            Ok(delivery) => Ok(Some((delivery.peer, delivery.message))),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::closed(format!(
                "inbox of {}",
                self.identity
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_routes_by_identity() {
        let ctx = Context::new();
        let mut router = ctx.bind("inproc://route-test", 8).expect("bind");
        let alice = ctx
            .connect("inproc://route-test", Identity::from("alice"), 8)
            .expect("connect alice");
        let bob = ctx
            .connect("inproc://route-test", Identity::from("bob"), 8)
            .expect("connect bob");

        let peer = Identity::from("$controller");
        alice.send(&peer, Message::request("ping")).expect("send");
        bob.send(&peer, Message::request("pong")).expect("send");

        let (from, via, first) = router.recv().expect("recv");
        assert_eq!(from, Identity::from("alice"));
        assert_eq!(via, peer);
        assert_eq!(first.str_field("$req"), Some("ping"));

        let (from, _, second) = router.recv().expect("recv");
        assert_eq!(from, Identity::from("bob"));
        assert_eq!(second.str_field("$req"), Some("pong"));

        // Replies land in the right inbox.
        router
            .send(&Identity::from("bob"), &peer, Message::request("reply"))
            .expect("route to bob");
        assert!(alice.try_recv().expect("alice inbox").is_none());
        let (_, delivered) = bob.recv().expect("bob inbox");
        assert_eq!(delivered.str_field("$req"), Some("reply"));
    }

    #[test]
    fn test_send_to_unknown_peer_fails() {
        let ctx = Context::new();
        let mut router = ctx.bind("inproc://unknown-peer", 8).expect("bind");
        let err = router
            .send(
                &Identity::from("ghost"),
                &Identity::from("$controller"),
                Message::new(),
            )
            .expect_err("no such peer");
        assert!(matches!(err, TransportError::UnknownPeer { .. }));
    }

    #[test]
    fn test_recv_timeout_expires_without_traffic() {
        let ctx = Context::new();
        let mut router = ctx.bind("inproc://idle", 8).expect("bind");
        let got = router
            .recv_timeout(Duration::from_millis(10))
            .expect("recv_timeout");
        assert!(got.is_none());
    }

    #[test]
    fn test_attach_frames_are_invisible_to_recv() {
        let ctx = Context::new();
        let mut router = ctx.bind("inproc://attach", 8).expect("bind");
        let dealer = ctx
            .connect("inproc://attach", Identity::from("w1"), 8)
            .expect("connect");
        // Only the attach frame is queued; a payload recv must not yield it.
        assert!(router.has_input());
        assert!(router.try_recv().expect("try_recv").is_none());

        dealer
            .send(&Identity::from("$controller"), Message::signal("ready"))
            .expect("send");
        let (from, _, message) = router.recv().expect("recv");
        assert_eq!(from, Identity::from("w1"));
        assert!(message.is_signal("ready"));
    }

    #[test]
    fn test_dealer_send_fails_after_router_drop() {
        let ctx = Context::new();
        let dealer = {
            let _router = ctx.bind("inproc://gone", 8).expect("bind");
            ctx.connect("inproc://gone", Identity::from("w1"), 8)
                .expect("connect")
        };
        let err = dealer
            .send(&Identity::from("$controller"), Message::new())
            .expect_err("router dropped");
        assert!(matches!(err, TransportError::Closed { .. }));
    }
}
