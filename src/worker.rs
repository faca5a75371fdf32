//! # Worker Actor
//!
//! The base dispatch unit: one [`HandlerTable`], one inbound channel, one
//! stop flag, one thread. The loop waits (bounded, so the stop flag is
//! reevaluated even with no traffic) for a request, resolves it through the
//! table, and sends the produced reply back to the originating peer token.
//!
//! Two bindings are installed for every worker at construction:
//!
//! - the catch-all `{}` pattern replying `$rep: null, $error: "No handler
//!   match"` — reachable only when no concrete handler claims the request;
//! - `{"$signal": "stop"}` replying `$rep: "OK"` and raising the stop flag.
//!   The loop exits only after that acknowledgment is sent, so shutdown is
//!   never observed before the ack.
//!
//! # Examples
//!
//! ```rust
//! use switchboard::message::{keys, Message};
//! use switchboard::worker::Worker;
//!
//! let mut worker = Worker::new();
//! worker.bind(Message::request("sum"), |_, request| {
//!     let a = request.get("a").and_then(|v| v.as_i64()).unwrap_or(0);
//!     let b = request.get("b").and_then(|v| v.as_i64()).unwrap_or(0);
//!     request.reply().with(keys::REP, a + b)
//! });
//!
//! let reply = worker
//!     .resolve(&Message::request("sum").with("a", 100).with("b", 20))
//!     .expect("resolve");
//! assert_eq!(reply.get(keys::REP), Some(&120.into()));
//! ```

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::Result;
use crate::handler::HandlerTable;
use crate::message::{keys, peers, signals, Message};
use crate::transport::{Context, Identity};

/// Bounded wait of the worker loop; the stop flag is rechecked at least this
/// often under no traffic.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Produces a fresh worker per pool thread.
pub type WorkerFactory = Arc<dyn Fn() -> Worker + Send + Sync>;

/// Per-loop mutable state handed to every handler invocation.
#[derive(Debug, Default)]
pub struct WorkerState {
    stop: bool,
}

impl WorkerState {
    /// Ask the loop to exit after the current reply is sent.
    pub fn request_stop(&mut self) {
        self.stop = true;
    }

    /// True once a stop has been requested.
    pub fn stop_requested(&self) -> bool {
        self.stop
    }
}

/// A worker actor: handler table plus stop flag.
pub struct Worker {
    handlers: HandlerTable<WorkerState>,
    state: WorkerState,
}

impl Worker {
    /// Create a worker with the built-in catch-all and stop bindings.
    pub fn new() -> Self {
        let mut handlers = HandlerTable::new();
        handlers.bind(Message::new(), default_handler);
        handlers.bind(Message::signal(signals::STOP), stop_handler);
        Self {
            handlers,
            state: WorkerState::default(),
        }
    }

    /// Install an application handler.
    pub fn bind(
        &mut self,
        pattern: Message,
        handler: impl Fn(&mut WorkerState, &Message) -> Message + Send + 'static,
    ) {
        self.handlers.bind(pattern, handler);
    }

    /// Resolve one message through the handler table.
    pub fn resolve(&mut self, message: &Message) -> Result<Message> {
        self.handlers.resolve(&mut self.state, message)
    }

    /// True once the stop handler has run.
    pub fn stop_requested(&self) -> bool {
        self.state.stop_requested()
    }

    /// Run the control loop against the proxy router at `endpoint`.
    ///
    /// Connects tagged with `identity`, sends the `ready` handshake to the
    /// controller token, then serves requests until the stop flag is raised.
    /// The stop acknowledgment is sent before the loop condition is
    /// rechecked, so it is always delivered.
    pub fn run(
        mut self,
        ctx: &Context,
        endpoint: &str,
        identity: Identity,
        depth: usize,
    ) -> Result<()> {
        let socket = ctx.connect(endpoint, identity.clone(), depth)?;
        socket.send(&Identity::from(peers::CONTROLLER), Message::signal(signals::READY))?;
        debug!(identity = %identity, endpoint = %endpoint, "worker loop entered");

        while !self.state.stop_requested() {
            let Some((peer, request)) = socket.recv_timeout(POLL_INTERVAL)? else {
                continue;
            };
            let reply = self.handlers.resolve(&mut self.state, &request)?;
            socket.send(&peer, reply)?;
        }

        debug!(identity = %identity, "worker loop exited");
        Ok(())
    }
}

impl Default for Worker {
    fn default() -> Self {
        Self::new()
    }
}

/// Last-resort reply for requests no concrete handler claimed.
fn default_handler(_state: &mut WorkerState, request: &Message) -> Message {
    request
        .reply()
        .with(keys::REP, Value::Null)
        .with(keys::ERROR, "No handler match")
}

/// Acknowledge a stop signal and raise the stop flag.
fn stop_handler(state: &mut WorkerState, request: &Message) -> Message {
    state.request_stop();
    request.reply().with(keys::REP, "OK")
}
