//! # Worker Pool Controller
//!
//! Owns N worker threads multiplexed over one proxy router channel. Startup
//! and shutdown are handshake-driven: a worker is not considered started
//! until its `ready` frame has been observed, and not considered stopped
//! until its `stop`/`OK` acknowledgment has been received and its thread
//! joined. Handshake frames that carry the wrong identity, peer token, or
//! payload are protocol violations and abort the operation.
//!
//! All pool state lives on the thread driving `start`/`stop`; workers only
//! ever talk to it through the proxy channel.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::error::{Result, SwitchboardError};
use crate::message::{keys, peers, signals, Message};
use crate::transport::{Context, Identity, RouterSocket};
use crate::worker::WorkerFactory;

/// One running worker: its identity and its thread handle.
struct RunningWorker {
    identity: Identity,
    thread: JoinHandle<()>,
}

/// Controller for a pool of worker threads behind one proxy channel.
pub struct PoolController {
    ctx: Context,
    proxy: RouterSocket,
    depth: usize,
    running: Vec<RunningWorker>,
}

impl PoolController {
    /// Bind the proxy channel at a generated local endpoint.
    pub fn new(ctx: &Context, depth: usize) -> Result<Self> {
        let proxy = ctx.bind(&Context::unique_endpoint(), depth)?;
        Ok(Self {
            ctx: ctx.clone(),
            proxy,
            depth,
            running: Vec::new(),
        })
    }

    /// Number of registered workers.
    pub fn worker_count(&self) -> usize {
        self.running.len()
    }

    /// Spawn `count` workers, blocking for each one's `ready` handshake
    /// before spawning the next. Returns identities in spawn order.
    pub fn start(&mut self, factory: &WorkerFactory, count: usize) -> Result<Vec<Identity>> {
        let mut identities = Vec::with_capacity(count);
        for index in 0..count {
            let identity = Identity::random();
            let thread = self.spawn_worker(factory, &identity, index)?;
            self.await_ready(&identity)?;
            self.running.push(RunningWorker {
                identity: identity.clone(),
                thread,
            });
            identities.push(identity);
        }
        info!(workers = count, endpoint = %self.proxy.endpoint(), "worker pool started");
        Ok(identities)
    }

    /// Stop every worker: per identity, send the stop signal, block for the
    /// matching acknowledgment, then join the thread within `timeout`.
    ///
    /// A join that misses its budget is remembered but does not prevent the
    /// remaining workers from being stopped; the first such error is
    /// returned after the registry is cleared.
    pub fn stop(&mut self, timeout: Duration) -> Result<()> {
        let controller = Identity::from(peers::CONTROLLER);
        let mut first_error = None;
        for RunningWorker { identity, thread } in self.running.drain(..) {
            self.proxy
                .send(&identity, &controller, Message::signal(signals::STOP))?;
            let (worker, peer, ack) = self.proxy.recv()?;
            if worker != identity
                || peer != controller
                || !ack.is_signal(signals::STOP)
                || ack.str_field(keys::REP) != Some("OK")
            {
                return Err(SwitchboardError::protocol_violation(format!(
                    "expected stop acknowledgment from {identity}, got {ack} from {worker} via {peer}"
                )));
            }
            debug!(identity = %identity, "worker acknowledged stop");
            if let Err(error) = join_within(thread, timeout, "worker thread") {
                warn!(identity = %identity, %error, "worker did not join in time");
                first_error.get_or_insert(error);
            }
        }
        info!("worker pool stopped");
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// True when unread proxy traffic is queued. A readiness poll, not a
    /// destructive read.
    pub fn message_queued(&self) -> bool {
        self.proxy.has_input()
    }

    /// Forward `(client, message)` to the worker `identity`.
    pub fn send(&mut self, identity: &Identity, client: &Identity, message: Message) -> Result<()> {
        self.proxy.send(identity, client, message)?;
        Ok(())
    }

    /// Block until a worker frame arrives: `(worker, client, message)`.
    pub fn recv(&mut self) -> Result<(Identity, Identity, Message)> {
        Ok(self.proxy.recv()?)
    }

    fn spawn_worker(
        &self,
        factory: &WorkerFactory,
        identity: &Identity,
        index: usize,
    ) -> Result<JoinHandle<()>> {
        let ctx = self.ctx.clone();
        let endpoint = self.proxy.endpoint().to_string();
        let identity = identity.clone();
        let depth = self.depth;
        let factory = factory.clone();
        thread::Builder::new()
            .name(format!("worker-{index}"))
            .spawn(move || {
                let worker = factory();
                if let Err(error) = worker.run(&ctx, &endpoint, identity.clone(), depth) {
                    error!(identity = %identity, %error, "worker loop aborted");
                }
            })
            .map_err(|e| SwitchboardError::internal(format!("failed to spawn worker thread: {e}")))
    }

    fn await_ready(&mut self, identity: &Identity) -> Result<()> {
        let (worker, peer, message) = self.proxy.recv()?;
        if worker != *identity
            || peer != Identity::from(peers::CONTROLLER)
            || !message.is_signal(signals::READY)
        {
            return Err(SwitchboardError::protocol_violation(format!(
                "expected ready handshake from {identity}, got {message} from {worker} via {peer}"
            )));
        }
        debug!(identity = %identity, "worker ready");
        Ok(())
    }
}

/// Join a thread within `timeout` by polling its finished flag.
///
/// On expiry the handle is released and the thread left to finish on its
/// own; the caller decides whether that is fatal.
pub(crate) fn join_within(handle: JoinHandle<()>, timeout: Duration, what: &str) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return Err(SwitchboardError::timeout(format!("joining {what}"), timeout));
        }
        thread::sleep(Duration::from_millis(1));
    }
    handle
        .join()
        .map_err(|_| SwitchboardError::internal(format!("{what} panicked")))
}
