//! # Service — the Broker Role
//!
//! The service owns the client-facing front channel, a worker pool behind a
//! proxy channel, and a FIFO ready queue of idle worker identities. Its loop
//! multiplexes three sources without any shared-memory locking:
//!
//! 1. the control channel, always polled;
//! 2. the front channel, polled **iff** the ready queue is non-empty and no
//!    stop has been requested — the backpressure rule: once every worker is
//!    busy, new client requests stay queued in the transport;
//! 3. the proxy channel, checked non-destructively each iteration.
//!
//! Dispatch pops the front ready identity (FIFO preserves the order workers
//! became available, approximating round robin) and a worker returns to the
//! back of the queue only when its reply has been forwarded, which is what
//! makes at-most-one-in-flight-per-worker hold by construction.
//!
//! A stop signal is acknowledged immediately but the loop keeps running
//! until every dispatched request has completed and its worker is back in
//! the ready queue (the draining phase). Only then is the front channel
//! closed and the pool stopped.
//!
//! Administrative traffic on the control channel resolves through the
//! service's own handler table: the stop binding, an `eval` binding exposing
//! an enumerated set of live counters, and a catch-all.

use serde_json::Value;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crossbeam::channel::Select;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::error::{Result, SwitchboardError};
use crate::handler::HandlerTable;
use crate::message::{keys, peers, signals, Message};
use crate::pool::PoolController;
use crate::transport::{Context, DealerSocket, Identity, RouterSocket};
use crate::worker::WorkerFactory;

/// Counters and flags owned by the service loop, readable over the admin
/// channel through the `eval` binding.
#[derive(Debug, Default)]
pub(crate) struct ServiceState {
    stop: bool,
    total_client_requests: u64,
    number_of_workers: usize,
    worker_ready_count: usize,
}

/// Which channel a poll iteration found ready.
enum Polled {
    Control,
    Front,
    Idle,
}

/// A broker instance, run on its own thread via [`Service::run`].
pub struct Service {
    ctx: Context,
    config: ServiceConfig,
    factory: WorkerFactory,
    admin: HandlerTable<ServiceState>,
    state: ServiceState,
}

impl Service {
    /// Create a service with its administrative handler table installed.
    pub fn new(ctx: &Context, factory: WorkerFactory, config: ServiceConfig) -> Self {
        let mut admin: HandlerTable<ServiceState> = HandlerTable::new();
        admin.bind(Message::new(), |_, request| {
            request
                .reply()
                .with(keys::REP, Value::Null)
                .with(keys::ERROR, "No handler match")
        });
        admin.bind(Message::signal(signals::STOP), |state, request| {
            state.stop = true;
            request.reply().with(keys::REP, "OK")
        });
        admin.bind(Message::request("eval"), eval_handler);

        let state = ServiceState {
            number_of_workers: config.workers,
            ..ServiceState::default()
        };
        Self {
            ctx: ctx.clone(),
            config,
            factory,
            admin,
            state,
        }
    }

    /// Plug in, serve until stopped and drained, then unplug.
    ///
    /// Plug order matters and mirrors the lifecycle contract: bind the front
    /// channel, signal readiness on the control channel, then start the
    /// pool. The controller observes readiness as soon as the service can
    /// accept (and transport-buffer) client traffic.
    pub(crate) fn run(mut self, control: DealerSocket) -> Result<()> {
        let endpoint = self
            .config
            .endpoint
            .clone()
            .unwrap_or_else(Context::unique_endpoint);
        let mut front = self.ctx.bind(&endpoint, self.config.queue_depth)?;
        control.send(
            &Identity::from(peers::CONTROLLER),
            Message::signal(signals::READY),
        )?;

        let mut pool = PoolController::new(&self.ctx, self.config.queue_depth)?;
        let mut ready: VecDeque<Identity> =
            pool.start(&self.factory, self.config.workers)?.into();
        info!(endpoint = %endpoint, workers = self.config.workers, "service plugged");

        // Loop while running, or while any dispatched request is still in
        // flight (the draining phase after a stop).
        while !self.state.stop || ready.len() < pool.worker_count() {
            self.state.worker_ready_count = ready.len();
            let accept_clients = !ready.is_empty() && !self.state.stop;
            match poll(&control, &front, accept_clients, self.config.poll_interval) {
                Polled::Control => self.handle_control(&control)?,
                Polled::Front => self.handle_front(&mut front, &mut pool, &mut ready)?,
                Polled::Idle => {}
            }
            if pool.message_queued() {
                handle_pool_reply(&mut front, &mut pool, &mut ready)?;
            }
        }

        info!(
            total_client_requests = self.state.total_client_requests,
            "service drained; unplugging"
        );
        drop(front);
        pool.stop(self.config.stop_timeout)?;
        Ok(())
    }

    /// Serve one control-channel message through the admin handler table.
    fn handle_control(&mut self, control: &DealerSocket) -> Result<()> {
        let Some((peer, request)) = control.try_recv()? else {
            return Ok(());
        };
        debug!(%request, "control message");
        let reply = self.admin.resolve(&mut self.state, &request)?;
        control.send(&peer, reply)?;
        Ok(())
    }

    /// Dispatch one client request to the least-recently-idle worker.
    fn handle_front(
        &mut self,
        front: &mut RouterSocket,
        pool: &mut PoolController,
        ready: &mut VecDeque<Identity>,
    ) -> Result<()> {
        let Some((client, _peer, request)) = front.try_recv()? else {
            return Ok(());
        };
        let worker = ready.pop_front().ok_or_else(|| {
            SwitchboardError::internal("client dispatch attempted with empty ready queue")
        })?;
        debug!(client = %client, worker = %worker, "dispatching client request");
        pool.send(&worker, &client, request)?;
        self.state.total_client_requests += 1;
        Ok(())
    }
}

/// Forward one worker reply to its client and return the worker to the back
/// of the ready queue.
fn handle_pool_reply(
    front: &mut RouterSocket,
    pool: &mut PoolController,
    ready: &mut VecDeque<Identity>,
) -> Result<()> {
    let (worker, client, reply) = pool.recv()?;
    ready.push_back(worker.clone());
    debug!(worker = %worker, client = %client, "forwarding worker reply");
    if let Err(error) = front.send(&client, &Identity::from(peers::SERVICE), reply) {
        // Clients may disconnect while a request is in flight; the worker is
        // back in rotation either way.
        warn!(client = %client, %error, "dropping reply for vanished client");
    }
    Ok(())
}

/// Bounded multiplexed wait over the control channel and, when the
/// backpressure rule allows, the front channel.
fn poll(
    control: &DealerSocket,
    front: &RouterSocket,
    accept_clients: bool,
    timeout: Duration,
) -> Polled {
    let mut select = Select::new();
    let control_index = select.recv(control.receiver());
    if accept_clients {
        select.recv(front.receiver());
    }
    match select.ready_timeout(timeout) {
        Ok(index) if index == control_index => Polled::Control,
        Ok(_) => Polled::Front,
        Err(_) => Polled::Idle,
    }
}

/// Answer `{"$req":"eval","$attr":<name>}` for the enumerated counters.
///
/// Deliberately not a generic reflective accessor: only the counters named
/// here are exposed across the control plane.
fn eval_handler(state: &mut ServiceState, request: &Message) -> Message {
    match request.str_field(keys::ATTR) {
        Some("total_client_requests") => request.reply().with(keys::REP, state.total_client_requests),
        Some("number_of_workers") => request
            .reply()
            .with(keys::REP, state.number_of_workers as u64),
        Some("worker_ready_count") => request
            .reply()
            .with(keys::REP, state.worker_ready_count as u64),
        Some(other) => request
            .reply()
            .with(keys::REP, Value::Null)
            .with(keys::ERROR, format!("Unknown attribute: {other}")),
        None => request
            .reply()
            .with(keys::REP, Value::Null)
            .with(keys::ERROR, "Missing $attr"),
    }
}
