//! # Controller Handle
//!
//! The owning thread's remote control for a service running on another
//! thread. The control channel is bound before anything is spawned; `start`
//! blocks for the startup handshake, `stop` for the shutdown acknowledgment
//! plus the thread join, and `send`/`recv` relay arbitrary administrative
//! request/reply exchanges while the service is running.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use switchboard::message::{keys, Message};
//! use switchboard::{create_service, ServiceConfig, Worker};
//!
//! # fn main() -> switchboard::Result<()> {
//! let factory = Arc::new(|| {
//!     let mut worker = Worker::new();
//!     worker.bind(Message::request("sum"), |_, request| {
//!         let a = request.get("a").and_then(|v| v.as_i64()).unwrap_or(0);
//!         let b = request.get("b").and_then(|v| v.as_i64()).unwrap_or(0);
//!         request.reply().with(keys::REP, a + b)
//!     });
//!     worker
//! });
//!
//! let mut controller = create_service(factory, ServiceConfig::with_workers(4))?;
//! controller.start()?;
//! let counters = controller.eval("total_client_requests")?;
//! println!("served so far: {counters}");
//! controller.stop(Duration::from_secs(5))?;
//! # Ok(())
//! # }
//! ```

use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info};

use crate::config::ServiceConfig;
use crate::error::{Result, SwitchboardError};
use crate::message::{keys, peers, signals, Message};
use crate::pool::join_within;
use crate::service::Service;
use crate::transport::{Context, Identity, RouterSocket};
use crate::worker::WorkerFactory;

/// Create a controller for a service over the process-wide transport
/// context. The crate's front door.
pub fn create_service(factory: WorkerFactory, config: ServiceConfig) -> Result<Controller> {
    Controller::new(Context::instance(), factory, config)
}

/// Remote-control handle owning the service's control channel.
pub struct Controller {
    ctx: Context,
    factory: WorkerFactory,
    config: ServiceConfig,
    control: RouterSocket,
    control_endpoint: String,
    service_thread: Option<JoinHandle<()>>,
}

impl Controller {
    /// Bind the control channel and prepare a (not yet started) handle.
    pub fn new(ctx: Context, factory: WorkerFactory, config: ServiceConfig) -> Result<Self> {
        let control_endpoint = Context::unique_endpoint();
        let control = ctx.bind(&control_endpoint, config.queue_depth)?;
        Ok(Self {
            ctx,
            factory,
            config,
            control,
            control_endpoint,
            service_thread: None,
        })
    }

    /// True while the service thread is held by this handle.
    pub fn is_running(&self) -> bool {
        self.service_thread.is_some()
    }

    /// Spawn the service thread and block until its `ready` handshake.
    ///
    /// There is deliberately no timeout on this wait: a hang here means the
    /// spawned thread never reached its loop, which is a bug to surface, not
    /// a condition to paper over. Fails with `AlreadyStarted` when a service
    /// is running.
    pub fn start(&mut self) -> Result<()> {
        if self.service_thread.is_some() {
            return Err(SwitchboardError::AlreadyStarted);
        }

        let service = Service::new(&self.ctx, self.factory.clone(), self.config.clone());
        let ctx = self.ctx.clone();
        let endpoint = self.control_endpoint.clone();
        let depth = self.config.queue_depth;
        let thread = thread::Builder::new()
            .name("switchboard-service".to_string())
            .spawn(move || {
                let control = match ctx.connect(&endpoint, Identity::from(peers::SERVICE), depth) {
                    Ok(socket) => socket,
                    Err(error) => {
                        error!(%error, "service could not connect its control channel");
                        return;
                    }
                };
                if let Err(error) = service.run(control) {
                    error!(%error, "service loop aborted");
                }
            })
            .map_err(|e| {
                SwitchboardError::internal(format!("failed to spawn service thread: {e}"))
            })?;

        let (identity, peer, message) = self.control.recv()?;
        if identity != Identity::from(peers::SERVICE)
            || peer != Identity::from(peers::CONTROLLER)
            || !message.is_signal(signals::READY)
        {
            return Err(SwitchboardError::protocol_violation(format!(
                "expected ready handshake from service, got {message} from {identity} via {peer}"
            )));
        }

        self.service_thread = Some(thread);
        info!("service started");
        Ok(())
    }

    /// Request a graceful stop, block for the acknowledgment, then join the
    /// service thread within `timeout`.
    ///
    /// The acknowledgment arrives as soon as the service observes the
    /// signal; the join is what waits out the draining phase.
    pub fn stop(&mut self, timeout: Duration) -> Result<()> {
        let thread = self
            .service_thread
            .take()
            .ok_or_else(|| SwitchboardError::internal("service is not running"))?;

        self.control.send(
            &Identity::from(peers::SERVICE),
            &Identity::from(peers::CONTROLLER),
            Message::signal(signals::STOP),
        )?;
        let (identity, _peer, ack) = self.control.recv()?;
        if identity != Identity::from(peers::SERVICE)
            || !ack.is_signal(signals::STOP)
            || ack.str_field(keys::REP) != Some("OK")
        {
            return Err(SwitchboardError::protocol_violation(format!(
                "expected stop acknowledgment from service, got {ack} from {identity}"
            )));
        }

        join_within(thread, timeout, "service thread")?;
        info!("service stopped");
        Ok(())
    }

    /// Relay an administrative message to the running service.
    pub fn send(&mut self, message: Message) -> Result<()> {
        self.control.send(
            &Identity::from(peers::SERVICE),
            &Identity::from(peers::CONTROLLER),
            message,
        )?;
        Ok(())
    }

    /// Block for the service's next administrative reply.
    pub fn recv(&mut self) -> Result<Message> {
        let (identity, _peer, message) = self.control.recv()?;
        if identity != Identity::from(peers::SERVICE) {
            return Err(SwitchboardError::protocol_violation(format!(
                "administrative reply from unexpected sender {identity}"
            )));
        }
        Ok(message)
    }

    /// Read one live counter over the control plane.
    pub fn eval(&mut self, attr: &str) -> Result<Message> {
        self.send(Message::request("eval").with(keys::ATTR, attr))?;
        self.recv()
    }
}
