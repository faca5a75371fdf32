#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Switchboard
//!
//! A lightweight request/reply broker: a front-facing channel receives
//! client requests and fans them out to a pool of worker actors, each
//! running its own control loop on a separate OS thread, with a synchronous
//! control plane for starting, signaling readiness, and gracefully stopping
//! the whole pool.
//!
//! ## Architecture
//!
//! - **Pattern dispatch**: handlers are (pattern, callback) pairs; the most
//!   specific matching pattern wins, and a built-in catch-all guarantees a
//!   reply for every request.
//! - **Round-robin load balancing**: a FIFO queue of idle worker identities;
//!   a worker holds at most one in-flight request, and the front channel is
//!   only polled while a worker is available.
//! - **No locks**: every structure is exclusively owned by its managing
//!   thread; all coordination is message exchange over bounded channels.
//! - **Handshake lifecycle**: `ready` on startup, `stop`/`OK` on shutdown,
//!   with a draining phase that finishes in-flight requests before the pool
//!   is torn down.
//!
//! ## Module Organization
//!
//! - [`message`] - The string-keyed payload model and reserved protocol keys
//! - [`handler`] - Pattern-based handler tables with specificity ordering
//! - [`transport`] - In-process identity-routed channels and the context
//! - [`worker`] - The worker actor and its control loop
//! - [`pool`] - The worker pool controller and its handshakes
//! - [`service`] - The broker loop: dispatch, backpressure, draining
//! - [`controller`] - The owning thread's remote-control handle
//! - [`config`] - Typed service configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Idempotent tracing initialization
//!
//! ## Quick Start
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
//! let mut controller = create_service(
//!     factory,
//!     ServiceConfig::with_workers(4).at_endpoint("inproc://math"),
//! )?;
//! controller.start()?;
//! // ... clients connect to "inproc://math" and exchange messages ...
//! controller.stop(Duration::from_secs(5))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod handler;
pub mod logging;
pub mod message;
pub mod pool;
pub mod service;
pub mod transport;
pub mod worker;

pub use config::ServiceConfig;
pub use controller::{create_service, Controller};
pub use error::{Result, SwitchboardError};
pub use handler::HandlerTable;
pub use message::Message;
pub use pool::PoolController;
pub use service::Service;
pub use transport::{Context, DealerSocket, Identity, RouterSocket, TransportError};
pub use worker::{Worker, WorkerFactory, WorkerState};
