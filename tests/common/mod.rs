//! Shared helpers for integration tests.
#![allow(dead_code)] // not every test binary uses every helper

use std::sync::Arc;
use std::time::Duration;

use switchboard::message::{peers, Message};
use switchboard::{logging, Context, DealerSocket, Identity, Worker, WorkerFactory};

/// How long a test client is willing to wait for a reply.
pub const REPLY_BUDGET: Duration = Duration::from_secs(5);

pub fn init_tracing() {
    logging::init();
}

/// The canonical math worker: `sum` and `multiply` handlers over `a`/`b`.
pub fn math_factory() -> WorkerFactory {
    Arc::new(|| {
        let mut worker = Worker::new();
        worker.bind(Message::request("sum"), |_, request| {
            let a = request.get("a").and_then(|v| v.as_i64()).unwrap_or(0);
            let b = request.get("b").and_then(|v| v.as_i64()).unwrap_or(0);
            request.reply().with("$rep", a + b)
        });
        worker.bind(Message::request("multiply"), |_, request| {
            let a = request.get("a").and_then(|v| v.as_i64()).unwrap_or(0);
            let b = request.get("b").and_then(|v| v.as_i64()).unwrap_or(0);
            request.reply().with("$rep", a * b)
        });
        worker
    })
}

/// A client connection to a service's front endpoint.
pub struct Client {
    socket: DealerSocket,
}

impl Client {
    pub fn connect(endpoint: &str, name: &str) -> Self {
        let socket = Context::instance()
            .connect(endpoint, Identity::from(name), 64)
            .expect("client connect");
        Self { socket }
    }

    pub fn send(&self, message: Message) {
        self.socket
            .send(&Identity::from(peers::SERVICE), message)
            .expect("client send");
    }

    pub fn recv(&self) -> Message {
        self.socket
            .recv_timeout(REPLY_BUDGET)
            .expect("client recv")
            .expect("reply within budget")
            .1
    }

    /// Non-blocking receive, for asserting a reply is already queued.
    pub fn try_recv(&self) -> Option<Message> {
        self.socket
            .try_recv()
            .expect("client try_recv")
            .map(|(_, message)| message)
    }
}
