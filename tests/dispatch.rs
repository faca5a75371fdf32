//! Dispatch tests: specificity through the full stack, round-robin fanout,
//! and the graceful draining phase.

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{init_tracing, math_factory, Client};
use serde_json::json;
use switchboard::message::{keys, Message};
use switchboard::{create_service, ServiceConfig, Worker, WorkerFactory};
use uuid::Uuid;

const STOP_BUDGET: Duration = Duration::from_secs(10);

/// Workers that tag replies with a per-worker token and serve `slow`
/// requests by sleeping before replying.
fn tagged_slow_factory(delay: Duration) -> WorkerFactory {
    Arc::new(move || {
        let tag = Uuid::new_v4().simple().to_string();
        let mut worker = Worker::new();
        worker.bind(Message::request("slow"), move |_, request| {
            thread::sleep(delay);
            request.reply().with(keys::REP, "done").with("worker", tag.clone())
        });
        worker
    })
}

#[test]
fn test_specific_handler_beats_default_through_full_stack() {
    init_tracing();
    let mut controller = create_service(
        math_factory(),
        ServiceConfig::with_workers(1).at_endpoint("inproc://front-specificity"),
    )
    .expect("create");
    controller.start().expect("start");

    let client = Client::connect("inproc://front-specificity", "spec-client");
    client.send(Message::request("sum").with("a", 2).with("b", 3));
    let reply = client.recv();
    assert_eq!(reply.get(keys::REP), Some(&json!(5)));
    assert!(!reply.contains(keys::ERROR));

    controller.stop(STOP_BUDGET).expect("stop");
}

#[test]
fn test_unhandled_request_returns_default_reply_shape() {
    init_tracing();
    let mut controller = create_service(
        math_factory(),
        ServiceConfig::with_workers(1).at_endpoint("inproc://front-unhandled"),
    )
    .expect("create");
    controller.start().expect("start");

    let client = Client::connect("inproc://front-unhandled", "unhandled-client");
    client.send(Message::request("unknown"));
    let reply = client.recv();
    assert_eq!(reply.get(keys::REP), Some(&serde_json::Value::Null));
    assert_eq!(reply.str_field(keys::ERROR), Some("No handler match"));
    assert_eq!(reply.str_field(keys::REQ), Some("unknown"));

    controller.stop(STOP_BUDGET).expect("stop");
}

#[test]
fn test_concurrent_requests_land_on_distinct_workers() {
    init_tracing();
    let mut controller = create_service(
        tagged_slow_factory(Duration::from_millis(300)),
        ServiceConfig::with_workers(2).at_endpoint("inproc://front-fanout"),
    )
    .expect("create");
    controller.start().expect("start");

    // Two requests in flight at once: with at-most-one-in-flight per worker,
    // they must be served by different workers.
    let client = Client::connect("inproc://front-fanout", "fanout-client");
    client.send(Message::request("slow").with("seq", 1));
    client.send(Message::request("slow").with("seq", 2));

    let first = client.recv();
    let second = client.recv();
    assert_eq!(first.get(keys::REP), Some(&json!("done")));
    assert_eq!(second.get(keys::REP), Some(&json!("done")));
    assert_ne!(
        first.str_field("worker").expect("worker tag"),
        second.str_field("worker").expect("worker tag")
    );

    controller.stop(STOP_BUDGET).expect("stop");
}

#[test]
fn test_sequential_requests_alternate_between_ready_workers() {
    init_tracing();
    let mut controller = create_service(
        tagged_slow_factory(Duration::from_millis(10)),
        ServiceConfig::with_workers(2).at_endpoint("inproc://front-rotate"),
    )
    .expect("create");
    controller.start().expect("start");

    // One request at a time: the serving worker goes to the back of the
    // ready queue, so consecutive requests alternate between the two.
    let client = Client::connect("inproc://front-rotate", "rotate-client");
    let mut tags = Vec::new();
    for seq in 0..4 {
        client.send(Message::request("slow").with("seq", seq));
        tags.push(client.recv().str_field("worker").expect("tag").to_string());
    }
    assert_ne!(tags[0], tags[1]);
    assert_eq!(tags[0], tags[2]);
    assert_eq!(tags[1], tags[3]);

    controller.stop(STOP_BUDGET).expect("stop");
}

#[test]
fn test_graceful_drain_finishes_in_flight_requests() {
    init_tracing();
    let mut controller = create_service(
        tagged_slow_factory(Duration::from_millis(500)),
        ServiceConfig::with_workers(2).at_endpoint("inproc://front-drain"),
    )
    .expect("create");
    controller.start().expect("start");

    let client = Client::connect("inproc://front-drain", "drain-client");
    client.send(Message::request("slow").with("seq", 1));
    client.send(Message::request("slow").with("seq", 2));
    // Give the dispatch loop time to hand both requests to workers.
    thread::sleep(Duration::from_millis(200));

    // Stop while both requests are mid-flight. stop() returns only after the
    // service has drained and its thread joined, so both replies must already
    // sit in the client's inbox, no waiting allowed.
    controller.stop(STOP_BUDGET).expect("stop drains first");

    let first = client.try_recv().expect("first reply already forwarded");
    let second = client.try_recv().expect("second reply already forwarded");
    assert_eq!(first.get(keys::REP), Some(&json!("done")));
    assert_eq!(second.get(keys::REP), Some(&json!("done")));
}
