//! Live-socket round trips: XPUB subscription notifications feeding the
//! tracker, command request/reply over the DEALER socket, and publication
//! forwarding through the inproc queue.

use bridge::command::CommandDispatcher;
use bridge::publish::{self, PublishHandle, StatusSink};
use bridge::runtime::sim::SimRuntime;
use bridge::sockets::BridgeSockets;
use bridge::subscriptions::{self, StatusChannel};
use mk_protocol::{Container, MessageType};
use prost::Message;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const RECV_TIMEOUT_MS: i32 = 5000;

fn wait_for(mut condition: impl FnMut() -> bool, what: &str) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn subscriptions_commands_and_publications_flow_end_to_end() {
    let ctx = zmq::Context::new();
    let sockets = BridgeSockets::bind(&ctx, Ipv4Addr::LOCALHOST).unwrap();
    let status_dsn = sockets.status_dsn.clone();
    let command_dsn = sockets.command_dsn.clone();

    let subs = subscriptions::shared();
    let shutdown = Arc::new(AtomicBool::new(false));
    let publisher = PublishHandle::connect(&ctx).unwrap();

    let loop_subs = subs.clone();
    let loop_shutdown = shutdown.clone();
    let socket_thread = std::thread::spawn(move || {
        let mut dispatcher = CommandDispatcher::new(SimRuntime::new(), PathBuf::from("."));
        sockets.run(&loop_subs, &mut dispatcher, &loop_shutdown);
    });

    // a subscriber arrives: the XPUB notification increments the counter
    let subscriber = ctx.socket(zmq::SUB).unwrap();
    subscriber.set_rcvtimeo(RECV_TIMEOUT_MS).unwrap();
    subscriber.connect(&status_dsn).unwrap();
    subscriber.set_subscribe(b"motion").unwrap();
    wait_for(
        || subs.lock().unwrap().status_count(StatusChannel::Motion) == 1,
        "subscribe notification",
    );
    assert!(subs.lock().unwrap().take_full_update(StatusChannel::Motion));

    // a queued publication reaches the subscriber as [topic, payload]
    publisher.send_status("motion", &publish::ping());
    let parts = subscriber.recv_multipart(0).unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0], b"motion".to_vec());
    let envelope = Container::decode(parts[1].as_slice()).unwrap();
    assert_eq!(envelope.kind(), Some(MessageType::Ping));

    // topic filtering: an io publication does not reach a motion subscriber
    publisher.send_status("io", &publish::ping());
    publisher.send_status("motion", &publish::ping());
    let parts = subscriber.recv_multipart(0).unwrap();
    assert_eq!(parts[0], b"motion".to_vec());

    // command round trip: PING is acknowledged
    let client = ctx.socket(zmq::DEALER).unwrap();
    client.set_rcvtimeo(RECV_TIMEOUT_MS).unwrap();
    client.connect(&command_dsn).unwrap();
    client
        .send(Container::of_type(MessageType::Ping).encode_to_vec(), 0)
        .unwrap();
    let reply = Container::decode(client.recv_bytes(0).unwrap().as_slice()).unwrap();
    assert_eq!(reply.kind(), Some(MessageType::PingAcknowledge));

    // malformed command over the wire: PLAN_RUN without parameters
    client
        .send(
            Container::of_type(MessageType::EmcTaskPlanRun).encode_to_vec(),
            0,
        )
        .unwrap();
    let reply = Container::decode(client.recv_bytes(0).unwrap().as_slice()).unwrap();
    assert_eq!(reply.kind(), Some(MessageType::Error));
    assert_eq!(reply.note, vec!["wrong parameters".to_owned()]);

    // unsubscribe drops the counter back to zero
    subscriber.set_unsubscribe(b"motion").unwrap();
    wait_for(
        || subs.lock().unwrap().status_count(StatusChannel::Motion) == 0,
        "unsubscribe notification",
    );

    shutdown.store(true, Ordering::Relaxed);
    socket_thread.join().unwrap();
}

#[test]
fn each_peer_subscribe_is_delivered_and_counted() {
    let ctx = zmq::Context::new();
    let sockets = BridgeSockets::bind(&ctx, Ipv4Addr::LOCALHOST).unwrap();
    let status_dsn = sockets.status_dsn.clone();

    let subs = subscriptions::shared();
    let shutdown = Arc::new(AtomicBool::new(false));

    let loop_subs = subs.clone();
    let loop_shutdown = shutdown.clone();
    let socket_thread = std::thread::spawn(move || {
        let mut dispatcher = CommandDispatcher::new(SimRuntime::new(), PathBuf::from("."));
        sockets.run(&loop_subs, &mut dispatcher, &loop_shutdown);
    });

    let first = ctx.socket(zmq::SUB).unwrap();
    first.connect(&status_dsn).unwrap();
    first.set_subscribe(b"io").unwrap();
    wait_for(
        || subs.lock().unwrap().status_count(StatusChannel::Io) == 1,
        "first subscribe notification",
    );
    assert!(subs.lock().unwrap().take_full_update(StatusChannel::Io));

    // a second peer subscribing the same topic must be seen too, so it
    // gets its own full update
    let second = ctx.socket(zmq::SUB).unwrap();
    second.connect(&status_dsn).unwrap();
    second.set_subscribe(b"io").unwrap();
    wait_for(
        || subs.lock().unwrap().status_count(StatusChannel::Io) == 2,
        "second subscribe notification",
    );
    assert!(subs.lock().unwrap().take_full_update(StatusChannel::Io));

    shutdown.store(true, Ordering::Relaxed);
    socket_thread.join().unwrap();
}

#[test]
fn error_socket_subscriptions_are_tracked_separately() {
    let ctx = zmq::Context::new();
    let sockets = BridgeSockets::bind(&ctx, Ipv4Addr::LOCALHOST).unwrap();
    let error_dsn = sockets.error_dsn.clone();

    let subs = subscriptions::shared();
    let shutdown = Arc::new(AtomicBool::new(false));

    let loop_subs = subs.clone();
    let loop_shutdown = shutdown.clone();
    let socket_thread = std::thread::spawn(move || {
        let mut dispatcher = CommandDispatcher::new(SimRuntime::new(), PathBuf::from("."));
        sockets.run(&loop_subs, &mut dispatcher, &loop_shutdown);
    });

    let subscriber = ctx.socket(zmq::SUB).unwrap();
    subscriber.connect(&error_dsn).unwrap();
    subscriber.set_subscribe(b"error").unwrap();
    subscriber.set_subscribe(b"display").unwrap();

    wait_for(
        || subs.lock().unwrap().total_error() == 2,
        "error subscriptions",
    );
    assert_eq!(subs.lock().unwrap().total_status(), 0);
    assert!(subs.lock().unwrap().take_new_error_subscription());

    shutdown.store(true, Ordering::Relaxed);
    socket_thread.join().unwrap();
}
