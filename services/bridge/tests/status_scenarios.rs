//! End-to-end status-stream scenarios driven through the control loop
//! with a recording sink: subscribe semantics, tolerance behaviour, ping
//! cadence, and error fan-out.

use bridge::config::DisplayConfig;
use bridge::diff::StatusTracker;
use bridge::poller::ControlLoop;
use bridge::publish::StatusSink;
use bridge::runtime::sim::SimRuntime;
use bridge::runtime::{AxisStat, ErrorKind};
use bridge::subscriptions::{self, SharedSubscriptions};
use mk_protocol::{Container, MessageType};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Status,
    Error,
}

#[derive(Clone, Default)]
struct RecordingSink {
    messages: Arc<Mutex<Vec<(Side, String, Container)>>>,
}

impl RecordingSink {
    fn take(&self) -> Vec<(Side, String, Container)> {
        std::mem::take(&mut *self.messages.lock().unwrap())
    }
}

impl StatusSink for RecordingSink {
    fn send_status(&self, topic: &str, envelope: &Container) {
        self.messages
            .lock()
            .unwrap()
            .push((Side::Status, topic.to_owned(), envelope.clone()));
    }

    fn send_error(&self, topic: &str, envelope: &Container) {
        self.messages
            .lock()
            .unwrap()
            .push((Side::Error, topic.to_owned(), envelope.clone()));
    }
}

struct Harness {
    control: ControlLoop<SimRuntime, SimRuntime, RecordingSink>,
    runtime: SimRuntime,
    subs: SharedSubscriptions,
    sink: RecordingSink,
}

/// poll 0.1 s, ping 2 s → ping ratio 20, keepalive 2000 ms.
fn harness() -> Harness {
    harness_with_intervals(0.1, 2.0)
}

fn harness_with_intervals(poll: f64, ping: f64) -> Harness {
    let runtime = SimRuntime::new();
    let subs = subscriptions::shared();
    let sink = RecordingSink::default();
    let control = ControlLoop::new(
        runtime.clone(),
        runtime.clone(),
        sink.clone(),
        StatusTracker::new(&DisplayConfig::default()),
        subs.clone(),
        poll,
        ping,
    );
    Harness {
        control,
        runtime,
        subs,
        sink,
    }
}

#[test]
fn cold_subscribe_gets_one_full_update_with_pparams() {
    let mut h = harness();
    h.runtime.with_snapshot(|s| {
        s.enabled = true;
        s.feedrate = 1.0;
        s.axes = 1;
        s.axis = vec![AxisStat {
            homed: true,
            ..AxisStat::default()
        }];
    });

    h.subs.lock().unwrap().apply_status("motion", true);
    h.control.cycle();

    let messages = h.sink.take();
    assert_eq!(messages.len(), 1);
    let (side, topic, envelope) = &messages[0];
    assert_eq!(*side, Side::Status);
    assert_eq!(topic, "motion");
    assert_eq!(envelope.kind(), Some(MessageType::EmcstatFullUpdate));
    assert_eq!(
        envelope.pparams.as_ref().unwrap().keepalive_timer,
        Some(2000)
    );

    let body = envelope.emc_status_motion.as_ref().unwrap();
    assert_eq!(body.enabled, Some(true));
    assert_eq!(body.feedrate, Some(1.0));
    assert_eq!(body.axis.len(), 1);
    assert_eq!(body.axis[0].homed, Some(true));
    // the full update is the whole baseline: zero-valued fields present
    assert_eq!(body.paused, Some(false));
}

#[test]
fn below_tolerance_change_is_silent_above_is_published() {
    let mut h = harness();
    h.runtime.with_snapshot(|s| s.feedrate = 1.0);
    h.subs.lock().unwrap().apply_status("motion", true);
    h.control.cycle();
    let _ = h.sink.take();

    h.runtime.with_snapshot(|s| s.feedrate = 1.00005);
    h.control.cycle();
    assert!(h.sink.take().is_empty());

    h.runtime.with_snapshot(|s| s.feedrate = 1.0002);
    h.control.cycle();
    let messages = h.sink.take();
    assert_eq!(messages.len(), 1);
    let envelope = &messages[0].2;
    assert_eq!(envelope.kind(), Some(MessageType::EmcstatIncrementalUpdate));
    assert!(envelope.pparams.is_none());
    let body = envelope.emc_status_motion.as_ref().unwrap();
    assert_eq!(body.feedrate, Some(1.0002));
    assert_eq!(body.enabled, None);
    assert!(body.axis.is_empty());
}

#[test]
fn ping_cadence_fires_every_ratio_cycles() {
    let mut h = harness();
    h.subs.lock().unwrap().apply_status("motion", true);
    h.control.cycle();
    let _ = h.sink.take();

    // cycles 2..=20: quiet
    for _ in 0..19 {
        h.control.cycle();
    }
    assert!(h.sink.take().is_empty());

    // 20 further polls completed: the next cycle carries the ping
    h.control.cycle();
    let messages = h.sink.take();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].1, "motion");
    assert_eq!(messages[0].2.kind(), Some(MessageType::Ping));
}

#[test]
fn zero_ping_interval_disables_pings() {
    let mut h = harness_with_intervals(0.1, 0.0);
    h.subs.lock().unwrap().apply_status("motion", true);
    for _ in 0..100 {
        h.control.cycle();
    }
    let pings = h
        .sink
        .take()
        .into_iter()
        .filter(|(_, _, e)| e.kind() == Some(MessageType::Ping))
        .count();
    assert_eq!(pings, 0);
}

#[test]
fn double_subscribe_yields_two_full_updates_and_counted_unsubscribes() {
    let mut h = harness();
    h.runtime.with_snapshot(|s| s.estop = 1);

    h.subs.lock().unwrap().apply_status("io", true);
    h.control.cycle();
    let first = h.sink.take();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].2.kind(), Some(MessageType::EmcstatFullUpdate));

    h.subs.lock().unwrap().apply_status("io", true);
    h.control.cycle();
    let second = h.sink.take();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].2.kind(), Some(MessageType::EmcstatFullUpdate));
    assert_eq!(
        h.subs
            .lock()
            .unwrap()
            .status_count(bridge::subscriptions::StatusChannel::Io),
        2
    );

    // one unsubscribes: no message, counter drops
    h.subs.lock().unwrap().apply_status("io", false);
    h.control.cycle();
    assert!(h.sink.take().is_empty());

    // last unsubscriber gone: channel silent even when state changes
    h.subs.lock().unwrap().apply_status("io", false);
    h.runtime.with_snapshot(|s| s.estop = 0);
    h.control.cycle();
    assert!(h.sink.take().is_empty());
}

#[test]
fn unsubscribed_window_is_silent_and_resubscribe_brings_full() {
    let mut h = harness();
    h.subs.lock().unwrap().apply_status("task", true);
    h.control.cycle();
    assert_eq!(h.sink.take().len(), 1);

    h.subs.lock().unwrap().apply_status("task", false);
    h.runtime.with_snapshot(|s| s.task_state = 2);
    h.control.cycle();
    h.control.cycle();
    assert!(h.sink.take().is_empty());

    h.subs.lock().unwrap().apply_status("task", true);
    h.control.cycle();
    let messages = h.sink.take();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].2.kind(), Some(MessageType::EmcstatFullUpdate));
    assert_eq!(
        messages[0]
            .2
            .emc_status_task
            .as_ref()
            .unwrap()
            .task_state,
        Some(2)
    );
}

#[test]
fn error_events_fan_out_by_kind_only_to_subscribed_topics() {
    let mut h = harness();
    h.subs.lock().unwrap().apply_error("error", true);

    h.runtime.push_error(ErrorKind::OperatorError, "spindle fault");
    h.control.cycle();
    let messages = h.sink.take();
    assert_eq!(messages.len(), 1);
    let (side, topic, envelope) = &messages[0];
    assert_eq!(*side, Side::Error);
    assert_eq!(topic, "error");
    assert_eq!(envelope.kind(), Some(MessageType::EmcOperatorError));
    assert_eq!(envelope.note, vec!["spindle fault".to_owned()]);

    // a text event with no text subscriber disappears
    h.runtime.push_error(ErrorKind::NmlText, "hello");
    h.control.cycle();
    assert!(h.sink.take().is_empty());
}

#[test]
fn first_error_ping_after_subscribe_carries_pparams() {
    // poll 1 s, ping 2 s → ratio 2
    let mut h = harness_with_intervals(1.0, 2.0);
    h.subs.lock().unwrap().apply_error("error", true);
    h.subs.lock().unwrap().apply_error("display", true);

    let mut pings = Vec::new();
    for _ in 0..6 {
        h.control.cycle();
        pings.extend(
            h.sink
                .take()
                .into_iter()
                .filter(|(_, _, e)| e.kind() == Some(MessageType::Ping)),
        );
    }
    assert!(pings.len() >= 4, "expected pings on both topics");
    // the very first error-side ping announces the cadence, later ones do not
    assert_eq!(
        pings[0].2.pparams.as_ref().unwrap().keepalive_timer,
        Some(2000)
    );
    assert!(pings[1].2.pparams.is_none());
    assert!(pings[2].2.pparams.is_none());
}
