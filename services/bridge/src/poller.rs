//! The control-loop context.
//!
//! Ticks at the configured poll interval.  Each cycle: when any status
//! subscriber exists, poll the runtime snapshot and diff the subscribed
//! channels (a channel's armed full-update flag turns its publication into
//! a clone of the whole baseline, with protocol parameters attached); when
//! any error subscriber exists, drain one error event and fan it out by
//! kind.  Every `ping_ratio` cycles a PING goes out on each topic that has
//! at least one subscriber.
//!
//! Poll failures are cycle-local: log, skip, keep ticking.  Sleeping is a
//! plain monotonic sleep; drift is acceptable.

use crate::diff::StatusTracker;
use crate::publish::{self, StatusSink};
use crate::runtime::{ErrorChannel, ErrorKind, StatPoller, StatSnapshot};
use crate::subscriptions::{ErrorTopic, SharedSubscriptions, StatusChannel};
use mk_protocol::Container;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Cycles between pings: `floor(ping_interval / poll_interval)`.
/// `None` (from a non-positive ping interval) disables pings entirely.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn ping_ratio(ping_interval_secs: f64, poll_interval_secs: f64) -> Option<u32> {
    if ping_interval_secs <= 0.0 {
        return None;
    }
    Some((ping_interval_secs / poll_interval_secs).floor() as u32)
}

/// The control loop with its runtime handles and channel baselines.
pub struct ControlLoop<S, E, P> {
    stat: S,
    errors: E,
    sink: P,
    tracker: StatusTracker,
    subs: SharedSubscriptions,
    poll_interval: Duration,
    ping_ratio: Option<u32>,
    ping_count: u32,
    keepalive_ms: u32,
}

impl<S, E, P> ControlLoop<S, E, P>
where
    S: StatPoller,
    E: ErrorChannel,
    P: StatusSink,
{
    pub fn new(
        stat: S,
        errors: E,
        sink: P,
        tracker: StatusTracker,
        subs: SharedSubscriptions,
        poll_interval_secs: f64,
        ping_interval_secs: f64,
    ) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let keepalive_ms = (ping_interval_secs * 1000.0).max(0.0) as u32;
        ControlLoop {
            stat,
            errors,
            sink,
            tracker,
            subs,
            poll_interval: Duration::from_secs_f64(poll_interval_secs),
            ping_ratio: ping_ratio(ping_interval_secs, poll_interval_secs),
            ping_count: 0,
            keepalive_ms,
        }
    }

    /// Tick until the shutdown flag is raised.
    pub fn run(mut self, shutdown: &AtomicBool) {
        debug!(
            interval = ?self.poll_interval,
            ping_ratio = ?self.ping_ratio,
            "control loop started"
        );
        while !shutdown.load(Ordering::Relaxed) {
            self.cycle();
            std::thread::sleep(self.poll_interval);
        }
        debug!("control loop stopped");
    }

    /// One poll cycle; public so tests can drive the loop synchronously.
    pub fn cycle(&mut self) {
        let at_ping = self.ping_ratio.is_some_and(|ratio| self.ping_count == ratio);

        let total_status = self.subs.lock().expect("subscription state poisoned").total_status();
        if total_status > 0 {
            match self.stat.poll() {
                Ok(snapshot) => {
                    self.update_status(&snapshot);
                    if at_ping {
                        self.ping_status();
                    }
                }
                Err(e) => warn!(error = %e, "status poll failed, skipping cycle"),
            }
        }

        let total_error = self.subs.lock().expect("subscription state poisoned").total_error();
        if total_error > 0 {
            match self.errors.poll() {
                Ok(Some((kind, text))) => self.publish_error_event(kind, text),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "error-channel poll failed, skipping cycle"),
            }
            if at_ping {
                self.ping_error();
            }
        }

        if at_ping {
            self.ping_count = 0;
        } else {
            self.ping_count += 1;
        }
    }

    /// Diff and publish every channel that has at least one subscriber.
    fn update_status(&mut self, snapshot: &StatSnapshot) {
        if self.channel_count(StatusChannel::Io) > 0 {
            let delta = self.tracker.update_io(snapshot);
            if self.take_full(StatusChannel::Io) {
                let body = self.tracker.io_baseline().clone();
                self.send_full(StatusChannel::Io, |c| c.emc_status_io = Some(body));
            } else if let Some(delta) = delta {
                self.send_incremental(StatusChannel::Io, |c| c.emc_status_io = Some(delta));
            }
        }
        if self.channel_count(StatusChannel::Task) > 0 {
            let delta = self.tracker.update_task(snapshot);
            if self.take_full(StatusChannel::Task) {
                let body = self.tracker.task_baseline().clone();
                self.send_full(StatusChannel::Task, |c| c.emc_status_task = Some(body));
            } else if let Some(delta) = delta {
                self.send_incremental(StatusChannel::Task, |c| c.emc_status_task = Some(delta));
            }
        }
        if self.channel_count(StatusChannel::Interp) > 0 {
            let delta = self.tracker.update_interp(snapshot);
            if self.take_full(StatusChannel::Interp) {
                let body = self.tracker.interp_baseline().clone();
                self.send_full(StatusChannel::Interp, |c| c.emc_status_interp = Some(body));
            } else if let Some(delta) = delta {
                self.send_incremental(StatusChannel::Interp, |c| {
                    c.emc_status_interp = Some(delta);
                });
            }
        }
        if self.channel_count(StatusChannel::Motion) > 0 {
            let delta = self.tracker.update_motion(snapshot);
            if self.take_full(StatusChannel::Motion) {
                let body = self.tracker.motion_baseline().clone();
                self.send_full(StatusChannel::Motion, |c| c.emc_status_motion = Some(body));
            } else if let Some(delta) = delta {
                self.send_incremental(StatusChannel::Motion, |c| {
                    c.emc_status_motion = Some(delta);
                });
            }
        }
        if self.channel_count(StatusChannel::Config) > 0 {
            let delta = self.tracker.update_config(snapshot);
            if self.take_full(StatusChannel::Config) {
                let body = self.tracker.config_baseline().clone();
                self.send_full(StatusChannel::Config, |c| c.emc_status_config = Some(body));
            } else if let Some(delta) = delta {
                self.send_incremental(StatusChannel::Config, |c| {
                    c.emc_status_config = Some(delta);
                });
            }
        }
    }

    fn publish_error_event(&mut self, kind: ErrorKind, text: String) {
        let (topic, message_type) = publish::classify_error(kind);
        let subscribed = self
            .subs
            .lock()
            .expect("subscription state poisoned")
            .error_count(topic)
            > 0;
        if !subscribed {
            return;
        }
        let envelope = publish::error_event(message_type, text);
        self.sink.send_error(topic.topic(), &envelope);
    }

    fn ping_status(&mut self) {
        let envelope = publish::ping();
        for channel in StatusChannel::ALL {
            if self.channel_count(channel) > 0 {
                self.sink.send_status(channel.topic(), &envelope);
            }
        }
    }

    fn ping_error(&mut self) {
        // the first error ping after a new subscription teaches the
        // keepalive cadence
        let mut pparams_pending = self
            .subs
            .lock()
            .expect("subscription state poisoned")
            .take_new_error_subscription();
        for topic in ErrorTopic::ALL {
            let subscribed = self
                .subs
                .lock()
                .expect("subscription state poisoned")
                .error_count(topic)
                > 0;
            if !subscribed {
                continue;
            }
            let envelope = if pparams_pending {
                pparams_pending = false;
                publish::ping_with_pparams(self.keepalive_ms)
            } else {
                publish::ping()
            };
            self.sink.send_error(topic.topic(), &envelope);
        }
    }

    fn channel_count(&self, channel: StatusChannel) -> u32 {
        self.subs
            .lock()
            .expect("subscription state poisoned")
            .status_count(channel)
    }

    fn take_full(&self, channel: StatusChannel) -> bool {
        self.subs
            .lock()
            .expect("subscription state poisoned")
            .take_full_update(channel)
    }

    fn send_full(&self, channel: StatusChannel, attach: impl FnOnce(&mut Container)) {
        let envelope = publish::full_update(attach, self.keepalive_ms);
        self.sink.send_status(channel.topic(), &envelope);
    }

    fn send_incremental(&self, channel: StatusChannel, attach: impl FnOnce(&mut Container)) {
        let envelope = publish::incremental_update(attach);
        self.sink.send_status(channel.topic(), &envelope);
    }
}
