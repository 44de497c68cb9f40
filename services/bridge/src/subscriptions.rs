//! Per-topic subscriber accounting.
//!
//! The XPUB sockets deliver one notification frame per subscribe or
//! unsubscribe: first byte 0x01 (subscribe) or 0x00 (unsubscribe), the
//! remainder the UTF-8 topic name.  The tracker keeps one counter per
//! recognized topic (unknown topics are ignored), arms the per-channel
//! full-update flag on every subscribe, and maintains the derived totals
//! the control loop gates on.
//!
//! Counters never go below zero, even if the transport delivers an
//! unmatched unsubscribe.
//!
//! Written by the socket-poll context, read (and flag-consumed) by the
//! control-loop context; shared behind a single mutex.

use std::sync::{Arc, Mutex};

/// One of the five status channels, each an independently subscribable
/// topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChannel {
    Io,
    Task,
    Interp,
    Motion,
    Config,
}

impl StatusChannel {
    pub const ALL: [StatusChannel; 5] = [
        StatusChannel::Io,
        StatusChannel::Task,
        StatusChannel::Interp,
        StatusChannel::Motion,
        StatusChannel::Config,
    ];

    pub fn topic(self) -> &'static str {
        match self {
            StatusChannel::Io => mk_protocol::topics::IO,
            StatusChannel::Task => mk_protocol::topics::TASK,
            StatusChannel::Interp => mk_protocol::topics::INTERP,
            StatusChannel::Motion => mk_protocol::topics::MOTION,
            StatusChannel::Config => mk_protocol::topics::CONFIG,
        }
    }

    pub fn from_topic(topic: &str) -> Option<Self> {
        StatusChannel::ALL.into_iter().find(|c| c.topic() == topic)
    }

    fn slot(self) -> usize {
        match self {
            StatusChannel::Io => 0,
            StatusChannel::Task => 1,
            StatusChannel::Interp => 2,
            StatusChannel::Motion => 3,
            StatusChannel::Config => 4,
        }
    }
}

/// One of the three error-side topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTopic {
    Error,
    Text,
    Display,
}

impl ErrorTopic {
    pub const ALL: [ErrorTopic; 3] = [ErrorTopic::Error, ErrorTopic::Text, ErrorTopic::Display];

    pub fn topic(self) -> &'static str {
        match self {
            ErrorTopic::Error => mk_protocol::topics::ERROR,
            ErrorTopic::Text => mk_protocol::topics::TEXT,
            ErrorTopic::Display => mk_protocol::topics::DISPLAY,
        }
    }

    pub fn from_topic(topic: &str) -> Option<Self> {
        ErrorTopic::ALL.into_iter().find(|t| t.topic() == topic)
    }

    fn slot(self) -> usize {
        match self {
            ErrorTopic::Error => 0,
            ErrorTopic::Text => 1,
            ErrorTopic::Display => 2,
        }
    }
}

/// Parse an XPUB subscription notification frame into
/// `(subscribe, topic)`.  Returns `None` for empty frames and non-UTF-8
/// topic names.
pub fn parse_notification(frame: &[u8]) -> Option<(bool, &str)> {
    let (&flag, topic) = frame.split_first()?;
    let topic = std::str::from_utf8(topic).ok()?;
    match flag {
        0x01 => Some((true, topic)),
        0x00 => Some((false, topic)),
        _ => None,
    }
}

/// Subscriber counters and full-update flags for all eight topics.
#[derive(Debug, Default)]
pub struct Subscriptions {
    status: [u32; 5],
    full_update: [bool; 5],
    error: [u32; 3],
    new_error_subscription: bool,
}

impl Subscriptions {
    pub fn new() -> Self {
        Subscriptions::default()
    }

    /// Apply a status-socket notification.  Unknown topics are ignored.
    pub fn apply_status(&mut self, topic: &str, subscribe: bool) {
        let Some(channel) = StatusChannel::from_topic(topic) else {
            return;
        };
        let slot = channel.slot();
        if subscribe {
            self.status[slot] += 1;
            self.full_update[slot] = true;
        } else {
            self.status[slot] = self.status[slot].saturating_sub(1);
        }
    }

    /// Apply an error-socket notification.  Unknown topics are ignored.
    pub fn apply_error(&mut self, topic: &str, subscribe: bool) {
        let Some(error_topic) = ErrorTopic::from_topic(topic) else {
            return;
        };
        let slot = error_topic.slot();
        if subscribe {
            self.error[slot] += 1;
            self.new_error_subscription = true;
        } else {
            self.error[slot] = self.error[slot].saturating_sub(1);
        }
    }

    pub fn status_count(&self, channel: StatusChannel) -> u32 {
        self.status[channel.slot()]
    }

    pub fn error_count(&self, topic: ErrorTopic) -> u32 {
        self.error[topic.slot()]
    }

    pub fn total_status(&self) -> u32 {
        self.status.iter().sum()
    }

    pub fn total_error(&self) -> u32 {
        self.error.iter().sum()
    }

    /// Consume the channel's full-update flag.
    pub fn take_full_update(&mut self, channel: StatusChannel) -> bool {
        std::mem::take(&mut self.full_update[channel.slot()])
    }

    /// Consume the "new error subscriber since last ping" flag.
    pub fn take_new_error_subscription(&mut self) -> bool {
        std::mem::take(&mut self.new_error_subscription)
    }
}

/// The tracker as shared between the socket-poll and control-loop
/// contexts.
pub type SharedSubscriptions = Arc<Mutex<Subscriptions>>;

pub fn shared() -> SharedSubscriptions {
    Arc::new(Mutex::new(Subscriptions::new()))
}
