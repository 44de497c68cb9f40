//! Publication plumbing.
//!
//! The control loop never touches the XPUB sockets directly: each ZeroMQ
//! socket stays owned by the socket-poll context, and publications travel
//! over an inproc PUSH/PULL pair as three frames
//! `[destination, topic, payload]`.  The socket loop pops them and re-sends
//! `[topic, payload]` on the matching XPUB socket, which keeps per-channel
//! ordering (single writer per socket) intact.
//!
//! Envelope builders live here too: full update (always with protocol
//! parameters), incremental update, ping, and error event.

use crate::runtime::ErrorKind;
use crate::subscriptions::ErrorTopic;
use mk_protocol::{Container, MessageType, ProtocolParameters};
use prost::Message;
use thiserror::Error;
use tracing::warn;

/// inproc endpoint carrying queued publications to the socket loop.
pub const PUBLISH_ENDPOINT: &str = "inproc://bridge-publish";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("socket error: {0}")]
    Socket(#[from] zmq::Error),
    #[error("endpoint '{0}' reported no bound address")]
    NoEndpoint(String),
}

/// Destination socket of a queued publication; the first inproc frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishTarget {
    Status,
    Error,
}

impl PublishTarget {
    pub fn frame(self) -> &'static [u8] {
        match self {
            PublishTarget::Status => b"status",
            PublishTarget::Error => b"error",
        }
    }

    pub fn from_frame(frame: &[u8]) -> Option<Self> {
        match frame {
            b"status" => Some(PublishTarget::Status),
            b"error" => Some(PublishTarget::Error),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope builders
// ---------------------------------------------------------------------------

/// A full update: the entire channel baseline plus protocol parameters.
pub fn full_update(attach: impl FnOnce(&mut Container), keepalive_ms: u32) -> Container {
    let mut envelope = Container::of_type(MessageType::EmcstatFullUpdate);
    envelope.pparams = Some(ProtocolParameters {
        keepalive_timer: Some(keepalive_ms),
    });
    attach(&mut envelope);
    envelope
}

/// An incremental update carrying only changed fields.
pub fn incremental_update(attach: impl FnOnce(&mut Container)) -> Container {
    let mut envelope = Container::of_type(MessageType::EmcstatIncrementalUpdate);
    attach(&mut envelope);
    envelope
}

/// A bare heartbeat.
pub fn ping() -> Container {
    Container::of_type(MessageType::Ping)
}

/// A heartbeat additionally announcing the keepalive cadence; sent as the
/// first error-side ping after a new subscription.
pub fn ping_with_pparams(keepalive_ms: u32) -> Container {
    let mut envelope = ping();
    envelope.pparams = Some(ProtocolParameters {
        keepalive_timer: Some(keepalive_ms),
    });
    envelope
}

/// One error-channel event, `note[0]` carrying the text.
pub fn error_event(kind: MessageType, text: String) -> Container {
    let mut envelope = Container::of_type(kind);
    envelope.note.push(text);
    envelope
}

/// Map a runtime error event onto its topic and published message type.
pub fn classify_error(kind: ErrorKind) -> (ErrorTopic, MessageType) {
    match kind {
        ErrorKind::NmlError => (ErrorTopic::Error, MessageType::EmcNmlError),
        ErrorKind::OperatorError => (ErrorTopic::Error, MessageType::EmcOperatorError),
        ErrorKind::NmlText => (ErrorTopic::Text, MessageType::EmcNmlText),
        ErrorKind::OperatorText => (ErrorTopic::Text, MessageType::EmcOperatorText),
        ErrorKind::NmlDisplay => (ErrorTopic::Display, MessageType::EmcNmlDisplay),
        ErrorKind::OperatorDisplay => (ErrorTopic::Display, MessageType::EmcOperatorDisplay),
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Where the control loop hands off publications.  The production
/// implementation queues onto the inproc pair; tests record.
pub trait StatusSink {
    fn send_status(&self, topic: &str, envelope: &Container);
    fn send_error(&self, topic: &str, envelope: &Container);
}

/// The PUSH side of the inproc publication queue.
pub struct PublishHandle {
    push: zmq::Socket,
}

impl PublishHandle {
    /// Connect to the socket loop's PULL socket.  The PULL side must be
    /// bound first (inproc endpoints do not exist before bind).
    pub fn connect(ctx: &zmq::Context) -> Result<Self, TransportError> {
        let push = ctx.socket(zmq::PUSH)?;
        push.set_linger(0)?;
        push.connect(PUBLISH_ENDPOINT)?;
        Ok(PublishHandle { push })
    }

    fn queue(&self, target: PublishTarget, topic: &str, envelope: &Container) {
        let payload = envelope.encode_to_vec();
        let frames: [&[u8]; 3] = [target.frame(), topic.as_bytes(), payload.as_slice()];
        if let Err(e) = self.push.send_multipart(frames, 0) {
            warn!(topic, error = %e, "dropping publication: send queue unavailable");
        }
    }
}

impl StatusSink for PublishHandle {
    fn send_status(&self, topic: &str, envelope: &Container) {
        self.queue(PublishTarget::Status, topic, envelope);
    }

    fn send_error(&self, topic: &str, envelope: &Container) {
        self.queue(PublishTarget::Error, topic, envelope);
    }
}
