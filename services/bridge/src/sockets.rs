//! The socket-poll context.
//!
//! Owns all ZeroMQ sockets for the lifetime of the process: the status and
//! error XPUB publishers (whose inbound traffic is subscription
//! notifications), the command DEALER, and the inproc PULL carrying
//! publications queued by the control loop.  A single multiplexed poll
//! drives all four; the 250 ms timeout exists only to observe the
//! shutdown flag.
//!
//! Sockets never cross threads (the control loop reaches the publishers
//! through the inproc queue), so no socket locking is needed.

use crate::command::CommandDispatcher;
use crate::publish::{PublishTarget, TransportError, PUBLISH_ENDPOINT};
use crate::runtime::Commander;
use crate::subscriptions::{parse_notification, SharedSubscriptions};
use prost::Message;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

const POLL_TIMEOUT_MS: i64 = 250;

/// The bound sockets plus their announced endpoints.
pub struct BridgeSockets {
    status: zmq::Socket,
    error: zmq::Socket,
    command: zmq::Socket,
    publish_pull: zmq::Socket,

    pub status_dsn: String,
    pub status_port: u16,
    pub error_dsn: String,
    pub error_port: u16,
    pub command_dsn: String,
    pub command_port: u16,
}

fn bind_ephemeral(
    ctx: &zmq::Context,
    socket_type: zmq::SocketType,
    ip: Ipv4Addr,
) -> Result<(zmq::Socket, String, u16), TransportError> {
    let socket = ctx.socket(socket_type)?;
    socket.set_linger(0)?;
    let endpoint = format!("tcp://{ip}:*");
    socket.bind(&endpoint)?;
    let dsn = socket
        .get_last_endpoint()?
        .map_err(|_| TransportError::NoEndpoint(endpoint.clone()))?;
    let port = dsn
        .rsplit(':')
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or(TransportError::NoEndpoint(endpoint))?;
    Ok((socket, dsn, port))
}

impl BridgeSockets {
    /// Bind the three service sockets to ephemeral ports on `ip` and the
    /// publication PULL to its inproc endpoint.
    pub fn bind(ctx: &zmq::Context, ip: Ipv4Addr) -> Result<Self, TransportError> {
        let (status, status_dsn, status_port) = bind_ephemeral(ctx, zmq::XPUB, ip)?;
        let (error, error_dsn, error_port) = bind_ephemeral(ctx, zmq::XPUB, ip)?;
        // without verbose mode XPUB coalesces subscriptions across peers
        // and a second subscriber's subscribe frame never reaches the
        // tracker
        status.set_xpub_verbose(true)?;
        error.set_xpub_verbose(true)?;
        let (command, command_dsn, command_port) = bind_ephemeral(ctx, zmq::DEALER, ip)?;

        let publish_pull = ctx.socket(zmq::PULL)?;
        publish_pull.set_linger(0)?;
        publish_pull.bind(PUBLISH_ENDPOINT)?;

        info!(%status_dsn, %error_dsn, %command_dsn, "sockets bound");
        Ok(BridgeSockets {
            status,
            error,
            command,
            publish_pull,
            status_dsn,
            status_port,
            error_dsn,
            error_port,
            command_dsn,
            command_port,
        })
    }

    /// Poll until the shutdown flag is raised.
    pub fn run<C: Commander>(
        &self,
        subs: &SharedSubscriptions,
        dispatcher: &mut CommandDispatcher<C>,
        shutdown: &AtomicBool,
    ) {
        debug!("socket loop started");
        while !shutdown.load(Ordering::Relaxed) {
            let mut items = [
                self.status.as_poll_item(zmq::POLLIN),
                self.error.as_poll_item(zmq::POLLIN),
                self.command.as_poll_item(zmq::POLLIN),
                self.publish_pull.as_poll_item(zmq::POLLIN),
            ];
            match zmq::poll(&mut items, POLL_TIMEOUT_MS) {
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "socket poll failed");
                    break;
                }
            }
            let (status_ready, error_ready, command_ready, publish_ready) = (
                items[0].is_readable(),
                items[1].is_readable(),
                items[2].is_readable(),
                items[3].is_readable(),
            );
            drop(items);

            if status_ready {
                self.process_status_events(subs);
            }
            if error_ready {
                self.process_error_events(subs);
            }
            if command_ready {
                self.process_commands(dispatcher);
            }
            if publish_ready {
                self.forward_publications();
            }
        }
        debug!("socket loop stopped");
    }

    /// Drain subscription notifications from the status publisher.
    fn process_status_events(&self, subs: &SharedSubscriptions) {
        while let Ok(frame) = self.status.recv_bytes(zmq::DONTWAIT) {
            let Some((subscribe, topic)) = parse_notification(&frame) else {
                continue;
            };
            let mut tracker = subs.lock().expect("subscription state poisoned");
            tracker.apply_status(topic, subscribe);
            info!(
                topic,
                subscribe,
                total = tracker.total_status(),
                "status subscription changed"
            );
        }
    }

    /// Drain subscription notifications from the error publisher.
    fn process_error_events(&self, subs: &SharedSubscriptions) {
        while let Ok(frame) = self.error.recv_bytes(zmq::DONTWAIT) {
            let Some((subscribe, topic)) = parse_notification(&frame) else {
                continue;
            };
            let mut tracker = subs.lock().expect("subscription state poisoned");
            tracker.apply_error(topic, subscribe);
            info!(
                topic,
                subscribe,
                total = tracker.total_error(),
                "error subscription changed"
            );
        }
    }

    /// Handle queued command frames, replying inline where the dispatcher
    /// produced a reply.
    fn process_commands<C: Commander>(&self, dispatcher: &mut CommandDispatcher<C>) {
        while let Ok(frame) = self.command.recv_bytes(zmq::DONTWAIT) {
            if let Some(reply) = dispatcher.handle(&frame) {
                if let Err(e) = self.command.send(reply.encode_to_vec(), 0) {
                    warn!(error = %e, "failed to send command reply");
                }
            }
        }
    }

    /// Move queued `[destination, topic, payload]` publications onto the
    /// matching publisher socket as `[topic, payload]`.
    fn forward_publications(&self) {
        while let Ok(frames) = self.publish_pull.recv_multipart(zmq::DONTWAIT) {
            if frames.len() != 3 {
                warn!(frames = frames.len(), "malformed internal publication");
                continue;
            }
            let socket = match PublishTarget::from_frame(&frames[0]) {
                Some(PublishTarget::Status) => &self.status,
                Some(PublishTarget::Error) => &self.error,
                None => {
                    warn!("internal publication with unknown destination");
                    continue;
                }
            };
            let parts: [&[u8]; 2] = [frames[1].as_slice(), frames[2].as_slice()];
            if let Err(e) = socket.send_multipart(parts, 0) {
                warn!(error = %e, "failed to publish message");
            }
        }
    }
}
