//! bridge: exposes a machine-control runtime to remote clients.
//!
//! Status is replicated differentially over a subscription-driven
//! multicast socket (five channels, full update on subscribe, incremental
//! updates after), runtime errors fan out over a second one, commands
//! arrive on a bidirectional socket, and part programs move over an
//! anonymous FTP service.  All four endpoints are announced via mDNS.
//!
//! Three execution contexts cooperate: the socket-poll loop (subscription
//! events, commands, publication forwarding), the control loop (runtime
//! polling, diffing, pings), and the file-service task.

pub mod command;
pub mod config;
pub mod diff;
pub mod discovery;
pub mod file_service;
pub mod net;
pub mod poller;
pub mod publish;
pub mod runtime;
pub mod sockets;
pub mod subscriptions;
