//! Service discovery.
//!
//! Each endpoint (status, error, command, file) is registered with the
//! local mDNS responder under the `_machinekit._tcp` service type, with a
//! per-role subtype (`_status._sub._machinekit._tcp`, ...) so browsers can
//! filter by role.  TXT records carry:
//!
//! - `dsn` — the endpoint URL (`tcp://ip:port` or `ftp://ip:port`)
//! - `uuid` — the deployment UUID from the deployment ini
//! - `service` — the role name
//! - `instance` — this process's UUID
//!
//! All registrations are withdrawn on shutdown, before the sockets close.

use mdns_sd::{ServiceDaemon, ServiceInfo};
use std::net::Ipv4Addr;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

const SERVICE_TYPE: &str = "_machinekit._tcp.local.";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("mdns registration failed: {0}")]
    Mdns(#[from] mdns_sd::Error),
}

/// Owns the mDNS daemon and every registration made through it.
pub struct ServiceAnnouncer {
    daemon: ServiceDaemon,
    registered: Vec<String>,
    ip: Ipv4Addr,
    host_name: String,
    service_uuid: String,
    instance: Uuid,
}

impl ServiceAnnouncer {
    pub fn new(ip: Ipv4Addr, service_uuid: String) -> Result<Self, DiscoveryError> {
        let instance = Uuid::new_v4();
        Ok(ServiceAnnouncer {
            daemon: ServiceDaemon::new()?,
            registered: Vec::new(),
            ip,
            host_name: format!("{instance}.local."),
            service_uuid,
            instance,
        })
    }

    /// The per-process UUID published as `instance=`.
    pub fn instance(&self) -> Uuid {
        self.instance
    }

    /// Register one endpoint under its role subtype.
    pub fn announce(&mut self, role: &str, dsn: &str, port: u16) -> Result<(), DiscoveryError> {
        let service_type = format!("_{role}._sub.{SERVICE_TYPE}");
        let instance_name = format!("{} on {}", capitalize(role), self.ip);
        let address = self.ip.to_string();
        let instance = self.instance.to_string();
        let properties = [
            ("dsn", dsn),
            ("uuid", self.service_uuid.as_str()),
            ("service", role),
            ("instance", instance.as_str()),
        ];
        let service_info = ServiceInfo::new(
            &service_type,
            &instance_name,
            &self.host_name,
            address.as_str(),
            port,
            &properties[..],
        )?;
        let fullname = service_info.get_fullname().to_owned();
        self.daemon.register(service_info)?;
        info!(role, dsn, port, "service announced");
        self.registered.push(fullname);
        Ok(())
    }

    /// Withdraw every registration and stop the daemon.
    pub fn shutdown(self) {
        for fullname in &self.registered {
            if let Err(e) = self.daemon.unregister(fullname) {
                warn!(service = fullname.as_str(), error = %e, "unregister failed");
            }
        }
        if let Err(e) = self.daemon.shutdown() {
            warn!(error = %e, "mdns daemon shutdown failed");
        }
    }
}

fn capitalize(role: &str) -> String {
    let mut chars = role.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
