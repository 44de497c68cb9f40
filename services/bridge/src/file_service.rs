//! Program file service.
//!
//! Anonymous FTP rooted at the program directory (`DISPLAY.PROGRAM_PREFIX`,
//! falling back to the working directory), bound to a pre-picked free port
//! on the announce interface.
//!
//! Connection limits are enforced at the advertised endpoint: an accept
//! loop tallies live sessions globally and per peer address, refuses
//! clients past either ceiling with a `421` line, and proxies admitted
//! clients to the FTP backend listening on an unannounced ephemeral port
//! of the same interface.
//!
//! Anything that appears in the program directory during the session,
//! completed uploads and partial files left by aborted transfers alike,
//! is removed by the shutdown sweep, so uploads never outlive the session.

use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::net::{IpAddr, Ipv4Addr, TcpListener};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use unftp_sbe_fs::ServerExt;

/// Global ceiling on concurrent sessions.
pub const MAX_CONNECTIONS: u32 = 256;
/// Ceiling on concurrent sessions from one client address.
pub const MAX_CONNECTIONS_PER_IP: u32 = 5;

const GREETING: &str = "welcome to the GCode file service";
const REFUSAL: &[u8] = b"421 Too many connections. Service temporarily unavailable.\r\n";

#[derive(Debug, Error)]
pub enum FileServiceError {
    #[error("program directory unavailable: {0}")]
    Io(#[from] std::io::Error),
    #[error("ftp server failed: {0}")]
    Server(String),
}

// ---------------------------------------------------------------------------
// Connection accounting
// ---------------------------------------------------------------------------

/// Live-session tallies behind the accept loop.
#[derive(Debug, Default)]
struct ConnectionLimits {
    total: u32,
    per_ip: HashMap<IpAddr, u32>,
}

impl ConnectionLimits {
    /// Admit one session from `peer`, or refuse if either ceiling is hit.
    fn try_admit(&mut self, peer: IpAddr) -> bool {
        if self.total >= MAX_CONNECTIONS {
            return false;
        }
        let count = self.per_ip.entry(peer).or_insert(0);
        if *count >= MAX_CONNECTIONS_PER_IP {
            return false;
        }
        *count += 1;
        self.total += 1;
        true
    }

    /// Return a session's slot when it ends.
    fn release(&mut self, peer: IpAddr) {
        self.total = self.total.saturating_sub(1);
        if let Some(count) = self.per_ip.get_mut(&peer) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.per_ip.remove(&peer);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FileService
// ---------------------------------------------------------------------------

/// The prepared file service: bound port, DSN, and the pre-session
/// directory snapshot the shutdown sweep compares against.
pub struct FileService {
    root: PathBuf,
    preexisting: HashSet<OsString>,
    ip: Ipv4Addr,
    pub port: u16,
    pub dsn: String,
}

impl FileService {
    /// Pick a free port and snapshot the directory contents.
    pub fn prepare(root: PathBuf, ip: Ipv4Addr) -> Result<Self, FileServiceError> {
        let port = free_port(ip)?;
        let preexisting = match std::fs::read_dir(&root) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .map(|entry| entry.file_name())
                .collect(),
            Err(e) => {
                warn!(root = %root.display(), error = %e, "program directory not readable");
                HashSet::new()
            }
        };
        let dsn = format!("ftp://{ip}:{port}");
        info!(root = %root.display(), %dsn, "file service prepared");
        Ok(FileService {
            root,
            preexisting,
            ip,
            port,
            dsn,
        })
    }

    /// Run the FTP backend and the limit-enforcing accept loop until the
    /// surrounding task is aborted.
    pub async fn serve(&self) -> Result<(), FileServiceError> {
        let backend_port = free_port(self.ip)?;
        let backend_addr = format!("{}:{}", self.ip, backend_port);
        let server = libunftp::Server::with_fs(self.root.clone())
            .greeting(GREETING)
            .build()
            .map_err(|e| FileServiceError::Server(e.to_string()))?;
        let backend = backend_addr.clone();
        tokio::spawn(async move {
            let _ = server.listen(backend).await;
        });

        let listener = tokio::net::TcpListener::bind((self.ip, self.port)).await?;
        info!(address = %format!("{}:{}", self.ip, self.port), "file service listening");
        let limits = Arc::new(Mutex::new(ConnectionLimits::default()));

        loop {
            let (client, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "file service accept failed");
                    break;
                }
            };
            let peer_ip = peer.ip();
            let admitted = limits
                .lock()
                .expect("connection limits poisoned")
                .try_admit(peer_ip);
            if !admitted {
                warn!(peer = %peer, "refusing ftp connection: limit reached");
                tokio::spawn(refuse(client));
                continue;
            }
            debug!(peer = %peer, "ftp session admitted");
            let limits = limits.clone();
            let backend_addr = backend_addr.clone();
            tokio::spawn(async move {
                if let Err(e) = proxy_session(client, &backend_addr).await {
                    debug!(peer = %peer, error = %e, "ftp session ended with error");
                }
                limits
                    .lock()
                    .expect("connection limits poisoned")
                    .release(peer_ip);
            });
        }
        Ok(())
    }

    /// Remove everything uploaded during the session: files present now
    /// but absent from the startup snapshot.
    pub fn sweep_session_files(&self) {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "session sweep skipped: directory not readable");
                return;
            }
        };
        for entry in entries.filter_map(Result::ok) {
            let name = entry.file_name();
            if self.preexisting.contains(&name) {
                continue;
            }
            let path = entry.path();
            if path.is_file() {
                match std::fs::remove_file(&path) {
                    Ok(()) => info!(file = %path.display(), "removed session upload"),
                    Err(e) => warn!(file = %path.display(), error = %e, "failed to remove upload"),
                }
            }
        }
    }
}

/// Pipe one admitted client to the FTP backend until either side closes.
async fn proxy_session(
    mut client: tokio::net::TcpStream,
    backend_addr: &str,
) -> std::io::Result<()> {
    let mut upstream = tokio::net::TcpStream::connect(backend_addr).await?;
    tokio::io::copy_bidirectional(&mut client, &mut upstream).await?;
    Ok(())
}

async fn refuse(mut client: tokio::net::TcpStream) {
    let _ = client.write_all(REFUSAL).await;
}

fn free_port(ip: Ipv4Addr) -> Result<u16, FileServiceError> {
    let listener = TcpListener::bind((ip, 0))?;
    Ok(listener.local_addr()?.port())
}
