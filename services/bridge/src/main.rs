// bridge: machine-control remote access service.
//
// Startup order matters: interface selection and socket binding first
// (their DSNs go into the TXT records), then discovery announcements,
// then the three execution contexts.  Shutdown withdraws announcements
// before closing sockets and sweeps session uploads last.

use bridge::command::CommandDispatcher;
use bridge::config::{DisplayConfig, MachineConfig};
use bridge::diff::StatusTracker;
use bridge::discovery::ServiceAnnouncer;
use bridge::file_service::FileService;
use bridge::net::choose_interface;
use bridge::poller::ControlLoop;
use bridge::publish::PublishHandle;
use bridge::runtime::sim::SimRuntime;
use bridge::sockets::BridgeSockets;
use bridge::subscriptions;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Heartbeat period in seconds; also published to clients as
/// `pparams.keepalive_timer`.
const PING_INTERVAL_SECS: f64 = 2.0;

fn fatal<T, E: std::fmt::Display>(result: Result<T, E>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        eprintln!("FATAL: {what}: {e}");
        std::process::exit(1);
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "bridge starting");

    // machine ini: first CLI arg, else INI_FILE_NAME
    let machine_ini: Option<PathBuf> = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("INI_FILE_NAME").ok())
        .map(PathBuf::from);

    let deployment_ini = match std::env::var("MACHINEKIT_INI") {
        Ok(path) => PathBuf::from(path),
        Err(_) => {
            eprintln!("FATAL: no MACHINEKIT_INI environment variable set");
            std::process::exit(1);
        }
    };
    let machine = fatal(
        MachineConfig::load(&deployment_ini),
        "failed to load deployment config",
    );

    if !machine.remote {
        println!("Remote communication is deactivated, the bridge will not start");
        println!(
            "set REMOTE in {} to 1 to enable remote communication",
            deployment_ini.display()
        );
        return;
    }

    let interface = fatal(
        choose_interface(&machine.interfaces),
        "failed to determine preferred interface",
    );
    info!(interface = %interface.name, ip = %interface.ip, "announcing bridge");

    let display = fatal(
        DisplayConfig::load(machine_ini.as_deref()),
        "failed to load machine config",
    );
    let program_dir = display.program_dir();

    let ctx = zmq::Context::new();
    let sockets = fatal(
        BridgeSockets::bind(&ctx, interface.ip),
        "failed to bind sockets",
    );
    let file_service = Arc::new(fatal(
        FileService::prepare(program_dir.clone(), interface.ip),
        "failed to prepare file service",
    ));

    let mut announcer = fatal(
        ServiceAnnouncer::new(interface.ip, machine.uuid.clone()),
        "cannot register DNS service",
    );
    for (role, dsn, port) in [
        ("status", &sockets.status_dsn, sockets.status_port),
        ("error", &sockets.error_dsn, sockets.error_port),
        ("command", &sockets.command_dsn, sockets.command_port),
        ("file", &file_service.dsn, file_service.port),
    ] {
        fatal(
            announcer.announce(role, dsn, port),
            "cannot register DNS service",
        );
    }

    let runtime = SimRuntime::new();
    let subs = subscriptions::shared();
    let shutdown = Arc::new(AtomicBool::new(false));

    // control-loop context
    let publisher = fatal(
        PublishHandle::connect(&ctx),
        "failed to open publish queue",
    );
    let control = ControlLoop::new(
        runtime.clone(),
        runtime.clone(),
        publisher,
        StatusTracker::new(&display),
        subs.clone(),
        display.cycle_time,
        PING_INTERVAL_SECS,
    );
    let control_shutdown = shutdown.clone();
    let control_handle =
        tokio::task::spawn_blocking(move || control.run(&control_shutdown));

    // socket-poll context
    let mut dispatcher = CommandDispatcher::new(runtime.clone(), program_dir);
    let socket_subs = subs.clone();
    let socket_shutdown = shutdown.clone();
    let socket_handle = tokio::task::spawn_blocking(move || {
        sockets.run(&socket_subs, &mut dispatcher, &socket_shutdown);
    });

    // file-service context
    let ftp = file_service.clone();
    let file_handle = tokio::spawn(async move {
        if let Err(e) = ftp.serve().await {
            tracing::error!(error = %e, "file service failed");
        }
    });

    shutdown_signal().await;

    // withdraw announcements before any socket closes
    announcer.shutdown();
    shutdown.store(true, Ordering::Relaxed);
    file_handle.abort();
    let _ = control_handle.await;
    let _ = socket_handle.await;
    file_service.sweep_session_files();
    info!("bridge shut down");
}

/// Waits for SIGTERM or Ctrl-C (SIGINT) and returns to trigger graceful
/// shutdown.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        () = terminate => { info!("received SIGTERM, shutting down"); },
    }
}
