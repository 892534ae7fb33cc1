use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use crate::lifecycle::{LifecycleConfig, Supervisor, wait_for_termination};
use crate::settings::{SettingsStore, default_config_path, default_static_dir};

pub mod content;
pub mod domain;
pub mod error;
pub mod http;
pub mod index;
pub mod lifecycle;
pub mod notes;
pub mod paths;
pub mod search;
pub mod settings;

/// How long in-flight requests may keep the server up once termination starts.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a walk or search still running on a blocking thread may delay exit.
pub const BLOCKING_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Path to the settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the web UI
    #[arg(short, long)]
    pub static_dir: Option<PathBuf>,
}

/// Shared state handed to every request handler.
#[derive(Debug)]
pub struct AppContext {
    pub settings: SettingsStore,
    pub supervisor: Arc<Supervisor>,
    pub static_dir: PathBuf,
}

impl AppContext {
    pub fn new(settings: SettingsStore, static_dir: PathBuf, lifecycle: LifecycleConfig) -> Self {
        Self {
            settings,
            supervisor: Arc::new(Supervisor::new(lifecycle)),
            static_dir,
        }
    }
}

/// Drives `future` on a fresh multi-threaded runtime, then tears the runtime
/// down without waiting more than `blocking_timeout` for blocking tasks.
pub fn run_until_complete<F: Future>(future: F, blocking_timeout: Duration) -> io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(blocking_timeout);
    Ok(output)
}

pub async fn serve(args: Args) -> io::Result<()> {
    let config_path = args.config.unwrap_or_else(default_config_path);
    let static_dir = args.static_dir.unwrap_or_else(default_static_dir);
    let settings = SettingsStore::load(config_path)?;
    log::info!("Settings file: {}", settings.path().display());

    let ctx = Arc::new(AppContext::new(settings, static_dir, LifecycleConfig::default()));
    let supervisor = Arc::clone(&ctx.supervisor);

    let shutdown = wait_for_termination(supervisor.subscribe());
    let (addr, server) = warp::serve(http::routes(Arc::clone(&ctx)))
        .try_bind_with_graceful_shutdown(SocketAddr::new(args.host, args.port), async move {
            shutdown.await;
        })
        .map_err(io::Error::other)?;

    log::info!("Server started at http://{addr}");
    log::info!("Notes folder: {}", ctx.settings.notes_root().display());

    supervisor.spawn_monitor();
    supervisor.spawn_signal_listener();
    supervisor.mark_running();

    let drain_deadline = {
        let termination = wait_for_termination(supervisor.subscribe());
        async move {
            termination.await;
            tokio::time::sleep(DRAIN_TIMEOUT).await;
        }
    };
    tokio::select! {
        _ = server => {}
        _ = drain_deadline => log::warn!("Open connections did not close in time, exiting anyway"),
    }

    match supervisor.mark_terminated() {
        Some(reason) => log::info!("Server stopped ({reason})"),
        None => log::info!("Server stopped"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn long_blocking_work_does_not_hold_up_exit() {
        let started = Instant::now();
        let output = run_until_complete(
            async {
                tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(10)));
                tokio::task::yield_now().await;
                "done"
            },
            Duration::from_millis(100),
        )
        .unwrap();

        assert_eq!(output, "done");
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
