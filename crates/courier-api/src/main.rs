//! `courier-server` binary: wires the store, queue, worker, and HTTP surface.

use anyhow::{bail, Context};
use clap::Parser;
use courier_api::config::AUTH_TOKEN_ENV;
use courier_api::{AppContext, HttpCallbackNotifier, ServerConfig};
use courier_run::{work_queue, FsEvidenceSink, Orchestrator, RunStore, Worker};
use courier_session::{SessionConfig, SessionManager, WebDriverBackend};
use courier_workflow::{PageMap, WorkflowDriver};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const QUEUE_CAPACITY: usize = 256;
const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);
const REAP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Parser)]
#[command(name = "courier-server", version, about = "Listing delivery automation server")]
struct Args {
    /// Path to the TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured listen address
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("courier={default},courier_server={default}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = ServerConfig::load(args.config.as_deref())?;
    config.apply_env();
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if config.auth_token.is_empty() {
        bail!("no auth token configured; set auth_token in the config file or {AUTH_TOKEN_ENV}");
    }
    if config.backend.kind != "webdriver" {
        bail!("unsupported backend kind {:?}", config.backend.kind);
    }

    let store = RunStore::new(config.run_ttl);
    let _sweeper = store.spawn_sweeper(SWEEP_INTERVAL);

    let (queue, receiver) = work_queue(QUEUE_CAPACITY, config.worker.lease);
    let _reaper = queue.spawn_reaper(REAP_INTERVAL);

    let backend = Arc::new(WebDriverBackend::new(
        &config.backend.endpoint,
        &config.backend.browser,
    ));
    let sessions = SessionManager::new(
        backend,
        &config.storage_state_path,
        SessionConfig::default(),
    );
    let workflow = WorkflowDriver::new(PageMap::default(), config.workflow_config());
    let evidence = Arc::new(FsEvidenceSink::new(config.evidence_dir.clone()));
    let notifier = Arc::new(HttpCallbackNotifier::new());

    let worker = Worker::new(store.clone(), sessions, workflow, evidence, notifier);
    let _worker = tokio::spawn(worker.run(receiver));

    let orchestrator = Orchestrator::new(store, queue);
    let ctx = Arc::new(AppContext::new(orchestrator, config.auth_token.clone()));
    let app = courier_api::router(ctx);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, version = courier_api::VERSION, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
