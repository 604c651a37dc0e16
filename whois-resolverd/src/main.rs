mod config;
mod store;
mod store_manager;
mod queue;
mod drain;
mod webhook;
mod registry;
mod whois;
mod api;
#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use crate::config::Config;
use crate::drain::Pipeline;
use crate::queue::JobQueue;
use crate::registry::{Registrar, RegistryClient};
use crate::store::memory::ResultStore;
use crate::store_manager::StoreHandle;
use crate::webhook::Notifier;
use crate::whois::client::WhoisClient;
use crate::whois::resolver::{Resolver, WhoisResolver};

/// How long shutdown waits for background tasks before giving up on them
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("whois_resolverd=info"))
        )
        .init();

    tracing::info!("Starting whois-resolverd");

    // Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/whois-resolverd/resolverd.toml".to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    tracing::info!("Loaded config from {}", config_path);

    // Shared HTTP client for webhook and registry calls
    let http = reqwest::Client::builder()
        .timeout(config.http.timeout())
        .build()
        .context("Failed to build HTTP client")?;

    let store = StoreHandle::spawn(ResultStore::new());
    let queue = JobQueue::new();

    let resolver: Arc<dyn Resolver> = Arc::new(WhoisResolver::new(WhoisClient::new(&config.whois)));
    let notifier = Notifier::new(http.clone(), &config.webhook);
    let pipeline = Pipeline::new(resolver, store.clone(), notifier);

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();

    // Listen for signals before anything registers externally
    let mut signals = ShutdownSignals::install()?;

    // Spawn drain loop
    let drain_cancel = cancel.clone();
    let drain_queue = queue.clone();
    let drain_interval = config.queue.drain_interval();
    let drain_handle = tokio::spawn(async move {
        if let Err(e) = drain::run(drain_queue, pipeline, drain_interval, drain_cancel).await {
            tracing::error!("Drain loop error: {}", e);
        }
    });

    // Build API router
    let app = api::routes::router(api::routes::AppState {
        queue,
        store: store.clone(),
    });

    // Bind HTTP server
    let listener = tokio::net::TcpListener::bind(&config.api.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.api.listen))?;

    let listen_port = listener
        .local_addr()
        .context("Failed to read listener address")?
        .port();

    tracing::info!("API listening on {}", config.api.listen);

    // Run server with graceful shutdown
    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    // Register with the dispatch registry, if one is configured
    let mut registrar = match &config.registry.url {
        Some(url) => Some(
            Registrar::start(
                RegistryClient::new(http.clone(), url.as_str()),
                registry::registration_for(&config.registry, listen_port),
                config.registry.heartbeat_interval(),
                &cancel,
            )
            .await,
        ),
        None => {
            tracing::info!("No registry configured, skipping registration");
            None
        }
    };

    // Wait for shutdown signal
    signals.recv().await;

    tracing::info!("Shutdown signal received");

    // Trigger cancellation
    cancel.cancel();

    if let Some(registrar) = registrar.as_mut() {
        registrar.deregister(config.registry.deregister_timeout()).await;
    }

    // An in-flight lookup is never interrupted, so only wait a bounded time
    if tokio::time::timeout(SHUTDOWN_GRACE, async {
        let _ = tokio::join!(drain_handle, server_handle);
    })
    .await
    .is_err()
    {
        tracing::warn!("Background tasks did not finish within {:?}", SHUTDOWN_GRACE);
    }

    match store.len().await {
        Ok(n) => tracing::info!("Discarding {} unclaimed results", n),
        Err(e) => tracing::error!("Failed to query result store: {}", e),
    }

    // Shutdown result store
    if let Err(e) = store.shutdown().await {
        tracing::error!("Failed to shutdown result store: {}", e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Termination signals, installed at startup so a failure to listen for
/// them surfaces before the instance registers anywhere
#[cfg(unix)]
struct ShutdownSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).context("Failed to listen for SIGINT")?,
            terminate: signal(SignalKind::terminate()).context("Failed to listen for SIGTERM")?,
            hangup: signal(SignalKind::hangup()).context("Failed to listen for SIGHUP")?,
            quit: signal(SignalKind::quit()).context("Failed to listen for SIGQUIT")?,
        })
    }

    /// Resolves on the first termination signal
    async fn recv(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => {}
            _ = self.terminate.recv() => {}
            _ = self.hangup.recv() => {}
            _ = self.quit.recv() => {}
        }
    }
}

#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
