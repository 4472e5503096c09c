//! Service wiring: manager, boot streams, control plane, graceful stop

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info, warn};

use weir_config::Config;
use weir_core::MemoryCache;
use weir_manager::StreamManager;
use weir_metrics::{Registry, SharedMetrics, Snapshot};
use weir_stream::StreamConfig;

/// Run the service until a shutdown signal arrives.
pub async fn run(config: Config) -> Result<()> {
    let registry = Arc::new(Registry::new());
    let metrics: SharedMetrics = Arc::clone(&registry) as SharedMetrics;

    let mut manager =
        StreamManager::new(metrics).with_api_timeout(config.http.api_timeout);
    for name in &config.caches {
        info!(cache = %name, "memory cache registered");
        manager = manager.add_cache(name.as_str(), Arc::new(MemoryCache::new()));
    }
    let manager = Arc::new(manager);

    if let Some(dir) = &config.streams_dir {
        boot_streams(&manager, dir)?;
    }

    let ops = Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_snapshot))
        .with_state(registry);
    let app = weir_manager::router(Arc::clone(&manager)).merge(ops);

    let listener = tokio::net::TcpListener::bind(&config.http.listen_addr)
        .await
        .with_context(|| format!("binding control plane on {}", config.http.listen_addr))?;
    info!(addr = %listener.local_addr()?, "control plane listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down streams");
    if let Err(err) = manager.stop(config.http.api_timeout).await {
        error!(error = %err, "stream shutdown overran its deadline");
    }
    Ok(())
}

/// Register every stream config found under `dir`, named by file stem.
fn boot_streams(manager: &StreamManager, dir: &str) -> Result<()> {
    let entries = std::fs::read_dir(dir).with_context(|| format!("reading streams dir {dir}"))?;
    for entry in entries {
        let path = entry?.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yaml" || e == "yml");
        if !is_yaml {
            continue;
        }

        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            warn!(path = %path.display(), "skipping stream file with unusable name");
            continue;
        };
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("reading stream config {}", path.display()))?;
        let stream_config: StreamConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing stream config {}", path.display()))?;
        manager
            .create(id, stream_config)
            .with_context(|| format!("creating stream '{id}'"))?;
        info!(stream = id, path = %path.display(), "boot stream created");
    }
    Ok(())
}

async fn healthz() -> &'static str {
    "OK"
}

async fn metrics_snapshot(State(registry): State<Arc<Registry>>) -> Json<Snapshot> {
    Json(registry.snapshot())
}

/// Resolves on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received"),
        _ = terminate => info!("sigterm received"),
    }
}
