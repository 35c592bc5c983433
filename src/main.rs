use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

use hyperqube_quorum_daemon::broadcast::{run_ingestion, LogPublisher, StdinSource};
use hyperqube_quorum_daemon::core::{self, Config, DaemonMetrics, HealthChecker};
use hyperqube_quorum_daemon::execution::LoggingExecutor;
use hyperqube_quorum_daemon::history::HistoryStore;
use hyperqube_quorum_daemon::quorum::{EngineSettings, QuorumEngine, QuorumState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration; invalid quorum settings are fatal here.
    let config = Config::from_env()?;

    // Initialize logging
    core::logging::init_logging(&config.monitoring.log_level);

    tracing::info!("🚀 HyperQube Quorum Daemon starting...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Network: {} | quorum: {}/{} signers | node: {}",
        config.broadcast.network,
        config.quorum.threshold,
        config.broadcast.trusted_signers.len(),
        config.broadcast.node_id
    );
    if config.quorum.dry_run {
        tracing::info!("Running in dry-run mode");
    }

    if let Some(dir) = config.quorum.history_path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let metrics = Arc::new(DaemonMetrics::new());
    let health_checker = HealthChecker::new(metrics.clone());

    // Start health check endpoint
    let health_clone = health_checker.clone();
    let health_port = config.monitoring.health_port;
    tokio::spawn(async move { start_health_server(health_clone, health_port).await });
    tracing::info!("✅ Health endpoint running on port {}", health_port);

    let state = Arc::new(RwLock::new(QuorumState::new()));
    let history = Arc::new(RwLock::new(HistoryStore::load(&config.quorum.history_path)));
    health_checker.update_component("history", true).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Ingestion: one task per source. Stdin NDJSON is the built-in local
    // transport; relay clients implement EventSource out of tree.
    let mut ingestion = tokio::spawn(run_ingestion(
        "stdin".to_string(),
        StdinSource::new(),
        config.validator_config(),
        state.clone(),
        metrics.clone(),
        shutdown_rx.clone(),
    ));
    health_checker.update_component("ingestion", true).await;

    // Periodic quorum evaluator
    let engine = QuorumEngine::new(
        state,
        history,
        Arc::new(LoggingExecutor),
        Arc::new(LogPublisher),
        metrics,
        EngineSettings {
            quorum: config.quorum.threshold,
            topic: config.broadcast.topic.clone(),
            node_id: config.broadcast.node_id.clone(),
            interval: Duration::from_secs(config.quorum.interval_secs),
            dry_run: config.quorum.dry_run,
        },
    );
    let evaluator_shutdown = shutdown_rx.clone();
    let evaluator = tokio::spawn(async move { engine.run(evaluator_shutdown).await });
    health_checker.update_component("evaluator", true).await;

    // Graceful shutdown on ctrl-c or when the event stream ends.
    let stream_ended = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, cleaning up...");
            false
        }
        _ = &mut ingestion => {
            tracing::info!("Event stream ended");
            true
        }
    };

    let _ = shutdown_tx.send(true);
    if !stream_ended {
        let _ = ingestion.await;
    }
    let _ = evaluator.await;

    tracing::info!("HyperQube Quorum Daemon shutting down cleanly");
    Ok(())
}

async fn start_health_server(health_checker: HealthChecker, port: u16) {
    use warp::Filter;

    let health = warp::path("health")
        .and(warp::any().map(move || health_checker.clone()))
        .and_then(|checker: HealthChecker| async move {
            let status = checker.get_status().await;
            Ok::<_, warp::Rejection>(warp::reply::json(&status))
        });

    warp::serve(health).run(([0, 0, 0, 0], port)).await;
}
