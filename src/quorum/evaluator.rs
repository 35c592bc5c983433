use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

use crate::broadcast::{AckPublisher, Acknowledgement};
use crate::core::DaemonMetrics;
use crate::execution::{ExecutionRequest, Executor};
use crate::history::HistoryStore;
use crate::signal::ActionKey;

use super::state::QuorumState;

/// Engine knobs taken from daemon config.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub quorum: usize,
    pub topic: String,
    pub node_id: String,
    pub interval: Duration,
    pub dry_run: bool,
}

/// Periodic evaluator: every tick, selects at most one winning action and
/// drives it through execution, durable history commit, vote clearing and
/// acknowledgement, in that order.
pub struct QuorumEngine {
    state: Arc<RwLock<QuorumState>>,
    history: Arc<RwLock<HistoryStore>>,
    executor: Arc<dyn Executor>,
    publisher: Arc<dyn AckPublisher>,
    metrics: Arc<DaemonMetrics>,
    settings: EngineSettings,
}

impl QuorumEngine {
    pub fn new(
        state: Arc<RwLock<QuorumState>>,
        history: Arc<RwLock<HistoryStore>>,
        executor: Arc<dyn Executor>,
        publisher: Arc<dyn AckPublisher>,
        metrics: Arc<DaemonMetrics>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            state,
            history,
            executor,
            publisher,
            metrics,
            settings,
        }
    }

    /// Tick loop. Shutdown is honored only between cycles so a cycle is
    /// never left with history committed but votes uncleared, or vice versa.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "⏱️  Quorum evaluator started (interval: {:?}, quorum: {})",
            self.settings.interval, self.settings.quorum
        );

        let mut interval = tokio::time::interval(self.settings.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so votes can accumulate.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    debug!("Running periodic quorum check...");
                    self.run_cycle().await;
                }
                _ = shutdown.changed() => {
                    info!("Quorum evaluator shutting down");
                    return;
                }
            }
        }
    }

    /// One evaluation cycle. Returns the key that was executed and durably
    /// committed, if any. Failures are logged and surfaced as failure
    /// acknowledgements; the key stays out of history so the next tick
    /// retries while the signer set still endorses it.
    pub async fn run_cycle(&self) -> Option<ActionKey> {
        // Selection runs under the same exclusion domain as record_vote.
        // The winner is cloned out so the lock is not held across the
        // executor boundary.
        let winner = {
            let state = self.state.read().await;
            let history = self.history.read().await;
            state.evaluate(&history, self.settings.quorum)
        }?;

        let vote_count = self.state.read().await.vote_count(&winner.key);
        info!(
            "🎯 Selected action {} with version {} and {} votes",
            winner.key, winner.version_raw, vote_count
        );

        if self.settings.dry_run {
            info!("Dry run - not executing or saving action to history.");
            return None;
        }

        let request = ExecutionRequest::from_candidate(&winner);

        if let Err(e) = self.executor.execute(&request).await {
            error!("Execution of {} failed: {:#}", winner.key, e);
            self.metrics.increment_execution_failures();
            let ack = Acknowledgement::failure(
                &request,
                &self.settings.topic,
                &self.settings.node_id,
                format!("{:#}", e),
            );
            self.publish_ack(&ack).await;
            return None;
        }

        // Durable history write gates completion: if it fails, votes stay
        // so the action is re-evaluated, at the cost of re-executing after
        // the failure.
        {
            let mut history = self.history.write().await;
            history.add(&winner.key);
            if let Err(e) = history.save() {
                history.remove(&winner.key);
                error!(
                    "Failed to persist history for {} ({}); votes retained for retry",
                    winner.key, e
                );
                return None;
            }
        }
        info!("Action {} saved to history", winner.key);

        self.state.write().await.clear_votes(&winner.key);
        self.metrics.increment_actions_executed();

        let ack = Acknowledgement::success(&request, &self.settings.topic, &self.settings.node_id);
        self.publish_ack(&ack).await;

        Some(winner.key)
    }

    async fn publish_ack(&self, ack: &Acknowledgement) {
        if let Err(e) = self.publisher.publish(ack).await {
            warn!("Acknowledgement publish failed: {:#}", e);
        }
    }
}
