use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, info, warn};

use crate::core::DaemonMetrics;
use crate::quorum::{QuorumState, RecordOutcome};
use crate::signal::{validate, RawEvent, RejectReason, ValidatorConfig};

/// One connected broadcast source. Real relay transports live outside this
/// crate and implement this; `recv` returning `None` means the source is
/// exhausted and its ingestion task exits.
#[async_trait]
pub trait EventSource: Send {
    async fn recv(&mut self) -> Option<RawEvent>;
}

/// Source backed by an in-process channel. Used by embedders and tests to
/// feed events directly.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<RawEvent>,
}

impl ChannelSource {
    pub fn new() -> (mpsc::UnboundedSender<RawEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn recv(&mut self) -> Option<RawEvent> {
        self.rx.recv().await
    }
}

/// Source reading newline-delimited JSON `RawEvent`s from stdin. Gives the
/// daemon a working local transport; lines that fail to parse are logged
/// and skipped.
pub struct StdinSource {
    lines: tokio::io::Lines<BufReader<tokio::io::Stdin>>,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSource for StdinSource {
    async fn recv(&mut self) -> Option<RawEvent> {
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<RawEvent>(line) {
                        Ok(event) => return Some(event),
                        Err(e) => {
                            warn!("Skipping malformed event line: {}", e);
                            continue;
                        }
                    }
                }
                Ok(None) => return None,
                Err(e) => {
                    warn!("Error reading event stream: {}", e);
                    return None;
                }
            }
        }
    }
}

/// Consume one source until it ends or shutdown is signalled. Validation is
/// done outside the lock; the write lock is held only for the single
/// `record_vote` call, so a slow source never stalls the evaluator or its
/// sibling sources.
pub async fn run_ingestion<S: EventSource>(
    name: String,
    mut source: S,
    validator_config: ValidatorConfig,
    state: Arc<RwLock<QuorumState>>,
    metrics: Arc<DaemonMetrics>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("📡 Ingestion started for source: {}", name);

    loop {
        let event = tokio::select! {
            event = source.recv() => event,
            _ = shutdown.changed() => {
                info!("Ingestion for {} shutting down", name);
                return;
            }
        };

        let Some(event) = event else {
            info!("Event stream ended for source: {}", name);
            return;
        };

        metrics.increment_events_received();

        let signal = match validate(&event, &validator_config) {
            Ok(signal) => signal,
            Err(RejectReason::WrongTopic(topic)) => {
                debug!("Skipping event with wrong topic: {}", topic);
                metrics.increment_events_rejected();
                continue;
            }
            Err(reason) => {
                debug!("Rejected event from {}: {}", event.signer, reason);
                metrics.increment_events_rejected();
                continue;
            }
        };

        let outcome = {
            let mut state = state.write().await;
            state.record_vote(&signal)
        };

        match outcome {
            RecordOutcome::Stale => {
                debug!(
                    "Ignoring stale signal from {} (observed_at {})",
                    signal.signer.short(),
                    signal.observed_at
                );
                metrics.increment_signals_stale();
            }
            RecordOutcome::Voted {
                key,
                superseded,
                vote_count,
            } => {
                if let Some(old_key) = superseded {
                    info!(
                        "Cleared vote from {} for old action {} (superseded by newer signal)",
                        signal.signer.short(),
                        old_key
                    );
                    metrics.increment_signals_superseded();
                }
                info!(
                    "✅ Recorded {} signal: version={} network={} signer={} ({} vote(s) for {})",
                    signal.kind,
                    signal.version_raw,
                    signal.network,
                    signal.signer.short(),
                    vote_count,
                    key
                );
                metrics.increment_votes_recorded();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn validator_config() -> ValidatorConfig {
        ValidatorConfig {
            topic: "hyperqube".to_string(),
            network: "hqz".to_string(),
            trusted_signers: ["s1", "s2", "s3"].iter().map(|s| s.to_string()).collect(),
        }
    }

    fn upgrade_event(signer: &str, version: &str, observed_at: i64) -> RawEvent {
        let mut fields = HashMap::new();
        fields.insert("version".to_string(), version.to_string());
        fields.insert("binaryHash".to_string(), "ab".repeat(32));
        fields.insert("networkScope".to_string(), "hqz".to_string());
        fields.insert("actionType".to_string(), "upgrade".to_string());
        RawEvent {
            signer: signer.to_string(),
            observed_at,
            topic: "hyperqube".to_string(),
            fields,
        }
    }

    #[tokio::test]
    async fn test_ingestion_records_valid_votes() {
        let state = Arc::new(RwLock::new(QuorumState::new()));
        let metrics = Arc::new(DaemonMetrics::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let (tx, source) = ChannelSource::new();
        tx.send(upgrade_event("s1", "v1.0.0", 1)).unwrap();
        tx.send(upgrade_event("s2", "v1.0.0", 2)).unwrap();
        // Untrusted signer, must be dropped.
        tx.send(upgrade_event("mallory", "v1.0.0", 3)).unwrap();
        drop(tx);

        run_ingestion(
            "test".to_string(),
            source,
            validator_config(),
            state.clone(),
            metrics.clone(),
            shutdown_rx,
        )
        .await;
        drop(shutdown_tx);

        let state = state.read().await;
        let key = crate::signal::ActionKey::new(&crate::signal::ActionKind::Upgrade, "v1.0.0");
        assert_eq!(state.vote_count(&key), 2);
        assert_eq!(metrics.events_received(), 3);
        assert_eq!(metrics.events_rejected(), 1);
        assert_eq!(metrics.votes_recorded(), 2);
    }

    #[tokio::test]
    async fn test_ingestion_stops_on_shutdown() {
        let state = Arc::new(RwLock::new(QuorumState::new()));
        let metrics = Arc::new(DaemonMetrics::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let (_tx, source) = ChannelSource::new();
        let handle = tokio::spawn(run_ingestion(
            "test".to_string(),
            source,
            validator_config(),
            state,
            metrics,
            shutdown_rx,
        ));

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
