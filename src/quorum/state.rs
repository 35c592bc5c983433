use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::history::HistoryStore;
use crate::signal::{ActionKey, CandidateAction, Signal, SignerId};

/// What `record_vote` did with a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Older than (or equal to) the signer's last-known signal; dropped
    /// without touching any map.
    Stale,
    Voted {
        key: ActionKey,
        /// Key the signer's previous vote was removed from, if any.
        superseded: Option<ActionKey>,
        vote_count: usize,
    },
}

/// Action Registry, Vote Ledger and latest-signal index as one logical unit.
/// Every method that touches more than one map assumes the caller holds the
/// single lock around the whole struct; supersession moves a vote between
/// keys and must never be observed half-done.
#[derive(Debug, Default)]
pub struct QuorumState {
    /// First-seen description per action key. Never overwritten.
    actions: HashMap<ActionKey, CandidateAction>,
    /// Distinct signers currently endorsing each key.
    votes: HashMap<ActionKey, HashSet<SignerId>>,
    /// Each signer's most recent signal: (observed_at, key it voted for).
    latest: HashMap<SignerId, (i64, ActionKey)>,
}

impl QuorumState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a validated signal into the ledger. Only each signer's most
    /// recent signal counts: a newer signal clears the signer's previous
    /// vote, an older or equal-timestamp one is dropped (first-seen wins
    /// ties, so replayed duplicates are no-ops).
    pub fn record_vote(&mut self, signal: &Signal) -> RecordOutcome {
        let key = signal.action_key();

        let mut superseded = None;
        if let Some((prev_at, prev_key)) = self.latest.get(&signal.signer) {
            if signal.observed_at <= *prev_at {
                return RecordOutcome::Stale;
            }
            if *prev_key != key {
                if let Some(old_votes) = self.votes.get_mut(prev_key) {
                    old_votes.remove(&signal.signer);
                }
                superseded = Some(prev_key.clone());
            }
        }

        self.actions
            .entry(key.clone())
            .or_insert_with(|| CandidateAction::from_signal(signal));

        let voters = self.votes.entry(key.clone()).or_default();
        voters.insert(signal.signer.clone());
        let vote_count = voters.len();

        self.latest
            .insert(signal.signer.clone(), (signal.observed_at, key.clone()));

        RecordOutcome::Voted {
            key,
            superseded,
            vote_count,
        }
    }

    /// Select at most one winning action: skip keys already executed, skip
    /// keys below quorum, then take the strictly greatest semantic version.
    /// Equal versions (possible across reboot genesis references) break to
    /// the lexically smallest key so every node picks the same winner.
    /// Read-only; the caller decides what to do with the selection.
    pub fn evaluate(&self, history: &HistoryStore, quorum: usize) -> Option<CandidateAction> {
        let mut winner: Option<&CandidateAction> = None;

        for (key, action) in &self.actions {
            if history.has(key) {
                continue;
            }

            let vote_count = self.vote_count(key);
            if vote_count < quorum {
                debug!(
                    "Action {} has {}/{} votes (below quorum)",
                    key, vote_count, quorum
                );
                continue;
            }

            winner = match winner {
                None => Some(action),
                Some(best) => {
                    if action.version > best.version
                        || (action.version == best.version && action.key < best.key)
                    {
                        Some(action)
                    } else {
                        Some(best)
                    }
                }
            };
        }

        winner.cloned()
    }

    pub fn vote_count(&self, key: &ActionKey) -> usize {
        self.votes.get(key).map(|v| v.len()).unwrap_or(0)
    }

    pub fn voters(&self, key: &ActionKey) -> Vec<SignerId> {
        self.votes
            .get(key)
            .map(|v| v.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop an executed action's vote set so it stops accumulating memory.
    /// Its key stays in the registry; history membership keeps it out of
    /// future evaluations.
    pub fn clear_votes(&mut self, key: &ActionKey) {
        self.votes.remove(key);
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{ActionKind, SignerId};
    use semver::Version;
    use url::Url;

    fn upgrade_signal(signer: &str, version: &str, observed_at: i64) -> Signal {
        Signal {
            signer: SignerId(signer.to_string()),
            observed_at,
            kind: ActionKind::Upgrade,
            version: Version::parse(version.trim_start_matches('v')).unwrap(),
            version_raw: version.to_string(),
            binary_hash: "ab".repeat(32),
            network: "hqz".to_string(),
        }
    }

    fn reboot_signal(signer: &str, version: &str, genesis: &str, observed_at: i64) -> Signal {
        Signal {
            kind: ActionKind::Reboot {
                genesis: Url::parse(genesis).unwrap(),
                deadline: None,
            },
            ..upgrade_signal(signer, version, observed_at)
        }
    }

    fn empty_history() -> HistoryStore {
        HistoryStore::in_memory()
    }

    #[test]
    fn test_vote_accumulation() {
        let mut state = QuorumState::new();
        let key = upgrade_signal("s1", "v1.0.0", 1).action_key();

        state.record_vote(&upgrade_signal("s1", "v1.0.0", 1));
        state.record_vote(&upgrade_signal("s2", "v1.0.0", 2));
        state.record_vote(&upgrade_signal("s3", "v1.0.0", 3));

        assert_eq!(state.vote_count(&key), 3);
        assert_eq!(state.action_count(), 1);
    }

    #[test]
    fn test_supersession_moves_vote() {
        let mut state = QuorumState::new();
        let a = upgrade_signal("s1", "v1.0.0", 100);
        let b = upgrade_signal("s1", "v2.0.0", 200);

        state.record_vote(&a);
        let outcome = state.record_vote(&b);

        assert_eq!(state.vote_count(&a.action_key()), 0);
        assert_eq!(state.vote_count(&b.action_key()), 1);
        assert_eq!(
            outcome,
            RecordOutcome::Voted {
                key: b.action_key(),
                superseded: Some(a.action_key()),
                vote_count: 1,
            }
        );
    }

    #[test]
    fn test_stale_signal_has_no_effect() {
        let mut state = QuorumState::new();
        state.record_vote(&upgrade_signal("s1", "v2.0.0", 200));

        // Out-of-order delivery of an older signal.
        let outcome = state.record_vote(&upgrade_signal("s1", "v1.0.0", 100));
        assert_eq!(outcome, RecordOutcome::Stale);
        assert_eq!(
            state.vote_count(&upgrade_signal("s1", "v2.0.0", 0).action_key()),
            1
        );
        assert_eq!(
            state.vote_count(&upgrade_signal("s1", "v1.0.0", 0).action_key()),
            0
        );
    }

    #[test]
    fn test_equal_timestamp_is_stale() {
        let mut state = QuorumState::new();
        state.record_vote(&upgrade_signal("s1", "v1.0.0", 100));

        // Same timestamp, different action: first-seen wins.
        let outcome = state.record_vote(&upgrade_signal("s1", "v2.0.0", 100));
        assert_eq!(outcome, RecordOutcome::Stale);
        assert_eq!(
            state.vote_count(&upgrade_signal("s1", "v1.0.0", 0).action_key()),
            1
        );
    }

    #[test]
    fn test_duplicate_same_key_keeps_single_vote() {
        let mut state = QuorumState::new();
        let key = upgrade_signal("s1", "v1.0.0", 0).action_key();

        state.record_vote(&upgrade_signal("s1", "v1.0.0", 100));
        // Replay at the same timestamp is stale, a newer one is a refresh.
        state.record_vote(&upgrade_signal("s1", "v1.0.0", 100));
        state.record_vote(&upgrade_signal("s1", "v1.0.0", 150));

        assert_eq!(state.vote_count(&key), 1);
    }

    #[test]
    fn test_candidate_is_first_writer_wins() {
        let mut state = QuorumState::new();
        let mut first = upgrade_signal("s1", "v1.0.0", 1);
        first.binary_hash = "11".repeat(32);
        let mut second = upgrade_signal("s2", "v1.0.0", 2);
        second.binary_hash = "22".repeat(32);

        state.record_vote(&first);
        state.record_vote(&second);

        let winner = state.evaluate(&empty_history(), 2).unwrap();
        assert_eq!(winner.binary_hash, "11".repeat(32));
        assert_eq!(winner.origin_signer, SignerId("s1".to_string()));
    }

    #[test]
    fn test_evaluate_below_quorum_selects_nothing() {
        let mut state = QuorumState::new();
        state.record_vote(&upgrade_signal("s1", "v1.0.0", 1));
        state.record_vote(&upgrade_signal("s2", "v1.0.0", 2));

        assert!(state.evaluate(&empty_history(), 3).is_none());
    }

    #[test]
    fn test_evaluate_picks_highest_version() {
        let mut state = QuorumState::new();
        state.record_vote(&upgrade_signal("s1", "v1.0.0", 1));
        state.record_vote(&upgrade_signal("s2", "v1.0.0", 1));
        state.record_vote(&upgrade_signal("s3", "v2.0.0", 1));
        state.record_vote(&upgrade_signal("s4", "v2.0.0", 1));

        let winner = state.evaluate(&empty_history(), 2).unwrap();
        assert_eq!(winner.version_raw, "v2.0.0");
    }

    #[test]
    fn test_evaluate_skips_history() {
        let mut state = QuorumState::new();
        state.record_vote(&upgrade_signal("s1", "v1.0.0", 1));
        state.record_vote(&upgrade_signal("s2", "v1.0.0", 1));

        let mut history = empty_history();
        history.add(&upgrade_signal("s1", "v1.0.0", 0).action_key());

        assert!(state.evaluate(&history, 2).is_none());
    }

    #[test]
    fn test_equal_version_tie_breaks_to_smallest_key() {
        let mut state = QuorumState::new();
        // Two reboot campaigns for the same version, different genesis refs.
        for (signer, t) in [("s1", 1), ("s2", 2)] {
            state.record_vote(&reboot_signal(
                signer,
                "v3.0.0",
                "https://b.example.com/genesis.json",
                t,
            ));
        }
        for (signer, t) in [("s3", 3), ("s4", 4)] {
            state.record_vote(&reboot_signal(
                signer,
                "v3.0.0",
                "https://a.example.com/genesis.json",
                t,
            ));
        }

        let winner = state.evaluate(&empty_history(), 2).unwrap();
        assert_eq!(
            winner.key.as_str(),
            "reboot:v3.0.0:https://a.example.com/genesis.json"
        );
    }

    #[test]
    fn test_clear_votes() {
        let mut state = QuorumState::new();
        let key = upgrade_signal("s1", "v1.0.0", 0).action_key();
        state.record_vote(&upgrade_signal("s1", "v1.0.0", 1));
        state.record_vote(&upgrade_signal("s2", "v1.0.0", 2));

        state.clear_votes(&key);
        assert_eq!(state.vote_count(&key), 0);
        // The registry entry survives; only the vote set is released.
        assert_eq!(state.action_count(), 1);
    }
}
