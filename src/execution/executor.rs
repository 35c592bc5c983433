use anyhow::Result;
use async_trait::async_trait;
use semver::Version;
use tracing::info;

use crate::signal::{ActionKey, ActionKind, CandidateAction, SignerId};

/// Everything the execution boundary needs to perform a selected action.
/// The core's responsibility ends here; download, hash verification and
/// process replacement live behind the `Executor` implementation.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub key: ActionKey,
    pub kind: ActionKind,
    pub version: Version,
    pub version_raw: String,
    pub binary_hash: String,
    pub network: String,
    pub origin_signer: SignerId,
}

impl ExecutionRequest {
    pub fn from_candidate(action: &CandidateAction) -> Self {
        Self {
            key: action.key.clone(),
            kind: action.kind.clone(),
            version: action.version.clone(),
            version_raw: action.version_raw.clone(),
            binary_hash: action.binary_hash.clone(),
            network: action.network.clone(),
            origin_signer: action.origin_signer.clone(),
        }
    }
}

/// Boundary that performs the actual upgrade or reboot. Implementations must
/// apply their own timeouts; the engine never retries a failed call within a
/// cycle, it only surfaces the failure and lets the next tick re-evaluate.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> Result<()>;
}

/// Default executor: logs what would happen. Stands in for the real
/// upgrade/reboot mechanics, which run outside this daemon's core.
pub struct LoggingExecutor;

#[async_trait]
impl Executor for LoggingExecutor {
    async fn execute(&self, request: &ExecutionRequest) -> Result<()> {
        match &request.kind {
            ActionKind::Upgrade => {
                info!("[UPGRADE ACTION] Version: {}", request.version_raw);
            }
            ActionKind::Reboot { genesis, deadline } => {
                info!(
                    "[REBOOT ACTION] Version: {} Genesis: {}{}",
                    request.version_raw,
                    genesis,
                    deadline
                        .map(|d| format!(" Deadline: {}", d))
                        .unwrap_or_default()
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[tokio::test]
    async fn test_logging_executor_succeeds() {
        let request = ExecutionRequest {
            key: ActionKey::new(&ActionKind::Upgrade, "v1.0.0"),
            kind: ActionKind::Upgrade,
            version: Version::new(1, 0, 0),
            version_raw: "v1.0.0".to_string(),
            binary_hash: "ab".repeat(32),
            network: "hqz".to_string(),
            origin_signer: SignerId("s1".to_string()),
        };
        assert!(LoggingExecutor.execute(&request).await.is_ok());

        let reboot = ExecutionRequest {
            kind: ActionKind::Reboot {
                genesis: Url::parse("https://example.com/genesis.json").unwrap(),
                deadline: Some(1735689600),
            },
            ..request
        };
        assert!(LoggingExecutor.execute(&reboot).await.is_ok());
    }
}
