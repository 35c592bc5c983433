use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::execution::ExecutionRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Success,
    Failure,
}

/// Status broadcast published after an execution attempt, addressed back to
/// the signer whose signal first registered the action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub topic: String,
    #[serde(rename = "originSigner")]
    pub origin_signer: String,
    pub version: String,
    #[serde(rename = "networkScope")]
    pub network: String,
    #[serde(rename = "actionType")]
    pub action: String,
    pub status: AckStatus,
    #[serde(rename = "nodeIdentity")]
    pub node_id: String,
    #[serde(rename = "executedAt")]
    pub executed_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Human-readable summary line.
    pub content: String,
}

impl Acknowledgement {
    pub fn success(request: &ExecutionRequest, topic: &str, node_id: &str) -> Self {
        Self::build(request, topic, node_id, AckStatus::Success, None)
    }

    pub fn failure(request: &ExecutionRequest, topic: &str, node_id: &str, error: String) -> Self {
        Self::build(request, topic, node_id, AckStatus::Failure, Some(error))
    }

    fn build(
        request: &ExecutionRequest,
        topic: &str,
        node_id: &str,
        status: AckStatus,
        error: Option<String>,
    ) -> Self {
        let content = match status {
            AckStatus::Success => format!(
                "[quorum-daemon] The {} to version {} has been successful on node {}.",
                request.kind, request.version_raw, node_id
            ),
            AckStatus::Failure => format!(
                "[quorum-daemon] The {} to version {} has failed on node {}.",
                request.kind, request.version_raw, node_id
            ),
        };

        Self {
            topic: topic.to_string(),
            origin_signer: request.origin_signer.0.clone(),
            version: request.version_raw.clone(),
            network: request.network.clone(),
            action: request.kind.as_str().to_string(),
            status,
            node_id: node_id.to_string(),
            executed_at: Utc::now().timestamp(),
            error,
            content,
        }
    }
}

/// Boundary that publishes acknowledgements to the broadcast medium. A
/// publish failure never touches ledger state; the engine only logs it.
#[async_trait]
pub trait AckPublisher: Send + Sync {
    async fn publish(&self, ack: &Acknowledgement) -> Result<()>;
}

/// Default publisher: emits the acknowledgement as a structured log line.
pub struct LogPublisher;

#[async_trait]
impl AckPublisher for LogPublisher {
    async fn publish(&self, ack: &Acknowledgement) -> Result<()> {
        info!(
            "📣 Acknowledgement: {}",
            serde_json::to_string(ack).unwrap_or_else(|_| ack.content.clone())
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{ActionKey, ActionKind, SignerId};
    use semver::Version;

    fn request() -> ExecutionRequest {
        ExecutionRequest {
            key: ActionKey::new(&ActionKind::Upgrade, "v1.0.0"),
            kind: ActionKind::Upgrade,
            version: Version::new(1, 0, 0),
            version_raw: "v1.0.0".to_string(),
            binary_hash: "ab".repeat(32),
            network: "hqz".to_string(),
            origin_signer: SignerId("origin".to_string()),
        }
    }

    #[test]
    fn test_success_ack_shape() {
        let ack = Acknowledgement::success(&request(), "hyperqube", "node-1");
        assert_eq!(ack.status, AckStatus::Success);
        assert_eq!(ack.origin_signer, "origin");
        assert_eq!(ack.version, "v1.0.0");
        assert!(ack.error.is_none());
        assert!(ack.content.contains("successful"));

        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["actionType"], "upgrade");
        assert_eq!(json["nodeIdentity"], "node-1");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_ack_carries_error() {
        let ack = Acknowledgement::failure(
            &request(),
            "hyperqube",
            "node-1",
            "download timed out".to_string(),
        );
        assert_eq!(ack.status, AckStatus::Failure);
        assert_eq!(ack.error.as_deref(), Some("download timed out"));

        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["error"], "download timed out");
    }
}
