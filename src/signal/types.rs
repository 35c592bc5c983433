use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use url::Url;

/// Opaque authenticated identity of a trusted signer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignerId(pub String);

impl SignerId {
    /// Shortened form for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for SignerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a signal asks the network to do. Reboot carries its payload here
/// rather than as loose optional fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Upgrade,
    Reboot {
        genesis: Url,
        deadline: Option<i64>,
    },
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Upgrade => "upgrade",
            ActionKind::Reboot { .. } => "reboot",
        }
    }

    pub fn genesis(&self) -> Option<&Url> {
        match self {
            ActionKind::Upgrade => None,
            ActionKind::Reboot { genesis, .. } => Some(genesis),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deterministic identity of a proposed action: `upgrade:<version>` or
/// `reboot:<version>:<genesis>`. The version component keeps the broadcast
/// spelling so that `v1.5.0` and `1.5.0` remain distinct proposals, matching
/// how signers key their campaigns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionKey(String);

impl ActionKey {
    pub fn new(kind: &ActionKind, version_raw: &str) -> Self {
        match kind {
            ActionKind::Upgrade => ActionKey(format!("upgrade:{}", version_raw)),
            ActionKind::Reboot { genesis, .. } => {
                ActionKey(format!("reboot:{}:{}", version_raw, genesis))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated broadcast proposal from one trusted signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub signer: SignerId,
    /// Broadcast creation time, monotonic per signer.
    pub observed_at: i64,
    pub kind: ActionKind,
    pub version: Version,
    /// Version exactly as broadcast (keys and acknowledgements use this).
    pub version_raw: String,
    pub binary_hash: String,
    pub network: String,
}

impl Signal {
    pub fn action_key(&self) -> ActionKey {
        ActionKey::new(&self.kind, &self.version_raw)
    }
}

/// First-seen description of a proposed action. Immutable once registered;
/// later signals for the same key never overwrite it.
#[derive(Debug, Clone)]
pub struct CandidateAction {
    pub key: ActionKey,
    pub kind: ActionKind,
    pub version: Version,
    pub version_raw: String,
    pub binary_hash: String,
    pub network: String,
    /// Signer whose signal first registered this action; acknowledgements
    /// are addressed back to it.
    pub origin_signer: SignerId,
}

impl CandidateAction {
    pub fn from_signal(signal: &Signal) -> Self {
        Self {
            key: signal.action_key(),
            kind: signal.kind.clone(),
            version: signal.version.clone(),
            version_raw: signal.version_raw.clone(),
            binary_hash: signal.binary_hash.clone(),
            network: signal.network.clone(),
            origin_signer: signal.signer.clone(),
        }
    }
}

/// Untrusted broadcast event as handed over by the transport boundary. The
/// transport has already verified cryptographic authenticity and exposes the
/// signer identity, creation time, topic and the raw field map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub signer: String,
    #[serde(rename = "observedAt")]
    pub observed_at: i64,
    pub topic: String,
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

impl RawEvent {
    /// First non-empty value for the field, if any.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|v| v.as_str()).filter(|v| !v.is_empty())
    }
}
