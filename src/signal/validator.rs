use semver::Version;
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use super::types::{ActionKind, RawEvent, Signal, SignerId};

/// Why a broadcast event was refused entry into the ledger. None of these is
/// an error to the caller; rejected events are dropped and logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("wrong topic: {0}")]
    WrongTopic(String),
    #[error("signer not in trusted set: {0}")]
    UntrustedSigner(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid semantic version: {0}")]
    InvalidVersion(String),
    #[error("unknown action type: {0}")]
    UnknownActionType(String),
    #[error("invalid genesis reference: {0}")]
    InvalidGenesis(String),
    #[error("invalid deadline: {0}")]
    InvalidDeadline(String),
    #[error("wrong network scope: {0}")]
    WrongNetwork(String),
}

/// The slice of daemon config the validator needs.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub topic: String,
    pub network: String,
    pub trusted_signers: HashSet<String>,
}

/// Convert an untrusted broadcast event into a validated `Signal`, or reject
/// it. Pure: no logging, no state, callers decide what to do with rejects.
pub fn validate(event: &RawEvent, config: &ValidatorConfig) -> Result<Signal, RejectReason> {
    if event.topic != config.topic {
        return Err(RejectReason::WrongTopic(event.topic.clone()));
    }

    if !config.trusted_signers.contains(&event.signer) {
        return Err(RejectReason::UntrustedSigner(event.signer.clone()));
    }

    let version_raw = event
        .field("version")
        .ok_or(RejectReason::MissingField("version"))?;
    let binary_hash = event
        .field("binaryHash")
        .ok_or(RejectReason::MissingField("binaryHash"))?;
    let network = event
        .field("networkScope")
        .ok_or(RejectReason::MissingField("networkScope"))?;
    let action_type = event
        .field("actionType")
        .ok_or(RejectReason::MissingField("actionType"))?;

    if network != config.network {
        return Err(RejectReason::WrongNetwork(network.to_string()));
    }

    // Semver requires a bare version; signers broadcast with a leading "v".
    let version = Version::parse(version_raw.trim_start_matches('v'))
        .map_err(|_| RejectReason::InvalidVersion(version_raw.to_string()))?;

    let kind = match action_type {
        "upgrade" => ActionKind::Upgrade,
        "reboot" => {
            let genesis_raw = event
                .field("genesisReference")
                .ok_or(RejectReason::MissingField("genesisReference"))?;
            let genesis = Url::parse(genesis_raw)
                .map_err(|_| RejectReason::InvalidGenesis(genesis_raw.to_string()))?;

            let deadline = match event.field("deadline") {
                Some(raw) => Some(
                    raw.parse::<i64>()
                        .map_err(|_| RejectReason::InvalidDeadline(raw.to_string()))?,
                ),
                None => None,
            };

            ActionKind::Reboot { genesis, deadline }
        }
        other => return Err(RejectReason::UnknownActionType(other.to_string())),
    };

    Ok(Signal {
        signer: SignerId(event.signer.clone()),
        observed_at: event.observed_at,
        kind,
        version,
        version_raw: version_raw.to_string(),
        binary_hash: binary_hash.to_string(),
        network: network.to_string(),
    })
}
