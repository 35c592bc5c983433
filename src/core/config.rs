use anyhow::{bail, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

use crate::signal::ValidatorConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub quorum: QuorumConfig,
    pub broadcast: BroadcastConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuorumConfig {
    /// Distinct trusted signers required before an action executes.
    pub threshold: usize,
    /// Seconds between evaluator ticks.
    pub interval_secs: u64,
    /// Log selections without executing or persisting anything.
    pub dry_run: bool,
    pub history_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    pub topic: String,
    pub network: String,
    pub node_id: String,
    /// Allow-list of signer identities whose signals count.
    pub trusted_signers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub health_port: u16,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let config_dir = env::var("CONFIG_DIR").map(PathBuf::from).unwrap_or_else(|_| {
            let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".hyperqube-quorum")
        });

        let trusted_signers: Vec<String> = env::var("TRUSTED_SIGNERS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let config = Config {
            quorum: QuorumConfig {
                threshold: env::var("QUORUM_THRESHOLD")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .unwrap_or(3),
                interval_secs: env::var("EVALUATOR_INTERVAL_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .unwrap_or(60),
                dry_run: env::var("DRY_RUN")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()
                    .unwrap_or(false),
                history_path: env::var("HISTORY_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| config_dir.join("history.json")),
            },
            broadcast: BroadcastConfig {
                topic: env::var("TOPIC").unwrap_or_else(|_| "hyperqube".to_string()),
                network: env::var("NETWORK_SCOPE").unwrap_or_else(|_| "hqz".to_string()),
                node_id: env::var("NODE_ID").unwrap_or_else(|_| generate_node_id()),
                trusted_signers,
            },
            monitoring: MonitoringConfig {
                health_port: env::var("HEALTH_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Startup-fatal checks. Everything past this point must tolerate
    /// runtime failures; a bad quorum configuration must not.
    pub fn validate(&self) -> Result<()> {
        if self.quorum.threshold < 1 {
            bail!("quorum threshold must be >= 1");
        }
        if self.broadcast.trusted_signers.is_empty() {
            bail!("TRUSTED_SIGNERS must list at least one signer identity");
        }
        if self.quorum.threshold > self.broadcast.trusted_signers.len() {
            bail!(
                "quorum threshold {} exceeds the {} configured trusted signer(s)",
                self.quorum.threshold,
                self.broadcast.trusted_signers.len()
            );
        }
        if self.quorum.interval_secs == 0 {
            bail!("evaluator interval must be >= 1 second");
        }
        Ok(())
    }

    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            topic: self.broadcast.topic.clone(),
            network: self.broadcast.network.clone(),
            trusted_signers: self
                .broadcast
                .trusted_signers
                .iter()
                .cloned()
                .collect::<HashSet<_>>(),
        }
    }
}

fn generate_node_id() -> String {
    format!("node-{}", uuid::Uuid::new_v4())
}
