use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::metrics::DaemonMetrics;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentHealth,
    pub metrics: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub ingestion: bool,
    pub evaluator: bool,
    pub history: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, bool>,
}

#[derive(Clone)]
pub struct HealthChecker {
    start_time: std::time::Instant,
    status: Arc<RwLock<ComponentHealth>>,
    metrics: Arc<DaemonMetrics>,
}

impl HealthChecker {
    pub fn new(metrics: Arc<DaemonMetrics>) -> Self {
        Self {
            start_time: std::time::Instant::now(),
            status: Arc::new(RwLock::new(ComponentHealth {
                ingestion: false,
                evaluator: false,
                history: false,
                extra: HashMap::new(),
            })),
            metrics,
        }
    }

    pub async fn get_status(&self) -> HealthStatus {
        let components = self.status.read().await.clone();

        HealthStatus {
            status: if components.ingestion && components.evaluator {
                "healthy".to_string()
            } else {
                "degraded".to_string()
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
            metrics: self.metrics.snapshot(),
        }
    }

    pub async fn update_component(&self, component: &str, healthy: bool) {
        let mut status = self.status.write().await;
        match component {
            "ingestion" => status.ingestion = healthy,
            "evaluator" => status.evaluator = healthy,
            "history" => status.history = healthy,
            _ => {
                status.extra.insert(component.to_string(), healthy);
            }
        }
    }
}
