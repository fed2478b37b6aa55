use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_schema_version() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigIntervals {
    pub poll_ms: u64,
    pub min_poll_ms: u64,
}

impl Default for ConfigIntervals {
    fn default() -> Self {
        Self {
            poll_ms: 200,
            min_poll_ms: 50,
        }
    }
}

impl ConfigIntervals {
    /// Listen cadence, never below the configured floor.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms.max(self.min_poll_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub log_level: String,
    pub intervals: ConfigIntervals,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            log_level: "warn".to_string(),
            intervals: ConfigIntervals::default(),
        }
    }
}
