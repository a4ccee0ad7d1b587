use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_TRUST_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;

/// Gate behaviour knobs. Every field has a default, so an empty JSON object
/// is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Automatic retries of a transient parameter fetch before surfacing an
    /// error.
    pub max_auto_retries: u32,
    /// Fixed delay before an automatic retry.
    pub retry_delay_ms: u64,
    /// How long a cached key stays usable without a fresh ceremony. `None`
    /// keeps it until logout.
    pub trust_window_secs: Option<u64>,
    /// Where the setup screen should send the user.
    pub setup_path: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_auto_retries: 1,
            retry_delay_ms: 500,
            trust_window_secs: Some(DEFAULT_TRUST_WINDOW_SECS),
            setup_path: "/settings/encryption".to_string(),
        }
    }
}

impl GateConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn trust_window(&self) -> Option<Duration> {
        self.trust_window_secs.map(Duration::from_secs)
    }
}
