//! Runtime configuration for post decryption

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PostError, PostResult};

/// Default delay after appending recipients, giving the recipient store time to settle.
const DEFAULT_RECIPIENT_SETTLE_DELAY_MS: u64 = 1500;

/// Default capacity for the state change broadcast channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default social network the decryption context is tagged with.
const DEFAULT_NETWORK: &str = "twitter.com";

/// Configuration for the decryption orchestrator and presentation layer.
///
/// Every field has a default, so a partial JSON file is accepted:
///
/// ```json
/// { "recipient_settle_delay_ms": 500 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecryptConfig {
    /// Minimum delay before an append-recipients request resolves.
    pub recipient_settle_delay_ms: u64,
    /// Capacity of the state change broadcast channel.
    pub event_channel_capacity: usize,
    /// Active network identifier passed to the decryption service.
    pub network: String,
}

impl Default for DecryptConfig {
    fn default() -> Self {
        Self {
            recipient_settle_delay_ms: DEFAULT_RECIPIENT_SETTLE_DELAY_MS,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            network: DEFAULT_NETWORK.to_string(),
        }
    }
}

impl DecryptConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> PostResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make the orchestrator unusable.
    pub fn validate(&self) -> PostResult<()> {
        if self.event_channel_capacity == 0 {
            return Err(PostError::Config(
                "event_channel_capacity must be greater than zero".to_string(),
            ));
        }
        if self.network.is_empty() {
            return Err(PostError::Config("network cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Settle delay as a [`Duration`]
    pub fn recipient_settle_delay(&self) -> Duration {
        Duration::from_millis(self.recipient_settle_delay_ms)
    }
}
