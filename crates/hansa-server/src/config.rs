//! Server configuration

use std::path::Path;
use std::time::Duration;

use hansa_core::WeightSet;
use serde::{Deserialize, Serialize};

/// Server configuration. Every field has a default, so a YAML file only
/// needs the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Spacing between endgame scoring reveals
    pub scoring_delay_ms: u64,
    /// Reveal i is sent at `scoring_delay_ms * (i + scoring_delay_offset)`
    pub scoring_delay_offset: u32,
    /// How long a bot waits before answering
    pub bot_response_delay_ms: u64,
    /// Inbound (client to server) slots per connection; outbound is unbounded
    pub bot_channel_capacity: usize,
    pub client_channel_capacity: usize,
    pub join_channel_capacity: usize,
    /// `tracing_subscriber` env filter
    pub log_filter: String,
    /// Planner weights for every bot; the generic tuning when absent
    pub bot_weights: Option<WeightSet>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            scoring_delay_ms: 500,
            scoring_delay_offset: 10,
            bot_response_delay_ms: 200,
            bot_channel_capacity: 10,
            client_channel_capacity: 100,
            join_channel_capacity: 10,
            log_filter: "hansa_server=info,hansa_core=info".to_string(),
            bot_weights: None,
        }
    }
}

impl ServerConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Delay from the start of scoring until reveal `index`.
    pub fn scoring_delay(&self, index: usize) -> Duration {
        let steps = index as u64 + u64::from(self.scoring_delay_offset);
        Duration::from_millis(self.scoring_delay_ms * steps)
    }

    pub fn bot_response_delay(&self) -> Duration {
        Duration::from_millis(self.bot_response_delay_ms)
    }

    pub fn weights(&self) -> WeightSet {
        self.bot_weights.clone().unwrap_or_default()
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
