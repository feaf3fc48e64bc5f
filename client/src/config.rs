//! Client configuration, loaded from JSON.
//!
//! ```json
//! {
//!   "contract": "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
//!   "submission_timeout_ms": 30000,
//!   "confirmation_timeout_ms": 120000,
//!   "poll_interval_ms": 1000
//! }
//! ```

use std::{path::Path, time::Duration};

use confidential_nft_primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_SUBMISSION_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_CONFIRMATION_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("contract address must not be zero")]
    ZeroContract,
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("poll interval {poll_ms}ms exceeds confirmation timeout {timeout_ms}ms")]
    PollExceedsTimeout { poll_ms: u64, timeout_ms: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Collectible contract every batch is bound to.
    pub contract: Address,
    #[serde(default = "default_submission_timeout_ms")]
    pub submission_timeout_ms: u64,
    #[serde(default = "default_confirmation_timeout_ms")]
    pub confirmation_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_submission_timeout_ms() -> u64 {
    DEFAULT_SUBMISSION_TIMEOUT_MS
}

fn default_confirmation_timeout_ms() -> u64 {
    DEFAULT_CONFIRMATION_TIMEOUT_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl ClientConfig {
    /// Defaults for everything but the contract.
    pub fn new(contract: Address) -> Self {
        ClientConfig {
            contract,
            submission_timeout_ms: DEFAULT_SUBMISSION_TIMEOUT_MS,
            confirmation_timeout_ms: DEFAULT_CONFIRMATION_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.contract.is_zero() {
            return Err(ConfigError::ZeroContract);
        }
        for (name, value) in [
            ("submission_timeout_ms", self.submission_timeout_ms),
            ("confirmation_timeout_ms", self.confirmation_timeout_ms),
            ("poll_interval_ms", self.poll_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroDuration(name));
            }
        }
        if self.poll_interval_ms > self.confirmation_timeout_ms {
            return Err(ConfigError::PollExceedsTimeout {
                poll_ms: self.poll_interval_ms,
                timeout_ms: self.confirmation_timeout_ms,
            });
        }
        Ok(())
    }

    pub fn submission_timeout(&self) -> Duration {
        Duration::from_millis(self.submission_timeout_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
