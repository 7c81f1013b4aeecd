// SPDX-License-Identifier: MIT

//! Runtime configuration from environment variables
//!
//! | Variable                   | Default                     |
//! |----------------------------|-----------------------------|
//! | `RELAY_MAX_STEPS`          | 25                          |
//! | `OPENAI_MODEL`             | `gpt-4o-mini`               |
//! | `OPENAI_API_KEY`           | unset: offline model        |
//! | `OPENAI_BASE_URL`          | `https://api.openai.com/v1` |
//! | `RELAY_MODEL_TIMEOUT_SECS` | 30                          |
//! | `RELAY_CHECKPOINT_DIR`     | unset: no checkpoints       |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::adk::error::RelayError;
use crate::relay::workflow::graph::DEFAULT_MAX_STEPS;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub max_steps: usize,
    pub model_name: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model_timeout: Duration,
    pub checkpoint_dir: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            model_name: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model_timeout: Duration::from_secs(DEFAULT_MODEL_TIMEOUT_SECS),
            checkpoint_dir: None,
        }
    }
}

impl RuntimeConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let max_steps = match get("RELAY_MAX_STEPS") {
            Some(raw) => parse_positive("RELAY_MAX_STEPS", &raw)? as usize,
            None => defaults.max_steps,
        };
        let model_timeout = match get("RELAY_MODEL_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_positive("RELAY_MODEL_TIMEOUT_SECS", &raw)?),
            None => defaults.model_timeout,
        };

        Ok(Self {
            max_steps,
            model_name: get("OPENAI_MODEL").unwrap_or(defaults.model_name),
            api_key: get("OPENAI_API_KEY"),
            base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model_timeout,
            checkpoint_dir: get("RELAY_CHECKPOINT_DIR").map(PathBuf::from),
        })
    }

    /// Reject a step budget of zero
    pub fn with_max_steps(mut self, max_steps: usize) -> Result<Self, RelayError> {
        if max_steps == 0 {
            return Err(RelayError::config("max steps must be at least 1"));
        }
        self.max_steps = max_steps;
        Ok(self)
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, RelayError> {
    match raw.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(RelayError::config(format!(
            "{} must be a positive integer, got '{}'",
            key, raw
        ))),
    }
}
