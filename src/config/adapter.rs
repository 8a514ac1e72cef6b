use crate::adapters::robots::RobotsPolicy;
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_positive_number, Validate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str =
    "BlazeIntelligenceBot/1.0 (+https://blaze-intelligence.com/bot)";

/// Settings shared by every adapter instance. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub user_agent: String,
    pub respect_robots_txt: bool,
    pub rate_limit_ms: u64,
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub robots_policy: RobotsPolicy,
    pub verify_linkouts: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            respect_robots_txt: true,
            rate_limit_ms: 1000,
            timeout_ms: 30_000,
            retry_attempts: 3,
            retry_delay_ms: 2000,
            robots_policy: RobotsPolicy::FailOpen,
            verify_linkouts: false,
        }
    }
}

impl AdapterConfig {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// robots.txt 比對用的名稱：`BlazeIntelligenceBot/1.0 (...)` -> `BlazeIntelligenceBot`
    pub fn bot_name(&self) -> &str {
        self.user_agent
            .split(|c: char| c == '/' || c.is_whitespace())
            .next()
            .unwrap_or_default()
    }
}

impl Validate for AdapterConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("adapter.user_agent", &self.user_agent)?;
        validate_positive_number("adapter.timeout_ms", self.timeout_ms, 1)?;
        validate_positive_number("adapter.retry_attempts", self.retry_attempts, 1)?;
        Ok(())
    }
}
