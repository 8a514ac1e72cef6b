use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use url::Url;

/// What to conclude when robots.txt cannot be fetched or read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotsPolicy {
    #[default]
    FailOpen,
    FailClosed,
}

impl RobotsPolicy {
    pub fn on_error(self) -> RobotsDecision {
        match self {
            RobotsPolicy::FailOpen => RobotsDecision::Allowed,
            RobotsPolicy::FailClosed => RobotsDecision::Disallowed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotsDecision {
    Allowed,
    Disallowed,
}

impl RobotsDecision {
    pub fn is_allowed(self) -> bool {
        self == RobotsDecision::Allowed
    }
}

/// `https://host/any/path` -> `https://host/robots.txt`
pub fn robots_url(base_url: &str) -> Result<String> {
    let url = Url::parse(base_url)?.join("/robots.txt")?;
    Ok(url.to_string())
}

/// Line scan that only detects a whole-site `Disallow: /` in a group
/// addressed to `*` or to `bot_name`. Path-specific rules are ignored.
pub fn parse_robots(body: &str, bot_name: &str) -> RobotsDecision {
    let bot = bot_name.to_ascii_lowercase();
    let mut applies = false;
    // 連續的 User-agent 行屬於同一個群組
    let mut in_agent_run = false;

    for raw in body.lines() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match field.trim().to_ascii_lowercase().as_str() {
            "user-agent" => {
                let agent = value.to_ascii_lowercase();
                let matches = agent == "*" || (!bot.is_empty() && agent == bot);
                applies = if in_agent_run { applies || matches } else { matches };
                in_agent_run = true;
            }
            "disallow" => {
                in_agent_run = false;
                if applies && value == "/" {
                    return RobotsDecision::Disallowed;
                }
            }
            _ => in_agent_run = false,
        }
    }

    RobotsDecision::Allowed
}

#[derive(Debug, Clone)]
pub struct RobotsChecker {
    enabled: bool,
    bot_name: String,
    policy: RobotsPolicy,
}

impl RobotsChecker {
    pub fn new(enabled: bool, bot_name: impl Into<String>, policy: RobotsPolicy) -> Self {
        Self {
            enabled,
            bot_name: bot_name.into(),
            policy,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn policy(&self) -> RobotsPolicy {
        self.policy
    }

    /// 把抓取結果轉成決策；抓取失敗時交給 policy 決定
    pub fn evaluate(&self, base_url: &str, fetched: Result<String>) -> RobotsDecision {
        match fetched {
            Ok(body) => {
                let decision = parse_robots(&body, &self.bot_name);
                tracing::debug!("robots.txt for {}: {:?}", base_url, decision);
                decision
            }
            Err(e) => {
                let decision = self.policy.on_error();
                tracing::warn!(
                    "⚠️ Could not check robots.txt for {} ({}), policy {:?} -> {:?}",
                    base_url,
                    e,
                    self.policy,
                    decision
                );
                decision
            }
        }
    }
}
