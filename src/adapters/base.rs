use crate::adapters::http::{HttpClient, RequestOptions};
use crate::adapters::rate_limit::RateLimiter;
use crate::adapters::retry::RetryPolicy;
use crate::adapters::robots::{robots_url, RobotsChecker, RobotsDecision};
use crate::config::adapter::AdapterConfig;
use crate::domain::model::{EntityType, ExternalRef, Linkout};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use chrono::{SecondsFormat, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestStats {
    pub requests: u64,
    pub retries: u64,
    pub failed: u64,
}

/// Shared plumbing every source adapter embeds: one HTTP client, one rate
/// limiter, the retry policy and the robots.txt checker.
#[derive(Debug)]
pub struct AdapterCore {
    name: String,
    config: AdapterConfig,
    http: HttpClient,
    limiter: RateLimiter,
    retry: RetryPolicy,
    robots: RobotsChecker,
    requests: AtomicU64,
    retries: AtomicU64,
    failed: AtomicU64,
}

impl AdapterCore {
    pub fn new(name: impl Into<String>, config: AdapterConfig) -> Result<Self> {
        config.validate()?;

        let http = HttpClient::new(&config)?;
        let limiter = RateLimiter::new(config.rate_limit());
        let retry = RetryPolicy::new(config.retry_attempts, config.retry_delay());
        let robots = RobotsChecker::new(
            config.respect_robots_txt,
            config.bot_name(),
            config.robots_policy,
        );

        Ok(Self {
            name: name.into(),
            config,
            http,
            limiter,
            retry,
            robots,
            requests: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub async fn enforce_rate_limit(&self) -> Duration {
        self.limiter.enforce().await
    }

    /// Rate limit once, then retry the request with backoff. The error of
    /// the final attempt is propagated.
    pub async fn make_request(&self, url: &str, options: &RequestOptions) -> Result<String> {
        self.enforce_rate_limit().await;

        let http = &self.http;
        let requests = &self.requests;
        let retries = &self.retries;
        let result = self
            .retry
            .run(move |attempt| {
                requests.fetch_add(1, Ordering::Relaxed);
                if attempt > 1 {
                    retries.fetch_add(1, Ordering::Relaxed);
                }
                http.send(url, options)
            })
            .await;

        if result.is_err() {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    pub async fn get_json(&self, url: &str, options: &RequestOptions) -> Result<serde_json::Value> {
        let body = self.make_request(url, options).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// 未啟用時直接允許，不發出任何請求
    pub async fn check_robots_txt(&self, base_url: &str) -> RobotsDecision {
        if !self.robots.enabled() {
            return RobotsDecision::Allowed;
        }

        let fetched = match robots_url(base_url) {
            Ok(url) => self.make_request(&url, &RequestOptions::get()).await,
            Err(e) => Err(e),
        };
        self.robots.evaluate(base_url, fetched)
    }

    /// Re-checks a linkout with a single rate-limited request. A dead link is
    /// soft-deactivated, never removed.
    pub async fn verify_linkout(&self, linkout: &mut Linkout) -> bool {
        self.enforce_rate_limit().await;
        self.requests.fetch_add(1, Ordering::Relaxed);

        match self.http.send(&linkout.url, &RequestOptions::get()).await {
            Ok(_) => {
                linkout.verified = true;
                linkout.is_active = true;
                linkout.last_checked = Utc::now();
                true
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Linkout {} failed verification: {}", linkout.url, e);
                linkout.verified = false;
                linkout.deactivate();
                false
            }
        }
    }

    pub fn generate_external_ref(&self, source: &str, id: &str) -> ExternalRef {
        ExternalRef {
            source: source.to_string(),
            id: id.to_string(),
            last_updated: Utc::now(),
        }
    }

    pub fn create_linkout(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        source: &str,
        url: &str,
    ) -> Linkout {
        Linkout {
            entity_type,
            entity_id: entity_id.to_string(),
            source: source.to_string(),
            url: url.to_string(),
            verified: false,
            last_checked: Utc::now(),
            is_active: true,
        }
    }

    pub fn log(&self, level: LogLevel, message: &str, data: Option<&serde_json::Value>) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let data = data.map(|d| d.to_string()).unwrap_or_default();
        let adapter = self.name.as_str();

        match level {
            LogLevel::Debug => tracing::debug!(adapter, %timestamp, %data, "{}", message),
            LogLevel::Info => tracing::info!(adapter, %timestamp, %data, "{}", message),
            LogLevel::Warn => tracing::warn!(adapter, %timestamp, %data, "{}", message),
            LogLevel::Error => tracing::error!(adapter, %timestamp, %data, "{}", message),
        }
    }

    pub fn request_stats(&self) -> RequestStats {
        RequestStats {
            requests: self.requests.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
