// Adapters layer: the shared fetch plumbing every source builds on.

pub mod base;
pub mod http;
pub mod rate_limit;
pub mod retry;
pub mod robots;

pub use base::{AdapterCore, LogLevel, RequestStats};
pub use http::{HttpClient, Method, RequestOptions};
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;
pub use robots::{RobotsChecker, RobotsDecision, RobotsPolicy};
