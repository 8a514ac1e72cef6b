pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{AdapterCore, RobotsDecision, RobotsPolicy};
pub use app::sources::{EspnAdapter, MlbStatsAdapter};
pub use config::{adapter::AdapterConfig, cli::LocalStorage, toml_config::TomlConfig, SourceKind};
pub use core::{runner::AdapterRunner, SourceAdapter, Storage};
pub use utils::error::{AdapterError, Result};
