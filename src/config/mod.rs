pub mod adapter;
pub mod cli;
pub mod toml_config;

use crate::utils::error::Result;
use crate::utils::validation::validate_url;
use toml_config::TomlConfig;

#[cfg(feature = "cli")]
use crate::utils::validation::{validate_path, Validate};
#[cfg(feature = "cli")]
use clap::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum SourceKind {
    Mlb,
    Espn,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "blaze-ingest")]
#[command(about = "Rate-limited ingestion of external sports data sources")]
pub struct CliConfig {
    #[arg(long, value_enum, default_value = "mlb")]
    pub source: SourceKind,

    #[arg(long, help = "Path to a TOML configuration file")]
    pub config: Option<String>,

    #[arg(long, help = "Override output.path from the config file")]
    pub output_path: Option<String>,

    #[arg(long, help = "Override adapter.user_agent")]
    pub user_agent: Option<String>,

    #[arg(long, value_delimiter = ',', help = "Team abbreviations to ingest")]
    pub teams: Vec<String>,

    #[arg(long, help = "Only check robots.txt for the selected source")]
    pub robots_only: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入設定檔（若有），再套用命令列覆蓋
    pub fn load(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        if let Some(path) = &self.output_path {
            config.output.path = path.clone();
        }
        if let Some(agent) = &self.user_agent {
            config.adapter.user_agent = agent.clone();
        }
        if !self.teams.is_empty() {
            match self.source {
                SourceKind::Mlb => config.mlb.teams = self.teams.clone(),
                SourceKind::Espn => config.espn.teams = self.teams.clone(),
            }
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.output_path {
            validate_path("output_path", path)?;
        }
        if let Some(path) = &self.config {
            validate_path("config", path)?;
        }
        Ok(())
    }
}

/// 指定來源的 robots.txt 檢查位置
pub fn robots_base_url(config: &TomlConfig, source: SourceKind) -> Result<&str> {
    let url = match source {
        SourceKind::Mlb => config.mlb.robots_base_url(),
        SourceKind::Espn => config.espn.robots_base_url(),
    };
    validate_url("robots_base_url", url)?;
    Ok(url)
}
