use crate::config::adapter::AdapterConfig;
use crate::utils::error::{AdapterError, Result};
use crate::utils::validation::{validate_path, validate_url, Validate};
use chrono::{Datelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub adapter: AdapterConfig,
    pub output: OutputConfig,
    pub mlb: MlbSourceConfig,
    pub espn: EspnSourceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "./output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MlbSourceConfig {
    pub base_url: String,
    pub site_url: String,
    pub season: Option<i32>,
    /// 只抓取這些球隊（縮寫，例如 "STL"）；空白代表全部
    pub teams: Vec<String>,
}

impl Default for MlbSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://statsapi.mlb.com".to_string(),
            site_url: "https://www.mlb.com".to_string(),
            season: None,
            teams: Vec::new(),
        }
    }
}

impl MlbSourceConfig {
    pub fn season(&self) -> i32 {
        self.season.unwrap_or_else(|| Utc::now().year())
    }

    /// robots.txt 以公開網站為準，不是 statsapi 主機
    pub fn robots_base_url(&self) -> &str {
        &self.site_url
    }
}

impl Validate for MlbSourceConfig {
    fn validate(&self) -> Result<()> {
        validate_url("mlb.base_url", &self.base_url)?;
        validate_url("mlb.site_url", &self.site_url)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EspnSourceConfig {
    pub base_url: String,
    pub standings_url: String,
    pub site_url: String,
    pub teams: Vec<String>,
}

impl Default for EspnSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://site.api.espn.com/apis/site/v2/sports/football/nfl".to_string(),
            standings_url: "https://site.api.espn.com/apis/v2/sports/football/nfl".to_string(),
            site_url: "https://www.espn.com".to_string(),
            teams: Vec::new(),
        }
    }
}

impl EspnSourceConfig {
    pub fn robots_base_url(&self) -> &str {
        &self.base_url
    }
}

impl Validate for EspnSourceConfig {
    fn validate(&self) -> Result<()> {
        validate_url("espn.base_url", &self.base_url)?;
        validate_url("espn.standings_url", &self.standings_url)?;
        validate_url("espn.site_url", &self.site_url)?;
        Ok(())
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AdapterError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CFBD_API_KEY})；找不到的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AdapterError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.adapter.validate()?;
        validate_path("output.path", &self.output.path)?;
        self.mlb.validate()?;
        self.espn.validate()?;
        Ok(())
    }
}
