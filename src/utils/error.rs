use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Normalization error in {source_name}: {message}")]
    NormalizationError {
        source_name: String,
        message: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("{adapter}: fetching is disallowed by robots.txt")]
    RobotsDisallowed { adapter: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AdapterError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AdapterError::RobotsDisallowed { .. } => ErrorSeverity::Low,
            AdapterError::ApiError(_) => ErrorSeverity::Medium,
            AdapterError::CsvError(_)
            | AdapterError::SerializationError(_)
            | AdapterError::NormalizationError { .. }
            | AdapterError::ValidationError { .. } => ErrorSeverity::High,
            AdapterError::IoError(_)
            | AdapterError::UrlParseError(_)
            | AdapterError::ConfigValidationError { .. }
            | AdapterError::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            AdapterError::ApiError(_) => {
                "檢查網路連線與來源 API 狀態，或調高 retry_attempts / timeout_ms"
            }
            AdapterError::RobotsDisallowed { .. } => {
                "來源網站禁止爬取；請改用官方 API 或關閉 respect_robots_txt（需自行承擔責任）"
            }
            AdapterError::NormalizationError { .. } => "來源回應格式可能已變更，請檢查原始 payload",
            AdapterError::ValidationError { .. } => "檢查正規化後的資料是否缺少必要欄位",
            AdapterError::IoError(_) | AdapterError::CsvError(_) => "確認輸出目錄存在且可寫入",
            AdapterError::SerializationError(_) => "檢查資料是否可序列化為 JSON",
            AdapterError::UrlParseError(_)
            | AdapterError::ConfigValidationError { .. }
            | AdapterError::InvalidConfigValueError { .. } => "檢查設定檔與命令列參數",
        }
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;
