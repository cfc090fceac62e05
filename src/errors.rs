use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuoteBoardError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("HTTP status error: {0}")]
    HttpStatus(u16),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, QuoteBoardError>;

// 用于从字符串创建错误
impl From<String> for QuoteBoardError {
    fn from(s: String) -> Self {
        QuoteBoardError::Unknown(s)
    }
}

impl From<&str> for QuoteBoardError {
    fn from(s: &str) -> Self {
        QuoteBoardError::Unknown(s.to_string())
    }
}
