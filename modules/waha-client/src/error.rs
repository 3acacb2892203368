use thiserror::Error;

pub type Result<T> = std::result::Result<T, WahaError>;

#[derive(Debug, Error)]
pub enum WahaError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Gateway error (status {status}): {message}")]
    Gateway { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for WahaError {
    fn from(err: reqwest::Error) -> Self {
        WahaError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for WahaError {
    fn from(err: serde_json::Error) -> Self {
        WahaError::Parse(err.to_string())
    }
}
