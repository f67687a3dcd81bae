use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Upstream returned HTTP {status} for {url}")]
    UpstreamError { status: u16, url: String },

    #[error("Payload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },

    #[error("Model API rejected the credentials: {0}")]
    AuthError(String),

    #[error("Model error: {0}")]
    ModelError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NetworkError(_) => StatusCode::BAD_GATEWAY,
            AppError::UpstreamError { .. } => StatusCode::BAD_GATEWAY,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::AuthError(_) => StatusCode::BAD_GATEWAY,
            AppError::ModelError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short label used in log lines and in the error banner.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ConfigError(_) => "config",
            AppError::InvalidInput(_) => "input",
            AppError::NetworkError(_) => "network",
            AppError::UpstreamError { .. } => "upstream",
            AppError::PayloadTooLarge { .. } => "payload",
            AppError::AuthError(_) => "auth",
            AppError::ModelError(_) => "model",
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::NetworkError(format!("request timed out: {}", err))
        } else {
            AppError::NetworkError(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
