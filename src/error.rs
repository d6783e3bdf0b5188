//! Application error types

use serde::Serialize;
use thiserror::Error;

/// Hint appended to market data failures shown to the user
pub const MARKET_ERROR_HINT: &str = "This may be due to an invalid ticker or an API key issue.";

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Provider(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Ai(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Document store error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Message shown in the market data panel, with the troubleshooting hint
    pub fn with_market_hint(&self) -> String {
        format!("{} {}", self, MARKET_ERROR_HINT)
    }

    /// Stable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Http(_) => "HTTP_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Provider(_) => "PROVIDER_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Ai(_) => "AI_ERROR",
            AppError::Auth(_) => "AUTH_ERROR",
            AppError::Backend(_) => "BACKEND_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Io(_) => "IO_ERROR",
        }
    }
}

/// Serializable error response for the view layer
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        ErrorResponse {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_hint_appended() {
        let err = AppError::Validation("No valid price data for \"ZZZZ\".".to_string());
        assert_eq!(
            err.with_market_hint(),
            "No valid price data for \"ZZZZ\". This may be due to an invalid ticker or an API key issue."
        );
    }

    #[test]
    fn test_error_response_codes() {
        let response = ErrorResponse::from(AppError::Backend("offline".to_string()));
        assert_eq!(response.code, "BACKEND_ERROR");
        assert_eq!(response.message, "Document store error: offline");

        let response = ErrorResponse::from(AppError::Validation("empty symbol".to_string()));
        assert_eq!(response.code, "VALIDATION_ERROR");

        let response = ErrorResponse::from(AppError::NotFound("entry 4".to_string()));
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Not found: entry 4");
    }
}
