use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Standard error response format for all API errors
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
        }
    }

    pub fn with_code(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
        }
    }
}

/// Trait for errors that can be converted to HTTP responses
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Optional error code for programmatic handling (e.g., "NOT_FOUND")
    fn error_code(&self) -> Option<&'static str> {
        None
    }
}

/// Convert any HttpError into an Axum response
pub fn into_response<E: HttpError>(err: E) -> Response {
    let status = err.status_code();
    let code = err.error_code();
    let message = err.to_string();

    tracing::error!(
        error = %message,
        status = %status,
        code = ?code,
        "API error"
    );

    let body = if let Some(code) = code {
        ErrorResponse::with_code(message, code)
    } else {
        ErrorResponse::new(message)
    };

    (status, Json(body)).into_response()
}

/// Macro to implement IntoResponse for HttpError types
#[macro_export]
macro_rules! impl_into_response {
    ($error_type:ty) => {
        impl axum::response::IntoResponse for $error_type {
            fn into_response(self) -> axum::response::Response {
                $crate::error::into_response(self)
            }
        }
    };
}

/// Failure classes of the fetch layer. Every upstream failure maps to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NetworkUnreachable,
    Timeout,
    NotFound,
    RateLimited,
    Unauthorized,
    ServerFault,
    Unknown,
}

impl ErrorKind {
    /// Transient failures worth another attempt
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::NetworkUnreachable | Self::ServerFault
        )
    }

    /// Status our own API answers with when an upstream call fails this way
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::NetworkUnreachable | Self::Unauthorized | Self::ServerFault => {
                StatusCode::BAD_GATEWAY
            }
            Self::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::NetworkUnreachable => "NETWORK_UNREACHABLE",
            Self::Timeout => "TIMEOUT",
            Self::NotFound => "NOT_FOUND",
            Self::RateLimited => "RATE_LIMITED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::ServerFault => "SERVER_FAULT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Errors raised while talking to the weather/geocoding API
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error. Please check your internet connection. ({0})")]
    Network(String),

    #[error("Request timed out. Please try again.")]
    Timeout,

    #[error("City not found. Please check the spelling and try again.")]
    NotFound,

    #[error("Too many requests. Please wait a moment and try again.")]
    RateLimited,

    #[error("Invalid API key. Please check your configuration.")]
    Unauthorized,

    #[error("Server error ({status}). Please try again later.")]
    ServerFault { status: u16, message: String },

    #[error("An unexpected error occurred: {0}")]
    Unknown(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::NetworkUnreachable,
            Self::Timeout => ErrorKind::Timeout,
            Self::NotFound => ErrorKind::NotFound,
            Self::RateLimited => ErrorKind::RateLimited,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::ServerFault { .. } => ErrorKind::ServerFault,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Classify a transport-level failure (no usable HTTP response)
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Unknown(format!("Invalid API response: {}", err))
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Classify a non-success HTTP status reported by the API
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            401 => Self::Unauthorized,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500..=599 => Self::ServerFault {
                status,
                message: message.unwrap_or_default(),
            },
            _ => Self::Unknown(match message {
                Some(message) => format!("HTTP {}: {}", status, message),
                None => format!("HTTP {}", status),
            }),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::from_transport(err)
    }
}

impl HttpError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    fn error_code(&self) -> Option<&'static str> {
        Some(self.kind().code())
    }
}

impl_into_response!(ApiError);

/// Serializable snapshot of a failure, kept in view state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ApiError> for ErrorBody {
    fn from(err: &ApiError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
