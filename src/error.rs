use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error};

/// Errors surfaced by HTTP handlers. Each variant maps to one status code and
/// a plain-text body; internal details are logged, never returned.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidCredentials(&'static str),

    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Invalid JWT Token")]
    Unauthenticated,

    /// Content that is hidden from the caller, not owned by the caller, or
    /// does not exist. All three produce the same response.
    #[error("Invalid Request")]
    NotVisible,

    #[error("{context}")]
    Internal {
        context: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InvalidCredentials(_)
            | AppError::MalformedPayload => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated | AppError::NotVisible => StatusCode::UNAUTHORIZED,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Internal { context, source } => error!(error = %source, "{}", context),
            other => debug!(status = %other.status(), "Request rejected: {}", other),
        }
        (self.status(), self.to_string()).into_response()
    }
}

/// Attach the endpoint's generic 500 message to a lower-level failure.
pub trait ResultExt<T> {
    fn or_internal(self, context: &'static str) -> Result<T, AppError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn or_internal(self, context: &'static str) -> Result<T, AppError> {
        self.map_err(|e| AppError::Internal {
            context,
            source: Box::new(e),
        })
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_and_auth_failures_are_401() {
        assert_eq!(AppError::NotVisible.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotVisible.to_string(), "Invalid Request");
        assert_eq!(AppError::Unauthenticated.to_string(), "Invalid JWT Token");
    }

    #[test]
    fn internal_error_hides_its_source() {
        let err: Result<(), AppError> =
            Err(std::io::Error::other("disk on fire")).or_internal("Error fetching tweets");
        let err = err.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Error fetching tweets");
    }
}
