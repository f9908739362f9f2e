//! Application error types.
//!
//! Every component converts its failures into [`AppError`]; handlers return
//! it directly and the `IntoResponse` impl renders the unified error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::response::ApiResponse;

/// Convenience alias for results carrying an [`AppError`].
pub type AppResult<T> = Result<T, AppError>;

/// Unified application error.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An operation required an active database session.
    #[error("Not connected to a database")]
    NotConnected,

    /// Opening a database connection failed.
    #[error("Database connection error: {0}")]
    DatabaseConnection(String),

    /// Executing SQL failed. The driver message is preserved verbatim.
    #[error("{0}")]
    DatabaseQuery(String),

    /// Reading or parsing a data file failed.
    #[error("Failed to read dataset: {0}")]
    DatasetRead(String),

    /// An import or preview was requested before any file was loaded.
    #[error("No dataset loaded")]
    DatasetNotLoaded,

    /// Spatial import failed after all fallbacks.
    #[error("Spatial import error: {0}")]
    SpatialImport(String),

    /// Enabling the spatial extension was denied for lack of privilege.
    #[error("Permission denied: {0}")]
    ExtensionPrivilege(String),

    /// The requested import job does not exist.
    #[error("Import job not found: {0}")]
    JobNotFound(String),

    /// The operation is not available for the connected dialect.
    #[error("Unsupported for this database type: {0}")]
    UnsupportedDialect(String),

    /// A well-known-text geometry could not be parsed.
    #[error("Invalid WKT geometry: {0}")]
    InvalidWkt(String),
}

impl AppError {
    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotConnected => "NOT_CONNECTED",
            AppError::DatabaseConnection(_) => "CONNECTION_ERROR",
            AppError::DatabaseQuery(_) => "QUERY_ERROR",
            AppError::DatasetRead(_) => "DATASET_READ_ERROR",
            AppError::DatasetNotLoaded => "DATASET_NOT_LOADED",
            AppError::SpatialImport(_) => "SPATIAL_IMPORT_ERROR",
            AppError::ExtensionPrivilege(_) => "PERMISSION_DENIED",
            AppError::JobNotFound(_) => "JOB_NOT_FOUND",
            AppError::UnsupportedDialect(_) => "UNSUPPORTED_DIALECT",
            AppError::InvalidWkt(_) => "INVALID_WKT",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidWkt(_) => StatusCode::BAD_REQUEST,
            AppError::NotConnected | AppError::DatasetNotLoaded => StatusCode::CONFLICT,
            AppError::JobNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ExtensionPrivilege(_) => StatusCode::FORBIDDEN,
            AppError::UnsupportedDialect(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::warn!(code = self.code(), error = %self, "request rejected");
        }
        let body = ApiResponse::err(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_is_verbatim() {
        // Query failures must surface the driver text unchanged.
        let err = AppError::DatabaseQuery("syntax error at or near \"SELEC\"".into());
        assert_eq!(err.to_string(), "syntax error at or near \"SELEC\"");
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(AppError::NotConnected.code(), "NOT_CONNECTED");
        assert_eq!(
            AppError::ExtensionPrivilege("x".into()).code(),
            "PERMISSION_DENIED"
        );
    }
}
