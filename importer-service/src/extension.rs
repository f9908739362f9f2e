//! PostGIS extension management.
//!
//! Checks for and attempts to enable the PostGIS extension on the connected
//! PostgreSQL database. Permission failures are told apart from other
//! failures by matching known phrases in the driver message; drivers change
//! their wording between versions, so this is a best-effort heuristic, not
//! a contract.

use common::errors::{AppError, AppResult};
use sqlx::PgPool;

/// Phrases that mark a privilege failure in PostgreSQL error messages.
const PERMISSION_PHRASES: [&str; 2] = ["permission denied", "must be superuser"];

/// Instructional text shown when the user cannot enable PostGIS themselves.
pub const PERMISSION_HELP: &str =
    "Permission denied. Please ask your database administrator to run:\nCREATE EXTENSION postgis;";

/// Returns true when the error message indicates missing privilege.
pub fn is_permission_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    PERMISSION_PHRASES.iter().any(|p| lower.contains(p))
}

/// Manages the PostGIS extension on a PostgreSQL session.
pub struct ExtensionManager;

impl ExtensionManager {
    /// True when PostGIS is already installed, or could be created
    /// silently. False on privilege or any other failure.
    pub async fn check(pool: &PgPool) -> bool {
        match Self::installed(pool).await {
            Ok(true) => true,
            Ok(false) => match Self::create(pool).await {
                Ok(()) => {
                    tracing::info!("postgis extension created");
                    true
                }
                Err(e) => {
                    if is_permission_error(&e.to_string()) {
                        tracing::warn!(error = %e, "postgis unavailable: insufficient privilege");
                    } else {
                        tracing::warn!(error = %e, "postgis extension creation failed");
                    }
                    false
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "postgis availability check failed");
                false
            }
        }
    }

    /// Attempts to enable PostGIS, returning a success flag plus a
    /// human-readable outcome.
    pub async fn enable(pool: &PgPool) -> (bool, String) {
        match Self::create(pool).await {
            Ok(()) => (true, "PostGIS extension enabled successfully!".to_string()),
            Err(e) => {
                let message = e.to_string();
                if is_permission_error(&message) {
                    (false, PERMISSION_HELP.to_string())
                } else {
                    (false, format!("Failed to enable PostGIS: {}", message))
                }
            }
        }
    }

    /// Whether the extension is already installed (no creation attempt).
    pub async fn installed(pool: &PgPool) -> AppResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pg_extension WHERE extname = 'postgis'")
                .fetch_one(pool)
                .await
                .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
        Ok(count > 0)
    }

    async fn create(pool: &PgPool) -> AppResult<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS postgis")
            .execute(pool)
            .await
            .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_phrases_detected() {
        assert!(is_permission_error(
            "ERROR: permission denied to create extension \"postgis\""
        ));
        assert!(is_permission_error("Must be superuser to create this extension."));
    }

    #[test]
    fn test_other_errors_not_flagged() {
        assert!(!is_permission_error("could not open extension control file"));
        assert!(!is_permission_error("connection reset by peer"));
    }
}
