//! Connection configuration models.
//!
//! Contains models for database connection management. A configuration is
//! built fresh from the UI fields on every test/connect action and is never
//! persisted anywhere.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Database dialect enumeration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// MySQL database.
    MySql,
    /// PostgreSQL database.
    Postgres,
    /// SQLite database (file-backed).
    Sqlite,
    /// Microsoft SQL Server database.
    Mssql,
}

impl Dialect {
    /// Returns the default port for this dialect.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Dialect::MySql => Some(3306),
            Dialect::Postgres => Some(5432),
            Dialect::Sqlite => None,
            Dialect::Mssql => Some(1433),
        }
    }

    /// Quotes an identifier the way this dialect expects.
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", ident),
            Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", ident),
            Dialect::Mssql => format!("[{}]", ident),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::MySql => write!(f, "mysql"),
            Dialect::Postgres => write!(f, "postgres"),
            Dialect::Sqlite => write!(f, "sqlite"),
            Dialect::Mssql => write!(f, "mssql"),
        }
    }
}

/// Connection parameters posted by the UI for test/connect actions.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ConnectionRequest {
    /// Database dialect.
    pub dialect: Dialect,
    /// Database host (ignored for sqlite).
    #[serde(default)]
    pub host: Option<String>,
    /// Database port (dialect default if not specified).
    #[serde(default)]
    pub port: Option<u16>,
    /// Database username.
    #[serde(default)]
    pub username: Option<String>,
    /// Database password.
    #[serde(default)]
    pub password: Option<String>,
    /// Database name, or the file path for sqlite.
    #[validate(length(min = 1, message = "Database name is required"))]
    pub database: String,
}

impl ConnectionRequest {
    /// Effective port, falling back to the dialect default.
    pub fn port_or_default(&self) -> u16 {
        self.port
            .or_else(|| self.dialect.default_port())
            .unwrap_or(0)
    }
}

/// Current session state reported to the UI.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConnectionStatus {
    /// Whether a session handle is currently open.
    pub connected: bool,
    /// Dialect of the open session, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,
    /// Database name of the open session, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl ConnectionStatus {
    /// Status value for the disconnected state.
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            dialect: None,
            database: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(Dialect::MySql.default_port(), Some(3306));
        assert_eq!(Dialect::Postgres.default_port(), Some(5432));
        assert_eq!(Dialect::Sqlite.default_port(), None);
        assert_eq!(Dialect::Mssql.default_port(), Some(1433));
    }

    #[test]
    fn test_quote_ident_per_dialect() {
        assert_eq!(Dialect::MySql.quote_ident("cities"), "`cities`");
        assert_eq!(Dialect::Postgres.quote_ident("cities"), "\"cities\"");
        assert_eq!(Dialect::Mssql.quote_ident("cities"), "[cities]");
    }
}
