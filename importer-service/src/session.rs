//! Database session manager.
//!
//! Owns the single active connection handle. At most one session is open
//! per process; every data-bearing operation borrows the handle from here
//! and fails immediately when no session exists.

use std::sync::Arc;
use std::time::Duration;

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::connection::{ConnectionRequest, ConnectionStatus, Dialect};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use sqlx::{mysql::MySqlPoolOptions, postgres::PgPoolOptions, sqlite::SqlitePoolOptions};
use sqlx::{MySqlPool, PgPool, SqlitePool};
use tiberius::{AuthMethod, Client, Config as MssqlConfig, EncryptionLevel};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// Shared handle to a SQL Server client (tiberius has no pool).
pub type MssqlClient = Arc<Mutex<Client<Compat<TcpStream>>>>;

/// Connection handle for the supported dialects.
#[derive(Clone)]
pub enum DatabaseHandle {
    /// MySQL connection pool.
    MySql(MySqlPool),
    /// PostgreSQL connection pool.
    Postgres(PgPool),
    /// SQLite connection pool (single connection).
    Sqlite(SqlitePool),
    /// SQL Server client behind a mutex.
    Mssql(MssqlClient),
}

/// The live session: dialect, database name and the open handle.
#[derive(Clone)]
pub struct ActiveSession {
    /// Dialect of the open connection.
    pub dialect: Dialect,
    /// Database name (or file path for sqlite).
    pub database: String,
    /// The open connection handle.
    pub handle: DatabaseHandle,
}

impl ActiveSession {
    /// The PostgreSQL pool, if this session is a Postgres one.
    pub fn pg_pool(&self) -> Option<&PgPool> {
        match &self.handle {
            DatabaseHandle::Postgres(pool) => Some(pool),
            _ => None,
        }
    }

    /// Executes a non-returning statement on the handle, yielding the
    /// affected-row count.
    pub async fn execute_raw(&self, sql: &str) -> AppResult<u64> {
        match &self.handle {
            DatabaseHandle::MySql(pool) => sqlx::query(sql)
                .execute(pool)
                .await
                .map(|r| r.rows_affected())
                .map_err(|e| AppError::DatabaseQuery(e.to_string())),
            DatabaseHandle::Postgres(pool) => sqlx::query(sql)
                .execute(pool)
                .await
                .map(|r| r.rows_affected())
                .map_err(|e| AppError::DatabaseQuery(e.to_string())),
            DatabaseHandle::Sqlite(pool) => sqlx::query(sql)
                .execute(pool)
                .await
                .map(|r| r.rows_affected())
                .map_err(|e| AppError::DatabaseQuery(e.to_string())),
            DatabaseHandle::Mssql(client) => {
                let mut guard = client.lock().await;
                guard
                    .execute(sql, &[])
                    .await
                    .map(|r| r.rows_affected().iter().sum())
                    .map_err(|e| AppError::DatabaseQuery(e.to_string()))
            }
        }
    }
}

/// Manages the single active database session.
pub struct SessionManager {
    config: AppConfig,
    session: RwLock<Option<ActiveSession>>,
}

impl SessionManager {
    /// Creates a manager in the disconnected state.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            session: RwLock::new(None),
        }
    }

    /// Tests connectivity by opening a one-off handle, probing it with
    /// `SELECT 1` and closing it again. Never touches the active session.
    /// Returns `false` on any failure.
    pub async fn test(&self, req: &ConnectionRequest) -> bool {
        match self.open_handle(req).await {
            Ok(handle) => {
                close_handle(&handle).await;
                true
            }
            Err(e) => {
                tracing::warn!(dialect = %req.dialect, error = %e, "connection test failed");
                false
            }
        }
    }

    /// Opens a new session, replacing any previous one. On failure the
    /// manager is left in the disconnected state.
    pub async fn connect(&self, req: &ConnectionRequest) -> AppResult<()> {
        // Drop any previous handle first so a failed attempt cannot leave
        // a stale session behind.
        self.disconnect().await;

        let handle = self.open_handle(req).await?;
        let session = ActiveSession {
            dialect: req.dialect,
            database: req.database.clone(),
            handle,
        };
        *self.session.write().await = Some(session);
        tracing::info!(dialect = %req.dialect, database = %req.database, "session opened");
        Ok(())
    }

    /// Closes the active session if there is one. Idempotent.
    pub async fn disconnect(&self) {
        if let Some(session) = self.session.write().await.take() {
            close_handle(&session.handle).await;
            tracing::info!(dialect = %session.dialect, "session closed");
        }
    }

    /// Whether a session handle is present. Reflects slot occupancy only,
    /// not liveness.
    pub async fn is_connected(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Status summary for the UI.
    pub async fn status(&self) -> ConnectionStatus {
        match self.session.read().await.as_ref() {
            Some(s) => ConnectionStatus {
                connected: true,
                dialect: Some(s.dialect),
                database: Some(s.database.clone()),
            },
            None => ConnectionStatus::disconnected(),
        }
    }

    /// Clones out the active session, or fails with `NotConnected`.
    pub async fn current(&self) -> AppResult<ActiveSession> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(AppError::NotConnected)
    }

    /// Opens and probes a handle for the requested dialect.
    async fn open_handle(&self, req: &ConnectionRequest) -> AppResult<DatabaseHandle> {
        let timeout = Duration::from_secs(self.config.connect_timeout_secs);
        let max_connections = self.config.max_connections;

        let handle = match req.dialect {
            Dialect::MySql => {
                let url = build_mysql_url(req)?;
                let pool = MySqlPoolOptions::new()
                    .max_connections(max_connections)
                    .acquire_timeout(timeout)
                    .connect(&url)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                DatabaseHandle::MySql(pool)
            }
            Dialect::Postgres => {
                let url = build_postgres_url(req)?;
                let pool = PgPoolOptions::new()
                    .max_connections(max_connections)
                    .acquire_timeout(timeout)
                    .connect(&url)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                DatabaseHandle::Postgres(pool)
            }
            Dialect::Sqlite => {
                let url = format!("sqlite:{}?mode=rwc", req.database);
                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect(&url)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                DatabaseHandle::Sqlite(pool)
            }
            Dialect::Mssql => {
                let client = connect_mssql(req, timeout).await?;
                DatabaseHandle::Mssql(Arc::new(Mutex::new(client)))
            }
        };

        probe(&handle).await?;
        Ok(handle)
    }
}

/// Issues `SELECT 1` over the handle to verify it actually works.
async fn probe(handle: &DatabaseHandle) -> AppResult<()> {
    match handle {
        DatabaseHandle::MySql(pool) => {
            sqlx::query("SELECT 1")
                .execute(pool)
                .await
                .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
        }
        DatabaseHandle::Postgres(pool) => {
            sqlx::query("SELECT 1")
                .execute(pool)
                .await
                .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
        }
        DatabaseHandle::Sqlite(pool) => {
            sqlx::query("SELECT 1")
                .execute(pool)
                .await
                .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
        }
        DatabaseHandle::Mssql(client) => {
            let mut guard = client.lock().await;
            guard
                .simple_query("SELECT 1")
                .await
                .map_err(|e| AppError::DatabaseConnection(e.to_string()))?
                .into_first_result()
                .await
                .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
        }
    }
    Ok(())
}

/// Closes pooled handles; the tiberius client closes on drop.
async fn close_handle(handle: &DatabaseHandle) {
    match handle {
        DatabaseHandle::MySql(pool) => pool.close().await,
        DatabaseHandle::Postgres(pool) => pool.close().await,
        DatabaseHandle::Sqlite(pool) => pool.close().await,
        DatabaseHandle::Mssql(_) => {}
    }
}

async fn connect_mssql(
    req: &ConnectionRequest,
    timeout: Duration,
) -> AppResult<Client<Compat<TcpStream>>> {
    let host = req
        .host
        .as_deref()
        .ok_or_else(|| AppError::Validation("SQL Server requires host".into()))?;

    let mut config = MssqlConfig::new();
    config.host(host);
    config.port(req.port_or_default());
    config.database(&req.database);
    config.trust_cert();
    config.encryption(EncryptionLevel::Required);
    config.authentication(AuthMethod::sql_server(
        req.username.as_deref().unwrap_or("sa"),
        req.password.as_deref().unwrap_or(""),
    ));

    let tcp = tokio::time::timeout(timeout, TcpStream::connect(config.get_addr()))
        .await
        .map_err(|_| AppError::DatabaseConnection("connect timed out".into()))?
        .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
    tcp.set_nodelay(true)
        .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;

    Client::connect(config, tcp.compat_write())
        .await
        .map_err(|e| AppError::DatabaseConnection(e.to_string()))
}

// ============== URL Builders ==============

fn build_mysql_url(req: &ConnectionRequest) -> AppResult<String> {
    let host = req
        .host
        .as_deref()
        .ok_or_else(|| AppError::Validation("MySQL requires host".into()))?;
    let username = req.username.as_deref().unwrap_or("root");
    let password = req.password.as_deref().unwrap_or("");

    Ok(format!(
        "mysql://{}:{}@{}:{}/{}",
        encode_credential(username),
        encode_credential(password),
        host,
        req.port_or_default(),
        req.database
    ))
}

fn build_postgres_url(req: &ConnectionRequest) -> AppResult<String> {
    let host = req
        .host
        .as_deref()
        .ok_or_else(|| AppError::Validation("PostgreSQL requires host".into()))?;
    let username = req.username.as_deref().unwrap_or("postgres");
    let password = req.password.as_deref().unwrap_or("");

    Ok(format!(
        "postgres://{}:{}@{}:{}/{}",
        encode_credential(username),
        encode_credential(password),
        host,
        req.port_or_default(),
        req.database
    ))
}

/// Credentials may contain characters with meaning in URLs (`@`, `/`, `:`).
fn encode_credential(raw: &str) -> String {
    utf8_percent_encode(raw, NON_ALPHANUMERIC).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(dialect: Dialect) -> ConnectionRequest {
        ConnectionRequest {
            dialect,
            host: Some("localhost".into()),
            port: None,
            username: Some("user".into()),
            password: Some("p@ss:w/rd".into()),
            database: "demo".into(),
        }
    }

    #[test]
    fn test_mysql_url_uses_default_port() {
        let url = build_mysql_url(&req(Dialect::MySql)).unwrap();
        assert!(url.starts_with("mysql://user:"));
        assert!(url.ends_with("@localhost:3306/demo"));
    }

    #[test]
    fn test_credentials_are_percent_encoded() {
        let url = build_postgres_url(&req(Dialect::Postgres)).unwrap();
        assert!(url.contains("p%40ss%3Aw%2Frd"));
        assert!(!url[11..].contains("p@ss"));
    }

    #[test]
    fn test_missing_host_is_rejected() {
        let mut r = req(Dialect::Postgres);
        r.host = None;
        assert!(build_postgres_url(&r).is_err());
    }
}
