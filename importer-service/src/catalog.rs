//! Schema inspection for the connected database.
//!
//! Table and column listings back the Import and Query tabs; each dialect
//! has its own catalog query.

use common::errors::{AppError, AppResult};
use common::models::query::ColumnInfo;
use common::utils::validate_identifier;

use crate::session::{ActiveSession, DatabaseHandle};

/// Lists user tables in the connected database.
pub async fn list_tables(session: &ActiveSession) -> AppResult<Vec<String>> {
    match &session.handle {
        DatabaseHandle::MySql(pool) => {
            sqlx::query_scalar(
                "SELECT table_name FROM information_schema.tables
                 WHERE table_schema = DATABASE() ORDER BY table_name",
            )
            .fetch_all(pool)
            .await
            .map_err(|e| AppError::DatabaseQuery(e.to_string()))
        }
        DatabaseHandle::Postgres(pool) => {
            sqlx::query_scalar(
                "SELECT tablename FROM pg_tables
                 WHERE schemaname = 'public' ORDER BY tablename",
            )
            .fetch_all(pool)
            .await
            .map_err(|e| AppError::DatabaseQuery(e.to_string()))
        }
        DatabaseHandle::Sqlite(pool) => {
            sqlx::query_scalar(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .fetch_all(pool)
            .await
            .map_err(|e| AppError::DatabaseQuery(e.to_string()))
        }
        DatabaseHandle::Mssql(client) => {
            let mut guard = client.lock().await;
            let rows = guard
                .simple_query("SELECT name FROM sys.tables ORDER BY name")
                .await
                .map_err(|e| AppError::DatabaseQuery(e.to_string()))?
                .into_first_result()
                .await
                .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
            Ok(rows
                .iter()
                .filter_map(|row| row.try_get::<&str, _>(0).ok().flatten())
                .map(str::to_string)
                .collect())
        }
    }
}

/// Lists the columns of one table with their reported data types.
pub async fn table_columns(session: &ActiveSession, table: &str) -> AppResult<Vec<ColumnInfo>> {
    validate_identifier(table)?;

    let pairs: Vec<(String, String)> = match &session.handle {
        DatabaseHandle::MySql(pool) => sqlx::query_as(
            "SELECT column_name, data_type FROM information_schema.columns
             WHERE table_schema = DATABASE() AND table_name = ?
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?,
        DatabaseHandle::Postgres(pool) => sqlx::query_as(
            "SELECT column_name::text, data_type::text FROM information_schema.columns
             WHERE table_schema = 'public' AND table_name = $1
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?,
        DatabaseHandle::Sqlite(pool) => {
            // PRAGMA does not take bind parameters; the identifier was
            // validated above.
            sqlx::query_as(&format!(
                "SELECT name, type FROM pragma_table_info('{}') ORDER BY cid",
                table
            ))
            .fetch_all(pool)
            .await
            .map_err(|e| AppError::DatabaseQuery(e.to_string()))?
        }
        DatabaseHandle::Mssql(client) => {
            let mut guard = client.lock().await;
            let rows = guard
                .query(
                    "SELECT COLUMN_NAME, DATA_TYPE FROM INFORMATION_SCHEMA.COLUMNS
                     WHERE TABLE_NAME = @P1 ORDER BY ORDINAL_POSITION",
                    &[&table],
                )
                .await
                .map_err(|e| AppError::DatabaseQuery(e.to_string()))?
                .into_first_result()
                .await
                .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
            rows.iter()
                .filter_map(|row| {
                    let name = row.try_get::<&str, _>(0).ok().flatten()?;
                    let data_type = row.try_get::<&str, _>(1).ok().flatten()?;
                    Some((name.to_string(), data_type.to_string()))
                })
                .collect()
        }
    };

    Ok(pairs
        .into_iter()
        .map(|(name, data_type)| ColumnInfo { name, data_type })
        .collect())
}
