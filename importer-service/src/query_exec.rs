//! Ad-hoc SQL execution.
//!
//! A leading SELECT fetches and materializes rows; any other statement is
//! executed and its affected-row count returned. This is the one component
//! whose failures are surfaced verbatim instead of being converted to a
//! boolean/message pair.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use common::errors::{AppError, AppResult};
use common::models::query::{ColumnInfo, QueryResult};
use common::utils::SqlClassifier;
use serde_json::Value;
use sqlx::{Column, Row, TypeInfo};

use crate::session::{ActiveSession, DatabaseHandle};

/// Executes SQL statements against the active session.
pub struct QueryRunner;

/// Converts a decoded cell into its JSON rendering.
trait JsonCell {
    fn into_json(self) -> Value;
}

macro_rules! json_cell_via_from {
    ($($t:ty),+ $(,)?) => {
        $(impl JsonCell for $t {
            fn into_json(self) -> Value {
                Value::from(self)
            }
        })+
    };
}

json_cell_via_from!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, bool, String);

impl JsonCell for rust_decimal::Decimal {
    fn into_json(self) -> Value {
        Value::String(self.to_string())
    }
}

impl JsonCell for NaiveDateTime {
    fn into_json(self) -> Value {
        Value::String(self.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
    }
}

impl JsonCell for DateTime<Utc> {
    fn into_json(self) -> Value {
        Value::String(self.to_rfc3339())
    }
}

impl JsonCell for NaiveDate {
    fn into_json(self) -> Value {
        Value::String(self.to_string())
    }
}

impl JsonCell for NaiveTime {
    fn into_json(self) -> Value {
        Value::String(self.to_string())
    }
}

impl JsonCell for Vec<u8> {
    fn into_json(self) -> Value {
        let mut hex = String::with_capacity(2 + self.len() * 2);
        hex.push_str("0x");
        for byte in &self {
            hex.push_str(&format!("{:02x}", byte));
        }
        Value::String(hex)
    }
}

/// Tries each listed type in order until the driver accepts the decode.
macro_rules! decode_sqlx_cell {
    ($row:expr, $i:expr, [ $($t:ty),+ $(,)? ]) => {{
        let mut out: Option<Value> = None;
        $(
            if out.is_none() {
                if let Ok(v) = $row.try_get::<Option<$t>, _>($i) {
                    out = Some(match v {
                        Some(v) => JsonCell::into_json(v),
                        None => Value::Null,
                    });
                }
            }
        )+
        out.unwrap_or_else(|| Value::String("<unsupported type>".into()))
    }};
}

impl QueryRunner {
    /// Executes a statement, classifying it by its leading keyword.
    ///
    /// Errors carry the driver message unchanged.
    pub async fn execute(
        session: &ActiveSession,
        sql: &str,
        limit: Option<u32>,
    ) -> AppResult<QueryResult> {
        let start = std::time::Instant::now();
        let is_select = SqlClassifier::is_select(sql);

        let mut result = match &session.handle {
            DatabaseHandle::MySql(pool) => {
                if is_select {
                    let rows = sqlx::query(sql)
                        .fetch_all(pool)
                        .await
                        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
                    mysql_rows_to_result(&rows)
                } else {
                    let done = sqlx::query(sql)
                        .execute(pool)
                        .await
                        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
                    QueryResult::affected(done.rows_affected(), 0)
                }
            }
            DatabaseHandle::Postgres(pool) => {
                if is_select {
                    let rows = sqlx::query(sql)
                        .fetch_all(pool)
                        .await
                        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
                    pg_rows_to_result(&rows)
                } else {
                    let done = sqlx::query(sql)
                        .execute(pool)
                        .await
                        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
                    QueryResult::affected(done.rows_affected(), 0)
                }
            }
            DatabaseHandle::Sqlite(pool) => {
                if is_select {
                    let rows = sqlx::query(sql)
                        .fetch_all(pool)
                        .await
                        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
                    sqlite_rows_to_result(&rows)
                } else {
                    let done = sqlx::query(sql)
                        .execute(pool)
                        .await
                        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
                    QueryResult::affected(done.rows_affected(), 0)
                }
            }
            DatabaseHandle::Mssql(client) => {
                let mut guard = client.lock().await;
                if is_select {
                    let rows = guard
                        .simple_query(sql)
                        .await
                        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?
                        .into_first_result()
                        .await
                        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
                    mssql_rows_to_result(&rows)
                } else {
                    let done = guard
                        .execute(sql, &[])
                        .await
                        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
                    let affected: u64 = done.rows_affected().iter().sum();
                    QueryResult::affected(affected, 0)
                }
            }
        };

        if let Some(limit) = limit {
            result.rows.truncate(limit as usize);
            result.row_count = result.rows.len();
        }
        result.execution_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            select = is_select,
            rows = result.row_count,
            affected = result.affected_rows,
            duration_ms = result.execution_time_ms,
            "statement executed"
        );
        Ok(result)
    }
}

fn mysql_rows_to_result(rows: &[sqlx::mysql::MySqlRow]) -> QueryResult {
    let columns = sqlx_columns(rows.first());
    let data = rows
        .iter()
        .map(|row| {
            (0..row.columns().len())
                .map(|i| {
                    decode_sqlx_cell!(
                        row,
                        i,
                        [
                            i8,
                            i16,
                            i32,
                            i64,
                            u8,
                            u16,
                            u32,
                            u64,
                            f32,
                            f64,
                            rust_decimal::Decimal,
                            bool,
                            String,
                            NaiveDateTime,
                            DateTime<Utc>,
                            NaiveDate,
                            NaiveTime,
                            Vec<u8>,
                        ]
                    )
                })
                .collect()
        })
        .collect();
    QueryResult::rows(columns, data, 0)
}

fn pg_rows_to_result(rows: &[sqlx::postgres::PgRow]) -> QueryResult {
    let columns = sqlx_columns(rows.first());
    let data = rows
        .iter()
        .map(|row| {
            (0..row.columns().len())
                .map(|i| {
                    decode_sqlx_cell!(
                        row,
                        i,
                        [
                            i16,
                            i32,
                            i64,
                            f32,
                            f64,
                            rust_decimal::Decimal,
                            bool,
                            String,
                            NaiveDateTime,
                            DateTime<Utc>,
                            NaiveDate,
                            NaiveTime,
                            Vec<u8>,
                        ]
                    )
                })
                .collect()
        })
        .collect();
    QueryResult::rows(columns, data, 0)
}

fn sqlite_rows_to_result(rows: &[sqlx::sqlite::SqliteRow]) -> QueryResult {
    let columns = sqlx_columns(rows.first());
    let data = rows
        .iter()
        .map(|row| {
            (0..row.columns().len())
                .map(|i| {
                    decode_sqlx_cell!(
                        row,
                        i,
                        [i64, f64, bool, String, NaiveDateTime, NaiveDate, NaiveTime, Vec<u8>]
                    )
                })
                .collect()
        })
        .collect();
    QueryResult::rows(columns, data, 0)
}

fn sqlx_columns<R: Row>(first: Option<&R>) -> Vec<ColumnInfo> {
    first
        .map(|row| {
            row.columns()
                .iter()
                .map(|col| ColumnInfo {
                    name: col.name().to_string(),
                    data_type: col.type_info().name().to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn mssql_rows_to_result(rows: &[tiberius::Row]) -> QueryResult {
    let columns: Vec<ColumnInfo> = rows
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|col| ColumnInfo {
                    name: col.name().to_string(),
                    data_type: format!("{:?}", col.column_type()),
                })
                .collect()
        })
        .unwrap_or_default();

    let data = rows
        .iter()
        .map(|row| {
            (0..row.columns().len())
                .map(|i| mssql_cell(row, i))
                .collect()
        })
        .collect();
    QueryResult::rows(columns, data, 0)
}

/// Tries the tiberius decodes in order, mirroring the sqlx cell chain.
fn mssql_cell(row: &tiberius::Row, i: usize) -> Value {
    macro_rules! try_mssql {
        ($t:ty) => {
            if let Ok(v) = row.try_get::<$t, _>(i) {
                return match v {
                    Some(v) => JsonCell::into_json(v.to_owned()),
                    None => Value::Null,
                };
            }
        };
    }

    try_mssql!(u8);
    try_mssql!(i16);
    try_mssql!(i32);
    try_mssql!(i64);
    try_mssql!(f32);
    try_mssql!(f64);
    try_mssql!(bool);
    if let Ok(v) = row.try_get::<&str, _>(i) {
        return match v {
            Some(v) => Value::String(v.to_string()),
            None => Value::Null,
        };
    }
    try_mssql!(NaiveDateTime);
    try_mssql!(NaiveDate);
    try_mssql!(NaiveTime);
    if let Ok(v) = row.try_get::<uuid::Uuid, _>(i) {
        return match v {
            Some(v) => Value::String(v.to_string()),
            None => Value::Null,
        };
    }
    Value::String("<unsupported type>".into())
}
