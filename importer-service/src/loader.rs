//! Batched bulk loader.
//!
//! Writes a dataset into a target table in fixed-size batches. The table is
//! created (or replaced) up front, so a zero-row dataset still leaves an
//! empty table behind; each batch then appends. There is no transaction
//! around the whole job: rows from batches that completed before a failure
//! stay in the table.

use common::errors::{AppError, AppResult};
use common::models::connection::Dialect;
use common::models::dataset::{CellValue, Column, ColumnType, TabularDataset};
use common::models::progress::{ProgressEvent, ProgressSink};
use common::utils::validate_identifier;

use crate::session::{ActiveSession, DatabaseHandle};

/// Rows written per batch.
pub const BATCH_SIZE: usize = 1000;

/// Writes datasets into the connected database.
pub struct BulkLoader<'a> {
    session: &'a ActiveSession,
}

impl<'a> BulkLoader<'a> {
    /// Creates a loader bound to the active session.
    pub fn new(session: &'a ActiveSession) -> Self {
        Self { session }
    }

    /// Imports the dataset into `table`, replacing any existing table of
    /// that name. Progress is reported before every batch and once more on
    /// completion; on a batch failure an error-status event is emitted and
    /// the error returned.
    pub async fn import(
        &self,
        dataset: &TabularDataset,
        table: &str,
        sink: &dyn ProgressSink,
    ) -> AppResult<()> {
        validate_identifier(table)?;
        for column in &dataset.columns {
            validate_identifier(&column.name)?;
        }
        if dataset.columns.is_empty() {
            return Err(AppError::Validation(
                "Dataset has no columns to import".into(),
            ));
        }

        let total = dataset.row_count();
        sink.report(ProgressEvent::new(0, total, "Creating table structure..."));

        let result = self.run_batches(dataset, table, total, sink).await;
        match result {
            Ok(()) => {
                sink.report(ProgressEvent::new(
                    total,
                    total,
                    "Import completed successfully",
                ));
                tracing::info!(table = %table, rows = total, "import finished");
                Ok(())
            }
            Err(e) => {
                tracing::error!(table = %table, error = %e, "import aborted");
                sink.report(ProgressEvent::new(0, total, format!("Error: {}", e)));
                Err(e)
            }
        }
    }

    async fn run_batches(
        &self,
        dataset: &TabularDataset,
        table: &str,
        total: usize,
        sink: &dyn ProgressSink,
    ) -> AppResult<()> {
        self.create_or_replace(table, &dataset.columns).await?;

        for (index, batch) in dataset.rows.chunks(BATCH_SIZE).enumerate() {
            let done = index * BATCH_SIZE;
            sink.report(ProgressEvent::new(
                done,
                total,
                format!("Importing data... {}/{}", done, total),
            ));
            self.insert_batch(table, &dataset.columns, batch).await?;
        }
        Ok(())
    }

    /// Drops any previous table of that name and creates a fresh one from
    /// the dataset schema.
    pub(crate) async fn create_or_replace(&self, table: &str, columns: &[Column]) -> AppResult<()> {
        let dialect = self.session.dialect;
        let table_sql = dialect.quote_ident(table);

        let drop_sql = match dialect {
            Dialect::Mssql => format!(
                "IF OBJECT_ID(N'{}', N'U') IS NOT NULL DROP TABLE {}",
                table, table_sql
            ),
            _ => format!("DROP TABLE IF EXISTS {}", table_sql),
        };
        self.session.execute_raw(&drop_sql).await?;

        let defs: Vec<String> = columns
            .iter()
            .map(|c| {
                format!(
                    "{} {}",
                    dialect.quote_ident(&c.name),
                    sql_type(dialect, c.column_type)
                )
            })
            .collect();
        let create_sql = format!("CREATE TABLE {} ({})", table_sql, defs.join(", "));
        self.session.execute_raw(&create_sql).await?;
        Ok(())
    }

    /// Appends one batch of rows to the table.
    pub async fn insert_batch(
        &self,
        table: &str,
        columns: &[Column],
        batch: &[Vec<CellValue>],
    ) -> AppResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let dialect = self.session.dialect;
        let table_sql = dialect.quote_ident(table);
        let cols_sql = columns
            .iter()
            .map(|c| dialect.quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");

        macro_rules! push_sqlx_batch {
            ($db:ty, $pool:expr) => {{
                let mut qb = sqlx::QueryBuilder::<$db>::new(format!(
                    "INSERT INTO {} ({}) ",
                    table_sql, cols_sql
                ));
                qb.push_values(batch.iter(), |mut b, row| {
                    for cell in row.iter() {
                        match cell {
                            CellValue::Null => {
                                b.push("NULL");
                            }
                            CellValue::Integer(v) => {
                                b.push_bind(*v);
                            }
                            CellValue::Float(v) => {
                                b.push_bind(*v);
                            }
                            CellValue::Boolean(v) => {
                                b.push_bind(*v);
                            }
                            CellValue::Text(v) => {
                                b.push_bind(v.clone());
                            }
                        }
                    }
                });
                qb.build()
                    .execute($pool)
                    .await
                    .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
            }};
        }

        match &self.session.handle {
            DatabaseHandle::MySql(pool) => push_sqlx_batch!(sqlx::MySql, pool),
            DatabaseHandle::Postgres(pool) => push_sqlx_batch!(sqlx::Postgres, pool),
            DatabaseHandle::Sqlite(pool) => push_sqlx_batch!(sqlx::Sqlite, pool),
            DatabaseHandle::Mssql(_) => {
                // SQL Server caps statements at 2100 parameters, far below a
                // full batch; render literals instead of binding.
                let values: Vec<String> = batch
                    .iter()
                    .map(|row| {
                        let cells: Vec<String> = row.iter().map(mssql_literal).collect();
                        format!("({})", cells.join(", "))
                    })
                    .collect();
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES {}",
                    table_sql,
                    cols_sql,
                    values.join(", ")
                );
                self.session.execute_raw(&sql).await?;
            }
        }
        Ok(())
    }
}

/// SQL column type for an inferred dataset column type.
pub fn sql_type(dialect: Dialect, column_type: ColumnType) -> &'static str {
    match (dialect, column_type) {
        (_, ColumnType::Integer) => "BIGINT",
        (Dialect::Postgres, ColumnType::Float) => "DOUBLE PRECISION",
        (Dialect::MySql, ColumnType::Float) => "DOUBLE",
        (Dialect::Sqlite, ColumnType::Float) => "REAL",
        (Dialect::Mssql, ColumnType::Float) => "FLOAT",
        (Dialect::MySql, ColumnType::Boolean) => "TINYINT(1)",
        (Dialect::Mssql, ColumnType::Boolean) => "BIT",
        (_, ColumnType::Boolean) => "BOOLEAN",
        (Dialect::Mssql, ColumnType::Text) => "NVARCHAR(MAX)",
        (_, ColumnType::Text) => "TEXT",
    }
}

/// Renders a cell as a SQL Server literal, doubling embedded quotes.
fn mssql_literal(cell: &CellValue) -> String {
    match cell {
        CellValue::Null => "NULL".to_string(),
        CellValue::Integer(v) => v.to_string(),
        CellValue::Float(v) => {
            if v.is_finite() {
                v.to_string()
            } else {
                "NULL".to_string()
            }
        }
        CellValue::Boolean(v) => (if *v { "1" } else { "0" }).to_string(),
        CellValue::Text(v) => format!("N'{}'", v.replace('\'', "''")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_count_spans() {
        // 0 rows -> no batches, 1 row -> one batch, 1500 -> two batches.
        assert_eq!((0usize).div_ceil(BATCH_SIZE), 0);
        assert_eq!((1usize).div_ceil(BATCH_SIZE), 1);
        assert_eq!((1500usize).div_ceil(BATCH_SIZE), 2);
    }

    #[test]
    fn test_mssql_literal_escaping() {
        assert_eq!(
            mssql_literal(&CellValue::Text("O'Hare".into())),
            "N'O''Hare'"
        );
        assert_eq!(mssql_literal(&CellValue::Boolean(true)), "1");
        assert_eq!(mssql_literal(&CellValue::Null), "NULL");
    }

    #[test]
    fn test_sql_types_per_dialect() {
        assert_eq!(sql_type(Dialect::Postgres, ColumnType::Float), "DOUBLE PRECISION");
        assert_eq!(sql_type(Dialect::MySql, ColumnType::Boolean), "TINYINT(1)");
        assert_eq!(sql_type(Dialect::Mssql, ColumnType::Text), "NVARCHAR(MAX)");
        assert_eq!(sql_type(Dialect::Sqlite, ColumnType::Integer), "BIGINT");
    }
}
