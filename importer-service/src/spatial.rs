//! Spatial import and PostGIS tooling.
//!
//! Per-dialect strategy for writing geometry-bearing datasets:
//!
//! - PostgreSQL gets a native geometry column when PostGIS is available,
//!   degrading to a WKT text column when it is not (or when the native
//!   write fails mid-way).
//! - SQLite and SQL Server always store geometry as WKT text.
//! - MySQL loads the attribute columns first, adds a geometry column via
//!   `ALTER TABLE`, then fills it row-by-row from WKT.

use common::errors::{AppError, AppResult};
use common::models::connection::Dialect;
use common::models::dataset::{CellValue, Column, ColumnType, SpatialDataset, TabularDataset};
use common::models::progress::{ProgressEvent, ProgressSink};
use common::models::spatial::{ParsedGeometry, SpatialColumnKind, SpatialTableInfo};
use common::utils::validate_identifier;
use geo_types::Geometry;
use sqlx::PgPool;
use wkt::TryFromWkt;

use crate::extension::ExtensionManager;
use crate::loader::{BulkLoader, BATCH_SIZE};
use crate::session::ActiveSession;

/// Name of the text column holding WKT when no native geometry is written.
pub const WKT_COLUMN: &str = "geometry_wkt";

/// Name used for native geometry columns, avoiding a collision with any
/// attribute column called `geometry`.
pub const GEOM_COLUMN: &str = "geom";

/// Geometry values are updated in small batches on the MySQL path.
const GEOMETRY_UPDATE_BATCH: usize = 100;

/// Imports spatial datasets according to the session dialect.
pub struct SpatialImporter<'a> {
    session: &'a ActiveSession,
}

impl<'a> SpatialImporter<'a> {
    /// Creates an importer bound to the active session.
    pub fn new(session: &'a ActiveSession) -> Self {
        Self { session }
    }

    /// Imports the dataset into `table`, replacing any existing table.
    /// Never raises just because the spatial extension is missing; the
    /// geometry degrades to WKT text instead.
    pub async fn import(
        &self,
        data: &SpatialDataset,
        table: &str,
        srid: Option<i32>,
        sink: &dyn ProgressSink,
    ) -> AppResult<()> {
        validate_identifier(table)?;
        let srid = srid.unwrap_or(data.srid);
        let total = data.row_count();

        match self.session.dialect {
            Dialect::Postgres => self.import_postgres(data, table, srid, total, sink).await,
            Dialect::MySql => self.import_mysql(data, table, srid, total, sink).await,
            Dialect::Sqlite | Dialect::Mssql => {
                sink.report(ProgressEvent::new(
                    0,
                    total,
                    "Storing geometry as WKT text...",
                ));
                self.import_as_wkt(data, table, sink).await
            }
        }
    }

    async fn import_postgres(
        &self,
        data: &SpatialDataset,
        table: &str,
        srid: i32,
        total: usize,
        sink: &dyn ProgressSink,
    ) -> AppResult<()> {
        let pool = self
            .session
            .pg_pool()
            .ok_or_else(|| AppError::SpatialImport("not a PostgreSQL session".into()))?;

        sink.report(ProgressEvent::new(0, total, "Checking PostGIS extension..."));
        if !ExtensionManager::check(pool).await {
            sink.report(ProgressEvent::new(
                0,
                total,
                "PostGIS not available, storing geometry as WKT text...",
            ));
            return self.import_as_wkt(data, table, sink).await;
        }

        match self.native_postgres_import(pool, data, table, srid, total, sink).await {
            Ok(()) => {
                sink.report(ProgressEvent::new(total, total, "Spatial import completed"));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "native geometry import failed, falling back to WKT");
                // Clear the partial table before retrying as a plain load.
                let _ = self
                    .session
                    .execute_raw(&format!(
                        "DROP TABLE IF EXISTS {}",
                        self.session.dialect.quote_ident(table)
                    ))
                    .await;
                sink.report(ProgressEvent::new(
                    0,
                    total,
                    "PostGIS write failed, storing geometry as WKT text...",
                ));
                self.import_as_wkt(data, table, sink).await
            }
        }
    }

    /// Creates the table with a native geometry column and inserts rows
    /// through `ST_GeomFromText`.
    async fn native_postgres_import(
        &self,
        pool: &PgPool,
        data: &SpatialDataset,
        table: &str,
        srid: i32,
        total: usize,
        sink: &dyn ProgressSink,
    ) -> AppResult<()> {
        for column in &data.table.columns {
            validate_identifier(&column.name)?;
        }
        let dialect = self.session.dialect;
        let table_sql = dialect.quote_ident(table);

        sink.report(ProgressEvent::new(0, total, "Creating spatial table..."));
        self.session
            .execute_raw(&format!("DROP TABLE IF EXISTS {}", table_sql))
            .await?;

        let mut defs: Vec<String> = data
            .table
            .columns
            .iter()
            .map(|c| {
                format!(
                    "{} {}",
                    dialect.quote_ident(&c.name),
                    crate::loader::sql_type(dialect, c.column_type)
                )
            })
            .collect();
        defs.push(format!("{} geometry(Geometry, {})", GEOM_COLUMN, srid));
        self.session
            .execute_raw(&format!("CREATE TABLE {} ({})", table_sql, defs.join(", ")))
            .await?;

        let cols_sql = data
            .table
            .columns
            .iter()
            .map(|c| dialect.quote_ident(&c.name))
            .chain(std::iter::once(GEOM_COLUMN.to_string()))
            .collect::<Vec<_>>()
            .join(", ");

        let indexed: Vec<usize> = (0..data.table.rows.len()).collect();
        for chunk in indexed.chunks(BATCH_SIZE) {
            let done = chunk[0];
            sink.report(ProgressEvent::new(
                done,
                total,
                format!("Importing spatial data... {}/{}", done, total),
            ));

            let mut qb = sqlx::QueryBuilder::<sqlx::Postgres>::new(format!(
                "INSERT INTO {} ({}) ",
                table_sql, cols_sql
            ));
            qb.push_values(chunk.iter(), |mut b, &row_idx| {
                for cell in &data.table.rows[row_idx] {
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
                match &data.geometry_wkt[row_idx] {
                    Some(wkt) => {
                        b.push("ST_GeomFromText(");
                        b.push_bind_unseparated(wkt.clone());
                        b.push_unseparated(format!(", {})", srid));
                    }
                    None => {
                        b.push("NULL");
                    }
                }
            });
            qb.build()
                .execute(pool)
                .await
                .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
        }
        Ok(())
    }

    /// Loads attribute columns first, then adds and fills a geometry
    /// column keyed by the first attribute column's value.
    async fn import_mysql(
        &self,
        data: &SpatialDataset,
        table: &str,
        srid: i32,
        total: usize,
        sink: &dyn ProgressSink,
    ) -> AppResult<()> {
        let key_column = data
            .table
            .columns
            .first()
            .map(|c| c.name.clone())
            .ok_or_else(|| {
                AppError::SpatialImport(
                    "MySQL spatial import requires at least one attribute column".into(),
                )
            })?;

        let loader = BulkLoader::new(self.session);
        sink.report(ProgressEvent::new(0, total, "Creating table structure..."));
        loader.create_or_replace(table, &data.table.columns).await?;
        for (index, batch) in data.table.rows.chunks(BATCH_SIZE).enumerate() {
            let done = index * BATCH_SIZE;
            sink.report(ProgressEvent::new(
                done,
                total,
                format!("Importing data... {}/{}", done, total),
            ));
            loader.insert_batch(table, &data.table.columns, batch).await?;
        }

        let dialect = self.session.dialect;
        let table_sql = dialect.quote_ident(table);
        sink.report(ProgressEvent::new(0, total, "Adding geometry column..."));
        self.session
            .execute_raw(&format!("ALTER TABLE {} ADD COLUMN geometry GEOMETRY", table_sql))
            .await?;

        let pool = match &self.session.handle {
            crate::session::DatabaseHandle::MySql(pool) => pool,
            _ => return Err(AppError::SpatialImport("not a MySQL session".into())),
        };
        let update_sql = format!(
            "UPDATE {} SET geometry = ST_GeomFromText(?, {}) WHERE {} = ?",
            table_sql,
            srid,
            dialect.quote_ident(&key_column)
        );

        for start in (0..total).step_by(GEOMETRY_UPDATE_BATCH) {
            sink.report(ProgressEvent::new(
                start,
                total,
                format!("Inserting geometry data... {}/{}", start, total),
            ));
            let end = (start + GEOMETRY_UPDATE_BATCH).min(total);
            for row_idx in start..end {
                let Some(wkt) = &data.geometry_wkt[row_idx] else {
                    continue;
                };
                let key = &data.table.rows[row_idx][0];
                let mut query = sqlx::query(&update_sql).bind(wkt.clone());
                query = match key {
                    CellValue::Null => query.bind(Option::<String>::None),
                    CellValue::Integer(v) => query.bind(*v),
                    CellValue::Float(v) => query.bind(*v),
                    CellValue::Boolean(v) => query.bind(*v),
                    CellValue::Text(v) => query.bind(v.clone()),
                };
                query
                    .execute(pool)
                    .await
                    .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
            }
        }

        sink.report(ProgressEvent::new(total, total, "Spatial import completed"));
        Ok(())
    }

    /// Plain bulk load with the geometry rendered into a WKT text column.
    async fn import_as_wkt(
        &self,
        data: &SpatialDataset,
        table: &str,
        sink: &dyn ProgressSink,
    ) -> AppResult<()> {
        let extended = with_wkt_column(data);
        BulkLoader::new(self.session).import(&extended, table, sink).await
    }
}

/// Appends the WKT geometry as a text column to the attribute table.
pub fn with_wkt_column(data: &SpatialDataset) -> TabularDataset {
    let mut columns = data.table.columns.clone();
    columns.push(Column {
        name: WKT_COLUMN.to_string(),
        column_type: ColumnType::Text,
    });
    let rows = data
        .table
        .rows
        .iter()
        .zip(&data.geometry_wkt)
        .map(|(row, wkt)| {
            let mut row = row.clone();
            row.push(match wkt {
                Some(w) => CellValue::Text(w.clone()),
                None => CellValue::Null,
            });
            row
        })
        .collect();
    TabularDataset { columns, rows }
}

/// Converts an existing WKT text column into a native geometry column
/// with a spatial index. PostgreSQL + PostGIS only.
pub async fn convert_wkt_to_geometry(
    session: &ActiveSession,
    table: &str,
    wkt_column: &str,
    srid: i32,
) -> AppResult<String> {
    let pool = session.pg_pool().ok_or_else(|| {
        AppError::UnsupportedDialect(
            "Geometry conversion is only available for PostgreSQL databases".into(),
        )
    })?;
    validate_identifier(table)?;
    validate_identifier(wkt_column)?;

    if !ExtensionManager::check(pool).await {
        return Err(AppError::SpatialImport(
            "PostGIS extension is required for geometry conversion".into(),
        ));
    }

    let dialect = session.dialect;
    let table_sql = dialect.quote_ident(table);
    let wkt_sql = dialect.quote_ident(wkt_column);

    session
        .execute_raw(&format!(
            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} geometry(Geometry, {})",
            table_sql, GEOM_COLUMN, srid
        ))
        .await?;
    session
        .execute_raw(&format!(
            "UPDATE {} SET {} = ST_GeomFromText({}, {}) WHERE {} IS NOT NULL",
            table_sql, GEOM_COLUMN, wkt_sql, srid, wkt_sql
        ))
        .await?;
    session
        .execute_raw(&format!(
            "CREATE INDEX IF NOT EXISTS {}_{}_idx ON {} USING GIST ({})",
            table, GEOM_COLUMN, table_sql, GEOM_COLUMN
        ))
        .await?;

    tracing::info!(table = %table, srid, "wkt column converted to geometry");
    Ok(format!(
        "Successfully converted WKT to geometry column in table '{}'",
        table
    ))
}

/// Lists tables carrying spatial data: native geometry columns and text
/// columns following the WKT naming convention. PostgreSQL only.
pub async fn spatial_tables(session: &ActiveSession) -> AppResult<Vec<SpatialTableInfo>> {
    let pool = session.pg_pool().ok_or_else(|| {
        AppError::UnsupportedDialect("Spatial tables are only listed for PostgreSQL".into())
    })?;

    let rows: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT table_name::text, column_name::text, 'geometry' AS kind
         FROM information_schema.columns
         WHERE data_type = 'USER-DEFINED' AND udt_name = 'geometry'
           AND table_schema = 'public'
         UNION
         SELECT table_name::text, column_name::text, 'wkt' AS kind
         FROM information_schema.columns
         WHERE table_schema = 'public'
           AND (column_name LIKE '%geometry_wkt%' OR column_name LIKE '%geom_wkt%')
         ORDER BY table_name",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;

    Ok(rows
        .into_iter()
        .map(|(table, column, kind)| SpatialTableInfo {
            table,
            column,
            kind: if kind == "geometry" {
                SpatialColumnKind::Geometry
            } else {
                SpatialColumnKind::Wkt
            },
        })
        .collect())
}

/// Parses a WKT string into drawable paths and points.
pub fn parse_wkt(text: &str) -> AppResult<ParsedGeometry> {
    let geometry = Geometry::<f64>::try_from_wkt_str(text.trim())
        .map_err(|e| AppError::InvalidWkt(e.to_string()))?;

    let mut parsed = ParsedGeometry {
        geom_type: geometry_type_name(&geometry).to_string(),
        paths: Vec::new(),
        points: Vec::new(),
    };
    decompose(&geometry, &mut parsed);
    Ok(parsed)
}

fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

fn decompose(geometry: &Geometry<f64>, out: &mut ParsedGeometry) {
    match geometry {
        Geometry::Point(p) => out.points.push([p.x(), p.y()]),
        Geometry::MultiPoint(mp) => {
            for p in &mp.0 {
                out.points.push([p.x(), p.y()]);
            }
        }
        Geometry::Line(l) => out
            .paths
            .push(vec![[l.start.x, l.start.y], [l.end.x, l.end.y]]),
        Geometry::LineString(ls) => out.paths.push(line_coords(ls)),
        Geometry::MultiLineString(mls) => {
            for ls in &mls.0 {
                out.paths.push(line_coords(ls));
            }
        }
        Geometry::Polygon(poly) => push_polygon(poly, out),
        Geometry::MultiPolygon(mp) => {
            for poly in &mp.0 {
                push_polygon(poly, out);
            }
        }
        Geometry::GeometryCollection(gc) => {
            for inner in &gc.0 {
                decompose(inner, out);
            }
        }
        Geometry::Rect(r) => {
            let (min, max) = (r.min(), r.max());
            out.paths.push(vec![
                [min.x, min.y],
                [max.x, min.y],
                [max.x, max.y],
                [min.x, max.y],
                [min.x, min.y],
            ]);
        }
        Geometry::Triangle(t) => {
            let [a, b, c] = t.to_array();
            out.paths
                .push(vec![[a.x, a.y], [b.x, b.y], [c.x, c.y], [a.x, a.y]]);
        }
    }
}

fn line_coords(ls: &geo_types::LineString<f64>) -> Vec<[f64; 2]> {
    ls.coords().map(|c| [c.x, c.y]).collect()
}

fn push_polygon(poly: &geo_types::Polygon<f64>, out: &mut ParsedGeometry) {
    out.paths.push(line_coords(poly.exterior()));
    for ring in poly.interiors() {
        out.paths.push(line_coords(ring));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::dataset::{CellValue, Column, ColumnType, TabularDataset};

    fn spatial_sample() -> SpatialDataset {
        SpatialDataset {
            table: TabularDataset {
                columns: vec![Column {
                    name: "name".into(),
                    column_type: ColumnType::Text,
                }],
                rows: vec![
                    vec![CellValue::Text("a".into())],
                    vec![CellValue::Text("b".into())],
                ],
            },
            geometry_wkt: vec![Some("POINT(1 2)".into()), None],
            srid: 4326,
        }
    }

    #[test]
    fn test_wkt_column_is_appended() {
        let extended = with_wkt_column(&spatial_sample());
        assert_eq!(
            extended.column_names(),
            vec!["name".to_string(), WKT_COLUMN.to_string()]
        );
        assert_eq!(extended.rows[0][1], CellValue::Text("POINT(1 2)".into()));
        assert_eq!(extended.rows[1][1], CellValue::Null);
    }

    #[test]
    fn test_parse_point_wkt() {
        let parsed = parse_wkt("POINT (30 10)").unwrap();
        assert_eq!(parsed.geom_type, "Point");
        assert_eq!(parsed.points, vec![[30.0, 10.0]]);
        assert!(parsed.paths.is_empty());
    }

    #[test]
    fn test_parse_polygon_wkt() {
        let parsed = parse_wkt("POLYGON ((0 0, 4 0, 4 4, 0 4, 0 0))").unwrap();
        assert_eq!(parsed.geom_type, "Polygon");
        assert_eq!(parsed.paths.len(), 1);
        assert_eq!(parsed.paths[0].len(), 5);
    }

    #[test]
    fn test_parse_rejects_malformed_wkt() {
        assert!(parse_wkt("POINT(1,2,banana)").is_err());
        assert!(parse_wkt("not wkt at all").is_err());
    }
}
