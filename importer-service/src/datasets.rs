//! Dataset loading and the in-memory store.
//!
//! Files are read once into an immutable in-memory dataset; the store holds
//! the single currently-loaded file the way the session manager holds the
//! single connection.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use common::errors::{AppError, AppResult};
use common::models::dataset::{
    CellValue, Column, ColumnType, SpatialDataset, TabularDataset,
};
use common::utils::idents::sanitize_identifier;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;
use wkt::ToWkt;

/// Rows shown in the UI preview.
const PREVIEW_ROWS: usize = 20;

/// Kind of file the user picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// Delimited text file with a header row.
    Csv,
    /// ESRI shapefile (with `.dbf` attributes and optional `.prj`).
    Shapefile,
}

/// The loaded data, tabular or spatial.
pub enum LoadedDataset {
    /// Plain table from a CSV file.
    Tabular(TabularDataset),
    /// Attribute table plus WKT geometry from a shapefile.
    Spatial(SpatialDataset),
}

/// A loaded file with its derived metadata.
pub struct LoadedFile {
    /// File name (no directory).
    pub file_name: String,
    /// Table name suggested from the file stem.
    pub suggested_table: String,
    /// Kind of the source file.
    pub kind: DatasetKind,
    /// The parsed data.
    pub dataset: LoadedDataset,
}

impl LoadedFile {
    fn attribute_table(&self) -> &TabularDataset {
        match &self.dataset {
            LoadedDataset::Tabular(t) => t,
            LoadedDataset::Spatial(s) => &s.table,
        }
    }

    /// Builds the UI-facing summary with a bounded preview.
    pub fn summary(&self) -> DatasetSummary {
        let table = self.attribute_table();
        let (has_geometry, srid) = match &self.dataset {
            LoadedDataset::Tabular(_) => (false, None),
            LoadedDataset::Spatial(s) => (true, Some(s.srid)),
        };
        DatasetSummary {
            file_name: self.file_name.clone(),
            suggested_table: self.suggested_table.clone(),
            kind: self.kind,
            columns: table.columns.clone(),
            row_count: table.row_count(),
            has_geometry,
            srid,
            preview: table
                .rows
                .iter()
                .take(PREVIEW_ROWS)
                .map(|row| row.iter().map(CellValue::to_json).collect())
                .collect(),
        }
    }
}

/// Summary of the loaded dataset for the Import tab.
#[derive(Debug, Serialize, ToSchema)]
pub struct DatasetSummary {
    /// Source file name.
    pub file_name: String,
    /// Table name suggested from the file stem.
    pub suggested_table: String,
    /// Source file kind.
    pub kind: DatasetKind,
    /// Attribute columns (geometry excluded).
    pub columns: Vec<Column>,
    /// Total data rows.
    pub row_count: usize,
    /// Whether a geometry column accompanies the attributes.
    pub has_geometry: bool,
    /// SRID derived from the `.prj` sidecar, when spatial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srid: Option<i32>,
    /// First rows of attribute data, as JSON values.
    pub preview: Vec<Vec<serde_json::Value>>,
}

/// Holds the single currently-loaded dataset.
pub struct DatasetStore {
    current: RwLock<Option<Arc<LoadedFile>>>,
}

impl DatasetStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// Reads the file and replaces the current dataset with it.
    pub async fn load(&self, path: String, kind: DatasetKind) -> AppResult<DatasetSummary> {
        let loaded = tokio::task::spawn_blocking(move || read_file(&path, kind))
            .await
            .map_err(|e| AppError::DatasetRead(e.to_string()))?
            .map_err(|e| AppError::DatasetRead(format!("{:#}", e)))?;

        let loaded = Arc::new(loaded);
        let summary = loaded.summary();
        tracing::info!(
            file = %summary.file_name,
            rows = summary.row_count,
            columns = summary.columns.len(),
            spatial = summary.has_geometry,
            "dataset loaded"
        );
        *self.current.write().await = Some(loaded);
        Ok(summary)
    }

    /// The currently-loaded file, or `DatasetNotLoaded`.
    pub async fn current(&self) -> AppResult<Arc<LoadedFile>> {
        self.current
            .read()
            .await
            .clone()
            .ok_or(AppError::DatasetNotLoaded)
    }
}

impl Default for DatasetStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read_file(path: &str, kind: DatasetKind) -> anyhow::Result<LoadedFile> {
    let path_ref = Path::new(path);
    let file_name = path_ref
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    let suggested_table = sanitize_identifier(
        &path_ref
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );

    let dataset = match kind {
        DatasetKind::Csv => LoadedDataset::Tabular(read_csv(path_ref)?),
        DatasetKind::Shapefile => LoadedDataset::Spatial(read_shapefile(path_ref)?),
    };

    Ok(LoadedFile {
        file_name,
        suggested_table,
        kind,
        dataset,
    })
}

// ============== CSV ==============

fn read_csv(path: &Path) -> anyhow::Result<TabularDataset> {
    let mut reader = csv::ReaderBuilder::new()
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    anyhow::ensure!(!headers.is_empty(), "CSV has no header row");

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.context("reading CSV record")?;
        raw_rows.push(record.iter().map(|c| c.to_string()).collect());
    }

    // Pass 1: infer a type per column from what every cell parses as.
    let mut types: Vec<Option<ColumnType>> = vec![None; headers.len()];
    for row in &raw_rows {
        for (i, raw) in row.iter().enumerate().take(headers.len()) {
            if let Some(observed) = infer_cell(raw).cell_type() {
                types[i] = Some(match types[i] {
                    Some(t) => t.unify(observed),
                    None => observed,
                });
            }
        }
    }

    let columns: Vec<Column> = headers
        .iter()
        .zip(&types)
        .map(|(name, t)| Column {
            name: name.clone(),
            column_type: t.unwrap_or(ColumnType::Text),
        })
        .collect();

    // Pass 2: materialize cells at the unified column type.
    let rows: Vec<Vec<CellValue>> = raw_rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let raw = row.get(i).map(String::as_str).unwrap_or("");
                    coerce_cell(raw, col.column_type)
                })
                .collect()
        })
        .collect();

    Ok(TabularDataset { columns, rows })
}

/// Parses a raw cell at its most specific type.
fn infer_cell(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Null;
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return CellValue::Integer(v);
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        if v.is_finite() {
            return CellValue::Float(v);
        }
    }
    if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        return CellValue::Boolean(trimmed.eq_ignore_ascii_case("true"));
    }
    CellValue::Text(trimmed.to_string())
}

/// Parses a raw cell at the column's unified type.
fn coerce_cell(raw: &str, column_type: ColumnType) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Null;
    }
    match column_type {
        ColumnType::Integer => trimmed
            .parse::<i64>()
            .map(CellValue::Integer)
            .unwrap_or(CellValue::Null),
        ColumnType::Float => trimmed
            .parse::<f64>()
            .map(CellValue::Float)
            .unwrap_or(CellValue::Null),
        ColumnType::Boolean => CellValue::Boolean(trimmed.eq_ignore_ascii_case("true")),
        ColumnType::Text => CellValue::Text(trimmed.to_string()),
    }
}

// ============== Shapefile ==============

fn read_shapefile(path: &Path) -> anyhow::Result<SpatialDataset> {
    // Field order comes from the .dbf header; records themselves do not
    // guarantee one.
    let dbf_path = path.with_extension("dbf");
    let field_names: Vec<String> = {
        let dbf_reader = shapefile::dbase::Reader::from_path(&dbf_path)
            .with_context(|| format!("opening {}", dbf_path.display()))?;
        dbf_reader
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    };

    let mut reader = shapefile::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    let mut geometry_wkt: Vec<Option<String>> = Vec::new();

    for pair in reader.iter_shapes_and_records() {
        let (shape, record) = pair.context("reading shapefile record")?;
        let row = field_names
            .iter()
            .map(|name| field_to_cell(record.get(name)))
            .collect();
        rows.push(row);
        geometry_wkt.push(shape_to_wkt(shape)?);
    }

    // Attribute types from the cells themselves, same rules as CSV.
    let mut types: Vec<Option<ColumnType>> = vec![None; field_names.len()];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(observed) = cell.cell_type() {
                types[i] = Some(match types[i] {
                    Some(t) => t.unify(observed),
                    None => observed,
                });
            }
        }
    }
    let columns = field_names
        .into_iter()
        .zip(types)
        .map(|(name, t)| Column {
            name,
            column_type: t.unwrap_or(ColumnType::Text),
        })
        .collect();

    let srid = read_prj_srid(path);

    Ok(SpatialDataset {
        table: TabularDataset { columns, rows },
        geometry_wkt,
        srid,
    })
}

fn field_to_cell(value: Option<&shapefile::dbase::FieldValue>) -> CellValue {
    use shapefile::dbase::FieldValue;
    match value {
        None => CellValue::Null,
        Some(FieldValue::Character(v)) => match v {
            Some(s) if !s.trim().is_empty() => CellValue::Text(s.trim().to_string()),
            _ => CellValue::Null,
        },
        Some(FieldValue::Numeric(v)) => match v {
            Some(n) => CellValue::Float(*n),
            None => CellValue::Null,
        },
        Some(FieldValue::Logical(v)) => match v {
            Some(b) => CellValue::Boolean(*b),
            None => CellValue::Null,
        },
        Some(FieldValue::Integer(v)) => CellValue::Integer(*v as i64),
        Some(FieldValue::Float(v)) => match v {
            Some(n) => CellValue::Float(*n as f64),
            None => CellValue::Null,
        },
        Some(FieldValue::Double(v)) => CellValue::Float(*v),
        Some(FieldValue::Currency(v)) => CellValue::Float(*v),
        Some(FieldValue::Date(v)) => match v {
            Some(d) => CellValue::Text(format!(
                "{:04}-{:02}-{:02}",
                d.year(),
                d.month(),
                d.day()
            )),
            None => CellValue::Null,
        },
        Some(other) => CellValue::Text(format!("{:?}", other)),
    }
}

fn shape_to_wkt(shape: shapefile::Shape) -> anyhow::Result<Option<String>> {
    if matches!(shape, shapefile::Shape::NullShape) {
        return Ok(None);
    }
    let geometry = geo_types::Geometry::<f64>::try_from(shape)
        .map_err(|e| anyhow::anyhow!("unsupported shape: {:?}", e))?;
    Ok(Some(geometry.wkt_string()))
}

/// Derives the SRID from the `.prj` sidecar; EPSG:4326 when undeterminable.
fn read_prj_srid(shp_path: &Path) -> i32 {
    let prj_path = shp_path.with_extension("prj");
    match std::fs::read_to_string(&prj_path) {
        Ok(content) => derive_srid(&content),
        Err(_) => {
            tracing::debug!(path = %prj_path.display(), "no .prj sidecar, assuming EPSG:4326");
            4326
        }
    }
}

/// Maps a projection WKT description to an EPSG code.
///
/// Looks for an explicit EPSG authority tag first (the outermost one is
/// last in the text), then falls back to recognizing the two projections
/// that cover most shapefiles in the wild.
pub fn derive_srid(prj: &str) -> i32 {
    if let Some(code) = last_epsg_authority(prj) {
        return code;
    }
    if prj.contains("Web_Mercator") || prj.contains("Pseudo-Mercator") {
        return 3857;
    }
    if prj.contains("WGS_1984") || prj.contains("WGS 84") {
        return 4326;
    }
    4326
}

fn last_epsg_authority(prj: &str) -> Option<i32> {
    let mut last = None;
    let mut rest = prj;
    while let Some(pos) = rest.find("\"EPSG\"") {
        let tail = &rest[pos + 6..];
        let digits: String = tail
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(code) = digits.parse() {
            last = Some(code);
        }
        rest = tail;
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_infer_cell_types() {
        assert_eq!(infer_cell("42"), CellValue::Integer(42));
        assert_eq!(infer_cell("-3.5"), CellValue::Float(-3.5));
        assert_eq!(infer_cell("TRUE"), CellValue::Boolean(true));
        assert_eq!(infer_cell(""), CellValue::Null);
        assert_eq!(infer_cell("hello"), CellValue::Text("hello".into()));
    }

    #[test]
    fn test_csv_column_inference_promotes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,score,label").unwrap();
        writeln!(file, "1,2,alpha").unwrap();
        writeln!(file, "2,2.5,beta").unwrap();
        writeln!(file, "3,,gamma").unwrap();
        file.flush().unwrap();

        let dataset = read_csv(file.path()).unwrap();
        assert_eq!(dataset.columns[0].column_type, ColumnType::Integer);
        assert_eq!(dataset.columns[1].column_type, ColumnType::Float);
        assert_eq!(dataset.columns[2].column_type, ColumnType::Text);
        assert_eq!(dataset.row_count(), 3);
        // Integer cells widen to float in a float column.
        assert_eq!(dataset.rows[0][1], CellValue::Float(2.0));
        assert_eq!(dataset.rows[2][1], CellValue::Null);
    }

    #[test]
    fn test_mixed_column_becomes_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "v").unwrap();
        writeln!(file, "1").unwrap();
        writeln!(file, "x").unwrap();
        file.flush().unwrap();

        let dataset = read_csv(file.path()).unwrap();
        assert_eq!(dataset.columns[0].column_type, ColumnType::Text);
        assert_eq!(dataset.rows[0][0], CellValue::Text("1".into()));
    }

    #[test]
    fn test_derive_srid_from_authority() {
        let prj = r#"PROJCS["X",GEOGCS["Y",AUTHORITY["EPSG","4269"]],AUTHORITY["EPSG","26918"]]"#;
        assert_eq!(derive_srid(prj), 26918);
    }

    #[test]
    fn test_derive_srid_heuristics() {
        assert_eq!(
            derive_srid(r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984"]]"#),
            4326
        );
        assert_eq!(
            derive_srid(r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere"]"#),
            3857
        );
        assert_eq!(derive_srid("UNKNOWN"), 4326);
    }
}
