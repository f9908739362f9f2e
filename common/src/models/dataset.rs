//! In-memory dataset models.
//!
//! A dataset is loaded once from a file and is immutable afterwards except
//! for column-subset projection chosen by the user.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Inferred type of a dataset column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit floating point.
    Float,
    /// Boolean.
    Boolean,
    /// Arbitrary text.
    Text,
}

impl ColumnType {
    /// Unifies two observed cell types into the narrowest common column type.
    ///
    /// Integer widens to Float; everything else widens to Text.
    pub fn unify(self, other: ColumnType) -> ColumnType {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Integer, Float) | (Float, Integer) => Float,
            _ => Text,
        }
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum CellValue {
    /// Missing value.
    Null,
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// Boolean value.
    Boolean(bool),
    /// Text value.
    Text(String),
}

impl CellValue {
    /// Renders the cell as a JSON value for previews and API responses.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Null => serde_json::Value::Null,
            CellValue::Integer(v) => serde_json::Value::from(*v),
            CellValue::Float(v) => serde_json::Value::from(*v),
            CellValue::Boolean(v) => serde_json::Value::from(*v),
            CellValue::Text(v) => serde_json::Value::from(v.clone()),
        }
    }

    /// Observed type of this cell, if it carries one.
    pub fn cell_type(&self) -> Option<ColumnType> {
        match self {
            CellValue::Null => None,
            CellValue::Integer(_) => Some(ColumnType::Integer),
            CellValue::Float(_) => Some(ColumnType::Float),
            CellValue::Boolean(_) => Some(ColumnType::Boolean),
            CellValue::Text(_) => Some(ColumnType::Text),
        }
    }
}

/// A named, typed dataset column.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Column {
    /// Column name as it appeared in the source file.
    pub name: String,
    /// Inferred column type.
    pub column_type: ColumnType,
}

/// An in-memory table: ordered columns plus row-major cell data.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TabularDataset {
    /// Ordered column descriptors.
    pub columns: Vec<Column>,
    /// Row-major cell data; every row has `columns.len()` cells.
    pub rows: Vec<Vec<CellValue>>,
}

impl TabularDataset {
    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Returns a new dataset containing only the named columns, in the
    /// order given. Unknown names are ignored.
    pub fn project(&self, selected: &[String]) -> TabularDataset {
        let picked: Vec<usize> = selected
            .iter()
            .filter_map(|name| self.columns.iter().position(|c| &c.name == name))
            .collect();

        TabularDataset {
            columns: picked.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| picked.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }
}

/// A tabular dataset with an associated geometry column and SRID.
///
/// The geometry is kept as well-known text alongside the attribute table,
/// one entry per row (None for missing geometries).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SpatialDataset {
    /// Attribute columns (geometry excluded).
    pub table: TabularDataset,
    /// Well-known-text geometry per row.
    pub geometry_wkt: Vec<Option<String>>,
    /// Spatial reference identifier (EPSG code).
    pub srid: i32,
}

impl SpatialDataset {
    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.table.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_unification() {
        assert_eq!(
            ColumnType::Integer.unify(ColumnType::Float),
            ColumnType::Float
        );
        assert_eq!(
            ColumnType::Integer.unify(ColumnType::Integer),
            ColumnType::Integer
        );
        assert_eq!(ColumnType::Boolean.unify(ColumnType::Text), ColumnType::Text);
        assert_eq!(ColumnType::Float.unify(ColumnType::Boolean), ColumnType::Text);
    }

    fn sample() -> TabularDataset {
        TabularDataset {
            columns: vec![
                Column {
                    name: "id".into(),
                    column_type: ColumnType::Integer,
                },
                Column {
                    name: "name".into(),
                    column_type: ColumnType::Text,
                },
                Column {
                    name: "score".into(),
                    column_type: ColumnType::Float,
                },
            ],
            rows: vec![
                vec![
                    CellValue::Integer(1),
                    CellValue::Text("a".into()),
                    CellValue::Float(0.5),
                ],
                vec![
                    CellValue::Integer(2),
                    CellValue::Text("b".into()),
                    CellValue::Null,
                ],
            ],
        }
    }

    #[test]
    fn test_project_keeps_selection_order() {
        let projected = sample().project(&["score".into(), "id".into()]);
        assert_eq!(projected.column_names(), vec!["score", "id"]);
        assert_eq!(projected.rows[0], vec![CellValue::Float(0.5), CellValue::Integer(1)]);
    }

    #[test]
    fn test_project_ignores_unknown_columns() {
        let projected = sample().project(&["missing".into(), "name".into()]);
        assert_eq!(projected.column_names(), vec!["name"]);
        assert_eq!(projected.row_count(), 2);
    }
}
