//! Spatial tooling models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// How a table stores its spatial data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SpatialColumnKind {
    /// Native geometry column (PostGIS).
    Geometry,
    /// Well-known-text stored in a plain text column.
    Wkt,
}

/// A table/column pair carrying spatial data.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SpatialTableInfo {
    /// Table name.
    pub table: String,
    /// Column holding the spatial data.
    pub column: String,
    /// Storage kind of the column.
    pub kind: SpatialColumnKind,
}

/// Geometry decomposed for client-side drawing.
///
/// Points become entries in `points`; lines and polygon rings become entries
/// in `paths`. Coordinates are `[x, y]` pairs in the geometry's own CRS.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParsedGeometry {
    /// Geometry type name (Point, LineString, Polygon, ...).
    pub geom_type: String,
    /// Polyline paths (line strings and polygon rings).
    pub paths: Vec<Vec<[f64; 2]>>,
    /// Standalone points.
    pub points: Vec<[f64; 2]>,
}
