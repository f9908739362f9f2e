//! Shared data models for the importer service.

pub mod connection;
pub mod dataset;
pub mod progress;
pub mod query;
pub mod spatial;

// Re-export commonly used types
pub use connection::{ConnectionRequest, ConnectionStatus, Dialect};
pub use dataset::{CellValue, Column, ColumnType, SpatialDataset, TabularDataset};
pub use progress::{JobState, ProgressEvent, ProgressSink};
pub use query::{ColumnInfo, QueryRequest, QueryResult};
pub use spatial::{ParsedGeometry, SpatialColumnKind, SpatialTableInfo};
