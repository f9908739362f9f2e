//! Handler模块

pub mod connection;
pub mod datasets;
pub mod import;
pub mod query;
pub mod spatial;
pub mod tables;
pub mod ui;

pub(crate) const SERVICE_NAME: &str = "importer-service";
