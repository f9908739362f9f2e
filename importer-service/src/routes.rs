//! 路由模块

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::ui::index))
        .route("/api/connection/test", post(handlers::connection::test_connection))
        .route("/api/connection/connect", post(handlers::connection::connect))
        .route("/api/connection/disconnect", post(handlers::connection::disconnect))
        .route("/api/connection/status", get(handlers::connection::connection_status))
        .route("/api/datasets/load", post(handlers::datasets::load_dataset))
        .route("/api/datasets/current", get(handlers::datasets::current_dataset))
        .route("/api/import", post(handlers::import::start_import))
        .route("/api/import/jobs/{id}", get(handlers::import::job_status))
        .route("/api/query", post(handlers::query::execute_query))
        .route("/api/spatial/status", get(handlers::spatial::postgis_status))
        .route("/api/spatial/enable", post(handlers::spatial::enable_postgis))
        .route("/api/spatial/tables", get(handlers::spatial::spatial_tables))
        .route("/api/spatial/convert", post(handlers::spatial::convert_wkt))
        .route("/api/spatial/parse-wkt", post(handlers::spatial::parse_wkt))
        .route("/api/tables", get(handlers::tables::list_tables))
        .route("/api/tables/{name}/columns", get(handlers::tables::table_columns))
        .route("/api/health", get(handlers::connection::health_check))
}
