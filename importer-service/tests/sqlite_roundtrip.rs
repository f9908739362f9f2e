//! End-to-end tests against temp-file SQLite databases.
//!
//! SQLite is the one dialect that needs no server, so the whole
//! connect → import → query → spatial-fallback path runs for real here.

use std::path::Path;
use std::sync::Mutex;

use common::config::AppConfig;
use common::models::connection::{ConnectionRequest, Dialect};
use common::models::dataset::{CellValue, Column, ColumnType, SpatialDataset, TabularDataset};
use common::models::progress::{ProgressEvent, ProgressSink};
use importer_service::catalog;
use importer_service::loader::BulkLoader;
use importer_service::query_exec::QueryRunner;
use importer_service::session::{ActiveSession, SessionManager};
use importer_service::spatial::{self, SpatialImporter};
use tempfile::TempDir;

fn test_config() -> AppConfig {
    AppConfig {
        service_name: "importer-service-test".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        connect_timeout_secs: 3,
        max_connections: 2,
        open_browser: false,
    }
}

fn sqlite_request(path: &Path) -> ConnectionRequest {
    ConnectionRequest {
        dialect: Dialect::Sqlite,
        host: None,
        port: None,
        username: None,
        password: None,
        database: path.display().to_string(),
    }
}

async fn open_session(dir: &TempDir) -> (SessionManager, ActiveSession) {
    let manager = SessionManager::new(test_config());
    let request = sqlite_request(&dir.path().join("test.db"));
    manager.connect(&request).await.expect("sqlite connect");
    let session = manager.current().await.expect("session present");
    (manager, session)
}

/// Sink that records every event for later assertions.
#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn sample_dataset(rows: usize) -> TabularDataset {
    TabularDataset {
        columns: vec![
            Column {
                name: "id".to_string(),
                column_type: ColumnType::Integer,
            },
            Column {
                name: "name".to_string(),
                column_type: ColumnType::Text,
            },
            Column {
                name: "score".to_string(),
                column_type: ColumnType::Float,
            },
        ],
        rows: (0..rows)
            .map(|i| {
                vec![
                    CellValue::Integer(i as i64),
                    CellValue::Text(format!("row_{}", i)),
                    CellValue::Float(i as f64 / 2.0),
                ]
            })
            .collect(),
    }
}

async fn count_rows(session: &ActiveSession, table: &str) -> i64 {
    let result = QueryRunner::execute(session, &format!("SELECT COUNT(*) FROM {}", table), None)
        .await
        .expect("count query");
    result.rows[0][0].as_i64().expect("integer count")
}

#[tokio::test]
async fn test_connection_lifecycle() {
    let dir = TempDir::new().unwrap();
    let manager = SessionManager::new(test_config());
    let request = sqlite_request(&dir.path().join("lifecycle.db"));

    assert!(!manager.is_connected().await);

    // test() succeeds but never mutates the manager state.
    assert!(manager.test(&request).await);
    assert!(!manager.is_connected().await);

    manager.connect(&request).await.unwrap();
    assert!(manager.is_connected().await);
    let status = manager.status().await;
    assert_eq!(status.dialect, Some(Dialect::Sqlite));

    // disconnect is idempotent.
    manager.disconnect().await;
    manager.disconnect().await;
    assert!(!manager.is_connected().await);
    assert!(manager.current().await.is_err());
}

#[tokio::test]
async fn test_unreachable_host_fails_test() {
    let manager = SessionManager::new(test_config());
    let request = ConnectionRequest {
        dialect: Dialect::MySql,
        host: Some("127.0.0.1".to_string()),
        port: Some(1),
        username: Some("root".to_string()),
        password: None,
        database: "nope".to_string(),
    };
    assert!(!manager.test(&request).await);
    assert!(!manager.is_connected().await);
}

#[tokio::test]
async fn test_bulk_load_row_counts() {
    let dir = TempDir::new().unwrap();
    let (_manager, session) = open_session(&dir).await;
    let loader = BulkLoader::new(&session);

    // Zero, one and multi-batch loads all leave exactly N rows behind.
    for rows in [0usize, 1, 1500] {
        let dataset = sample_dataset(rows);
        let sink = RecordingSink::default();
        loader.import(&dataset, "measurements", &sink).await.unwrap();

        assert_eq!(count_rows(&session, "measurements").await, rows as i64);

        let messages = sink.messages();
        assert_eq!(messages.first().unwrap(), "Creating table structure...");
        assert_eq!(messages.last().unwrap(), "Import completed successfully");
    }

    let columns = catalog::table_columns(&session, "measurements").await.unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "score"]);
}

#[tokio::test]
async fn test_reimport_replaces_rows() {
    let dir = TempDir::new().unwrap();
    let (_manager, session) = open_session(&dir).await;
    let loader = BulkLoader::new(&session);

    let sink = RecordingSink::default();
    loader
        .import(&sample_dataset(300), "cities", &sink)
        .await
        .unwrap();
    loader
        .import(&sample_dataset(40), "cities", &sink)
        .await
        .unwrap();

    // Replace, not append.
    assert_eq!(count_rows(&session, "cities").await, 40);
}

#[tokio::test]
async fn test_select_and_write_statements() {
    let dir = TempDir::new().unwrap();
    let (_manager, session) = open_session(&dir).await;

    let one = QueryRunner::execute(&session, "SELECT 1", None).await.unwrap();
    assert_eq!(one.row_count, 1);
    assert_eq!(one.rows[0].len(), 1);
    assert_eq!(one.rows[0][0].as_i64(), Some(1));

    let created = QueryRunner::execute(&session, "CREATE TABLE t(x int)", None)
        .await
        .unwrap();
    assert_eq!(created.row_count, 0);
    assert!(created.rows.is_empty());

    let tables = catalog::list_tables(&session).await.unwrap();
    assert!(tables.contains(&"t".to_string()));
}

#[tokio::test]
async fn test_query_errors_propagate_verbatim() {
    let dir = TempDir::new().unwrap();
    let (_manager, session) = open_session(&dir).await;

    let err = QueryRunner::execute(&session, "SELECT * FROM missing_table", None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("missing_table"));
}

#[tokio::test]
async fn test_query_limit_truncates() {
    let dir = TempDir::new().unwrap();
    let (_manager, session) = open_session(&dir).await;
    let loader = BulkLoader::new(&session);
    loader
        .import(&sample_dataset(50), "limited", &RecordingSink::default())
        .await
        .unwrap();

    let result = QueryRunner::execute(&session, "SELECT * FROM limited", Some(10))
        .await
        .unwrap();
    assert_eq!(result.row_count, 10);
}

#[tokio::test]
async fn test_spatial_import_falls_back_to_wkt() {
    let dir = TempDir::new().unwrap();
    let (_manager, session) = open_session(&dir).await;

    let data = SpatialDataset {
        table: TabularDataset {
            columns: vec![Column {
                name: "name".to_string(),
                column_type: ColumnType::Text,
            }],
            rows: vec![
                vec![CellValue::Text("origin".to_string())],
                vec![CellValue::Text("unit".to_string())],
                vec![CellValue::Text("empty".to_string())],
            ],
        },
        geometry_wkt: vec![
            Some("POINT(0 0)".to_string()),
            Some("POLYGON((0 0,1 0,1 1,0 1,0 0))".to_string()),
            None,
        ],
        srid: 4326,
    };

    let sink = RecordingSink::default();
    SpatialImporter::new(&session)
        .import(&data, "places", None, &sink)
        .await
        .unwrap();

    // The geometry landed as a reconstructable WKT text column.
    let columns = catalog::table_columns(&session, "places").await.unwrap();
    assert!(columns.iter().any(|c| c.name == "geometry_wkt"));

    let result = QueryRunner::execute(
        &session,
        "SELECT geometry_wkt FROM places ORDER BY name",
        None,
    )
    .await
    .unwrap();
    assert_eq!(result.row_count, 3);

    // Sorted by name: empty, origin, unit.
    assert!(result.rows[0][0].is_null());

    let point = result.rows[1][0].as_str().unwrap();
    assert_eq!(spatial::parse_wkt(point).unwrap().geom_type, "Point");

    let polygon = result.rows[2][0].as_str().unwrap();
    let parsed = spatial::parse_wkt(polygon).unwrap();
    assert_eq!(parsed.geom_type, "Polygon");
    assert_eq!(parsed.paths[0].len(), 5);
}

#[tokio::test]
async fn test_spatial_reimport_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let (_manager, session) = open_session(&dir).await;

    let data = SpatialDataset {
        table: TabularDataset {
            columns: vec![Column {
                name: "id".to_string(),
                column_type: ColumnType::Integer,
            }],
            rows: (0..25).map(|i| vec![CellValue::Integer(i)]).collect(),
        },
        geometry_wkt: (0..25).map(|i| Some(format!("POINT({} {})", i, i))).collect(),
        srid: 4326,
    };

    let importer = SpatialImporter::new(&session);
    importer
        .import(&data, "points", None, &RecordingSink::default())
        .await
        .unwrap();
    importer
        .import(&data, "points", None, &RecordingSink::default())
        .await
        .unwrap();

    assert_eq!(count_rows(&session, "points").await, 25);
}
