//! 通用数据库导入工具
//!
//! 提供数据库连接、数据导入、SQL 查询与空间工具，包括：
//! - 四种数据库方言的连接管理（MySQL / PostgreSQL / SQLite / SQL Server）
//! - CSV 与 Shapefile 文件的批量导入
//! - 即席 SQL 执行
//! - PostGIS 扩展管理与 WKT 几何工具

use axum::{middleware, routing::get, Json, Router};
use common::config::AppConfig;
use common::middleware::request_id::request_id_middleware;
use importer_service::state::AppState;
use importer_service::{datasets, handlers, jobs, routes};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "importer-service";
const DEFAULT_PORT: u16 = 8080;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "数据库导入工具 API",
        version = "0.1.0",
        description = "通用数据库导入工具后端服务"
    ),
    paths(
        handlers::connection::test_connection,
        handlers::connection::connect,
        handlers::connection::disconnect,
        handlers::connection::connection_status,
        handlers::connection::health_check,
        handlers::datasets::load_dataset,
        handlers::datasets::current_dataset,
        handlers::import::start_import,
        handlers::import::job_status,
        handlers::query::execute_query,
        handlers::spatial::postgis_status,
        handlers::spatial::enable_postgis,
        handlers::spatial::spatial_tables,
        handlers::spatial::convert_wkt,
        handlers::spatial::parse_wkt,
        handlers::tables::list_tables,
        handlers::tables::table_columns,
    ),
    components(schemas(
        common::models::ConnectionRequest,
        common::models::ConnectionStatus,
        common::models::Dialect,
        common::models::QueryRequest,
        common::models::QueryResult,
        common::models::ColumnInfo,
        common::models::Column,
        common::models::ColumnType,
        common::models::ProgressEvent,
        common::models::JobState,
        common::models::SpatialTableInfo,
        common::models::SpatialColumnKind,
        common::models::ParsedGeometry,
        datasets::DatasetKind,
        datasets::DatasetSummary,
        jobs::ImportJobStatus,
        handlers::connection::ConnectionTestResult,
        handlers::connection::HealthResponse,
        handlers::datasets::LoadDatasetRequest,
        handlers::import::ImportRequest,
        handlers::import::ImportStarted,
        handlers::spatial::PostgisStatus,
        handlers::spatial::EnableResult,
        handlers::spatial::ConvertRequest,
        handlers::spatial::ConvertResult,
        handlers::spatial::ParseWktRequest,
    )),
    tags(
        (name = "connection", description = "连接管理端点"),
        (name = "datasets", description = "数据文件端点"),
        (name = "import", description = "数据导入端点"),
        (name = "query", description = "查询执行端点"),
        (name = "spatial", description = "空间工具端点"),
        (name = "tables", description = "表结构端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Load .env file (if present) before anything else
    load_dotenv();

    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置
    let mut config = AppConfig::load_with_service(SERVICE_NAME);
    config.port = std::env::var("SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    // 创建应用状态
    let state = AppState::new(config.clone());

    // 创建路由
    let app = create_router(state);

    // 启动服务
    let addr = format!("{}:{}", config.host, config.port);
    info!(service = SERVICE_NAME, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr).await.expect("绑定地址失败");

    if config.open_browser {
        let url = format!("http://{}:{}/", config.host, config.port);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = open::that(&url) {
                tracing::warn!(error = %e, "无法打开浏览器");
            }
        });
    }

    axum::serve(listener, app).await.expect("服务启动失败");
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Load .env file from the working directory (best-effort, no error if missing).
fn load_dotenv() {
    let env_path = std::path::Path::new(".env");
    if env_path.exists() {
        if let Ok(content) = std::fs::read_to_string(env_path) {
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim();
                    // Only set if not already set by the environment
                    if std::env::var(key).is_err() {
                        std::env::set_var(key, value);
                    }
                }
            }
        }
    }
}
