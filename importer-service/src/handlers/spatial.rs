//! 空间工具端点

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use common::errors::AppError;
use common::models::spatial::{ParsedGeometry, SpatialTableInfo};
use common::response::ApiResponse;

use super::SERVICE_NAME;
use crate::extension::ExtensionManager;
use crate::spatial;
use crate::state::AppState;

/// 查询 PostGIS 扩展状态
#[utoipa::path(
    get,
    path = "/api/spatial/status",
    tag = "spatial",
    responses(
        (status = 200, description = "扩展状态", body = ApiResponse<PostgisStatus>),
        (status = 409, description = "未连接数据库")
    )
)]
pub async fn postgis_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PostgisStatus>>, AppError> {
    let session = state.session.current().await?;
    let status = match session.pg_pool() {
        None => PostgisStatus {
            available: false,
            message: "PostGIS is only available for PostgreSQL databases".to_string(),
        },
        Some(pool) => match ExtensionManager::installed(pool).await {
            Ok(true) => PostgisStatus {
                available: true,
                message: "PostGIS is enabled".to_string(),
            },
            Ok(false) => PostgisStatus {
                available: false,
                message: "PostGIS is not enabled".to_string(),
            },
            Err(e) => PostgisStatus {
                available: false,
                message: format!("Error checking PostGIS: {}", e),
            },
        },
    };
    Ok(Json(ApiResponse::ok_with_service(status, SERVICE_NAME)))
}

/// 尝试启用 PostGIS 扩展
#[utoipa::path(
    post,
    path = "/api/spatial/enable",
    tag = "spatial",
    responses(
        (status = 200, description = "启用结果", body = ApiResponse<EnableResult>),
        (status = 409, description = "未连接数据库")
    )
)]
pub async fn enable_postgis(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<EnableResult>>, AppError> {
    let session = state.session.current().await?;
    let result = match session.pg_pool() {
        None => EnableResult {
            enabled: false,
            message: "PostGIS is only available for PostgreSQL databases".to_string(),
        },
        Some(pool) => {
            let (enabled, message) = ExtensionManager::enable(pool).await;
            EnableResult { enabled, message }
        }
    };
    Ok(Json(ApiResponse::ok_with_service(result, SERVICE_NAME)))
}

/// 列出包含空间数据的表
#[utoipa::path(
    get,
    path = "/api/spatial/tables",
    tag = "spatial",
    responses(
        (status = 200, description = "空间表列表", body = ApiResponse<Vec<SpatialTableInfo>>),
        (status = 409, description = "未连接数据库"),
        (status = 422, description = "非 PostgreSQL 会话")
    )
)]
pub async fn spatial_tables(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<SpatialTableInfo>>>, AppError> {
    let session = state.session.current().await?;
    let tables = spatial::spatial_tables(&session).await?;
    Ok(Json(ApiResponse::ok_with_service(tables, SERVICE_NAME)))
}

/// 将 WKT 文本列转换为原生几何列
#[utoipa::path(
    post,
    path = "/api/spatial/convert",
    tag = "spatial",
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "转换结果", body = ApiResponse<ConvertResult>),
        (status = 409, description = "未连接数据库"),
        (status = 422, description = "非 PostgreSQL 会话")
    )
)]
pub async fn convert_wkt(
    State(state): State<AppState>,
    Json(req): Json<ConvertRequest>,
) -> Result<Json<ApiResponse<ConvertResult>>, AppError> {
    let session = state.session.current().await?;
    let srid = req.srid.unwrap_or(4326);
    let message =
        spatial::convert_wkt_to_geometry(&session, &req.table, &req.wkt_column, srid).await?;
    Ok(Json(ApiResponse::ok_with_service(
        ConvertResult { message },
        SERVICE_NAME,
    )))
}

/// 解析 WKT 几何用于可视化
#[utoipa::path(
    post,
    path = "/api/spatial/parse-wkt",
    tag = "spatial",
    request_body = ParseWktRequest,
    responses(
        (status = 200, description = "解析结果", body = ApiResponse<ParsedGeometry>),
        (status = 400, description = "WKT 格式错误")
    )
)]
pub async fn parse_wkt(
    Json(req): Json<ParseWktRequest>,
) -> Result<Json<ApiResponse<ParsedGeometry>>, AppError> {
    let parsed = spatial::parse_wkt(&req.wkt)?;
    Ok(Json(ApiResponse::ok_with_service(parsed, SERVICE_NAME)))
}

/// PostGIS 状态
#[derive(Serialize, ToSchema)]
pub struct PostgisStatus {
    /// 扩展是否已启用
    pub available: bool,
    /// 状态说明
    pub message: String,
}

/// 启用结果
#[derive(Serialize, ToSchema)]
pub struct EnableResult {
    /// 是否启用成功
    pub enabled: bool,
    /// 结果说明（权限不足时包含处理建议）
    pub message: String,
}

/// WKT 转换请求
#[derive(Deserialize, ToSchema)]
pub struct ConvertRequest {
    /// 目标表
    pub table: String,
    /// WKT 文本列名
    pub wkt_column: String,
    /// SRID（默认 4326）
    #[serde(default)]
    pub srid: Option<i32>,
}

/// WKT 转换结果
#[derive(Serialize, ToSchema)]
pub struct ConvertResult {
    /// 结果说明
    pub message: String,
}

/// WKT 解析请求
#[derive(Deserialize, ToSchema)]
pub struct ParseWktRequest {
    /// WKT 文本
    pub wkt: String,
}
