//! 连接管理端点

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use common::errors::AppError;
use common::models::connection::{ConnectionRequest, ConnectionStatus};
use common::response::ApiResponse;

use super::SERVICE_NAME;
use crate::state::AppState;

/// 测试数据库连接（不影响当前会话）
#[utoipa::path(
    post,
    path = "/api/connection/test",
    tag = "connection",
    request_body = ConnectionRequest,
    responses(
        (status = 200, description = "连接测试结果", body = ApiResponse<ConnectionTestResult>)
    )
)]
pub async fn test_connection(
    State(state): State<AppState>,
    Json(req): Json<ConnectionRequest>,
) -> Result<Json<ApiResponse<ConnectionTestResult>>, AppError> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let start = std::time::Instant::now();
    let success = state.session.test(&req).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    Ok(Json(ApiResponse::ok_with_service(
        ConnectionTestResult {
            success,
            latency_ms: success.then_some(latency_ms),
        },
        SERVICE_NAME,
    )))
}

/// 建立数据库会话（替换现有会话）
#[utoipa::path(
    post,
    path = "/api/connection/connect",
    tag = "connection",
    request_body = ConnectionRequest,
    responses(
        (status = 200, description = "会话已建立", body = ApiResponse<ConnectionStatus>),
        (status = 500, description = "连接失败")
    )
)]
pub async fn connect(
    State(state): State<AppState>,
    Json(req): Json<ConnectionRequest>,
) -> Result<Json<ApiResponse<ConnectionStatus>>, AppError> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state.session.connect(&req).await?;
    let status = state.session.status().await;
    Ok(Json(ApiResponse::ok_with_service(status, SERVICE_NAME)))
}

/// 断开当前数据库会话（幂等）
#[utoipa::path(
    post,
    path = "/api/connection/disconnect",
    tag = "connection",
    responses(
        (status = 200, description = "会话已断开", body = ApiResponse<ConnectionStatus>)
    )
)]
pub async fn disconnect(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ConnectionStatus>>, AppError> {
    state.session.disconnect().await;
    Ok(Json(ApiResponse::ok_with_service(
        ConnectionStatus::disconnected(),
        SERVICE_NAME,
    )))
}

/// 查询当前会话状态
#[utoipa::path(
    get,
    path = "/api/connection/status",
    tag = "connection",
    responses(
        (status = 200, description = "会话状态", body = ApiResponse<ConnectionStatus>)
    )
)]
pub async fn connection_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ConnectionStatus>>, AppError> {
    let status = state.session.status().await;
    Ok(Json(ApiResponse::ok_with_service(status, SERVICE_NAME)))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        connected: state.session.is_connected().await,
    })
}

/// 连接测试结果
#[derive(Serialize, ToSchema)]
pub struct ConnectionTestResult {
    /// 测试是否成功
    pub success: bool,
    /// 连接延迟（毫秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 是否存在活跃会话
    pub connected: bool,
}
