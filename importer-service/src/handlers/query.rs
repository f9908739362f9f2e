//! SQL 查询端点

use axum::{extract::State, Json};
use validator::Validate;

use common::errors::AppError;
use common::models::query::{QueryRequest, QueryResult};
use common::response::ApiResponse;

use super::SERVICE_NAME;
use crate::query_exec::QueryRunner;
use crate::state::AppState;

/// 在当前会话上执行 SQL 语句
#[utoipa::path(
    post,
    path = "/api/query",
    tag = "query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "执行成功", body = ApiResponse<QueryResult>),
        (status = 409, description = "未连接数据库"),
        (status = 500, description = "SQL 执行失败，错误信息原样返回")
    )
)]
pub async fn execute_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<ApiResponse<QueryResult>>, AppError> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let session = state.session.current().await?;
    let result = QueryRunner::execute(&session, &req.sql, req.limit).await?;
    Ok(Json(ApiResponse::ok_with_service(result, SERVICE_NAME)))
}
