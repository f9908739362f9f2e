//! 表结构查询端点

use axum::extract::{Path, State};
use axum::Json;

use common::errors::AppError;
use common::models::query::ColumnInfo;
use common::response::ApiResponse;

use super::SERVICE_NAME;
use crate::catalog;
use crate::state::AppState;

/// 列出当前数据库中的用户表
#[utoipa::path(
    get,
    path = "/api/tables",
    tag = "tables",
    responses(
        (status = 200, description = "表名列表", body = ApiResponse<Vec<String>>),
        (status = 409, description = "未连接数据库")
    )
)]
pub async fn list_tables(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let session = state.session.current().await?;
    let tables = catalog::list_tables(&session).await?;
    Ok(Json(ApiResponse::ok_with_service(tables, SERVICE_NAME)))
}

/// 列出指定表的列信息
#[utoipa::path(
    get,
    path = "/api/tables/{name}/columns",
    tag = "tables",
    params(
        ("name" = String, Path, description = "表名")
    ),
    responses(
        (status = 200, description = "列信息", body = ApiResponse<Vec<ColumnInfo>>),
        (status = 409, description = "未连接数据库")
    )
)]
pub async fn table_columns(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<Vec<ColumnInfo>>>, AppError> {
    let session = state.session.current().await?;
    let columns = catalog::table_columns(&session, &name).await?;
    Ok(Json(ApiResponse::ok_with_service(columns, SERVICE_NAME)))
}
