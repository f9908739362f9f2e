//! 数据文件加载端点

use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use common::errors::AppError;
use common::response::ApiResponse;

use super::SERVICE_NAME;
use crate::datasets::{DatasetKind, DatasetSummary};
use crate::state::AppState;

/// 加载 CSV 或 Shapefile 文件
#[utoipa::path(
    post,
    path = "/api/datasets/load",
    tag = "datasets",
    request_body = LoadDatasetRequest,
    responses(
        (status = 200, description = "数据已加载", body = ApiResponse<DatasetSummary>),
        (status = 500, description = "文件读取失败")
    )
)]
pub async fn load_dataset(
    State(state): State<AppState>,
    Json(req): Json<LoadDatasetRequest>,
) -> Result<Json<ApiResponse<DatasetSummary>>, AppError> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let summary = state.datasets.load(req.path, req.kind).await?;
    Ok(Json(ApiResponse::ok_with_service(summary, SERVICE_NAME)))
}

/// 查看当前已加载的数据
#[utoipa::path(
    get,
    path = "/api/datasets/current",
    tag = "datasets",
    responses(
        (status = 200, description = "当前数据概要", body = ApiResponse<DatasetSummary>),
        (status = 409, description = "尚未加载任何文件")
    )
)]
pub async fn current_dataset(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DatasetSummary>>, AppError> {
    let loaded = state.datasets.current().await?;
    Ok(Json(ApiResponse::ok_with_service(
        loaded.summary(),
        SERVICE_NAME,
    )))
}

/// 文件加载请求
#[derive(Deserialize, Validate, ToSchema)]
pub struct LoadDatasetRequest {
    /// 本地文件路径
    #[validate(length(min = 1, message = "File path is required"))]
    pub path: String,
    /// 文件类型
    pub kind: DatasetKind,
}
