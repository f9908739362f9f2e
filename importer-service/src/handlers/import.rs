//! 数据导入端点

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use common::errors::AppError;
use common::models::dataset::SpatialDataset;
use common::models::progress::JobState;
use common::response::ApiResponse;
use common::utils::validate_identifier;

use super::SERVICE_NAME;
use crate::datasets::LoadedDataset;
use crate::jobs::{ImportJobStatus, JobSink};
use crate::loader::BulkLoader;
use crate::spatial::SpatialImporter;
use crate::state::AppState;

/// 启动导入作业（后台执行）
#[utoipa::path(
    post,
    path = "/api/import",
    tag = "import",
    request_body = ImportRequest,
    responses(
        (status = 200, description = "导入作业已启动", body = ApiResponse<ImportStarted>),
        (status = 409, description = "未连接数据库或未加载数据")
    )
)]
pub async fn start_import(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ApiResponse<ImportStarted>>, AppError> {
    let table = req.table_name.trim().to_string();
    if table.is_empty() {
        return Err(AppError::Validation("Please enter a table name".into()));
    }
    validate_identifier(&table)?;
    if req.columns.is_empty() {
        return Err(AppError::Validation(
            "Please select at least one column".into(),
        ));
    }

    // Both preconditions are checked before the task is spawned so the UI
    // gets an immediate error instead of a failed job.
    let session = state.session.current().await?;
    let loaded = state.datasets.current().await?;

    let job_id = state.jobs.create(&table);
    let sink = JobSink::new(state.jobs.clone(), job_id.clone());
    let jobs = state.jobs.clone();
    let task_job_id = job_id.clone();
    let columns = req.columns.clone();
    let srid = req.srid;

    tokio::spawn(async move {
        let outcome = match &loaded.dataset {
            LoadedDataset::Tabular(dataset) => {
                let projected = dataset.project(&columns);
                BulkLoader::new(&session)
                    .import(&projected, &table, &sink)
                    .await
            }
            LoadedDataset::Spatial(dataset) => {
                // The geometry column always rides along, selected or not.
                let projected = SpatialDataset {
                    table: dataset.table.project(&columns),
                    geometry_wkt: dataset.geometry_wkt.clone(),
                    srid: dataset.srid,
                };
                SpatialImporter::new(&session)
                    .import(&projected, &table, srid, &sink)
                    .await
            }
        };

        match outcome {
            Ok(()) => jobs.finish(&task_job_id, JobState::Completed),
            Err(e) => {
                tracing::error!(job_id = %task_job_id, error = %e, "import job failed");
                jobs.finish(&task_job_id, JobState::Failed);
            }
        }
    });

    Ok(Json(ApiResponse::ok_with_service(
        ImportStarted { job_id },
        SERVICE_NAME,
    )))
}

/// 查询导入作业进度
#[utoipa::path(
    get,
    path = "/api/import/jobs/{id}",
    tag = "import",
    params(
        ("id" = String, Path, description = "作业 ID")
    ),
    responses(
        (status = 200, description = "作业状态", body = ApiResponse<ImportJobStatus>),
        (status = 404, description = "作业不存在")
    )
)]
pub async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ImportJobStatus>>, AppError> {
    let job = state
        .jobs
        .get(&id)
        .ok_or_else(|| AppError::JobNotFound(id.clone()))?;
    Ok(Json(ApiResponse::ok_with_service(job, SERVICE_NAME)))
}

/// 导入请求
#[derive(Deserialize, ToSchema)]
pub struct ImportRequest {
    /// 目标表名
    pub table_name: String,
    /// 选中的列
    pub columns: Vec<String>,
    /// 坐标系 SRID（可选，默认取数据集自身）
    #[serde(default)]
    pub srid: Option<i32>,
}

/// 导入作业启动结果
#[derive(Serialize, ToSchema)]
pub struct ImportStarted {
    /// 作业 ID，用于轮询进度
    pub job_id: String,
}
