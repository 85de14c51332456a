use crate::server::{AppContext, AppError};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use lazyhls_common::{Error, TaskId, VideoInfo};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health))
        .route("/init", post(init))
        .route("/cleanup", post(cleanup))
        .route("/tasks", get(list_tasks))
        .route("/tasks/:id", get(get_task))
        .route("/tools", get(get_tools))
}

/// JSON status with version and task count for API clients.
async fn health(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "tasks": ctx.registry.len(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitRequest {
    video_path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitResponse {
    success: bool,
    video_id: TaskId,
    m3u8_url: String,
    video_info: VideoInfo,
}

async fn init(
    State(ctx): State<AppContext>,
    Json(req): Json<InitRequest>,
) -> Result<Json<InitResponse>, AppError> {
    if req.video_path.trim().is_empty() {
        return Err(Error::invalid_input("videoPath is required").into());
    }

    let task = ctx.registry.initialize(&PathBuf::from(&req.video_path)).await?;

    Ok(Json(InitResponse {
        success: true,
        m3u8_url: format!("/hls/{}.m3u8", task.id()),
        video_id: task.id().clone(),
        video_info: task.info().clone(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CleanupResponse {
    success: bool,
    deleted_files: usize,
}

async fn cleanup(State(ctx): State<AppContext>) -> Result<Json<CleanupResponse>, AppError> {
    let deleted_files = ctx.registry.cleanup().await?;
    Ok(Json(CleanupResponse {
        success: true,
        deleted_files,
    }))
}

async fn list_tasks(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(ctx.registry.snapshots())
}

async fn get_task(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let task = ctx
        .registry
        .get(&TaskId::from(id.as_str()))
        .ok_or_else(|| Error::task_not_found(&id))?;
    Ok(Json(task.snapshot()))
}

async fn get_tools(State(ctx): State<AppContext>) -> Result<impl IntoResponse, AppError> {
    let tools = ctx.tools.clone();
    let infos = tokio::task::spawn_blocking(move || tools.check_all())
        .await
        .map_err(|e| Error::internal(format!("tool check failed: {e}")))?;
    Ok(Json(infos))
}
