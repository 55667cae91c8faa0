//! Batch task handlers.

use super::TaskCreatedResponse;
use crate::api::AppState;
use crate::api::error_response::bad_request;
use crate::error::{Error, TaskError};
use crate::types::{BatchRequest, ListingMode, TaskId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /xhs/download/user-posted - Download everything a publisher posted
#[utoipa::path(
    post,
    path = "/xhs/download/user-posted",
    tag = "tasks",
    request_body = BatchRequest,
    responses(
        (status = 202, description = "Task accepted", body = TaskCreatedResponse),
        (status = 400, description = "Invalid request", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn download_user_posted(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Response {
    submit(state, ListingMode::Posted, request).await
}

/// POST /xhs/download/me-liked-videos - Download the videos among liked items
#[utoipa::path(
    post,
    path = "/xhs/download/me-liked-videos",
    tag = "tasks",
    request_body = BatchRequest,
    responses(
        (status = 202, description = "Task accepted", body = TaskCreatedResponse),
        (status = 400, description = "Invalid request", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn download_liked_videos(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Response {
    submit(state, ListingMode::Liked, request).await
}

/// POST /xhs/download/me-saved-videos - Download the videos among saved items
#[utoipa::path(
    post,
    path = "/xhs/download/me-saved-videos",
    tag = "tasks",
    request_body = BatchRequest,
    responses(
        (status = 202, description = "Task accepted", body = TaskCreatedResponse),
        (status = 400, description = "Invalid request", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn download_saved_videos(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Response {
    submit(state, ListingMode::Saved, request).await
}

async fn submit(state: AppState, mode: ListingMode, request: BatchRequest) -> Response {
    if request.profile_url.trim().is_empty() {
        return bad_request("profile_url must not be empty");
    }
    if request.limit == Some(0) {
        return bad_request("limit must be at least 1");
    }

    match state.downloader.create_task(mode, request).await {
        Ok(task_id) => (
            StatusCode::ACCEPTED,
            Json(TaskCreatedResponse {
                message: format!("{mode} download task created"),
                task_id,
                status_url: format!("/xhs/tasks/{task_id}"),
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /xhs/tasks - List all tasks
#[utoipa::path(
    get,
    path = "/xhs/tasks",
    tag = "tasks",
    responses(
        (status = 200, description = "All retained tasks, oldest first", body = Vec<crate::types::Task>)
    )
)]
pub async fn list_tasks(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.downloader.list_tasks().await)
}

/// GET /xhs/tasks/:id - Get single task
#[utoipa::path(
    get,
    path = "/xhs/tasks/{id}",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task document", body = crate::types::Task),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let task_id = match parse_task_id(&id) {
        Ok(task_id) => task_id,
        Err(e) => return e.into_response(),
    };

    match state.downloader.task(task_id).await {
        Ok(task) => (StatusCode::OK, Json(task)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /xhs/tasks/:id/cancel - Cancel a task
#[utoipa::path(
    post,
    path = "/xhs/tasks/{id}/cancel",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Cancellation requested"),
        (status = 404, description = "Task not found", body = crate::error::ApiError),
        (status = 409, description = "Task already finished", body = crate::error::ApiError)
    )
)]
pub async fn cancel_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let task_id = match parse_task_id(&id) {
        Ok(task_id) => task_id,
        Err(e) => return e.into_response(),
    };

    match state.downloader.cancel_task(task_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Malformed ids can never name a task, so they are reported as not found
fn parse_task_id(raw: &str) -> Result<TaskId, Error> {
    raw.parse::<TaskId>()
        .map_err(|_| Error::NotFound(format!("task {raw}")))
}
