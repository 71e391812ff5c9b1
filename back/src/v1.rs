use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use tareas_api::v1::{NewTask, Task, TaskUpdate, TrashEmptied};

use crate::{error::TaskError, store::AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks", get(get_tasks))
        .route("/tasks", post(create_task))
        .route("/tasks/:id", get(get_task))
        .route("/tasks/:id", put(update_task))
        .route("/tasks/:id", delete(delete_task))
        .route("/trash", get(get_trash))
        .route("/trash", delete(empty_trash))
        .route("/trash/:id", delete(purge_task))
        .route("/trash/:id/restore", post(restore_task))
}

async fn get_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<Task>> {
    Json(state.list().await)
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), TaskError> {
    let task = state.create(input).await?;

    info!(
        id = %task.id,
        title = %task.title,
        priority = ?task.priority,
        "created task"
    );

    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, TaskError> {
    Ok(Json(state.get(id).await?))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<TaskUpdate>,
) -> Result<Json<Task>, TaskError> {
    let task = state.update(id, patch).await?;

    info!(
        id = %task.id,
        status = ?task.status,
        "updated task"
    );

    Ok(Json(task))
}

/// Soft delete: the task moves to the trash rather than being erased.
async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, TaskError> {
    let task = state.soft_delete(id).await?;

    info!(
        id = %task.id,
        title = %task.title,
        "moved task to trash"
    );

    Ok(Json(task))
}

async fn get_trash(State(state): State<Arc<AppState>>) -> Json<Vec<Task>> {
    Json(state.list_trash().await)
}

async fn restore_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, TaskError> {
    let task = state.restore(id).await?;

    info!(
        id = %task.id,
        title = %task.title,
        "restored task from trash"
    );

    Ok(Json(task))
}

async fn purge_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, TaskError> {
    let task = state.purge(id).await?;

    info!(id = %task.id, "purged task");

    Ok(Json(task))
}

async fn empty_trash(State(state): State<Arc<AppState>>) -> Json<TrashEmptied> {
    let emptied = state.empty_trash().await;

    info!(removed = emptied.removed, "emptied trash");

    Json(emptied)
}
