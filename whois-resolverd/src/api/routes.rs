use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use shared::protocol::{is_valid_result_id, MSG_NO_SUCH_RESOLVED, RESOLVED_PATH, RESOLVE_PATH};
use shared::types::{ApiResponse, Job, SubmitRequest};
use crate::queue::JobQueue;
use crate::store_manager::StoreHandle;

#[derive(Clone)]
pub struct AppState {
    pub queue: JobQueue,
    pub store: StoreHandle,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolvedQuery {
    /// Remove the result as part of the fetch
    #[serde(default)]
    pub claim: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(RESOLVE_PATH, post(submit))
        .route(
            &format!("{}/:id", RESOLVED_PATH),
            get(get_resolved).delete(delete_resolved),
        )
        .with_state(state)
}

async fn submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Json<ApiResponse> {
    let job = match Job::try_from(req) {
        Ok(job) => job,
        Err(e) => return Json(ApiResponse::failure(e.to_string())),
    };

    let job_id = job.id.clone();
    let depth = state.queue.enqueue(job);
    tracing::info!("Queued job [{}], queue depth {}", job_id, depth);

    Json(ApiResponse::ok())
}

async fn get_resolved(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ResolvedQuery>,
) -> Result<Json<ApiResponse>, StatusCode> {
    if !is_valid_result_id(&id) {
        return Err(StatusCode::NOT_FOUND);
    }

    let record = if params.claim {
        state.store.take(id).await
    } else {
        state.store.get(id).await
    };

    let response = record
        .map_err(|e| {
            tracing::error!("Failed to query result store: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map(ApiResponse::found)
        .unwrap_or_else(|| ApiResponse::failure(MSG_NO_SUCH_RESOLVED));

    Ok(Json(response))
}

async fn delete_resolved(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    if !is_valid_result_id(&id) {
        return Err(StatusCode::NOT_FOUND);
    }

    state.store.delete(id).await.map_err(|e| {
        tracing::error!("Failed to delete from result store: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(ApiResponse::ok()))
}
