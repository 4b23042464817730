//! Curriculum routes, including batch reorder and the dashboard

use super::{ApiJson, ApiPath};
use crate::app::AppState;
use crate::database::{
    CreateCurriculumRequest, CurrentTaskInfo, Curriculum, CurriculumCard, CurriculumDetail,
    CurriculumWithProgress, ReorderRequest, ReorderResponse, UpdateCurriculumRequest,
};
use crate::error::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::Local;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/curriculums", get(list_curriculums).post(create_curriculum))
        .route(
            "/curriculums/{id}",
            get(get_curriculum)
                .patch(update_curriculum)
                .delete(delete_curriculum),
        )
        .route("/curriculums/{id}/reorder", patch(reorder_curriculum))
        .route("/curriculums/{id}/current-task", get(current_task))
        .route("/dashboard", get(dashboard))
}

async fn list_curriculums(
    State(state): State<AppState>,
) -> Result<Json<Vec<CurriculumWithProgress>>> {
    Ok(Json(state.curriculums.list_curriculums().await?))
}

async fn get_curriculum(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<CurriculumDetail>> {
    Ok(Json(state.curriculums.get_curriculum_detail(id).await?))
}

async fn create_curriculum(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateCurriculumRequest>,
) -> Result<(StatusCode, Json<Curriculum>)> {
    let curriculum = state.curriculums.create_curriculum(req).await?;
    Ok((StatusCode::CREATED, Json(curriculum)))
}

async fn update_curriculum(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateCurriculumRequest>,
) -> Result<Json<Curriculum>> {
    Ok(Json(state.curriculums.update_curriculum(id, req).await?))
}

async fn delete_curriculum(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    state.curriculums.delete_curriculum(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reorder_curriculum(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ReorderRequest>,
) -> Result<Json<ReorderResponse>> {
    let curriculum = state.reorder.reorder(id, &req).await?;
    Ok(Json(ReorderResponse {
        success: true,
        curriculum,
    }))
}

async fn current_task(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Option<CurrentTaskInfo>>> {
    Ok(Json(state.curriculums.current_task(id).await?))
}

async fn dashboard(State(state): State<AppState>) -> Result<Json<Vec<CurriculumCard>>> {
    let today = Local::now().date_naive();
    Ok(Json(state.curriculums.dashboard(today).await?))
}
