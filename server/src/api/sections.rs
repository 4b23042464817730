//! Section routes

use super::{ApiJson, ApiPath};
use crate::app::AppState;
use crate::database::{CreateSectionRequest, Section, UpdateSectionRequest};
use crate::error::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{patch, post};
use axum::{Json, Router};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/curriculums/{id}/sections", post(create_section))
        .route("/sections/{id}", patch(update_section).delete(delete_section))
}

async fn create_section(
    State(state): State<AppState>,
    ApiPath(curriculum_id): ApiPath<i64>,
    ApiJson(req): ApiJson<CreateSectionRequest>,
) -> Result<(StatusCode, Json<Section>)> {
    let section = state.curriculums.create_section(curriculum_id, req).await?;
    Ok((StatusCode::CREATED, Json(section)))
}

async fn update_section(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateSectionRequest>,
) -> Result<Json<Section>> {
    Ok(Json(state.curriculums.update_section(id, req).await?))
}

async fn delete_section(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    state.curriculums.delete_section(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
