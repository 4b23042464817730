//! Item routes

use super::{ApiJson, ApiPath};
use crate::app::AppState;
use crate::database::{CreateItemRequest, Item, UpdateItemRequest};
use crate::error::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{patch, post};
use axum::{Json, Router};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sections/{id}/items", post(create_item))
        .route("/items/{id}", patch(update_item).delete(delete_item))
        .route("/items/{id}/status", patch(cycle_item_status))
}

async fn create_item(
    State(state): State<AppState>,
    ApiPath(section_id): ApiPath<i64>,
    ApiJson(req): ApiJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<Item>)> {
    let item = state.curriculums.create_item(section_id, req).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateItemRequest>,
) -> Result<Json<Item>> {
    Ok(Json(state.curriculums.update_item(id, req).await?))
}

async fn cycle_item_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Item>> {
    Ok(Json(state.curriculums.cycle_item_status(id).await?))
}

async fn delete_item(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    state.curriculums.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
