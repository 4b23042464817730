//! Import and export routes

use super::ApiJson;
use crate::app::AppState;
use crate::error::Result;
use crate::services::CurriculumDocument;
use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Local;
use serde::Serialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/import", post(import))
        .route("/export/json", get(export_json))
        .route("/export/pack", get(export_pack))
}

#[derive(Serialize)]
struct ImportResponse {
    message: &'static str,
    id: i64,
}

fn attachment(file_name: &str) -> String {
    format!("attachment; filename=\"{}\"", file_name)
}

async fn import(
    State(state): State<AppState>,
    ApiJson(document): ApiJson<CurriculumDocument>,
) -> Result<(StatusCode, Json<ImportResponse>)> {
    let id = state.transfer.import(document).await?;
    Ok((
        StatusCode::CREATED,
        Json(ImportResponse {
            message: "Curriculum imported successfully",
            id,
        }),
    ))
}

async fn export_json(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let documents = state.transfer.export_json().await?;
    let file_name = format!("tora-export-{}.json", Local::now().format("%Y-%m-%d"));

    Ok(([(CONTENT_DISPOSITION, attachment(&file_name))], Json(documents)))
}

async fn export_pack(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let pack = state.transfer.export_pack(Local::now().date_naive()).await?;

    Ok((
        [
            (CONTENT_TYPE, "application/zip".to_string()),
            (CONTENT_DISPOSITION, attachment(&pack.file_name)),
        ],
        pack.bytes,
    ))
}
