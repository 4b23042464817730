//! HTTP API
//!
//! axum handlers over the services in `AppState`. Every route lives under
//! `/api` except the health probe.

pub mod curriculums;
pub mod illustrations;
pub mod items;
pub mod sections;
pub mod transfer;

use crate::app::AppState;
use crate::config::MAX_BODY_BYTES;
use crate::error::AppError;
use axum::extract::{DefaultBodyLimit, FromRequest, FromRequestParts};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// JSON body extractor whose rejection is reported as a validation error
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor reporting malformed ids as validation errors
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(curriculums::routes())
        .merge(sections::routes())
        .merge(items::routes())
        .merge(transfer::routes())
        .merge(illustrations::routes());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
