//! Illustration widget routes

use super::ApiPath;
use crate::app::AppState;
use crate::config::{IMAGE_CLIENT_MAX_AGE_SECS, RANKING_LIMIT};
use crate::error::{AppError, Result};
use crate::services::RankingResponse;
use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::HeaderName;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/illustrations/daily-ranking", get(daily_ranking))
        .route(
            "/illustrations/bookmark/{illust_id}",
            post(bookmark).delete(unbookmark),
        )
        .route("/illustrations/image", get(proxy_image))
}

#[derive(Serialize)]
struct BookmarkResponse {
    success: bool,
}

#[derive(Deserialize)]
struct ImageQuery {
    url: Option<String>,
}

async fn daily_ranking(State(state): State<AppState>) -> Result<Json<RankingResponse>> {
    let illustrations = state.illustrations.daily_ranking(RANKING_LIMIT).await?;
    Ok(Json(RankingResponse { illustrations }))
}

async fn bookmark(
    State(state): State<AppState>,
    ApiPath(illust_id): ApiPath<i64>,
) -> Result<Json<BookmarkResponse>> {
    state.illustrations.bookmark(illust_id).await?;
    Ok(Json(BookmarkResponse { success: true }))
}

async fn unbookmark(
    State(state): State<AppState>,
    ApiPath(illust_id): ApiPath<i64>,
) -> Result<Json<BookmarkResponse>> {
    state.illustrations.unbookmark(illust_id).await?;
    Ok(Json(BookmarkResponse { success: true }))
}

async fn proxy_image(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
) -> Result<impl IntoResponse> {
    let url = query
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| AppError::invalid("url", "Missing url parameter"))?;

    let image = state.illustrations.proxy_image(&url).await?;

    Ok((
        [
            (CONTENT_TYPE, image.content_type),
            (
                CACHE_CONTROL,
                format!("public, max-age={}", IMAGE_CLIENT_MAX_AGE_SECS),
            ),
            (
                X_CACHE,
                if image.cache_hit { "HIT" } else { "MISS" }.to_string(),
            ),
        ],
        image.bytes,
    ))
}
