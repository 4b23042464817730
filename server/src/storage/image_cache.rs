//! Bounded in-memory image cache
//!
//! Keyed by the upstream image URL. Entries live for a fixed time and the
//! cache holds at most a fixed number of them; moka handles both.

use axum::body::Bytes;
use moka::future::Cache;
use std::time::Duration;

/// A cached upstream response body
#[derive(Debug, Clone)]
pub struct CachedImage {
    pub bytes: Bytes,
    pub content_type: String,
}

impl CachedImage {
    pub fn new(bytes: Bytes, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }
}

pub type ImageCache = Cache<String, CachedImage>;

pub fn image_cache(max_entries: usize, ttl: Duration) -> ImageCache {
    Cache::builder()
        .max_capacity(max_entries as u64)
        .time_to_live(ttl)
        .build()
}
