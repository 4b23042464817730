//! Storage module
//!
//! Provides the in-memory cache for proxied illustration images.

pub mod image_cache;

pub use image_cache::{image_cache, CachedImage, ImageCache};
