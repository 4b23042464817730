//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::config::{IllustrationSettings, ServerConfig};
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::services::{
    CurriculumService, IllustrationService, ReorderCoordinator, TransferService,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub curriculums: CurriculumService,
    pub reorder: ReorderCoordinator,
    pub transfer: TransferService,
    pub illustrations: Arc<IllustrationService>,
}

impl AppState {
    pub fn new(pool: SqlitePool, illustrations: IllustrationSettings) -> Result<Self> {
        let repo = Repository::new(pool);

        Ok(Self {
            curriculums: CurriculumService::new(repo.clone()),
            reorder: ReorderCoordinator::new(repo.clone()),
            transfer: TransferService::new(repo),
            illustrations: Arc::new(IllustrationService::new(illustrations)?),
        })
    }
}

/// Application setup - called once on startup
pub async fn setup(config: &ServerConfig) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("Database file: {:?}", config.database);

    let pool = create_pool(&config.database).await?;
    let state = AppState::new(pool, config.illustration_settings())?;

    tracing::info!("Application initialized successfully");

    Ok(state)
}
