//! Repository layer for database operations
//!
//! CRUD operations for curriculums, sections and items, plus the batch
//! position update used by drag-and-drop reordering. Multi-statement
//! operations run inside a single transaction; writers take the lock with
//! `BEGIN IMMEDIATE`.

use super::models::*;
use crate::error::{AppError, Result, ValidationIssue};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool, Transaction};

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Transaction that takes the write lock up front.
    ///
    /// A deferred transaction that reads first cannot upgrade to a writer
    /// while another connection holds the lock, and SQLite reports that as
    /// busy without waiting. `BEGIN IMMEDIATE` waits out `busy_timeout` instead.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    // ===== Curriculums =====

    /// Create a new curriculum
    pub async fn create_curriculum(&self, req: &CreateCurriculumRequest) -> Result<Curriculum> {
        let mut conn = self.pool.acquire().await?;
        let curriculum = insert_curriculum(&mut conn, req, Utc::now()).await?;

        tracing::debug!("Created curriculum: {}", curriculum.id);
        Ok(curriculum)
    }

    /// Get a curriculum by ID
    pub async fn get_curriculum(&self, id: i64) -> Result<Curriculum> {
        sqlx::query_as::<_, Curriculum>("SELECT * FROM curriculums WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::curriculum_not_found(id))
    }

    /// List all curriculums, least recently updated first
    pub async fn list_curriculums(&self) -> Result<Vec<Curriculum>> {
        let curriculums = sqlx::query_as::<_, Curriculum>(
            "SELECT * FROM curriculums ORDER BY updated_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(curriculums)
    }

    /// Total and completed item counts per curriculum.
    ///
    /// Curriculums without any section are absent from the result.
    pub async fn item_counts(&self) -> Result<Vec<ItemCounts>> {
        let counts = sqlx::query_as::<_, ItemCounts>(
            r#"
            SELECT
                s.curriculum_id AS curriculum_id,
                COUNT(i.id) AS total,
                COALESCE(SUM(CASE WHEN i.status = 'completed' THEN 1 ELSE 0 END), 0) AS completed
            FROM sections s
            LEFT JOIN items i ON i.section_id = s.id
            GROUP BY s.curriculum_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }

    /// Apply a partial update to a curriculum
    pub async fn update_curriculum(
        &self,
        id: i64,
        req: &UpdateCurriculumRequest,
    ) -> Result<Curriculum> {
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE curriculums SET updated_at = ");
        query.push_bind(Utc::now());

        if let Some(title) = &req.title {
            query.push(", title = ").push_bind(title.trim().to_string());
        }
        if let Some(author) = &req.author {
            query.push(", author = ").push_bind(non_blank(author));
        }
        if let Some(platform) = &req.platform {
            query.push(", platform = ").push_bind(non_blank(platform));
        }
        if let Some(platform_url) = &req.platform_url {
            query.push(", platform_url = ").push_bind(non_blank(platform_url));
        }
        if let Some(description) = &req.description {
            query.push(", description = ").push_bind(non_blank(description));
        }
        if let Some(priority) = req.priority {
            query.push(", priority = ").push_bind(priority);
        }
        if let Some(status) = req.status {
            query.push(", status = ").push_bind(status);
        }
        if let Some(start_date) = req.start_date {
            query.push(", start_date = ").push_bind(start_date);
        }
        if let Some(end_date) = req.end_date {
            query.push(", end_date = ").push_bind(end_date);
        }

        query.push(" WHERE id = ").push_bind(id);
        query.push(" RETURNING *");

        let curriculum = query
            .build_query_as::<Curriculum>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::curriculum_not_found(id))?;

        tracing::debug!("Updated curriculum: {}", id);
        Ok(curriculum)
    }

    /// Delete a curriculum together with its sections and items
    pub async fn delete_curriculum(&self, id: i64) -> Result<()> {
        let rows = sqlx::query("DELETE FROM curriculums WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::curriculum_not_found(id));
        }

        tracing::debug!("Deleted curriculum: {}", id);
        Ok(())
    }

    /// Load a curriculum with its ordered sections and items.
    ///
    /// All three reads share one transaction so the snapshot is consistent
    /// even while a reorder commits concurrently.
    pub async fn load_tree(&self, id: i64) -> Result<CurriculumTree> {
        let mut tx = self.pool.begin().await?;

        let curriculum = sqlx::query_as::<_, Curriculum>("SELECT * FROM curriculums WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::curriculum_not_found(id))?;

        let sections = sqlx::query_as::<_, Section>(
            "SELECT * FROM sections WHERE curriculum_id = ? ORDER BY sort_order ASC, id ASC",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT i.* FROM items i
            JOIN sections s ON s.id = i.section_id
            WHERE s.curriculum_id = ?
            ORDER BY i.sort_order ASC, i.id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut grouped: Vec<(Section, Vec<Item>)> =
            sections.into_iter().map(|s| (s, Vec::new())).collect();
        for item in items {
            if let Some((_, bucket)) = grouped.iter_mut().find(|(s, _)| s.id == item.section_id) {
                bucket.push(item);
            }
        }

        Ok(CurriculumTree {
            curriculum,
            sections: grouped,
        })
    }

    /// Insert a curriculum with all of its sections and items atomically.
    ///
    /// Sections and items receive positions matching their index.
    pub async fn insert_tree(
        &self,
        curriculum: &CreateCurriculumRequest,
        sections: &[(CreateSectionRequest, Vec<CreateItemRequest>)],
    ) -> Result<Curriculum> {
        let now = Utc::now();
        let mut tx = self.begin_write().await?;

        let created = insert_curriculum(&mut tx, curriculum, now).await?;
        for (section_index, (section_req, items)) in sections.iter().enumerate() {
            let section =
                insert_section(&mut tx, created.id, section_req, section_index as i64, now).await?;
            for (item_index, item_req) in items.iter().enumerate() {
                insert_item(&mut tx, section.id, item_req, item_index as i64, now).await?;
            }
        }

        tx.commit().await?;

        tracing::debug!(
            "Inserted curriculum tree: {} ({} sections)",
            created.id,
            sections.len()
        );
        Ok(created)
    }

    // ===== Sections =====

    /// Append a section to the end of a curriculum
    pub async fn create_section(
        &self,
        curriculum_id: i64,
        req: &CreateSectionRequest,
    ) -> Result<Section> {
        let mut tx = self.begin_write().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM curriculums WHERE id = ?")
            .bind(curriculum_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::curriculum_not_found(curriculum_id));
        }

        let sort_order: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM sections WHERE curriculum_id = ?",
        )
        .bind(curriculum_id)
        .fetch_one(&mut *tx)
        .await?;

        let section = insert_section(&mut tx, curriculum_id, req, sort_order, Utc::now()).await?;
        tx.commit().await?;

        tracing::debug!("Created section: {} in curriculum: {}", section.id, curriculum_id);
        Ok(section)
    }

    pub async fn get_section(&self, id: i64) -> Result<Section> {
        sqlx::query_as::<_, Section>("SELECT * FROM sections WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::section_not_found(id))
    }

    pub async fn update_section(&self, id: i64, req: &UpdateSectionRequest) -> Result<Section> {
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE sections SET updated_at = ");
        query.push_bind(Utc::now());

        if let Some(title) = &req.title {
            query.push(", title = ").push_bind(title.trim().to_string());
        }
        if let Some(description) = &req.description {
            query.push(", description = ").push_bind(non_blank(description));
        }

        query.push(" WHERE id = ").push_bind(id);
        query.push(" RETURNING *");

        let section = query
            .build_query_as::<Section>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::section_not_found(id))?;

        tracing::debug!("Updated section: {}", id);
        Ok(section)
    }

    pub async fn delete_section(&self, id: i64) -> Result<()> {
        let rows = sqlx::query("DELETE FROM sections WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::section_not_found(id));
        }

        tracing::debug!("Deleted section: {}", id);
        Ok(())
    }

    // ===== Items =====

    /// Append an item to the end of a section
    pub async fn create_item(&self, section_id: i64, req: &CreateItemRequest) -> Result<Item> {
        let mut tx = self.begin_write().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM sections WHERE id = ?")
            .bind(section_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::section_not_found(section_id));
        }

        let sort_order: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM items WHERE section_id = ?",
        )
        .bind(section_id)
        .fetch_one(&mut *tx)
        .await?;

        let item = insert_item(&mut tx, section_id, req, sort_order, Utc::now()).await?;
        tx.commit().await?;

        tracing::debug!("Created item: {} in section: {}", item.id, section_id);
        Ok(item)
    }

    pub async fn get_item(&self, id: i64) -> Result<Item> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::item_not_found(id))
    }

    pub async fn update_item(&self, id: i64, req: &UpdateItemRequest) -> Result<Item> {
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE items SET updated_at = ");
        query.push_bind(Utc::now());

        if let Some(title) = &req.title {
            query.push(", title = ").push_bind(title.trim().to_string());
        }
        if let Some(description) = &req.description {
            query.push(", description = ").push_bind(non_blank(description));
        }
        if let Some(item_type) = req.item_type {
            query.push(", item_type = ").push_bind(item_type);
        }
        if let Some(status) = req.status {
            query.push(", status = ").push_bind(status);
        }

        query.push(" WHERE id = ").push_bind(id);
        query.push(" RETURNING *");

        let item = query
            .build_query_as::<Item>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::item_not_found(id))?;

        tracing::debug!("Updated item: {}", id);
        Ok(item)
    }

    /// Advance an item to the next status in the cycle
    pub async fn cycle_item_status(&self, id: i64) -> Result<Item> {
        let mut tx = self.begin_write().await?;

        let current: ItemStatus = sqlx::query_scalar("SELECT status FROM items WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::item_not_found(id))?;

        let item = sqlx::query_as::<_, Item>(
            "UPDATE items SET status = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(current.next())
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!("Item {} status: {:?} -> {:?}", id, current, item.status);
        Ok(item)
    }

    pub async fn delete_item(&self, id: i64) -> Result<()> {
        let rows = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::item_not_found(id));
        }

        tracing::debug!("Deleted item: {}", id);
        Ok(())
    }

    // ===== Reordering =====

    /// Write every position named in `req` in one transaction.
    ///
    /// Each update is scoped by its parent id, so a section that is not part
    /// of the curriculum, or an item listed under the wrong section, affects
    /// no row. Any such entry fails the whole batch and nothing is written.
    pub async fn apply_positions(&self, curriculum_id: i64, req: &ReorderRequest) -> Result<u64> {
        let now = Utc::now();
        let mut tx = self.begin_write().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM curriculums WHERE id = ?")
            .bind(curriculum_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::curriculum_not_found(curriculum_id));
        }

        let mut issues = Vec::new();
        let mut written = 0;

        for (section_index, section) in req.sections.iter().enumerate() {
            let rows = sqlx::query(
                "UPDATE sections SET sort_order = ?, updated_at = ? WHERE id = ? AND curriculum_id = ?",
            )
            .bind(section.sort_order)
            .bind(now)
            .bind(section.id)
            .bind(curriculum_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if rows == 0 {
                issues.push(ValidationIssue::new(
                    format!("sections[{}].id", section_index),
                    format!(
                        "Section {} does not belong to curriculum {}",
                        section.id, curriculum_id
                    ),
                ));
                continue;
            }
            written += rows;

            for (item_index, item) in section.items.iter().enumerate() {
                let rows = sqlx::query(
                    "UPDATE items SET sort_order = ?, updated_at = ? WHERE id = ? AND section_id = ?",
                )
                .bind(item.sort_order)
                .bind(now)
                .bind(item.id)
                .bind(section.id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

                if rows == 0 {
                    issues.push(ValidationIssue::new(
                        format!("sections[{}].items[{}].id", section_index, item_index),
                        format!("Item {} does not belong to section {}", item.id, section.id),
                    ));
                }
                written += rows;
            }
        }

        if !issues.is_empty() {
            tx.rollback().await?;
            return Err(AppError::Validation(issues));
        }

        tx.commit().await?;

        tracing::debug!(
            "Applied {} positions for curriculum: {}",
            written,
            curriculum_id
        );
        Ok(written)
    }
}

async fn insert_curriculum(
    conn: &mut SqliteConnection,
    req: &CreateCurriculumRequest,
    now: DateTime<Utc>,
) -> Result<Curriculum> {
    let curriculum = sqlx::query_as::<_, Curriculum>(
        r#"
        INSERT INTO curriculums (
            title, author, platform, platform_url, description,
            priority, status, start_date, end_date, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(req.title.trim())
    .bind(req.author.as_deref().and_then(non_blank))
    .bind(req.platform.as_deref().and_then(non_blank))
    .bind(req.platform_url.as_deref().and_then(non_blank))
    .bind(req.description.as_deref().and_then(non_blank))
    .bind(req.priority)
    .bind(req.status)
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(curriculum)
}

async fn insert_section(
    conn: &mut SqliteConnection,
    curriculum_id: i64,
    req: &CreateSectionRequest,
    sort_order: i64,
    now: DateTime<Utc>,
) -> Result<Section> {
    let section = sqlx::query_as::<_, Section>(
        r#"
        INSERT INTO sections (curriculum_id, title, description, sort_order, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(curriculum_id)
    .bind(req.title.trim())
    .bind(req.description.as_deref().and_then(non_blank))
    .bind(sort_order)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(section)
}

async fn insert_item(
    conn: &mut SqliteConnection,
    section_id: i64,
    req: &CreateItemRequest,
    sort_order: i64,
    now: DateTime<Utc>,
) -> Result<Item> {
    let item = sqlx::query_as::<_, Item>(
        r#"
        INSERT INTO items (section_id, title, description, item_type, status, sort_order, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(section_id)
    .bind(req.title.trim())
    .bind(req.description.as_deref().and_then(non_blank))
    .bind(req.item_type)
    .bind(req.status)
    .bind(sort_order)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(item)
}
