//! Database models
//!
//! Rust structs representing database entities and the request/response
//! shapes built around them. Entities serialize in camelCase for the web
//! client; enumerations are stored and sent as snake_case strings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

/// How urgently a curriculum should be worked on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum CurriculumPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl CurriculumPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            CurriculumPriority::High => "high",
            CurriculumPriority::Medium => "medium",
            CurriculumPriority::Low => "low",
        }
    }
}

/// Where a curriculum sits in the study pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum CurriculumStatus {
    Ongoing,
    Standby,
    #[default]
    Planned,
    /// Kept for data written by older dashboards
    Wishlist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ItemType {
    Video,
    Reading,
    Exercise,
    Homework,
    #[default]
    Other,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Video => "video",
            ItemType::Reading => "reading",
            ItemType::Exercise => "exercise",
            ItemType::Homework => "homework",
            ItemType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl ItemStatus {
    /// Next status in the click-through cycle
    pub fn next(self) -> Self {
        match self {
            ItemStatus::NotStarted => ItemStatus::InProgress,
            ItemStatus::InProgress => ItemStatus::Completed,
            ItemStatus::Completed => ItemStatus::NotStarted,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ItemStatus::NotStarted => "Not Started",
            ItemStatus::InProgress => "In Progress",
            ItemStatus::Completed => "Completed",
        }
    }
}

/// A course of study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Curriculum {
    pub id: i64,
    pub title: String,
    pub author: Option<String>,
    pub platform: Option<String>,
    pub platform_url: Option<String>,
    pub description: Option<String>,
    pub priority: CurriculumPriority,
    pub status: CurriculumStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named grouping of items within a curriculum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: i64,
    pub curriculum_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An atomic study task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub section_id: i64,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub status: ItemStatus,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ===== Requests =====

/// Treat `""` and `null` the same way for optional dates coming from forms
pub(crate) fn blank_date<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .or_else(|_| {
                DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc).date_naive())
            })
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Date patches distinguish "absent" (no change) from `null`/`""` (clear)
fn patch_date<'de, D>(deserializer: D) -> std::result::Result<Option<Option<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    blank_date(deserializer).map(Some)
}

/// Trimmed copy of an optional text field, `None` when blank
pub fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Create curriculum request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCurriculumRequest {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub platform_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: CurriculumPriority,
    #[serde(default)]
    pub status: CurriculumStatus,
    #[serde(default, deserialize_with = "blank_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_date")]
    pub end_date: Option<NaiveDate>,
}

/// Partial curriculum update; a blank string clears an optional text field
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCurriculumRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub platform: Option<String>,
    pub platform_url: Option<String>,
    pub description: Option<String>,
    pub priority: Option<CurriculumPriority>,
    pub status: Option<CurriculumStatus>,
    #[serde(default, deserialize_with = "patch_date")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "patch_date")]
    pub end_date: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSectionRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSectionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<ItemType>,
    pub status: Option<ItemStatus>,
}

/// Batch reorder request for one curriculum
///
/// Each `sort_order` is the absolute target position, not a delta. Entry
/// order inside the arrays carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub sections: Vec<SectionPlacement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPlacement {
    pub id: i64,
    pub sort_order: i64,
    pub items: Vec<ItemPlacement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPlacement {
    pub id: i64,
    pub sort_order: i64,
}

// ===== Views =====

/// Stored hierarchy of one curriculum, sections and items in sort order
#[derive(Debug, Clone, PartialEq)]
pub struct CurriculumTree {
    pub curriculum: Curriculum,
    pub sections: Vec<(Section, Vec<Item>)>,
}

/// Item totals for one curriculum, counted in SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct ItemCounts {
    pub curriculum_id: i64,
    pub total: i64,
    pub completed: i64,
}

/// A section with its ordered items and completion percentage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionWithItems {
    #[serde(flatten)]
    pub section: Section,
    pub items: Vec<Item>,
    pub progress: u8,
}

/// A curriculum with its full section/item hierarchy and overall totals
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumDetail {
    #[serde(flatten)]
    pub curriculum: Curriculum,
    pub sections: Vec<SectionWithItems>,
    pub total_items: u64,
    pub completed_items: u64,
    pub progress: u8,
}

/// Curriculum list entry with aggregated progress
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumWithProgress {
    #[serde(flatten)]
    pub curriculum: Curriculum,
    pub total_items: u64,
    pub completed_items: u64,
    pub progress: u8,
}

/// Reorder response body
#[derive(Debug, Clone, Serialize)]
pub struct ReorderResponse {
    pub success: bool,
    pub curriculum: CurriculumDetail,
}

/// Compact description of the task the dashboard card points at
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPreview {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub status: ItemStatus,
    pub section_title: String,
}

/// Full description of the current or next task of a curriculum
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTaskInfo {
    #[serde(flatten)]
    pub preview: TaskPreview,
    pub description: Option<String>,
    pub section_id: i64,
}

/// Dashboard card for one curriculum
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumCard {
    #[serde(flatten)]
    pub summary: CurriculumWithProgress,
    pub days_remaining: Option<i64>,
    pub current_task: Option<TaskPreview>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_cycle_wraps_around() {
        let mut status = ItemStatus::NotStarted;
        status = status.next();
        assert_eq!(status, ItemStatus::InProgress);
        status = status.next();
        assert_eq!(status, ItemStatus::Completed);
        status = status.next();
        assert_eq!(status, ItemStatus::NotStarted);
    }

    #[test]
    fn test_create_request_defaults_and_blank_dates() {
        let req: CreateCurriculumRequest = serde_json::from_str(
            r#"{"title":"Figure Drawing","startDate":"","endDate":"2026-12-31"}"#,
        )
        .unwrap();

        assert_eq!(req.priority, CurriculumPriority::Medium);
        assert_eq!(req.status, CurriculumStatus::Planned);
        assert_eq!(req.start_date, None);
        assert_eq!(req.end_date, NaiveDate::from_ymd_opt(2026, 12, 31));
    }

    #[test]
    fn test_update_request_distinguishes_absent_and_cleared_dates() {
        let req: UpdateCurriculumRequest =
            serde_json::from_str(r#"{"startDate":null,"title":"Anatomy"}"#).unwrap();

        assert_eq!(req.start_date, Some(None));
        assert_eq!(req.end_date, None);
        assert_eq!(req.title.as_deref(), Some("Anatomy"));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank("  "), None);
        assert_eq!(non_blank(" Loomis "), Some("Loomis".to_string()));
    }

    #[test]
    fn test_item_type_uses_type_key() {
        let req: CreateItemRequest =
            serde_json::from_str(r#"{"title":"Gesture drills","type":"exercise"}"#).unwrap();

        assert_eq!(req.item_type, ItemType::Exercise);
        assert_eq!(req.status, ItemStatus::NotStarted);
    }

    #[test]
    fn test_reorder_request_shape() {
        let req: ReorderRequest = serde_json::from_str(
            r#"{"sections":[{"id":5,"sortOrder":0,"items":[{"id":11,"sortOrder":1}]}]}"#,
        )
        .unwrap();

        assert_eq!(req.sections[0].id, 5);
        assert_eq!(req.sections[0].items[0].sort_order, 1);
    }

    #[test]
    fn test_reorder_section_requires_items() {
        let result =
            serde_json::from_str::<ReorderRequest>(r#"{"sections":[{"id":5,"sortOrder":0}]}"#);
        assert!(result.is_err());
    }
}
