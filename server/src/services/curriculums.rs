//! Curriculum service
//!
//! High-level operations on curriculums, sections and items: request
//! validation, read views with progress, and the dashboard summary.

use crate::database::{
    CreateCurriculumRequest, CreateItemRequest, CreateSectionRequest, CurrentTaskInfo, Curriculum,
    CurriculumCard, CurriculumDetail, CurriculumWithProgress, Item, Repository, Section,
    UpdateCurriculumRequest, UpdateItemRequest, UpdateSectionRequest,
};
use crate::error::{AppError, Result, ValidationIssue};
use crate::services::progress::{self, ProgressSummary};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Service for managing curriculums and their contents
#[derive(Clone)]
pub struct CurriculumService {
    repo: Repository,
}

impl CurriculumService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// List every curriculum with its aggregated progress
    pub async fn list_curriculums(&self) -> Result<Vec<CurriculumWithProgress>> {
        let curriculums = self.repo.list_curriculums().await?;
        let counts: HashMap<i64, ProgressSummary> = self
            .repo
            .item_counts()
            .await?
            .into_iter()
            .map(|c| {
                (
                    c.curriculum_id,
                    ProgressSummary::from_counts(c.total.max(0) as u64, c.completed.max(0) as u64),
                )
            })
            .collect();

        Ok(curriculums
            .into_iter()
            .map(|curriculum| {
                let summary = counts.get(&curriculum.id).copied().unwrap_or_default();
                with_progress(curriculum, summary)
            })
            .collect())
    }

    /// Get a curriculum with sections, items and section progress
    pub async fn get_curriculum_detail(&self, id: i64) -> Result<CurriculumDetail> {
        let tree = self.repo.load_tree(id).await?;
        Ok(progress::assemble_detail(tree))
    }

    pub async fn create_curriculum(&self, req: CreateCurriculumRequest) -> Result<Curriculum> {
        tracing::info!("Creating curriculum: {}", req.title);

        let mut issues = Vec::new();
        check_title("title", &req.title, &mut issues);
        check_platform_url(req.platform_url.as_deref(), &mut issues);
        check_date_range(req.start_date, req.end_date, &mut issues);
        if !issues.is_empty() {
            return Err(AppError::Validation(issues));
        }

        let curriculum = self.repo.create_curriculum(&req).await?;

        tracing::info!("Curriculum created: {}", curriculum.id);
        Ok(curriculum)
    }

    pub async fn update_curriculum(
        &self,
        id: i64,
        req: UpdateCurriculumRequest,
    ) -> Result<Curriculum> {
        tracing::debug!("Updating curriculum: {}", id);

        let mut issues = Vec::new();
        if let Some(title) = &req.title {
            check_title("title", title, &mut issues);
        }
        check_platform_url(req.platform_url.as_deref(), &mut issues);

        if req.start_date.is_some() || req.end_date.is_some() {
            let current = self.repo.get_curriculum(id).await?;
            let start = req.start_date.unwrap_or(current.start_date);
            let end = req.end_date.unwrap_or(current.end_date);
            check_date_range(start, end, &mut issues);
        }
        if !issues.is_empty() {
            return Err(AppError::Validation(issues));
        }

        self.repo.update_curriculum(id, &req).await
    }

    pub async fn delete_curriculum(&self, id: i64) -> Result<()> {
        tracing::info!("Deleting curriculum: {}", id);
        self.repo.delete_curriculum(id).await
    }

    pub async fn create_section(
        &self,
        curriculum_id: i64,
        req: CreateSectionRequest,
    ) -> Result<Section> {
        let mut issues = Vec::new();
        check_title("title", &req.title, &mut issues);
        if !issues.is_empty() {
            return Err(AppError::Validation(issues));
        }

        let section = self.repo.create_section(curriculum_id, &req).await?;
        tracing::info!("Section {} added to curriculum {}", section.id, curriculum_id);
        Ok(section)
    }

    pub async fn update_section(&self, id: i64, req: UpdateSectionRequest) -> Result<Section> {
        if let Some(title) = &req.title {
            let mut issues = Vec::new();
            check_title("title", title, &mut issues);
            if !issues.is_empty() {
                return Err(AppError::Validation(issues));
            }
        }
        self.repo.update_section(id, &req).await
    }

    pub async fn delete_section(&self, id: i64) -> Result<()> {
        tracing::info!("Deleting section: {}", id);
        self.repo.delete_section(id).await
    }

    pub async fn create_item(&self, section_id: i64, req: CreateItemRequest) -> Result<Item> {
        let mut issues = Vec::new();
        check_title("title", &req.title, &mut issues);
        if !issues.is_empty() {
            return Err(AppError::Validation(issues));
        }

        let item = self.repo.create_item(section_id, &req).await?;
        tracing::info!("Item {} added to section {}", item.id, section_id);
        Ok(item)
    }

    pub async fn update_item(&self, id: i64, req: UpdateItemRequest) -> Result<Item> {
        if let Some(title) = &req.title {
            let mut issues = Vec::new();
            check_title("title", title, &mut issues);
            if !issues.is_empty() {
                return Err(AppError::Validation(issues));
            }
        }
        self.repo.update_item(id, &req).await
    }

    /// not_started -> in_progress -> completed -> not_started
    pub async fn cycle_item_status(&self, id: i64) -> Result<Item> {
        self.repo.cycle_item_status(id).await
    }

    pub async fn delete_item(&self, id: i64) -> Result<()> {
        tracing::info!("Deleting item: {}", id);
        self.repo.delete_item(id).await
    }

    /// The in-progress task of a curriculum, or the next one to start
    pub async fn current_task(&self, curriculum_id: i64) -> Result<Option<CurrentTaskInfo>> {
        let detail = self.get_curriculum_detail(curriculum_id).await?;
        Ok(progress::find_current_or_next_task(&detail.sections).map(|task| task.info()))
    }

    /// One card per curriculum for the dashboard
    pub async fn dashboard(&self, today: NaiveDate) -> Result<Vec<CurriculumCard>> {
        let curriculums = self.repo.list_curriculums().await?;
        let mut cards = Vec::with_capacity(curriculums.len());

        for curriculum in curriculums {
            let detail = self.get_curriculum_detail(curriculum.id).await?;
            let summary = progress::detail_progress(&detail);
            let current_task =
                progress::find_current_or_next_task(&detail.sections).map(|task| task.preview());
            let days_remaining = progress::days_remaining(detail.curriculum.end_date, today);

            cards.push(CurriculumCard {
                summary: with_progress(detail.curriculum, summary),
                days_remaining,
                current_task,
            });
        }

        Ok(cards)
    }
}

fn with_progress(curriculum: Curriculum, summary: ProgressSummary) -> CurriculumWithProgress {
    CurriculumWithProgress {
        curriculum,
        total_items: summary.total_items,
        completed_items: summary.completed_items,
        progress: summary.percent,
    }
}

pub(crate) fn check_title(path: &str, title: &str, issues: &mut Vec<ValidationIssue>) {
    if title.trim().is_empty() {
        issues.push(ValidationIssue::new(path, "Title is required"));
    }
}

fn check_platform_url(url: Option<&str>, issues: &mut Vec<ValidationIssue>) {
    let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
        return;
    };
    match reqwest::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        _ => issues.push(ValidationIssue::new("platformUrl", "Invalid url")),
    }
}

fn check_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    issues: &mut Vec<ValidationIssue>,
) {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            issues.push(ValidationIssue::new(
                "endDate",
                "End date must not precede start date",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{create_memory_pool, ItemStatus};

    async fn create_test_service() -> CurriculumService {
        let repo = Repository::new(create_memory_pool().await.unwrap());
        CurriculumService::new(repo)
    }

    fn titled(title: &str) -> CreateCurriculumRequest {
        CreateCurriculumRequest {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title_and_bad_url() {
        let service = create_test_service().await;

        let err = service
            .create_curriculum(CreateCurriculumRequest {
                title: "   ".to_string(),
                platform_url: Some("not a url".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        match err {
            AppError::Validation(issues) => {
                let paths: Vec<&str> = issues.iter().map(|i| i.path.as_str()).collect();
                assert_eq!(paths, vec!["title", "platformUrl"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_checks_dates_against_stored_values() {
        let service = create_test_service().await;
        let curriculum = service
            .create_curriculum(CreateCurriculumRequest {
                title: "Composition".to_string(),
                start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
                ..Default::default()
            })
            .await
            .unwrap();

        let result = service
            .update_curriculum(
                curriculum.id,
                UpdateCurriculumRequest {
                    end_date: Some(NaiveDate::from_ymd_opt(2026, 2, 1)),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let cleared = service
            .update_curriculum(
                curriculum.id,
                UpdateCurriculumRequest {
                    start_date: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.start_date, None);
    }

    #[tokio::test]
    async fn test_list_includes_progress() {
        let service = create_test_service().await;
        let curriculum = service.create_curriculum(titled("Portraits")).await.unwrap();
        let empty = service.create_curriculum(titled("Someday")).await.unwrap();

        let section = service
            .create_section(
                curriculum.id,
                CreateSectionRequest {
                    title: "Eyes".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        for status in [ItemStatus::Completed, ItemStatus::NotStarted, ItemStatus::InProgress] {
            service
                .create_item(
                    section.id,
                    CreateItemRequest {
                        title: "Study".to_string(),
                        status,
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }

        let list = service.list_curriculums().await.unwrap();
        let portraits = list.iter().find(|c| c.curriculum.id == curriculum.id).unwrap();
        assert_eq!(portraits.total_items, 3);
        assert_eq!(portraits.completed_items, 1);
        assert_eq!(portraits.progress, 33);

        let someday = list.iter().find(|c| c.curriculum.id == empty.id).unwrap();
        assert_eq!(someday.total_items, 0);
        assert_eq!(someday.progress, 0);
    }

    #[tokio::test]
    async fn test_dashboard_cards() {
        let service = create_test_service().await;
        let curriculum = service
            .create_curriculum(CreateCurriculumRequest {
                title: "Hands".to_string(),
                end_date: NaiveDate::from_ymd_opt(2026, 10, 26),
                ..Default::default()
            })
            .await
            .unwrap();
        let section = service
            .create_section(
                curriculum.id,
                CreateSectionRequest {
                    title: "Structure".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        let next = service
            .create_item(
                section.id,
                CreateItemRequest {
                    title: "Mannequin hands".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let cards = service.dashboard(today).await.unwrap();

        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].days_remaining, Some(10));
        let task = cards[0].current_task.as_ref().unwrap();
        assert_eq!(task.id, next.id);
        assert_eq!(task.section_title, "Structure");
    }

    #[tokio::test]
    async fn test_current_task_none_when_all_done() {
        let service = create_test_service().await;
        let curriculum = service.create_curriculum(titled("Done")).await.unwrap();
        let section = service
            .create_section(
                curriculum.id,
                CreateSectionRequest {
                    title: "Only".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        service
            .create_item(
                section.id,
                CreateItemRequest {
                    title: "Finished".to_string(),
                    status: ItemStatus::Completed,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(service.current_task(curriculum.id).await.unwrap(), None);
    }
}
