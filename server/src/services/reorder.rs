//! Batch reordering
//!
//! Applies a drag-and-drop result to one curriculum: every section and item
//! named in the request gets its new position, or none does. The response is
//! re-read from storage after the commit rather than echoed from the request.

use crate::database::{CurriculumDetail, ReorderRequest, Repository};
use crate::error::{AppError, Result, ValidationIssue};
use crate::services::progress;
use std::collections::HashSet;

/// Coordinates validation, the transactional write and the fresh read-back
#[derive(Clone)]
pub struct ReorderCoordinator {
    repo: Repository,
}

impl ReorderCoordinator {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Reposition sections and items of `curriculum_id`.
    ///
    /// Positions are written exactly as given; entities missing from the
    /// request keep their current position.
    pub async fn reorder(
        &self,
        curriculum_id: i64,
        req: &ReorderRequest,
    ) -> Result<CurriculumDetail> {
        tracing::info!(
            "Reordering curriculum {} ({} sections)",
            curriculum_id,
            req.sections.len()
        );

        check_shape(req)?;

        let written = self.repo.apply_positions(curriculum_id, req).await?;
        tracing::debug!("Reorder of curriculum {} wrote {} rows", curriculum_id, written);

        let tree = self.repo.load_tree(curriculum_id).await?;
        Ok(progress::assemble_detail(tree))
    }
}

/// Reject requests that name the same entity twice; its target position
/// would be ambiguous.
fn check_shape(req: &ReorderRequest) -> Result<()> {
    let mut issues = Vec::new();
    let mut seen_sections = HashSet::new();
    let mut seen_items = HashSet::new();

    for (section_index, section) in req.sections.iter().enumerate() {
        if !seen_sections.insert(section.id) {
            issues.push(ValidationIssue::new(
                format!("sections[{}].id", section_index),
                format!("Section {} is listed more than once", section.id),
            ));
        }
        for (item_index, item) in section.items.iter().enumerate() {
            if !seen_items.insert(item.id) {
                issues.push(ValidationIssue::new(
                    format!("sections[{}].items[{}].id", section_index, item_index),
                    format!("Item {} is listed more than once", item.id),
                ));
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{
        create_memory_pool, CreateCurriculumRequest, CreateItemRequest, CreateSectionRequest,
        ItemPlacement, ItemStatus, SectionPlacement,
    };

    struct Fixture {
        repo: Repository,
        coordinator: ReorderCoordinator,
        curriculum_id: i64,
        sections: Vec<i64>,
        items: Vec<Vec<i64>>,
    }

    /// Curriculum with two sections of two items each
    async fn fixture() -> Fixture {
        let repo = Repository::new(create_memory_pool().await.unwrap());
        let curriculum = repo
            .create_curriculum(&CreateCurriculumRequest {
                title: "Landscape".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut sections = Vec::new();
        let mut items = Vec::new();
        for title in ["Values", "Edges"] {
            let section = repo
                .create_section(
                    curriculum.id,
                    &CreateSectionRequest {
                        title: title.to_string(),
                        description: None,
                    },
                )
                .await
                .unwrap();
            let mut ids = Vec::new();
            for (n, status) in [ItemStatus::Completed, ItemStatus::NotStarted]
                .into_iter()
                .enumerate()
            {
                let item = repo
                    .create_item(
                        section.id,
                        &CreateItemRequest {
                            title: format!("{title} {n}"),
                            status,
                            ..Default::default()
                        },
                    )
                    .await
                    .unwrap();
                ids.push(item.id);
            }
            sections.push(section.id);
            items.push(ids);
        }

        Fixture {
            coordinator: ReorderCoordinator::new(repo.clone()),
            repo,
            curriculum_id: curriculum.id,
            sections,
            items,
        }
    }

    fn placement(id: i64, sort_order: i64, items: &[(i64, i64)]) -> SectionPlacement {
        SectionPlacement {
            id,
            sort_order,
            items: items
                .iter()
                .map(|&(id, sort_order)| ItemPlacement { id, sort_order })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_reorder_swaps_sections_and_items() {
        let f = fixture().await;
        let (a, b) = (f.sections[0], f.sections[1]);
        let req = ReorderRequest {
            sections: vec![
                placement(a, 1, &[(f.items[0][0], 1), (f.items[0][1], 0)]),
                placement(b, 0, &[]),
            ],
        };

        let detail = f.coordinator.reorder(f.curriculum_id, &req).await.unwrap();

        let order: Vec<i64> = detail.sections.iter().map(|s| s.section.id).collect();
        assert_eq!(order, vec![b, a]);
        let moved: Vec<i64> = detail.sections[1].items.iter().map(|i| i.id).collect();
        assert_eq!(moved, vec![f.items[0][1], f.items[0][0]]);
        assert_eq!(detail.sections[1].progress, 50);
    }

    #[tokio::test]
    async fn test_item_under_wrong_section_changes_nothing() {
        let f = fixture().await;
        let before = f.repo.load_tree(f.curriculum_id).await.unwrap();

        let req = ReorderRequest {
            sections: vec![
                placement(f.sections[0], 1, &[(f.items[0][0], 1)]),
                // item of the first section listed under the second
                placement(f.sections[1], 0, &[(f.items[0][1], 0)]),
            ],
        };

        let err = f
            .coordinator
            .reorder(f.curriculum_id, &req)
            .await
            .unwrap_err();
        match err {
            AppError::Validation(issues) => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].path, "sections[1].items[0].id");
                assert!(issues[0].message.contains(&f.items[0][1].to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let after = f.repo.load_tree(f.curriculum_id).await.unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_duplicate_entries_are_rejected() {
        let f = fixture().await;
        let req = ReorderRequest {
            sections: vec![
                placement(f.sections[0], 0, &[]),
                placement(f.sections[0], 1, &[]),
            ],
        };

        let result = f.coordinator.reorder(f.curriculum_id, &req).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unknown_curriculum_is_not_found() {
        let f = fixture().await;
        let result = f
            .coordinator
            .reorder(9_999, &ReorderRequest::default())
            .await;

        assert!(matches!(
            result,
            Err(AppError::NotFound {
                entity: "Curriculum",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_reorder_is_idempotent() {
        let f = fixture().await;
        let req = ReorderRequest {
            sections: vec![
                placement(f.sections[0], 1, &[(f.items[0][0], 1), (f.items[0][1], 0)]),
                placement(f.sections[1], 0, &[(f.items[1][0], 1), (f.items[1][1], 0)]),
            ],
        };

        let first = f.coordinator.reorder(f.curriculum_id, &req).await.unwrap();
        let second = f.coordinator.reorder(f.curriculum_id, &req).await.unwrap();

        let ids = |d: &CurriculumDetail| -> Vec<(i64, Vec<i64>, u8)> {
            d.sections
                .iter()
                .map(|s| {
                    (
                        s.section.id,
                        s.items.iter().map(|i| i.id).collect(),
                        s.progress,
                    )
                })
                .collect()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn test_empty_request_returns_current_view() {
        let f = fixture().await;

        let detail = f
            .coordinator
            .reorder(f.curriculum_id, &ReorderRequest::default())
            .await
            .unwrap();

        let order: Vec<i64> = detail.sections.iter().map(|s| s.section.id).collect();
        assert_eq!(order, f.sections);
    }
}
