//! Progress aggregation
//!
//! Pure functions that roll item completion up to sections and curriculums
//! and pick the task a learner should look at next. Nothing here touches
//! storage.

use crate::database::{
    CurrentTaskInfo, CurriculumDetail, CurriculumTree, Item, ItemStatus, Section, SectionWithItems,
    TaskPreview,
};
use chrono::NaiveDate;
use serde::Serialize;

/// Completion totals for a curriculum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total_items: u64,
    pub completed_items: u64,
    pub percent: u8,
}

impl ProgressSummary {
    pub fn from_counts(total_items: u64, completed_items: u64) -> Self {
        Self {
            total_items,
            completed_items,
            percent: percent(completed_items, total_items),
        }
    }
}

/// `completed / total` as a whole percentage, rounding halves up.
///
/// Zero when `total` is zero.
pub fn percent(completed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    ((200 * completed + total) / (2 * total)) as u8
}

/// Completion percentage of one section's items
pub fn section_progress(items: &[Item]) -> u8 {
    let completed = items
        .iter()
        .filter(|item| item.status == ItemStatus::Completed)
        .count();
    percent(completed as u64, items.len() as u64)
}

/// Completion totals over every item of every section.
///
/// Items are counted individually, so a small section weighs no more than
/// its item count.
pub fn curriculum_progress<'a, I>(sections: I) -> ProgressSummary
where
    I: IntoIterator<Item = &'a [Item]>,
{
    let (total, completed) = sections
        .into_iter()
        .flatten()
        .fold((0u64, 0u64), |(total, completed), item| {
            let done = u64::from(item.status == ItemStatus::Completed);
            (total + 1, completed + done)
        });
    ProgressSummary::from_counts(total, completed)
}

/// The item a learner is working on, or should start next
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentTask<'a> {
    pub section: &'a Section,
    pub item: &'a Item,
}

impl CurrentTask<'_> {
    pub fn preview(&self) -> TaskPreview {
        TaskPreview {
            id: self.item.id,
            title: self.item.title.clone(),
            item_type: self.item.item_type,
            status: self.item.status,
            section_title: self.section.title.clone(),
        }
    }

    pub fn info(&self) -> CurrentTaskInfo {
        CurrentTaskInfo {
            preview: self.preview(),
            description: self.item.description.clone(),
            section_id: self.section.id,
        }
    }
}

/// First in-progress item in (section, item) order, else the first
/// not-started one. `None` means everything is completed.
pub fn find_current_or_next_task(sections: &[SectionWithItems]) -> Option<CurrentTask<'_>> {
    let flattened = || {
        sections.iter().flat_map(|entry| {
            entry.items.iter().map(move |item| CurrentTask {
                section: &entry.section,
                item,
            })
        })
    };

    flattened()
        .find(|task| task.item.status == ItemStatus::InProgress)
        .or_else(|| flattened().find(|task| task.item.status == ItemStatus::NotStarted))
}

/// Whole days from `today` until `end_date`; negative once overdue
pub fn days_remaining(end_date: Option<NaiveDate>, today: NaiveDate) -> Option<i64> {
    end_date.map(|end| (end - today).num_days())
}

/// Build the detail view of a stored hierarchy.
///
/// Sections and items are sorted by their stored position here as well, so
/// the view never depends on the order rows arrived in.
pub fn assemble_detail(tree: CurriculumTree) -> CurriculumDetail {
    let mut sections: Vec<SectionWithItems> = tree
        .sections
        .into_iter()
        .map(|(section, mut items)| {
            items.sort_by_key(|item| (item.sort_order, item.id));
            let progress = section_progress(&items);
            SectionWithItems {
                section,
                items,
                progress,
            }
        })
        .collect();
    sections.sort_by_key(|entry| (entry.section.sort_order, entry.section.id));

    let summary = curriculum_progress(sections.iter().map(|entry| entry.items.as_slice()));
    CurriculumDetail {
        curriculum: tree.curriculum,
        sections,
        total_items: summary.total_items,
        completed_items: summary.completed_items,
        progress: summary.percent,
    }
}

/// Totals of an already assembled detail view
pub fn detail_progress(detail: &CurriculumDetail) -> ProgressSummary {
    ProgressSummary {
        total_items: detail.total_items,
        completed_items: detail.completed_items,
        percent: detail.progress,
    }
}
