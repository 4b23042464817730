//! Import and export service
//!
//! Moves whole curriculums in and out of the store as JSON documents, and
//! packages a Markdown progress report plus a full JSON backup into a ZIP
//! "memory pack" with a checksummed manifest.

use crate::database::models::blank_date;
use crate::database::{
    CreateCurriculumRequest, CreateItemRequest, CreateSectionRequest, CurriculumDetail,
    CurriculumPriority, CurriculumStatus, ItemStatus, ItemType, Repository,
};
use crate::error::{AppError, Result, ValidationIssue};
use crate::services::curriculums::check_title;
use crate::services::progress;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

/// Portable form of one curriculum, used for both import and export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumDocument {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<CurriculumPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CurriculumStatus>,
    #[serde(
        default,
        deserialize_with = "blank_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "blank_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<NaiveDate>,
    pub sections: Vec<SectionDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDocument {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub items: Vec<ItemDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDocument {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ItemType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
}

/// Pack manifest structure
#[derive(Debug, Serialize, Deserialize)]
pub struct PackManifest {
    pub version: String,
    pub generated: String,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub size: u64,
    pub checksum: String,
}

/// A finished memory pack ready to be sent to the client
#[derive(Debug)]
pub struct ExportPack {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Import/export service
#[derive(Clone)]
pub struct TransferService {
    repo: Repository,
}

impl TransferService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create a curriculum with all sections and items from a document.
    ///
    /// Nothing is stored unless the whole document is valid and every row
    /// inserts.
    pub async fn import(&self, document: CurriculumDocument) -> Result<i64> {
        tracing::info!(
            "Importing curriculum: {} ({} sections)",
            document.title,
            document.sections.len()
        );

        validate_document(&document)?;

        let curriculum = CreateCurriculumRequest {
            title: document.title,
            author: document.author,
            platform: document.platform,
            platform_url: document.platform_url,
            description: document.description,
            priority: document.priority.unwrap_or_default(),
            status: document.status.unwrap_or_default(),
            start_date: document.start_date,
            end_date: document.end_date,
        };
        let sections: Vec<(CreateSectionRequest, Vec<CreateItemRequest>)> = document
            .sections
            .into_iter()
            .map(|section| {
                let items = section
                    .items
                    .into_iter()
                    .map(|item| CreateItemRequest {
                        title: item.title,
                        description: item.description,
                        item_type: item.item_type.unwrap_or_default(),
                        status: item.status.unwrap_or_default(),
                    })
                    .collect();
                (
                    CreateSectionRequest {
                        title: section.title,
                        description: section.description,
                    },
                    items,
                )
            })
            .collect();

        let created = self.repo.insert_tree(&curriculum, &sections).await?;

        tracing::info!("Curriculum imported: {}", created.id);
        Ok(created.id)
    }

    /// Every curriculum as a portable document, in creation order
    pub async fn export_json(&self) -> Result<Vec<CurriculumDocument>> {
        let details = self.load_all().await?;
        Ok(details.iter().map(to_document).collect())
    }

    /// ZIP archive with the Markdown report, a JSON backup and a manifest
    pub async fn export_pack(&self, today: NaiveDate) -> Result<ExportPack> {
        tracing::info!("Building memory pack");

        let details = self.load_all().await?;
        let stamp = today.format("%Y-%m-%d").to_string();

        let report = render_progress_report(&details, today)?;
        let documents: Vec<CurriculumDocument> = details.iter().map(to_document).collect();
        let backup = serde_json::to_string_pretty(&documents)?;

        let files = [
            (format!("tora-progress-{}.md", stamp), report.into_bytes()),
            (format!("tora-full-backup-{}.json", stamp), backup.into_bytes()),
        ];

        let mut manifest = PackManifest {
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated: stamp.clone(),
            files: Vec::new(),
        };

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);

        for (path, data) in &files {
            zip.start_file(path.as_str(), options)?;
            zip.write_all(data)?;

            manifest.files.push(FileEntry {
                path: path.clone(),
                size: data.len() as u64,
                checksum: calculate_checksum(data),
            });
        }

        let manifest_json = serde_json::to_string_pretty(&manifest)?;
        zip.start_file("manifest.json", options)?;
        zip.write_all(manifest_json.as_bytes())?;

        let bytes = zip.finish()?.into_inner();

        tracing::info!(
            "Memory pack built: {} curriculums, {} bytes",
            details.len(),
            bytes.len()
        );

        Ok(ExportPack {
            file_name: format!("tora-memory-pack-{}.zip", stamp),
            bytes,
        })
    }

    async fn load_all(&self) -> Result<Vec<CurriculumDetail>> {
        let mut curriculums = self.repo.list_curriculums().await?;
        curriculums.sort_by_key(|c| c.id);

        let mut details = Vec::with_capacity(curriculums.len());
        for curriculum in curriculums {
            let tree = self.repo.load_tree(curriculum.id).await?;
            details.push(progress::assemble_detail(tree));
        }
        Ok(details)
    }
}

fn validate_document(document: &CurriculumDocument) -> Result<()> {
    let mut issues: Vec<ValidationIssue> = Vec::new();

    check_title("title", &document.title, &mut issues);
    for (s, section) in document.sections.iter().enumerate() {
        check_title(&format!("sections[{}].title", s), &section.title, &mut issues);
        for (i, item) in section.items.iter().enumerate() {
            check_title(
                &format!("sections[{}].items[{}].title", s, i),
                &item.title,
                &mut issues,
            );
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(issues))
    }
}

fn to_document(detail: &CurriculumDetail) -> CurriculumDocument {
    let c = &detail.curriculum;
    CurriculumDocument {
        title: c.title.clone(),
        author: c.author.clone(),
        platform: c.platform.clone(),
        platform_url: c.platform_url.clone(),
        description: c.description.clone(),
        priority: Some(c.priority),
        status: Some(c.status),
        start_date: c.start_date,
        end_date: c.end_date,
        sections: detail
            .sections
            .iter()
            .map(|entry| SectionDocument {
                title: entry.section.title.clone(),
                description: entry.section.description.clone(),
                items: entry
                    .items
                    .iter()
                    .map(|item| ItemDocument {
                        title: item.title.clone(),
                        description: item.description.clone(),
                        item_type: Some(item.item_type),
                        status: Some(item.status),
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn status_marker(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Completed => "✓",
        ItemStatus::InProgress => "▶",
        ItemStatus::NotStarted => " ",
    }
}

/// Markdown progress report.
///
/// Ongoing curriculums are listed in full, standby ones with their section
/// titles, planned ones with their description only.
pub fn render_progress_report(
    details: &[CurriculumDetail],
    generated: NaiveDate,
) -> Result<String> {
    let mut md = String::new();
    writeln!(md, "# Tora Study Progress Report\n")?;
    writeln!(md, "Generated: {}\n", generated.format("%Y-%m-%d"))?;

    let with_status = |status: CurriculumStatus| {
        details
            .iter()
            .filter(move |d| d.curriculum.status == status)
            .peekable()
    };

    let mut ongoing = with_status(CurriculumStatus::Ongoing);
    if ongoing.peek().is_some() {
        writeln!(md, "## Active Studies (Ongoing)\n")?;
        for detail in ongoing {
            let c = &detail.curriculum;
            let summary = progress::detail_progress(detail);

            writeln!(md, "### {}", c.title)?;
            writeln!(
                md,
                "**Progress:** {}/{} items ({}%)\n",
                summary.completed_items, summary.total_items, summary.percent
            )?;

            let mut meta = Vec::new();
            if let Some(author) = &c.author {
                meta.push(format!("**Author:** {}", author));
            }
            if let Some(platform) = &c.platform {
                let platform = match &c.platform_url {
                    Some(url) => format!("[{}]({})", platform, url),
                    None => platform.clone(),
                };
                meta.push(format!("**Platform:** {}", platform));
            }
            meta.push(format!("**Priority:** {}", c.priority.as_str()));
            writeln!(md, "{}", meta.join(" | "))?;

            for entry in &detail.sections {
                writeln!(md, "\n#### {}", entry.section.title)?;
                if let Some(description) = &entry.section.description {
                    writeln!(md, "{}", description)?;
                }
                for item in &entry.items {
                    writeln!(
                        md,
                        "- [{}] {} ({}) - {}",
                        status_marker(item.status),
                        item.title,
                        item.item_type.as_str(),
                        item.status.label()
                    )?;
                }
            }
            writeln!(md, "\n---\n")?;
        }
    }

    let mut standby = with_status(CurriculumStatus::Standby);
    if standby.peek().is_some() {
        writeln!(md, "## On Hold (Standby)\n")?;
        for detail in standby {
            let c = &detail.curriculum;
            writeln!(md, "### {}", c.title)?;
            writeln!(
                md,
                "{}\n",
                c.description.as_deref().unwrap_or("Currently on hold.")
            )?;
            if !detail.sections.is_empty() {
                let titles: Vec<&str> = detail
                    .sections
                    .iter()
                    .map(|entry| entry.section.title.as_str())
                    .collect();
                writeln!(md, "**Sections:** {}\n", titles.join(", "))?;
            }
            writeln!(md, "---\n")?;
        }
    }

    let mut planned = with_status(CurriculumStatus::Planned);
    if planned.peek().is_some() {
        writeln!(md, "## Planned\n")?;
        for detail in planned {
            let c = &detail.curriculum;
            writeln!(md, "### {}", c.title)?;
            writeln!(
                md,
                "{}\n",
                c.description.as_deref().unwrap_or("Not yet started.")
            )?;
        }
    }

    Ok(md)
}

fn calculate_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_memory_pool;
    use std::io::Read;

    async fn create_test_service() -> TransferService {
        TransferService::new(Repository::new(create_memory_pool().await.unwrap()))
    }

    fn sample_document() -> CurriculumDocument {
        serde_json::from_str(
            r#"{
                "title": "Drawabox",
                "platform": "drawabox.com",
                "platformUrl": "https://drawabox.com",
                "priority": "high",
                "status": "ongoing",
                "sections": [
                    {
                        "title": "Lesson 1",
                        "items": [
                            { "title": "Superimposed lines", "type": "exercise", "status": "completed" },
                            { "title": "Ghosted planes", "type": "exercise", "status": "in_progress" }
                        ]
                    },
                    {
                        "title": "Lesson 2",
                        "description": "Boxes",
                        "items": [ { "title": "250 box challenge", "type": "homework" } ]
                    }
                ]
            }"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_import_then_export_keeps_structure() {
        let service = create_test_service().await;

        service.import(sample_document()).await.unwrap();
        let exported = service.export_json().await.unwrap();

        assert_eq!(exported.len(), 1);
        let doc = &exported[0];
        assert_eq!(doc.title, "Drawabox");
        assert_eq!(doc.priority, Some(CurriculumPriority::High));
        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.sections[0].items[1].title, "Ghosted planes");
        assert_eq!(doc.sections[1].items[0].status, Some(ItemStatus::NotStarted));
        assert_eq!(doc.sections[1].description.as_deref(), Some("Boxes"));
    }

    #[tokio::test]
    async fn test_import_accepts_blank_and_timestamp_dates() {
        let service = create_test_service().await;
        let document: CurriculumDocument = serde_json::from_str(
            r#"{
                "title": "Color Theory",
                "startDate": "",
                "endDate": "2026-01-01T00:00:00.000Z",
                "sections": []
            }"#,
        )
        .unwrap();
        assert_eq!(document.start_date, None);
        assert_eq!(document.end_date, NaiveDate::from_ymd_opt(2026, 1, 1));

        service.import(document).await.unwrap();
        let exported = service.export_json().await.unwrap();
        assert_eq!(exported[0].start_date, None);
        assert_eq!(exported[0].end_date, NaiveDate::from_ymd_opt(2026, 1, 1));
    }

    #[tokio::test]
    async fn test_import_rejects_blank_nested_title_and_stores_nothing() {
        let service = create_test_service().await;
        let mut document = sample_document();
        document.sections[1].items[0].title = " ".to_string();

        let err = service.import(document).await.unwrap_err();
        match err {
            AppError::Validation(issues) => {
                assert_eq!(issues[0].path, "sections[1].items[0].title");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(service.export_json().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_export_pack_contents() {
        let service = create_test_service().await;
        service.import(sample_document()).await.unwrap();

        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let pack = service.export_pack(today).await.unwrap();
        assert_eq!(pack.file_name, "tora-memory-pack-2026-10-16.zip");

        let mut archive = zip::ZipArchive::new(Cursor::new(pack.bytes)).unwrap();
        let mut report = String::new();
        archive
            .by_name("tora-progress-2026-10-16.md")
            .unwrap()
            .read_to_string(&mut report)
            .unwrap();
        assert!(report.contains("## Active Studies (Ongoing)"));
        assert!(report.contains("**Progress:** 1/3 items (33%)"));
        assert!(report.contains("- [✓] Superimposed lines (exercise) - Completed"));
        assert!(report.contains("**Platform:** [drawabox.com](https://drawabox.com)"));

        let mut manifest_json = String::new();
        archive
            .by_name("manifest.json")
            .unwrap()
            .read_to_string(&mut manifest_json)
            .unwrap();
        let manifest: PackManifest = serde_json::from_str(&manifest_json).unwrap();
        assert_eq!(manifest.files.len(), 2);

        let backup_entry = &manifest.files[1];
        let mut backup = Vec::new();
        archive
            .by_name(&backup_entry.path)
            .unwrap()
            .read_to_end(&mut backup)
            .unwrap();
        assert_eq!(calculate_checksum(&backup), backup_entry.checksum);
        assert_eq!(backup.len() as u64, backup_entry.size);
    }

    #[test]
    fn test_report_sections_by_status() {
        let report =
            render_progress_report(&[], NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()).unwrap();
        assert!(report.starts_with("# Tora Study Progress Report\n\nGenerated: 2026-01-02\n"));
        assert!(!report.contains("## Planned"));
    }

    #[tokio::test]
    async fn test_report_lists_standby_and_planned() {
        let service = create_test_service().await;
        let mut standby = sample_document();
        standby.title = "Perspective".to_string();
        standby.status = Some(CurriculumStatus::Standby);
        let mut planned = sample_document();
        planned.title = "Sculpting".to_string();
        planned.status = Some(CurriculumStatus::Planned);
        planned.description = Some("After the box challenge".to_string());
        service.import(standby).await.unwrap();
        service.import(planned).await.unwrap();

        let details = service.load_all().await.unwrap();
        let generated = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let report = render_progress_report(&details, generated).unwrap();

        assert!(!report.contains("## Active Studies (Ongoing)"));
        assert!(report.contains(
            "## On Hold (Standby)\n\n### Perspective\nCurrently on hold.\n\n\
             **Sections:** Lesson 1, Lesson 2\n\n---\n"
        ));
        assert!(report.ends_with("## Planned\n\n### Sculpting\nAfter the box challenge\n\n"));
    }
}
