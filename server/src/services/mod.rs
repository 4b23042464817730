//! Services module
//!
//! Business logic services that coordinate between the HTTP layer and the repository.

pub mod curriculums;
pub mod illustrations;
pub mod progress;
pub mod reorder;
pub mod transfer;

pub use curriculums::CurriculumService;
pub use illustrations::{Illustration, IllustrationService, ProxiedImage, RankingResponse};
pub use progress::ProgressSummary;
pub use reorder::ReorderCoordinator;
pub use transfer::{CurriculumDocument, ExportPack, TransferService};
