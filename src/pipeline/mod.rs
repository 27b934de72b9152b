//! Pipeline orchestration
//!
//! Stages run strictly in order: countries, events, athletes, then the scrape
//! stages and role extraction. A stage whose output artifact already exists is
//! skipped, which makes every re-run resume where the last one stopped.

mod orchestrator;
mod stage;
mod status;

pub use orchestrator::{Pipeline, PipelineReport, StagePlan};
pub use stage::Stage;
pub use status::{StatusHandle, CHECKING, COMPLETED, IDLE};
