//! Request orchestration for upload, summary, query, and related-paper lookups.

mod service;
pub mod types;

pub use service::{AssistantApi, AssistantService};
pub use types::{
    AssistantError, AssistantSettings, HealthReport, QueryOutcome, RelatedOutcome, SourceRef,
    SummaryOutcome, UploadOutcome,
};
