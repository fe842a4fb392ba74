pub mod submission_ctx;
pub mod submission_flow;
pub mod submission_watcher;

pub use submission_ctx::{MetadataFuture, SubmissionCtx};
pub use submission_flow::{FlowResult, SubmissionFlow};
pub use submission_watcher::{DetectionState, SubmissionWatcher};
