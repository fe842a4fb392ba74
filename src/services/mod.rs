pub mod difficulty_reconciler;
pub mod failure_log;
pub mod notifier;
pub mod problem_extractor;
pub mod solved_sync;

#[cfg(test)]
pub mod fake;

pub use difficulty_reconciler::reconcile;
pub use failure_log::FailureLog;
pub use notifier::{Notifier, PageNotifier, ToastKind};
pub use problem_extractor::{ExtractedCode, ProblemExtractor};
pub use solved_sync::{SolvedProblemSync, SyncJob, SyncOutcome};
