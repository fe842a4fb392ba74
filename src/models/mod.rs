pub mod language;
pub mod messages;
pub mod problem;
pub mod sync_state;

pub use language::LanguageInfo;
pub use messages::{Request, Response};
pub use problem::{
    format_problem_name, CatalogueEntry, Difficulty, ProblemMetadata, ProblemRecord, ProblemUrl,
    TrackedProblem,
};
pub use sync_state::{LastStatus, StatsUpdate, SyncCounters, SyncStatus};
