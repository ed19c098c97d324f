use tagreel_core::{JobSummary, ProgressEvent};
use thiserror::Error;

/// Events the engine delivers to the front end, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A running job reported progress.
    Progress(ProgressEvent),
    /// The job finished. `fatal` is set when it was cut short; the summary
    /// always carries whatever was counted up to that point.
    JobFinished {
        summary: JobSummary,
        fatal: Option<FatalError>,
    },
}

/// Errors that end a job early. Everything else is per-candidate and the
/// job keeps going.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FatalError {
    /// The browser session could not be started or driven.
    #[error("browser session failed: {0}")]
    Session(String),
    /// The retrieval tool is not installed or not on PATH. Without it no
    /// candidate can be fetched, so the job stops at the first attempt.
    #[error("retrieval tool `{0}` not found on PATH")]
    RetrievalToolMissing(String),
}
