use chrono::{DateTime, Utc};

/// Severity of a progress event; front ends map these onto their own
/// presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

/// Position within the per-candidate loop: item `current` of `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageProgress {
    pub current: usize,
    pub total: usize,
}

/// One entry in the ordered stream a running job emits.
///
/// Immutable once constructed; the engine emits events in the order
/// things happened and the channel preserves that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub level: EventLevel,
    pub message: String,
    pub at: DateTime<Utc>,
    pub progress: Option<StageProgress>,
}

impl ProgressEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Error, message)
    }

    fn new(level: EventLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Utc::now(),
            progress: None,
        }
    }

    /// Attaches loop position to the event.
    pub fn with_progress(mut self, current: usize, total: usize) -> Self {
        self.progress = Some(StageProgress { current, total });
        self
    }
}
