use thiserror::Error;
use url::Url;

/// Platform-assigned video identifier, taken from a video page URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VideoId(String);

impl VideoId {
    /// Extracts the id from a candidate URL.
    ///
    /// Video pages carry the id as a long run of digits in the path
    /// (`/@user/video/7234…`). The last all-digit segment longer than
    /// fifteen characters is the id. Profile links, tag links and
    /// unparsable strings yield `None`.
    pub fn from_url(raw: &str) -> Option<Self> {
        let url = Url::parse(raw).ok()?;
        let id = url
            .path_segments()?
            .rev()
            .find(|part| part.len() > 15 && part.bytes().all(|b| b.is_ascii_digit()))?;
        Some(Self(id.to_owned()))
    }

    /// Wraps an id that is already known to be valid (e.g. read back from
    /// the processed store).
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw digit string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pipeline stage a candidate can fail in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Fetch,
    Verify,
    Transform,
    Record,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Fetch => "fetch",
            PipelineStage::Verify => "verify",
            PipelineStage::Transform => "transform",
            PipelineStage::Record => "record",
        };
        f.write_str(name)
    }
}

/// Lifecycle of a candidate.
///
/// States advance strictly in the order they are declared; `Failed` is
/// terminal and reachable from any non-terminal state. Only the job
/// orchestrator moves candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateState {
    Discovered,
    Fetching,
    Fetched,
    Verifying,
    Verified,
    Transforming,
    Transformed,
    Recorded,
    Failed { stage: PipelineStage, reason: String },
}

impl CandidateState {
    /// Position in the linear stage order; `Failed` has none.
    fn order(&self) -> Option<u8> {
        match self {
            CandidateState::Discovered => Some(0),
            CandidateState::Fetching => Some(1),
            CandidateState::Fetched => Some(2),
            CandidateState::Verifying => Some(3),
            CandidateState::Verified => Some(4),
            CandidateState::Transforming => Some(5),
            CandidateState::Transformed => Some(6),
            CandidateState::Recorded => Some(7),
            CandidateState::Failed { .. } => None,
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CandidateState::Recorded | CandidateState::Failed { .. }
        )
    }
}

/// Attempted candidate transition that the lifecycle does not allow.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("illegal candidate transition from {from:?} to {to:?}")]
pub struct StateError {
    /// State the candidate was in.
    pub from: CandidateState,
    /// State the caller tried to move to.
    pub to: CandidateState,
}

/// One discovered video moving through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoCandidate {
    id: VideoId,
    source_url: String,
    state: CandidateState,
}

impl VideoCandidate {
    /// A freshly discovered candidate.
    pub fn new(id: VideoId, source_url: impl Into<String>) -> Self {
        Self {
            id,
            source_url: source_url.into(),
            state: CandidateState::Discovered,
        }
    }

    pub fn id(&self) -> &VideoId {
        &self.id
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn state(&self) -> &CandidateState {
        &self.state
    }

    /// Moves to the next lifecycle state. Only the immediate successor is
    /// legal; skipping ahead, moving backwards, or leaving a terminal
    /// state is refused.
    pub fn advance(&mut self, next: CandidateState) -> Result<(), StateError> {
        let legal = match (self.state.order(), next.order()) {
            (Some(cur), Some(n)) => n == cur + 1,
            _ => false,
        };
        if !legal {
            return Err(StateError {
                from: self.state.clone(),
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Marks the candidate failed at `stage`. Legal from any non-terminal
    /// state.
    pub fn fail(
        &mut self,
        stage: PipelineStage,
        reason: impl Into<String>,
    ) -> Result<(), StateError> {
        let next = CandidateState::Failed {
            stage,
            reason: reason.into(),
        };
        if self.state.is_terminal() {
            return Err(StateError {
                from: self.state.clone(),
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}
