//! Tagreel core: pure domain types for the hashtag acquisition pipeline.
mod candidate;
mod event;
mod geometry;
mod request;
mod summary;

pub use candidate::{CandidateState, PipelineStage, StateError, VideoCandidate, VideoId};
pub use event::{EventLevel, ProgressEvent, StageProgress};
pub use geometry::{plan_crop, CropPlan, GeometryError, RoundingPolicy, VideoDimensions};
pub use request::{JobRequest, RequestError};
pub use summary::JobSummary;
