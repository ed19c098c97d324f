use crate::PipelineStage;

/// Final per-stage accounting for one job.
///
/// Every candidate the job touched lands in exactly one bucket:
/// `succeeded` or one of the `failed_*` counters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobSummary {
    pub hashtag: String,
    /// New candidates discovery handed to the pipeline.
    pub discovered: usize,
    /// Candidates that made it all the way to the processed store.
    pub succeeded: usize,
    pub failed_fetch: usize,
    pub failed_verify: usize,
    pub failed_transform: usize,
    pub failed_record: usize,
}

impl JobSummary {
    /// Empty summary for a job that has not counted anything yet.
    pub fn for_hashtag(hashtag: impl Into<String>) -> Self {
        Self {
            hashtag: hashtag.into(),
            ..Self::default()
        }
    }

    /// Bumps the counter matching a failure at `stage`.
    pub fn count_failure(&mut self, stage: PipelineStage) {
        match stage {
            PipelineStage::Fetch => self.failed_fetch += 1,
            PipelineStage::Verify => self.failed_verify += 1,
            PipelineStage::Transform => self.failed_transform += 1,
            PipelineStage::Record => self.failed_record += 1,
        }
    }

    /// Candidates that failed at any stage.
    pub fn failed_total(&self) -> usize {
        self.failed_fetch + self.failed_verify + self.failed_transform + self.failed_record
    }

    /// Candidates that were fetched but never completed.
    pub fn skipped_past_fetch(&self) -> usize {
        self.failed_verify + self.failed_transform + self.failed_record
    }
}
