use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use pipeline_logging::{pipeline_debug, pipeline_error, pipeline_info, pipeline_warn};
use tagreel_core::{
    CandidateState, JobRequest, JobSummary, PipelineStage, ProgressEvent, VideoCandidate,
};

use crate::discovery::{CandidateSource, DiscoveryError};
use crate::engine::EngineConfig;
use crate::fetch::{FetchError, Fetcher};
use crate::progress::ProgressSink;
use crate::store::ProcessedStore;
use crate::transform::Transformer;
use crate::types::FatalError;
use crate::verify::{Inspector, VerifyError};

/// The stage components one job runs through, injected so any of them
/// can be substituted in tests.
pub struct PipelineDeps<'a> {
    pub discovery: &'a dyn CandidateSource,
    pub fetcher: &'a dyn Fetcher,
    pub inspector: &'a dyn Inspector,
    pub transformer: &'a dyn Transformer,
}

/// Runs one job start to finish.
///
/// Returns the summary plus the fatal error that cut the job short, if
/// any. Per-candidate failures never escape this function: they become
/// a warning event, a summary counter, and a `Failed` candidate.
pub async fn run_job(
    deps: &PipelineDeps<'_>,
    config: &EngineConfig,
    request: &JobRequest,
    sink: &dyn ProgressSink,
    stop: &AtomicBool,
) -> (JobSummary, Option<FatalError>) {
    let mut summary = JobSummary::for_hashtag(request.hashtag());
    let mut store = open_store(config, sink);

    sink.emit(ProgressEvent::info(format!(
        "Looking for {} new video(s) tagged #{}",
        request.target_new_count(),
        request.hashtag()
    )));

    let outcome = match deps.discovery.discover(request, &store, sink, stop).await {
        Ok(outcome) => outcome,
        Err(DiscoveryError::SessionFailed(err)) => {
            sink.emit(ProgressEvent::error(format!(
                "Browser session failed: {err}"
            )));
            return (summary, Some(FatalError::Session(err.to_string())));
        }
    };

    summary.discovered = outcome.candidates.len();
    if outcome.candidates.is_empty() {
        sink.emit(ProgressEvent::info("No new videos found"));
        return (summary, None);
    }
    if outcome.exhausted {
        sink.emit(ProgressEvent::warning(format!(
            "Found only {} of {} requested new video(s) before the page ran out",
            outcome.candidates.len(),
            request.target_new_count()
        )));
    }

    if let Err(err) =
        fs::create_dir_all(&config.fetch_dir).and_then(|()| fs::create_dir_all(&config.edit_dir))
    {
        sink.emit(ProgressEvent::warning(format!(
            "Could not create output directories: {err}"
        )));
    }

    let total = outcome.candidates.len();
    let mut fatal = None;

    for (index, mut candidate) in outcome.candidates.into_iter().enumerate() {
        if stop.load(Ordering::Relaxed) {
            sink.emit(ProgressEvent::warning(
                "Stop requested; leaving remaining videos for a later run",
            ));
            break;
        }

        sink.emit(
            ProgressEvent::info(format!(
                "Processing video {} ({} of {total})",
                candidate.id(),
                index + 1
            ))
            .with_progress(index + 1, total),
        );

        match process_candidate(deps, config, &mut candidate, sink).await {
            Ok(()) => match store.record(candidate.id()) {
                Ok(()) => {
                    mark(&mut candidate, CandidateState::Recorded);
                    summary.succeeded += 1;
                    sink.emit(ProgressEvent::info(format!(
                        "Finished video {} ({} done)",
                        candidate.id(),
                        summary.succeeded
                    )));
                }
                Err(err) => {
                    mark_failed(&mut candidate, PipelineStage::Record, &err.to_string());
                    summary.count_failure(PipelineStage::Record);
                    sink.emit(ProgressEvent::warning(format!(
                        "Could not record video {}: {err}",
                        candidate.id()
                    )));
                }
            },
            Err(StageFailure::Fatal(err)) => {
                mark_failed(&mut candidate, PipelineStage::Fetch, &err.to_string());
                summary.count_failure(PipelineStage::Fetch);
                sink.emit(ProgressEvent::error(err.to_string()));
                fatal = Some(err);
                break;
            }
            Err(StageFailure::Item { stage, reason }) => {
                mark_failed(&mut candidate, stage, &reason);
                summary.count_failure(stage);
                sink.emit(ProgressEvent::warning(format!(
                    "Video {} failed at {stage}: {reason}",
                    candidate.id()
                )));
            }
        }
    }

    pipeline_info!(
        "job for #{} done: {} succeeded, {} failed",
        summary.hashtag,
        summary.succeeded,
        summary.failed_total()
    );
    (summary, fatal)
}

enum StageFailure {
    /// Ends the whole job.
    Fatal(FatalError),
    /// Skips only this candidate.
    Item { stage: PipelineStage, reason: String },
}

async fn process_candidate(
    deps: &PipelineDeps<'_>,
    config: &EngineConfig,
    candidate: &mut VideoCandidate,
    sink: &dyn ProgressSink,
) -> Result<(), StageFailure> {
    let fetched = config.fetch_dir.join(format!("{}.mp4", candidate.id()));
    let edited = config.edit_dir.join(format!("{}_edited.mp4", candidate.id()));

    mark(candidate, CandidateState::Fetching);
    match deps.fetcher.fetch(candidate.source_url(), &fetched).await {
        Ok(()) => mark(candidate, CandidateState::Fetched),
        Err(FetchError::ToolMissing(tool)) => {
            return Err(StageFailure::Fatal(FatalError::RetrievalToolMissing(tool)));
        }
        Err(err) => {
            return Err(StageFailure::Item {
                stage: PipelineStage::Fetch,
                reason: err.to_string(),
            });
        }
    }

    mark(candidate, CandidateState::Verifying);
    let dims = match deps.inspector.verify(&fetched).await {
        Ok(dims) => {
            mark(candidate, CandidateState::Verified);
            dims
        }
        Err(err) => {
            // A download that does not verify is junk on disk; drop it
            // so a later run can retry the id with a clean slate.
            if matches!(err, VerifyError::Corrupt(_)) {
                discard(&fetched);
            }
            return Err(StageFailure::Item {
                stage: PipelineStage::Verify,
                reason: err.to_string(),
            });
        }
    };
    sink.emit(ProgressEvent::info(format!(
        "Verified video {} ({dims})",
        candidate.id()
    )));

    mark(candidate, CandidateState::Transforming);
    match deps.transformer.transform(&fetched, dims, &edited).await {
        Ok(()) => {
            mark(candidate, CandidateState::Transformed);
            pipeline_debug!("wrote {}", edited.display());
            Ok(())
        }
        Err(err) => Err(StageFailure::Item {
            stage: PipelineStage::Transform,
            reason: err.to_string(),
        }),
    }
}

fn open_store(config: &EngineConfig, sink: &dyn ProgressSink) -> ProcessedStore {
    match ProcessedStore::open(&config.store_path) {
        Ok(store) => {
            pipeline_info!("loaded {} processed id(s)", store.len());
            store
        }
        Err(err) => {
            // A corrupt log must not block all future discovery; start
            // empty and accept the risk of re-processing.
            sink.emit(ProgressEvent::warning(format!(
                "Processed-video log could not be read, starting empty: {err}"
            )));
            ProcessedStore::empty(&config.store_path)
        }
    }
}

// Stage transitions are sequenced by this module alone; a refusal here
// is a bug, not a runtime condition.
fn mark(candidate: &mut VideoCandidate, next: CandidateState) {
    if let Err(err) = candidate.advance(next) {
        pipeline_error!("{err}");
    }
}

fn mark_failed(candidate: &mut VideoCandidate, stage: PipelineStage, reason: &str) {
    if let Err(err) = candidate.fail(stage, reason) {
        pipeline_error!("{err}");
    }
}

fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => pipeline_info!("removed corrupt download {}", path.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => pipeline_warn!("could not remove {}: {err}", path.display()),
    }
}
