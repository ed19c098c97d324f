use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pipeline_logging::{pipeline_debug, pipeline_info, pipeline_warn};
use tagreel_core::{JobRequest, ProgressEvent, VideoCandidate};
use thiserror::Error;

use crate::extract::extract_candidate_links;
use crate::progress::ProgressSink;
use crate::store::ProcessedStore;
use crate::webdriver::SessionError;

/// Settings for the scroll-and-collect loop on the tag page.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Platform root; the tag page lives at `{base_url}/tag/{hashtag}`.
    pub base_url: String,
    /// Hard cap on scroll rounds, guarding against endless feeds.
    pub max_scroll_rounds: usize,
    /// Consecutive rounds without a new id before the page counts as
    /// exhausted.
    pub stall_limit: usize,
    /// Pause after each scroll so lazily loaded content can land.
    pub scroll_delay: Duration,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.tiktok.com".to_string(),
            max_scroll_rounds: 12,
            stall_limit: 3,
            scroll_delay: Duration::from_secs(3),
        }
    }
}

/// A live page in a browser session. Production sessions speak the
/// WebDriver protocol; tests script these directly.
#[async_trait]
pub trait PageSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;
    /// Scrolls to the bottom of the document to trigger lazy loading.
    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError>;
    /// Current DOM serialized to HTML.
    async fn page_source(&mut self) -> Result<String, SessionError>;
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Opens browser sessions for discovery runs.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn PageSession>, SessionError>;
}

/// Discovery failures that abort the job. Exhaustion is not one of them;
/// it shows up as `DiscoveryOutcome::exhausted`.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The browser session could not be started or pointed at the tag
    /// page. Without it there is nothing to discover.
    #[error("session failed: {0}")]
    SessionFailed(#[from] SessionError),
}

/// What a discovery run produced.
#[derive(Debug)]
pub struct DiscoveryOutcome {
    /// New candidates in first-seen order, at most the requested count.
    pub candidates: Vec<VideoCandidate>,
    /// Scroll rounds actually performed.
    pub rounds: usize,
    /// True when the page ran out before the target was reached.
    pub exhausted: bool,
    /// Candidate links seen across all rounds, before any filtering.
    pub raw_links_seen: usize,
}

/// Produces new candidates for a job.
///
/// The processed-store filter lives here: no previously recorded id may
/// ever leave discovery as a candidate.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn discover(
        &self,
        request: &JobRequest,
        store: &ProcessedStore,
        sink: &dyn ProgressSink,
        stop: &AtomicBool,
    ) -> Result<DiscoveryOutcome, DiscoveryError>;
}

/// Browser-backed discovery: open the tag page, scroll, collect new ids.
pub struct BrowserDiscovery {
    launcher: Box<dyn SessionLauncher>,
    settings: DiscoverySettings,
}

impl BrowserDiscovery {
    pub fn new(launcher: Box<dyn SessionLauncher>, settings: DiscoverySettings) -> Self {
        Self { launcher, settings }
    }

    fn tag_url(&self, hashtag: &str) -> String {
        format!(
            "{}/tag/{}",
            self.settings.base_url.trim_end_matches('/'),
            hashtag
        )
    }

    async fn collect(
        &self,
        session: &mut dyn PageSession,
        url: &str,
        target: usize,
        store: &ProcessedStore,
        sink: &dyn ProgressSink,
        stop: &AtomicBool,
    ) -> Result<DiscoveryOutcome, DiscoveryError> {
        session.navigate(url).await?;

        let mut candidates: Vec<VideoCandidate> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut raw_links_seen = 0usize;
        let mut stalled_rounds = 0usize;
        let mut rounds = 0usize;
        let mut exhausted = false;

        while candidates.len() < target {
            if stop.load(Ordering::Relaxed) {
                sink.emit(ProgressEvent::warning(
                    "Stop requested, ending discovery early",
                ));
                break;
            }
            if rounds >= self.settings.max_scroll_rounds {
                exhausted = true;
                break;
            }
            rounds += 1;
            pipeline_debug!("scroll round {rounds}, {} candidates so far", candidates.len());

            // A dying session mid-scroll costs us the rest of the page,
            // not the candidates already collected.
            if let Err(err) = session.scroll_to_bottom().await {
                pipeline_warn!("scroll failed, keeping what was collected: {err}");
                exhausted = true;
                break;
            }
            tokio::time::sleep(self.settings.scroll_delay).await;
            let html = match session.page_source().await {
                Ok(html) => html,
                Err(err) => {
                    pipeline_warn!("could not read page source: {err}");
                    exhausted = true;
                    break;
                }
            };

            let links = extract_candidate_links(&html, &self.settings.base_url);
            raw_links_seen += links.len();
            let mut new_this_round = 0usize;
            for link in links {
                if candidates.len() >= target {
                    break;
                }
                if store.contains(link.id.as_str()) || seen.contains(link.id.as_str()) {
                    continue;
                }
                pipeline_info!("discovered new video {}", link.id);
                sink.emit(ProgressEvent::info(format!("Found new video {}", link.id)));
                seen.insert(link.id.as_str().to_owned());
                candidates.push(VideoCandidate::new(link.id, link.url));
                new_this_round += 1;
            }

            if new_this_round == 0 {
                stalled_rounds += 1;
                if stalled_rounds >= self.settings.stall_limit {
                    exhausted = true;
                    break;
                }
            } else {
                stalled_rounds = 0;
            }
        }

        // Zero links across every round is the signature of a layout
        // change, not of an empty tag.
        if rounds > 0 && raw_links_seen == 0 {
            sink.emit(ProgressEvent::warning(
                "No video links found on the tag page; its structure may have changed",
            ));
        }

        Ok(DiscoveryOutcome {
            candidates,
            rounds,
            exhausted,
            raw_links_seen,
        })
    }
}

#[async_trait]
impl CandidateSource for BrowserDiscovery {
    async fn discover(
        &self,
        request: &JobRequest,
        store: &ProcessedStore,
        sink: &dyn ProgressSink,
        stop: &AtomicBool,
    ) -> Result<DiscoveryOutcome, DiscoveryError> {
        let url = self.tag_url(request.hashtag());
        sink.emit(ProgressEvent::info(format!("Opening tag page {url}")));

        let mut session = self.launcher.launch().await?;
        let outcome = self
            .collect(
                session.as_mut(),
                &url,
                request.target_new_count(),
                store,
                sink,
                stop,
            )
            .await;

        // Best-effort close; a leaked browser process is not worth
        // failing the job over.
        if let Err(err) = session.close().await {
            pipeline_warn!("failed to close browser session: {err}");
        }

        outcome
    }
}
