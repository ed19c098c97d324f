use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tagreel_core::{JobRequest, ProgressEvent, VideoCandidate, VideoId};
use tagreel_engine::{
    BrowserDiscovery, CandidateSource, DiscoveryError, DiscoverySettings, PageSession,
    ProcessedStore, ProgressSink, SessionError, SessionLauncher,
};
use tempfile::TempDir;

const A: &str = "7100000000000000001";
const B: &str = "7100000000000000002";
const C: &str = "7100000000000000003";
const D: &str = "7100000000000000004";
const E: &str = "7100000000000000005";

/// Serves one canned page per scroll round, repeating the last page once
/// the script runs out.
struct ScriptedSession {
    pages: Vec<String>,
    served: usize,
    scrolls: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
    navigated: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl PageSession for ScriptedSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.navigated.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
        self.scrolls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String, SessionError> {
        let page = self
            .pages
            .get(self.served)
            .or_else(|| self.pages.last())
            .cloned()
            .unwrap_or_default();
        self.served += 1;
        Ok(page)
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct ScriptedLauncher {
    pages: Vec<String>,
    scrolls: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
    navigated: Arc<Mutex<Vec<String>>>,
}

impl ScriptedLauncher {
    fn serving(pages: Vec<String>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }
}

#[async_trait]
impl SessionLauncher for ScriptedLauncher {
    async fn launch(&self) -> Result<Box<dyn PageSession>, SessionError> {
        Ok(Box::new(ScriptedSession {
            pages: self.pages.clone(),
            served: 0,
            scrolls: self.scrolls.clone(),
            closed: self.closed.clone(),
            navigated: self.navigated.clone(),
        }))
    }
}

struct FailingLauncher;

#[async_trait]
impl SessionLauncher for FailingLauncher {
    async fn launch(&self) -> Result<Box<dyn PageSession>, SessionError> {
        Err(SessionError::Network("connection refused".to_string()))
    }
}

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl TestSink {
    fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.message.clone())
            .collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn video_page(ids: &[&str]) -> String {
    let anchors: String = ids
        .iter()
        .map(|id| format!(r#"<a href="/@user/video/{id}">clip</a>"#))
        .collect();
    format!("<html><body>{anchors}</body></html>")
}

fn quick_settings() -> DiscoverySettings {
    DiscoverySettings {
        scroll_delay: Duration::from_millis(1),
        ..DiscoverySettings::default()
    }
}

fn request(count: usize) -> JobRequest {
    JobRequest::new("funnycats", count).unwrap()
}

fn candidate_ids(candidates: &[VideoCandidate]) -> Vec<String> {
    candidates
        .iter()
        .map(|candidate| candidate.id().to_string())
        .collect()
}

#[tokio::test]
async fn collects_up_to_target_then_stops() {
    let launcher = ScriptedLauncher::serving(vec![video_page(&[A, B, C, D, E])]);
    let scrolls = launcher.scrolls.clone();
    let closed = launcher.closed.clone();
    let navigated = launcher.navigated.clone();
    let discovery = BrowserDiscovery::new(Box::new(launcher), quick_settings());

    let store = ProcessedStore::empty("unused.txt");
    let sink = TestSink::default();
    let outcome = discovery
        .discover(&request(3), &store, &sink, &AtomicBool::new(false))
        .await
        .unwrap();

    assert_eq!(candidate_ids(&outcome.candidates), vec![A, B, C]);
    assert!(!outcome.exhausted);
    assert_eq!(outcome.rounds, 1);
    assert_eq!(scrolls.load(Ordering::SeqCst), 1);
    assert!(closed.load(Ordering::SeqCst));
    assert_eq!(
        navigated.lock().unwrap().as_slice(),
        ["https://www.tiktok.com/tag/funnycats"]
    );
}

#[tokio::test]
async fn already_recorded_ids_never_become_candidates() {
    let temp = TempDir::new().unwrap();
    let mut store = ProcessedStore::empty(temp.path().join("processed.txt"));
    store.record(&VideoId::from_raw(B)).unwrap();

    let launcher = ScriptedLauncher::serving(vec![video_page(&[A, B, C])]);
    let discovery = BrowserDiscovery::new(Box::new(launcher), quick_settings());

    let sink = TestSink::default();
    let outcome = discovery
        .discover(&request(3), &store, &sink, &AtomicBool::new(false))
        .await
        .unwrap();

    assert_eq!(candidate_ids(&outcome.candidates), vec![A, C]);
    assert!(outcome.exhausted, "page had no third new id to give");
}

#[tokio::test]
async fn filter_holds_across_consecutive_jobs() {
    let temp = TempDir::new().unwrap();
    let mut store = ProcessedStore::empty(temp.path().join("processed.txt"));

    let launcher = ScriptedLauncher::serving(vec![video_page(&[A, B])]);
    let discovery = BrowserDiscovery::new(Box::new(launcher), quick_settings());

    let sink = TestSink::default();
    let first = discovery
        .discover(&request(2), &store, &sink, &AtomicBool::new(false))
        .await
        .unwrap();
    assert_eq!(candidate_ids(&first.candidates), vec![A, B]);

    for candidate in &first.candidates {
        store.record(candidate.id()).unwrap();
    }

    let second = discovery
        .discover(&request(2), &store, &sink, &AtomicBool::new(false))
        .await
        .unwrap();
    assert!(second.candidates.is_empty());
    assert!(second.exhausted);
}

#[tokio::test]
async fn dry_page_counts_as_exhausted_after_stall_limit() {
    let launcher = ScriptedLauncher::serving(vec![video_page(&[A])]);
    let settings = DiscoverySettings {
        stall_limit: 2,
        ..quick_settings()
    };
    let discovery = BrowserDiscovery::new(Box::new(launcher), settings);

    let store = ProcessedStore::empty("unused.txt");
    let sink = TestSink::default();
    let outcome = discovery
        .discover(&request(5), &store, &sink, &AtomicBool::new(false))
        .await
        .unwrap();

    assert_eq!(candidate_ids(&outcome.candidates), vec![A]);
    assert!(outcome.exhausted);
    assert_eq!(outcome.rounds, 3, "one productive round plus two stalls");
}

#[tokio::test]
async fn round_cap_bounds_an_endless_feed() {
    // Every round surfaces one more id, so the feed never stalls.
    let pages = vec![
        video_page(&[A]),
        video_page(&[A, B]),
        video_page(&[A, B, C]),
        video_page(&[A, B, C, D]),
        video_page(&[A, B, C, D, E]),
    ];
    let launcher = ScriptedLauncher::serving(pages);
    let settings = DiscoverySettings {
        max_scroll_rounds: 4,
        ..quick_settings()
    };
    let discovery = BrowserDiscovery::new(Box::new(launcher), settings);

    let store = ProcessedStore::empty("unused.txt");
    let sink = TestSink::default();
    let outcome = discovery
        .discover(&request(100), &store, &sink, &AtomicBool::new(false))
        .await
        .unwrap();

    assert_eq!(outcome.rounds, 4);
    assert!(outcome.exhausted);
    assert_eq!(outcome.candidates.len(), 4);
}

#[tokio::test]
async fn page_without_video_links_raises_markup_warning() {
    let page = r#"<html><body><a href="/about">about</a></body></html>"#.to_string();
    let launcher = ScriptedLauncher::serving(vec![page]);
    let discovery = BrowserDiscovery::new(Box::new(launcher), quick_settings());

    let store = ProcessedStore::empty("unused.txt");
    let sink = TestSink::default();
    let outcome = discovery
        .discover(&request(1), &store, &sink, &AtomicBool::new(false))
        .await
        .unwrap();

    assert!(outcome.candidates.is_empty());
    assert_eq!(outcome.raw_links_seen, 0);
    assert!(
        sink.messages()
            .iter()
            .any(|message| message.contains("structure may have changed")),
        "expected a markup-drift warning, got {:?}",
        sink.messages()
    );
}

#[tokio::test]
async fn stop_flag_ends_discovery_before_scrolling() {
    let launcher = ScriptedLauncher::serving(vec![video_page(&[A, B])]);
    let scrolls = launcher.scrolls.clone();
    let closed = launcher.closed.clone();
    let discovery = BrowserDiscovery::new(Box::new(launcher), quick_settings());

    let store = ProcessedStore::empty("unused.txt");
    let sink = TestSink::default();
    let outcome = discovery
        .discover(&request(2), &store, &sink, &AtomicBool::new(true))
        .await
        .unwrap();

    assert!(outcome.candidates.is_empty());
    assert_eq!(scrolls.load(Ordering::SeqCst), 0);
    assert!(closed.load(Ordering::SeqCst), "session still gets closed");
    assert!(sink
        .messages()
        .iter()
        .any(|message| message.contains("Stop requested")));
}

#[tokio::test]
async fn launch_failure_aborts_discovery() {
    let discovery = BrowserDiscovery::new(Box::new(FailingLauncher), quick_settings());

    let store = ProcessedStore::empty("unused.txt");
    let sink = TestSink::default();
    let err = discovery
        .discover(&request(1), &store, &sink, &AtomicBool::new(false))
        .await
        .unwrap_err();

    assert!(matches!(err, DiscoveryError::SessionFailed(_)));
}
