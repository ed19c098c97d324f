use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use tagreel_core::JobRequest;
use thiserror::Error;

use crate::discovery::{BrowserDiscovery, DiscoverySettings};
use crate::fetch::{FetchSettings, YtDlpFetcher};
use crate::orchestrator::{run_job, PipelineDeps};
use crate::progress::ChannelProgressSink;
use crate::transform::{FfmpegTransformer, TransformSettings};
use crate::types::EngineEvent;
use crate::verify::{FfprobeInspector, ProbeSettings};
use crate::webdriver::{DriverSettings, WebDriverLauncher};

/// Where files go and how each stage component is configured.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory downloaded videos land in.
    pub fetch_dir: PathBuf,
    /// Directory transformed videos land in.
    pub edit_dir: PathBuf,
    /// The processed-video log.
    pub store_path: PathBuf,
    pub driver: DriverSettings,
    pub discovery: DiscoverySettings,
    pub fetch: FetchSettings,
    pub probe: ProbeSettings,
    pub transform: TransformSettings,
}

impl EngineConfig {
    /// Lays out the standard directory structure under `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            fetch_dir: root.join("videos"),
            edit_dir: root.join("edited_videos"),
            store_path: root.join("data").join("processed_videos.txt"),
            driver: DriverSettings::default(),
            discovery: DiscoverySettings::default(),
            fetch: FetchSettings::default(),
            probe: ProbeSettings::default(),
            transform: TransformSettings::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::with_root(".")
    }
}

/// Why [`EngineHandle::submit`] refused a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// The engine runs one job at a time; wait for `JobFinished`.
    #[error("a job is already running")]
    JobInFlight,
    #[error("engine is shut down")]
    Disconnected,
}

enum EngineCommand {
    Run(JobRequest),
}

/// Front-end handle to the engine worker thread.
///
/// The worker owns its tokio runtime and the production stage stack;
/// the handle only passes requests in and events out over channels, so
/// it can live on a thread that must never block.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    busy: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let busy = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));

        let worker_busy = busy.clone();
        let worker_stop = stop.clone();
        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let launcher = WebDriverLauncher::new(config.driver.clone());
            let discovery = BrowserDiscovery::new(Box::new(launcher), config.discovery.clone());
            let fetcher = YtDlpFetcher::new(config.fetch.clone());
            let inspector = FfprobeInspector::new(config.probe.clone());
            let transformer = FfmpegTransformer::new(config.transform.clone());
            let deps = PipelineDeps {
                discovery: &discovery,
                fetcher: &fetcher,
                inspector: &inspector,
                transformer: &transformer,
            };

            while let Ok(EngineCommand::Run(request)) = cmd_rx.recv() {
                worker_stop.store(false, Ordering::Relaxed);
                let sink = ChannelProgressSink::new(event_tx.clone());
                let (summary, fatal) =
                    runtime.block_on(run_job(&deps, &config, &request, &sink, &worker_stop));
                let _ = event_tx.send(EngineEvent::JobFinished { summary, fatal });
                worker_busy.store(false, Ordering::Release);
            }
        });

        Self {
            cmd_tx,
            event_rx,
            busy,
            stop,
        }
    }

    /// Hands a job to the worker. One at a time; the slot opens again
    /// once `JobFinished` has been sent.
    pub fn submit(&self, request: JobRequest) -> Result<(), SubmitError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Acquire)
            .is_err()
        {
            return Err(SubmitError::JobInFlight);
        }
        if self.cmd_tx.send(EngineCommand::Run(request)).is_err() {
            self.busy.store(false, Ordering::Release);
            return Err(SubmitError::Disconnected);
        }
        Ok(())
    }

    /// Asks the running job to wind down at its next safe point. Only
    /// affects the current job; candidates already past fetch finish
    /// their remaining stages.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Non-blocking poll for the next event.
    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Blocks until the next event, or `None` once the worker is gone.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }
}
