//! Tagreel engine: browser discovery and the external-tool pipeline.
mod engine;
mod discovery;
mod extract;
mod fetch;
mod orchestrator;
mod progress;
mod store;
mod transform;
mod types;
mod verify;
mod webdriver;

pub use discovery::{
    BrowserDiscovery, CandidateSource, DiscoveryError, DiscoveryOutcome, DiscoverySettings,
    PageSession, SessionLauncher,
};
pub use engine::{EngineConfig, EngineHandle, SubmitError};
pub use extract::{extract_candidate_links, CandidateLink};
pub use fetch::{FetchError, FetchSettings, Fetcher, YtDlpFetcher};
pub use orchestrator::{run_job, PipelineDeps};
pub use progress::{ChannelProgressSink, ProgressSink};
pub use store::{ProcessedStore, StoreError};
pub use transform::{FfmpegTransformer, TransformError, TransformSettings, Transformer};
pub use types::{EngineEvent, FatalError};
pub use verify::{FfprobeInspector, Inspector, ProbeSettings, VerifyError};
pub use webdriver::{
    DriverSettings, SessionError, WebDriverClient, WebDriverLauncher, WebDriverSession,
};
