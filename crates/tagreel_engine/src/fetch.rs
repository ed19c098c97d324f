use std::fs;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use pipeline_logging::{pipeline_debug, pipeline_warn};
use thiserror::Error;
use tokio::process::Command;

/// Settings for the external retrieval tool.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Tool binary name or path.
    pub program: String,
    /// Per-connection timeout handed to the tool.
    pub socket_timeout: Duration,
    /// Retry count passed through for both whole files and fragments.
    pub retries: u32,
    /// Wall-clock budget for one download; the tool is killed past it.
    pub timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            program: "yt-dlp".to_string(),
            socket_timeout: Duration::from_secs(30),
            retries: 3,
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// The tool binary is not installed or not on PATH.
    #[error("`{0}` not found on PATH")]
    ToolMissing(String),
    /// Download-level failure: unreachable network, unavailable video,
    /// timeout. The candidate may work on a later run.
    #[error("download failed: {0}")]
    Network(String),
    /// The tool exited in a way this pipeline does not recognize.
    #[error("retrieval tool exited with code {code:?}: {stderr}")]
    UnknownExit { code: Option<i32>, stderr: String },
}

/// Downloads one candidate to a local file via the retrieval tool.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Success means the tool exited cleanly and `dest` exists; content
    /// checks belong to the verifier.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError>;
}

/// Production fetcher shelling out to yt-dlp.
pub struct YtDlpFetcher {
    settings: FetchSettings,
}

impl YtDlpFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn command(&self, url: &str, dest: &Path) -> Command {
        let mut cmd = Command::new(&self.settings.program);
        cmd.arg("--no-warnings")
            .arg("--ignore-errors")
            .arg("--retries")
            .arg(self.settings.retries.to_string())
            .arg("--fragment-retries")
            .arg(self.settings.retries.to_string())
            .arg("--no-playlist")
            .arg("-o")
            .arg(dest)
            .arg(url)
            .arg("--socket-timeout")
            .arg(self.settings.socket_timeout.as_secs().to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait::async_trait]
impl Fetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        let mut cmd = self.command(url, dest);
        let output = match tokio::time::timeout(self.settings.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => FetchError::ToolMissing(self.settings.program.clone()),
                _ => FetchError::Network(format!("could not run {}: {err}", self.settings.program)),
            })?,
            Err(_) => {
                // kill_on_drop reaps the child when the future is dropped.
                remove_partial(dest);
                return Err(FetchError::Network(format!(
                    "{} timed out after {}s",
                    self.settings.program,
                    self.settings.timeout.as_secs()
                )));
            }
        };

        let stderr_trail = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.stdout.is_empty() {
            pipeline_debug!(
                "{} stdout: {}",
                self.settings.program,
                String::from_utf8_lossy(&output.stdout).trim()
            );
        }
        if !stderr_trail.is_empty() {
            pipeline_debug!("{} stderr: {stderr_trail}", self.settings.program);
        }

        match output.status.code() {
            Some(0) => {
                if dest.exists() {
                    Ok(())
                } else {
                    // --ignore-errors makes the tool exit 0 even when the
                    // transfer failed; the missing file is the signal.
                    Err(FetchError::Network(if stderr_trail.is_empty() {
                        "no output file despite clean exit".to_string()
                    } else {
                        stderr_trail
                    }))
                }
            }
            Some(1) => {
                remove_partial(dest);
                Err(FetchError::Network(if stderr_trail.is_empty() {
                    "download error".to_string()
                } else {
                    stderr_trail
                }))
            }
            Some(code) => {
                remove_partial(dest);
                Err(FetchError::UnknownExit {
                    code: Some(code),
                    stderr: stderr_trail,
                })
            }
            None => {
                remove_partial(dest);
                Err(FetchError::Network(format!(
                    "{} killed by signal",
                    self.settings.program
                )))
            }
        }
    }
}

fn remove_partial(dest: &Path) {
    match fs::remove_file(dest) {
        Ok(()) => pipeline_debug!("removed partial download {}", dest.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => pipeline_warn!("could not remove partial download {}: {err}", dest.display()),
    }
}
