use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use pipeline_logging::pipeline_debug;
use serde::Deserialize;
use tagreel_core::VideoDimensions;
use thiserror::Error;
use tokio::process::Command;

/// Settings for the media-inspection tool.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Tool binary name or path.
    pub program: String,
    /// Wall-clock budget for one probe.
    pub timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            program: "ffprobe".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Error)]
pub enum VerifyError {
    /// The file is not a playable video: missing, empty, truncated, or
    /// not decodable at all.
    #[error("corrupt video: {0}")]
    Corrupt(String),
    /// The inspection tool is not installed or not on PATH.
    #[error("`{0}` not found on PATH")]
    ToolMissing(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Checks that a fetched file is a real video and reports its geometry.
#[async_trait::async_trait]
pub trait Inspector: Send + Sync {
    async fn verify(&self, path: &Path) -> Result<VideoDimensions, VerifyError>;
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// Production inspector shelling out to ffprobe.
pub struct FfprobeInspector {
    settings: ProbeSettings,
}

impl FfprobeInspector {
    pub fn new(settings: ProbeSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl Inspector for FfprobeInspector {
    async fn verify(&self, path: &Path) -> Result<VideoDimensions, VerifyError> {
        // Cheap rejections before spawning anything.
        let meta = std::fs::metadata(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => VerifyError::Corrupt("file does not exist".to_string()),
            _ => VerifyError::Io(err),
        })?;
        if meta.len() == 0 {
            return Err(VerifyError::Corrupt("file is empty".to_string()));
        }

        let mut cmd = Command::new(&self.settings.program);
        cmd.arg("-v")
            .arg("error")
            .arg("-select_streams")
            .arg("v:0")
            .arg("-show_entries")
            .arg("stream=width,height")
            .arg("-of")
            .arg("json")
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.settings.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => VerifyError::ToolMissing(self.settings.program.clone()),
                _ => VerifyError::Io(err),
            })?,
            // A probe that cannot finish in time is treated like a file
            // it cannot read.
            Err(_) => {
                return Err(VerifyError::Corrupt(format!(
                    "{} timed out after {}s",
                    self.settings.program,
                    self.settings.timeout.as_secs()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(VerifyError::Corrupt(if stderr.is_empty() {
                format!("probe failed: {}", output.status)
            } else {
                stderr
            }));
        }

        let probe: ProbeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|err| VerifyError::Corrupt(format!("unreadable probe output: {err}")))?;
        let stream = probe
            .streams
            .first()
            .ok_or_else(|| VerifyError::Corrupt("no video stream".to_string()))?;
        match (stream.width, stream.height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => {
                let dims = VideoDimensions::new(width, height);
                pipeline_debug!("{} is {dims}", path.display());
                Ok(dims)
            }
            _ => Err(VerifyError::Corrupt(
                "stream carries no dimensions".to_string(),
            )),
        }
    }
}
