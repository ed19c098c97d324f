use std::fs;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use pipeline_logging::{pipeline_debug, pipeline_warn};
use tagreel_core::{plan_crop, GeometryError, RoundingPolicy, VideoDimensions};
use thiserror::Error;
use tokio::process::Command;

/// Settings for the media-processing tool and the edit it applies.
#[derive(Debug, Clone)]
pub struct TransformSettings {
    /// Tool binary name or path.
    pub program: String,
    /// Apply a horizontal mirror.
    pub mirror: bool,
    /// Percent of each edge to trim; zero disables the crop.
    pub crop_percent: u8,
    pub rounding: RoundingPolicy,
    /// Wall-clock budget for one encode; the tool is killed past it.
    pub timeout: Duration,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            mirror: true,
            crop_percent: 2,
            rounding: RoundingPolicy::Floor,
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransformError {
    /// The crop window cannot be computed for this input.
    #[error(transparent)]
    InvalidGeometry(#[from] GeometryError),
    /// The processing tool is not installed or not on PATH.
    #[error("`{0}` not found on PATH")]
    ToolMissing(String),
    /// The tool ran and failed; stderr tail attached. A timeout shows up
    /// here with no exit code.
    #[error("transform failed (exit {code:?}): {stderr}")]
    ToolFailure { code: Option<i32>, stderr: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Applies the configured edit to a verified video.
#[async_trait::async_trait]
pub trait Transformer: Send + Sync {
    async fn transform(
        &self,
        input: &Path,
        dims: VideoDimensions,
        output: &Path,
    ) -> Result<(), TransformError>;
}

/// Production transformer shelling out to ffmpeg.
pub struct FfmpegTransformer {
    settings: TransformSettings,
}

impl FfmpegTransformer {
    pub fn new(settings: TransformSettings) -> Self {
        Self { settings }
    }

    /// Builds the filter chain: mirror first, then the crop window.
    fn filter_chain(&self, dims: VideoDimensions) -> Result<Option<String>, TransformError> {
        let mut filters: Vec<String> = Vec::new();
        if self.settings.mirror {
            filters.push("hflip".to_string());
        }
        if self.settings.crop_percent > 0 {
            let plan = plan_crop(dims, self.settings.crop_percent, self.settings.rounding)?;
            filters.push(format!(
                "crop={}:{}:{}:{}",
                plan.out_width, plan.out_height, plan.offset_x, plan.offset_y
            ));
        }
        if filters.is_empty() {
            Ok(None)
        } else {
            Ok(Some(filters.join(",")))
        }
    }
}

#[async_trait::async_trait]
impl Transformer for FfmpegTransformer {
    async fn transform(
        &self,
        input: &Path,
        dims: VideoDimensions,
        output: &Path,
    ) -> Result<(), TransformError> {
        let chain = self.filter_chain(dims)?;

        let mut cmd = Command::new(&self.settings.program);
        cmd.arg("-y").arg("-i").arg(input);
        if let Some(chain) = &chain {
            cmd.arg("-vf").arg(chain);
        }
        cmd.arg("-c:v")
            .arg("libx264")
            .arg("-preset")
            .arg("medium")
            .arg("-crf")
            .arg("23")
            .arg("-c:a")
            .arg("aac")
            .arg("-b:a")
            .arg("128k")
            .arg(output)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        pipeline_debug!(
            "encoding {} with filters {}",
            input.display(),
            chain.as_deref().unwrap_or("none")
        );

        let out = match tokio::time::timeout(self.settings.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => {
                    TransformError::ToolMissing(self.settings.program.clone())
                }
                _ => TransformError::Io(err),
            })?,
            Err(_) => {
                remove_failed_output(output);
                return Err(TransformError::ToolFailure {
                    code: None,
                    stderr: format!("timed out after {}s", self.settings.timeout.as_secs()),
                });
            }
        };

        let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
        let wrote_output =
            fs::metadata(output).map(|meta| meta.len() > 0).unwrap_or(false);
        if out.status.success() && wrote_output {
            return Ok(());
        }

        // An exit 0 with nothing written is a failure too; the tool can
        // report success for an input it silently skipped.
        remove_failed_output(output);
        Err(TransformError::ToolFailure {
            code: out.status.code(),
            stderr,
        })
    }
}

fn remove_failed_output(output: &Path) {
    match fs::remove_file(output) {
        Ok(()) => pipeline_debug!("removed partial transform output {}", output.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => pipeline_warn!("could not remove {}: {err}", output.display()),
    }
}
