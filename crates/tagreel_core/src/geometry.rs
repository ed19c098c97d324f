use thiserror::Error;

/// Pixel dimensions of a video stream, as reported by the inspection tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoDimensions {
    pub width: u32,
    pub height: u32,
}

impl VideoDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for VideoDimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How a fractional per-edge crop is rounded to whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundingPolicy {
    /// Truncate toward zero.
    #[default]
    Floor,
    /// Round to the nearest pixel, halves up.
    Nearest,
}

/// A concrete crop window: output size plus top-left offset, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropPlan {
    pub out_width: u32,
    pub out_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

/// Crop geometry the transform stage cannot apply.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeometryError {
    /// Trimming half the frame or more from each edge leaves nothing.
    #[error("crop percent {0} is out of range, must be below 50")]
    PercentOutOfRange(u8),
    /// The output window collapsed to zero in at least one dimension.
    #[error("cropping {percent}% per edge from {dims} leaves no visible frame")]
    CropExceedsFrame { percent: u8, dims: VideoDimensions },
}

/// Computes the window that trims `percent` of each edge of `dims`.
///
/// The per-edge trim is `dim * percent / 100` pixels, rounded per
/// `rounding`. Output dimensions are forced even (encoder constraint);
/// the offsets keep the exact per-edge trim so the window stays centered.
pub fn plan_crop(
    dims: VideoDimensions,
    percent: u8,
    rounding: RoundingPolicy,
) -> Result<CropPlan, GeometryError> {
    if percent >= 50 {
        return Err(GeometryError::PercentOutOfRange(percent));
    }
    let edge = |dim: u32| match rounding {
        RoundingPolicy::Floor => dim * u32::from(percent) / 100,
        RoundingPolicy::Nearest => (dim * u32::from(percent) + 50) / 100,
    };
    let offset_x = edge(dims.width);
    let offset_y = edge(dims.height);
    let out_width = even_down(dims.width.saturating_sub(2 * offset_x));
    let out_height = even_down(dims.height.saturating_sub(2 * offset_y));
    if out_width == 0 || out_height == 0 {
        return Err(GeometryError::CropExceedsFrame { percent, dims });
    }
    Ok(CropPlan {
        out_width,
        out_height,
        offset_x,
        offset_y,
    })
}

fn even_down(v: u32) -> u32 {
    v - (v % 2)
}
