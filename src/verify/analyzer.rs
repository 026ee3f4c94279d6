use rand::Rng;
use thiserror::Error;

use crate::economy::EconomyConfig;
use crate::models::Detection;

use super::fingerprint::file_fingerprint;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("screenshot is {width}x{height}, minimum is {min}x{min}")]
    TooSmall { width: u32, height: u32, min: u32 },

    #[error("file is not a supported image or exceeds the size limit")]
    InvalidFormat,

    #[error("this screenshot was already submitted for this video")]
    DuplicateSubmission,
}

/// A screenshot as handed over by the UI: the original file name plus raw
/// bytes. The name and byte length feed the dedup fingerprint.
#[derive(Debug, Clone)]
pub struct ScreenshotUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ScreenshotUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn fingerprint(&self) -> String {
        file_fingerprint(&self.file_name, self.bytes.len())
    }
}

/// Validates a screenshot before any detection runs: size cap first, then
/// it must decode as an image, then both edges must clear the minimum.
/// Returns the decoded dimensions.
pub fn validate_screenshot(
    upload: &ScreenshotUpload,
    config: &EconomyConfig,
) -> Result<(u32, u32), VerifyError> {
    if upload.bytes.len() as u64 > config.max_screenshot_bytes {
        return Err(VerifyError::InvalidFormat);
    }
    let decoded =
        image::load_from_memory(&upload.bytes).map_err(|_| VerifyError::InvalidFormat)?;
    let (width, height) = (decoded.width(), decoded.height());
    let min = config.min_screenshot_edge_px;
    if width < min || height < min {
        return Err(VerifyError::TooSmall { width, height, min });
    }
    Ok((width, height))
}

/// Capability seam for screenshot analysis. Production uses the random
/// simulator; tests inject a fixed outcome.
pub trait Analyzer: Send + Sync {
    fn detect(&self, upload: &ScreenshotUpload) -> Detection;
}

/// Stand-in for real like/subscribe detection: draws both signals from
/// independent coin flips at the configured odds. Not reproducible.
pub struct SimulatedAnalyzer {
    like_probability: f64,
    subscribe_probability: f64,
}

impl SimulatedAnalyzer {
    pub fn new(config: &EconomyConfig) -> Self {
        Self {
            like_probability: config.like_probability,
            subscribe_probability: config.subscribe_probability,
        }
    }
}

impl Analyzer for SimulatedAnalyzer {
    fn detect(&self, _upload: &ScreenshotUpload) -> Detection {
        let mut rng = rand::thread_rng();
        Detection {
            liked: rng.gen_bool(self.like_probability),
            subscribed: rng.gen_bool(self.subscribe_probability),
        }
    }
}

/// Deterministic analyzer for tests and demos.
pub struct FixedAnalyzer {
    pub liked: bool,
    pub subscribed: bool,
}

impl Analyzer for FixedAnalyzer {
    fn detect(&self, _upload: &ScreenshotUpload) -> Detection {
        Detection {
            liked: self.liked,
            subscribed: self.subscribed,
        }
    }
}
