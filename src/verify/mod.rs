pub mod analyzer;
pub mod fingerprint;

pub use analyzer::{
    Analyzer, FixedAnalyzer, ScreenshotUpload, SimulatedAnalyzer, VerifyError,
};
pub use fingerprint::file_fingerprint;

use crate::economy::{coins_for_detection, EconomyConfig};
use crate::models::VerificationOutcome;

/// Validates a screenshot and runs the analyzer over it, mapping the
/// detection to its coin value. Dedup against prior submissions is the
/// controller's job since it needs the store.
pub fn verify_screenshot(
    upload: &ScreenshotUpload,
    config: &EconomyConfig,
    analyzer: &dyn Analyzer,
) -> Result<VerificationOutcome, VerifyError> {
    analyzer::validate_screenshot(upload, config)?;
    let detection = analyzer.detect(upload);
    Ok(VerificationOutcome {
        liked: detection.liked,
        subscribed: detection.subscribed,
        coins_awarded: coins_for_detection(detection, config),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::new(width, height);
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn small_screenshot_is_rejected() {
        let config = EconomyConfig::default();
        let upload = ScreenshotUpload::new("shot.png", png_bytes(400, 400));
        let err = analyzer::validate_screenshot(&upload, &config).unwrap_err();
        assert_eq!(
            err,
            VerifyError::TooSmall {
                width: 400,
                height: 400,
                min: 500
            }
        );
    }

    #[test]
    fn non_image_bytes_are_rejected() {
        let config = EconomyConfig::default();
        let upload = ScreenshotUpload::new("notes.txt", b"not an image".to_vec());
        assert_eq!(
            analyzer::validate_screenshot(&upload, &config).unwrap_err(),
            VerifyError::InvalidFormat
        );
    }

    #[test]
    fn oversized_file_is_rejected_before_decoding() {
        let mut config = EconomyConfig::default();
        config.max_screenshot_bytes = 16;
        let upload = ScreenshotUpload::new("shot.png", png_bytes(600, 600));
        assert_eq!(
            analyzer::validate_screenshot(&upload, &config).unwrap_err(),
            VerifyError::InvalidFormat
        );
    }

    #[test]
    fn like_and_subscribe_awards_fifteen() {
        let config = EconomyConfig::default();
        let upload = ScreenshotUpload::new("shot.png", png_bytes(800, 800));
        let analyzer = FixedAnalyzer {
            liked: true,
            subscribed: true,
        };

        let outcome = verify_screenshot(&upload, &config, &analyzer).unwrap();
        assert_eq!(outcome.coins_awarded, 15);
    }

    #[test]
    fn subscribe_without_like_awards_nothing() {
        let config = EconomyConfig::default();
        let upload = ScreenshotUpload::new("shot.png", png_bytes(800, 800));
        let analyzer = FixedAnalyzer {
            liked: false,
            subscribed: true,
        };

        let outcome = verify_screenshot(&upload, &config, &analyzer).unwrap();
        assert_eq!(outcome.coins_awarded, 0);
        assert!(outcome.subscribed);
    }

    #[test]
    fn simulated_analyzer_respects_degenerate_odds() {
        let mut config = EconomyConfig::default();
        config.like_probability = 1.0;
        config.subscribe_probability = 0.0;
        let analyzer = SimulatedAnalyzer::new(&config);
        let upload = ScreenshotUpload::new("shot.png", png_bytes(800, 800));

        for _ in 0..20 {
            let detection = analyzer.detect(&upload);
            assert!(detection.liked);
            assert!(!detection.subscribed);
        }
    }
}
