use std::fs;

use tagreel_core::{GeometryError, VideoDimensions};
use tagreel_engine::{
    FetchError, FetchSettings, Fetcher, FfmpegTransformer, FfprobeInspector, Inspector,
    ProbeSettings, TransformError, TransformSettings, Transformer, VerifyError, YtDlpFetcher,
};
use tempfile::TempDir;

// A binary name that cannot plausibly be on PATH.
const NO_SUCH_TOOL: &str = "tagreel-test-no-such-tool";

#[tokio::test]
async fn missing_retrieval_tool_is_reported_by_name() {
    let temp = TempDir::new().unwrap();
    let fetcher = YtDlpFetcher::new(FetchSettings {
        program: NO_SUCH_TOOL.to_string(),
        ..FetchSettings::default()
    });

    let err = fetcher
        .fetch(
            "https://www.tiktok.com/@user/video/7234567890123456789",
            &temp.path().join("out.mp4"),
        )
        .await
        .unwrap_err();
    match err {
        FetchError::ToolMissing(name) => assert_eq!(name, NO_SUCH_TOOL),
        other => panic!("expected a missing-tool error, got {other:?}"),
    }
}

#[tokio::test]
async fn inspector_rejects_missing_file_before_probing() {
    // The program does not exist, so reaching it would fail differently;
    // a corrupt verdict proves the pre-check fired first.
    let temp = TempDir::new().unwrap();
    let inspector = FfprobeInspector::new(ProbeSettings {
        program: NO_SUCH_TOOL.to_string(),
        ..ProbeSettings::default()
    });

    let err = inspector
        .verify(&temp.path().join("never-written.mp4"))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::Corrupt(reason) if reason.contains("does not exist")));
}

#[tokio::test]
async fn inspector_classifies_zero_byte_file_as_corrupt() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("empty.mp4");
    fs::write(&path, b"").unwrap();

    let inspector = FfprobeInspector::new(ProbeSettings {
        program: NO_SUCH_TOOL.to_string(),
        ..ProbeSettings::default()
    });

    let err = inspector.verify(&path).await.unwrap_err();
    assert!(matches!(err, VerifyError::Corrupt(reason) if reason.contains("empty")));
}

#[tokio::test]
async fn inspector_reports_missing_tool_for_real_probes() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("clip.mp4");
    fs::write(&path, b"not really a video").unwrap();

    let inspector = FfprobeInspector::new(ProbeSettings {
        program: NO_SUCH_TOOL.to_string(),
        ..ProbeSettings::default()
    });

    let err = inspector.verify(&path).await.unwrap_err();
    assert!(matches!(err, VerifyError::ToolMissing(name) if name == NO_SUCH_TOOL));
}

#[tokio::test]
async fn transformer_rejects_half_frame_crop_before_running() {
    let temp = TempDir::new().unwrap();
    let transformer = FfmpegTransformer::new(TransformSettings {
        program: NO_SUCH_TOOL.to_string(),
        crop_percent: 50,
        ..TransformSettings::default()
    });

    let err = transformer
        .transform(
            &temp.path().join("in.mp4"),
            VideoDimensions::new(1920, 1080),
            &temp.path().join("out.mp4"),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TransformError::InvalidGeometry(GeometryError::PercentOutOfRange(50))
    ));
}

#[tokio::test]
async fn transformer_reports_missing_tool() {
    let temp = TempDir::new().unwrap();
    let transformer = FfmpegTransformer::new(TransformSettings {
        program: NO_SUCH_TOOL.to_string(),
        ..TransformSettings::default()
    });

    let err = transformer
        .transform(
            &temp.path().join("in.mp4"),
            VideoDimensions::new(1920, 1080),
            &temp.path().join("out.mp4"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TransformError::ToolMissing(name) if name == NO_SUCH_TOOL));
}
