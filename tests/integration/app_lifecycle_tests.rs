/*!
 * Generate and continue tasks on a temporary workspace.
 *
 * Audio and line files are staged up front so the tasks run without ffmpeg
 * or network access; collaborators are mocks.
 */

use std::path::Path;
use std::sync::Arc;

use bisub::app_config::Config;
use bisub::app_controller::{Controller, RunSummary};
use bisub::file_utils::ISSUES_LOG_NAME;
use bisub::app_config::TranslationProvider;
use bisub::translation::{BatchTranslator, TranslationBackend};

use crate::common;
use crate::common::mock_providers::{DictionaryTranslator, MockProvider};

const LINE_FILE: &str = "[0.00->1.20]Good morning everyone.\n[1.50->3.00]Let us begin.\n";

/// Stage a video, its extracted audio and its segmented line file
fn stage_talk(root: &Path) {
    common::create_test_file(root, "videos/talk.mp4", "not really a video").unwrap();
    common::create_test_file(root, "audios/talk.wav", "not really audio").unwrap();
    common::create_test_file(root, "asr/talk.list", LINE_FILE).unwrap();
}

fn controller(config: Config, translator: Option<BatchTranslator>) -> Controller {
    // Recognition must never run: every line file is already present
    Controller::with_collaborators(config, Arc::new(MockProvider::failing()), None, translator)
}

fn dictionary(translation: &str) -> Option<BatchTranslator> {
    Some(BatchTranslator::chunked(
        Arc::new(DictionaryTranslator { translation: translation.to_string() }),
        8,
    ))
}

#[tokio::test]
async fn test_generate_withStagedFiles_shouldWriteBilingualSrt() {
    common::init_logging();
    let temp_dir = common::create_temp_dir().unwrap();
    stage_talk(temp_dir.path());

    let mut controller = controller(common::workspace_config(temp_dir.path()), dictionary("早上好"));
    let summary = controller.run_generate(false).await.unwrap();

    assert_eq!(summary, RunSummary { processed: 1, skipped: 0, failed: 0 });
    let srt = std::fs::read_to_string(temp_dir.path().join("subtitles/talk.srt")).unwrap();
    assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:01,200\n早上好\nGood morning everyone.\n\n"));
    assert!(srt.contains("2\n00:00:01,500 --> 00:00:03,000\n早上好\nLet us begin.\n"));
    assert!(temp_dir.path().join("asr/talk.bilingual.list").exists());
    assert!(!temp_dir.path().join("subtitles").join(ISSUES_LOG_NAME).exists());
}

#[tokio::test]
async fn test_generate_withExistingSubtitle_shouldSkipFile() {
    let temp_dir = common::create_temp_dir().unwrap();
    stage_talk(temp_dir.path());
    common::create_test_file(temp_dir.path(), "subtitles/talk.srt", "old").unwrap();

    let translator = MockProvider::working();
    let batch = Some(BatchTranslator::chunked(Arc::new(translator.clone()), 8));
    let mut controller = controller(common::workspace_config(temp_dir.path()), batch);
    let summary = controller.run_generate(false).await.unwrap();

    assert_eq!(summary, RunSummary { processed: 0, skipped: 1, failed: 0 });
    assert_eq!(translator.request_count(), 0);
    assert_eq!(std::fs::read_to_string(temp_dir.path().join("subtitles/talk.srt")).unwrap(), "old");
}

#[tokio::test]
async fn test_generate_withoutTranslator_shouldLeaveManualPlaceholder() {
    let temp_dir = common::create_temp_dir().unwrap();
    stage_talk(temp_dir.path());

    let mut controller = controller(common::workspace_config(temp_dir.path()), None);
    let summary = controller.run_generate(false).await.unwrap();

    assert_eq!(summary, RunSummary::default());
    let placeholder = temp_dir.path().join("asr/talk_zh.list");
    assert!(placeholder.exists());
    assert_eq!(std::fs::read_to_string(placeholder).unwrap(), "");
    assert!(!temp_dir.path().join("subtitles/talk.srt").exists());
}

#[tokio::test]
async fn test_generate_whenTranslatorFails_shouldRecordIssue() {
    let temp_dir = common::create_temp_dir().unwrap();
    stage_talk(temp_dir.path());

    let translator = Some(BatchTranslator::chunked(Arc::new(MockProvider::failing()), 8));
    let mut controller = controller(common::workspace_config(temp_dir.path()), translator);
    let summary = controller.run_generate(false).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert!(!temp_dir.path().join("subtitles/talk.srt").exists());
    let issues = std::fs::read_to_string(temp_dir.path().join("subtitles").join(ISSUES_LOG_NAME)).unwrap();
    assert!(issues.contains("generate run: 1 issue(s)"));
    assert!(issues.contains("talk"));
}

#[tokio::test]
async fn test_continue_withManualTranslation_shouldMerge() {
    let temp_dir = common::create_temp_dir().unwrap();
    stage_talk(temp_dir.path());
    common::create_test_file(
        temp_dir.path(),
        "asr/talk_zh.list",
        "[0.00->1.20]大家早上好。\n[1.50->3.00]我们开始吧。\n",
    )
    .unwrap();

    let mut controller = controller(common::workspace_config(temp_dir.path()), None);
    let summary = controller.run_continue(false).await.unwrap();

    assert_eq!(summary.processed, 1);
    let srt = std::fs::read_to_string(temp_dir.path().join("subtitles/talk.srt")).unwrap();
    assert!(srt.contains("大家早上好。\nGood morning everyone.\n"));
    assert!(srt.contains("我们开始吧。\nLet us begin.\n"));
}

#[tokio::test]
async fn test_continue_withCountMismatch_shouldSkipAndLogIssue() {
    let temp_dir = common::create_temp_dir().unwrap();
    stage_talk(temp_dir.path());
    common::create_test_file(temp_dir.path(), "asr/talk_zh.list", "[0.00->1.20]大家早上好。\n").unwrap();

    let mut controller = controller(common::workspace_config(temp_dir.path()), None);
    let summary = controller.run_continue(false).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert!(!temp_dir.path().join("subtitles/talk.srt").exists());
    let issues = std::fs::read_to_string(temp_dir.path().join("subtitles").join(ISSUES_LOG_NAME)).unwrap();
    assert!(issues.contains("1 translated segments for 2 lines"));
}

#[tokio::test]
async fn test_continue_withoutRawLineFile_shouldSkip() {
    let temp_dir = common::create_temp_dir().unwrap();
    common::create_test_file(temp_dir.path(), "asr/orphan_zh.list", "[0.00->1.00]孤儿\n").unwrap();

    let mut controller = controller(common::workspace_config(temp_dir.path()), None);
    let summary = controller.run_continue(false).await.unwrap();

    assert_eq!(summary, RunSummary { processed: 0, skipped: 1, failed: 0 });
}

#[tokio::test]
async fn test_segmentToFile_shouldPersistLineRecords() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = common::workspace_config(temp_dir.path());
    let line_file = temp_dir.path().join("asr/clip.list");

    let controller = controller(config, None);
    let fragments = common::fragments(&[("Hello", 0.0, 0.4), (" world.", 0.4, 1.0)]);
    let count = controller
        .segment_to_file(fragments, Path::new("clip.wav"), &line_file)
        .await
        .unwrap();

    assert_eq!(count, 1);
    assert_eq!(std::fs::read_to_string(line_file).unwrap(), "[0.00->1.00]Hello world.\n");
}

/// Ollama pointed at a closed local port, failing fast without retries
fn unreachable_ollama(root: &Path) -> Config {
    let mut config = common::workspace_config(root);
    config.translation.provider = TranslationProvider::Ollama;
    config.translation.common.retry_count = 0;
    let provider = config.translation.active_provider_config_mut();
    provider.endpoint = "http://127.0.0.1:9".to_string();
    provider.timeout_secs = 2;
    config
}

#[tokio::test]
async fn test_checkBackend_whenUnreachable_shouldStillWriteLineFile() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = unreachable_ollama(temp_dir.path());
    let backend = TranslationBackend::from_config(&config).unwrap();
    let translator = Some(backend.batch_translator(&config));
    let restorer = MockProvider::failing();
    let line_file = temp_dir.path().join("asr/lecture.list");

    let mut controller = Controller::with_collaborators(
        config,
        Arc::new(MockProvider::failing()),
        Some(Arc::new(restorer.clone())),
        translator,
    )
    .with_backend(Some(backend));
    std::fs::create_dir_all(temp_dir.path().join("asr")).unwrap();

    assert!(!controller.check_backend().await);

    // A long sentence would otherwise be sent to the failing restorer
    let count = controller
        .segment_to_file(common::evenly_spaced_sentence(25, 0.0), Path::new("lecture.wav"), &line_file)
        .await
        .unwrap();

    assert!(count >= 1);
    assert_eq!(restorer.request_count(), 0);
    let written = std::fs::read_to_string(&line_file).unwrap();
    assert!(written.starts_with("[0.00->"));
}

#[tokio::test]
async fn test_segmentToFile_withFailingRestorerAndNoCheck_shouldFail() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = common::workspace_config(temp_dir.path());
    let controller = Controller::with_collaborators(
        config,
        Arc::new(MockProvider::failing()),
        Some(Arc::new(MockProvider::failing())),
        None,
    );

    let result = controller
        .segment_to_file(common::evenly_spaced_sentence(25, 0.0), Path::new("lecture.wav"), &temp_dir.path().join("asr/lecture.list"))
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_generate_whenBackendUnreachable_shouldLeaveManualPlaceholder() {
    let temp_dir = common::create_temp_dir().unwrap();
    stage_talk(temp_dir.path());
    let config = unreachable_ollama(temp_dir.path());
    let backend = TranslationBackend::from_config(&config).unwrap();
    let translator = Some(backend.batch_translator(&config));

    let mut controller = controller(config, translator).with_backend(Some(backend));
    let summary = controller.run_generate(false).await.unwrap();

    assert_eq!(summary.failed, 0);
    assert!(temp_dir.path().join("asr/talk_zh.list").exists());
    let issues = std::fs::read_to_string(temp_dir.path().join("subtitles").join(ISSUES_LOG_NAME)).unwrap();
    assert!(issues.contains("provider unreachable"));
}
