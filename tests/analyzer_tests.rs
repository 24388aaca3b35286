mod common;

use std::sync::Arc;
use tempfile::TempDir;

use common::{pipeline, StubClient, COMPUTE_SPEC};
use qagen::analyzers::{CoverageAnalyzer, StandardsChecker};
use qagen::pipeline::{AUTO_API_DIR, AUTO_UI_DIR, MANUAL_UI_DIR};

#[tokio::test]
async fn test_generated_tests_pass_standards_check() {
    let out = TempDir::new().unwrap();
    let client = Arc::new(StubClient::new());
    let pipeline = pipeline(client);
    pipeline
        .run_ui_document(&common::login_document(), out.path())
        .await
        .unwrap();
    pipeline
        .run_api_from_spec_text(COMPUTE_SPEC, out.path())
        .await
        .unwrap();

    let checker = StandardsChecker::new();
    for dir in [MANUAL_UI_DIR, AUTO_UI_DIR, AUTO_API_DIR] {
        let report = checker.check_dir(&out.path().join(dir)).unwrap();
        assert!(report.issues.is_empty(), "{}: {:?}", dir, report.issues);
        assert!(!report.ok_files.is_empty());
    }
}

#[tokio::test]
async fn test_coverage_scope_follows_directory_name() {
    let out = TempDir::new().unwrap();
    let pipeline = pipeline(Arc::new(StubClient::new()));
    pipeline
        .run_api_from_spec_text(COMPUTE_SPEC, out.path())
        .await
        .unwrap();
    pipeline
        .run_ui_document(&common::login_document(), out.path())
        .await
        .unwrap();

    let analyzer = CoverageAnalyzer::new().unwrap();

    let api = analyzer.analyze_dir(&out.path().join(AUTO_API_DIR)).unwrap();
    assert_eq!(api.entries[0].scope, "API");
    assert_eq!(api.entries[0].total_tests, 2);
    assert_eq!(
        api.entries[0].files,
        vec!["test_api_createdisk.py", "test_api_vms_get_v3_vms.py"]
    );

    let ui = analyzer.analyze_dir(&out.path().join(MANUAL_UI_DIR)).unwrap();
    assert_eq!(ui.entries[0].scope, "UI");
    assert_eq!(ui.entries[0].total_tests, 1);
}

#[test]
fn test_empty_files_are_not_counted() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("test_empty.py"), "import allure\n").unwrap();

    let report = CoverageAnalyzer::new().unwrap().analyze_dir(dir.path()).unwrap();
    assert_eq!(report.entries[0].total_tests, 0);
    assert!(report.entries[0].files.is_empty());
}
