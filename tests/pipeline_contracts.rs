use async_trait::async_trait;
use maintainability_lib::analysis::aggregate::record_date;
use maintainability_lib::analysis::registry::MetricRegistry;
use maintainability_lib::commands::settings::{get_settings, save_settings};
use maintainability_lib::models::metric_record::without_sentinels;
use maintainability_lib::report::{MemoryReporter, ReportLevel};
use maintainability_lib::{
    MetricExtractor, MetricsAggregator, MetricsStore, OracleError, Pipeline, PipelineError, ScoringOracle,
    ScoringPrompt, SqliteStore,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const READABILITY: &str = "How easily a new reader can follow the code.";

struct FixedOracle(&'static str);

#[async_trait]
impl ScoringOracle for FixedOracle {
    async fn invoke(&self, _prompt: &ScoringPrompt) -> Result<String, OracleError> {
        Ok(self.0.to_string())
    }
}

struct ByMetricOracle;

#[async_trait]
impl ScoringOracle for ByMetricOracle {
    async fn invoke(&self, prompt: &ScoringPrompt) -> Result<String, OracleError> {
        match prompt.metric.as_str() {
            "readability" => Ok("Readability score: 7/10".to_string()),
            "testability" => Ok("I cannot decide.".to_string()),
            other => Err(OracleError::Unavailable(format!("no scorer for {other}"))),
        }
    }
}

fn create_workspace() -> (TempDir, String) {
    let _ = env_logger::builder().is_test(true).try_init();
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let workspace_path = temp_dir.path().to_string_lossy().to_string();
    (temp_dir, workspace_path)
}

fn write_source(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("parent")).expect("create dir");
    fs::write(path, content).expect("write source file");
}

#[tokio::test]
async fn end_to_end_single_file_single_metric() {
    let (_tmp, workspace_path) = create_workspace();
    save_settings(
        &workspace_path,
        json!({ "minLines": 0, "metrics": { "readability": READABILITY } }),
    )
    .expect("save settings");

    let reporter = Arc::new(MemoryReporter::default());
    let pipeline = Pipeline::open(&workspace_path, Arc::new(FixedOracle("Readability score: 7/10")), reporter)
        .expect("open pipeline");

    let mut sources = BTreeMap::new();
    sources.insert("a.py".to_string(), "import os\nx = 1\ny = 2\nz = x + y\nprint(z)\n".to_string());

    let summary = pipeline
        .extractor
        .extract_project("dev@example.com", "demo", &sources, pipeline.settings.policy)
        .await
        .expect("extract");
    assert_eq!(summary.records_written, 1);

    let files = pipeline.store.get_files("dev@example.com", "demo").expect("files");
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].loc, 5);
    let records = pipeline.store.get_metrics(&[files[0].file_id.clone()]).expect("metrics");
    assert_eq!(records[0].quantity, 7);
    let that_date = record_date(&files[0].timestamp).expect("date");

    let series = pipeline.series("dev@example.com", "demo").expect("series");
    assert_eq!(series.get("readability").unwrap()[&that_date], 7.0);

    let charts = pipeline.charts("dev@example.com", "demo").expect("charts");
    assert_eq!(charts.len(), 1);
    assert_eq!(charts[0].title, "Readability");
    assert_eq!(charts[0].x, vec![that_date]);
    assert_eq!(charts[0].y, vec![7.0]);
    assert_eq!(charts[0].description, READABILITY);
}

#[tokio::test]
async fn score_directory_collects_filters_and_reports_failures() {
    let (tmp, workspace_path) = create_workspace();
    save_settings(
        &workspace_path,
        json!({
            "minLines": 2,
            "extensions": [".py"],
            "ignorePatterns": ["generated"],
            "metrics": {
                "readability": READABILITY,
                "testability": "How easily the code can be tested.",
                "consistency": "Uniform style."
            }
        }),
    )
    .expect("save settings");

    let repo = tmp.path().join("repo");
    write_source(&repo, "app/main.py", "a = 1\nb = 2\nc = 3\n");
    write_source(&repo, "app/tiny.py", "a = 1\n");
    write_source(&repo, "generated/schema.py", "a = 1\nb = 2\nc = 3\n");
    write_source(&repo, "notes.txt", "a\nb\nc\n");

    let reporter = Arc::new(MemoryReporter::default());
    let pipeline = Pipeline::open(&workspace_path, Arc::new(ByMetricOracle), reporter.clone()).expect("open pipeline");

    let summary = pipeline
        .score_directory("dev@example.com", "repo", &repo)
        .await
        .expect("score directory");

    assert_eq!(summary.files_scored, 1);
    assert_eq!(summary.files_skipped, 1);
    assert_eq!(summary.records_written, 2);
    assert_eq!(summary.unparseable, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].file_path, "app/main.py");
    assert_eq!(summary.failures[0].metric_name, "consistency");
    assert!(!reporter.messages_at(ReportLevel::Warn).is_empty());

    // The unparsed testability record is aggregated as -1 unless filtered first.
    let series = pipeline.series("dev@example.com", "repo").expect("series");
    let testability: Vec<f64> = series.get("testability").unwrap().values().copied().collect();
    assert_eq!(testability, vec![-1.0]);

    let files = pipeline.store.get_files("dev@example.com", "repo").expect("files");
    let ids: Vec<String> = files.iter().map(|f| f.file_id.clone()).collect();
    let clean = without_sentinels(pipeline.store.get_metrics(&ids).expect("metrics"));
    assert!(clean.iter().all(|r| r.metric_name == "readability"));
}

#[tokio::test]
async fn repeated_runs_add_history_instead_of_overwriting() {
    let (_tmp, workspace_path) = create_workspace();
    let store = Arc::new(SqliteStore::open(&workspace_path).expect("store"));
    let registry = Arc::new(MetricRegistry::from_pairs([("readability", READABILITY)]));
    let reporter = Arc::new(MemoryReporter::default());

    let mut sources = BTreeMap::new();
    sources.insert("lib.py".to_string(), "x = 1\n".repeat(40));

    for reply in ["6/10", "8/10"] {
        let extractor = Arc::new(MetricExtractor::new(
            Arc::new(FixedOracle(reply)),
            store.clone(),
            registry.clone(),
            reporter.clone(),
        ));
        extractor
            .extract_project("dev@example.com", "demo", &sources, Default::default())
            .await
            .expect("extract");
    }

    let files = store.get_files("dev@example.com", "demo").expect("files");
    assert_eq!(files.len(), 2);
    assert_ne!(files[0].session_id, files[1].session_id);

    let ids: Vec<String> = files.iter().map(|f| f.file_id.clone()).collect();
    let quantities: Vec<i64> = store.get_metrics(&ids).expect("metrics").iter().map(|r| r.quantity).collect();
    assert_eq!(quantities, vec![6, 8]);

    // Same day, same loc: the bucket is the plain mean of both runs.
    let aggregator = MetricsAggregator::new(store.clone(), reporter);
    let series = aggregator.aggregate("dev@example.com", "demo").expect("series");
    let points: Vec<f64> = series.get("readability").unwrap().values().copied().collect();
    assert_eq!(points, vec![7.0]);
}

#[tokio::test]
async fn aggregation_not_found_contracts() {
    let (_tmp, workspace_path) = create_workspace();
    let store = Arc::new(SqliteStore::open(&workspace_path).expect("store"));
    let aggregator = MetricsAggregator::new(store.clone(), Arc::new(MemoryReporter::default()));

    let err = aggregator.aggregate("nobody@example.com", "nothing").unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)));

    let extractor = Arc::new(MetricExtractor::new(
        Arc::new(FixedOracle("5/10")),
        store.clone(),
        Arc::new(MetricRegistry::default()),
        Arc::new(MemoryReporter::default()),
    ));
    let mut sources = BTreeMap::new();
    sources.insert("tiny.py".to_string(), "x = 1\n".to_string());
    extractor
        .extract_project("dev@example.com", "demo", &sources, Default::default())
        .await
        .expect("extract");

    // Skipped files leave no File rows, so the project is still unknown.
    let err = aggregator.aggregate("dev@example.com", "demo").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn settings_round_trip_and_merge_partial_updates() {
    let (_tmp, workspace_path) = create_workspace();

    let initial = get_settings(&workspace_path).expect("load settings");
    assert!(initial.get("metrics").is_some());
    assert!(Path::new(&workspace_path).join(".maintainability/settings.json").exists());

    let saved = save_settings(&workspace_path, json!({ "minLines": 3, "modelName": "gpt-4o" })).expect("save");
    assert_eq!(saved["minLines"], json!(3));
    assert_eq!(saved["modelName"], json!("gpt-4o"));
    assert_eq!(saved["maxConcurrency"], initial["maxConcurrency"]);
    assert_eq!(saved["metrics"], initial["metrics"]);

    let reloaded = get_settings(&workspace_path).expect("reload");
    assert_eq!(reloaded, saved);
}
