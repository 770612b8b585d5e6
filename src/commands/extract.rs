use crate::analysis::registry::{humanize_metric_name, MetricRegistry};
use crate::analysis::score::parse_score;
use crate::commands::db::MetricsStore;
use crate::commands::oracle::{PromptTemplate, ScoringOracle};
use crate::error::{PipelineError, PipelineResult};
use crate::models::metric_record::{MetricRecord, SENTINEL_QUANTITY};
use crate::models::source_file::SourceFile;
use crate::models::timestamp_now;
use crate::report::Reporter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Caller-side policy for a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Files with this many lines or fewer are skipped.
    pub min_lines: usize,
    /// Upper bound on in-flight oracle calls.
    pub max_concurrency: usize,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        BatchPolicy {
            min_lines: 10,
            max_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub file_path: String,
    pub metric_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub session_id: String,
    pub files_scored: usize,
    pub files_skipped: usize,
    pub records_written: usize,
    pub unparseable: usize,
    pub failures: Vec<UnitFailure>,
}

/// Scores (file, metric) pairs through the oracle and persists the results.
pub struct MetricExtractor {
    oracle: Arc<dyn ScoringOracle>,
    store: Arc<dyn MetricsStore>,
    registry: Arc<MetricRegistry>,
    template: PromptTemplate,
    reporter: Arc<dyn Reporter>,
}

impl MetricExtractor {
    pub fn new(
        oracle: Arc<dyn ScoringOracle>,
        store: Arc<dyn MetricsStore>,
        registry: Arc<MetricRegistry>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        MetricExtractor {
            oracle,
            store,
            registry,
            template: PromptTemplate::default(),
            reporter,
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Score one file for one metric and write exactly one record.
    ///
    /// An unparseable response is stored with the sentinel quantity and the
    /// full text as reasoning. An oracle failure writes nothing.
    pub async fn extract(
        &self,
        file_id: &str,
        filepath: &str,
        code: &str,
        metric_name: &str,
    ) -> PipelineResult<i64> {
        let description = self.registry.require(metric_name)?;
        let prompt = self
            .template
            .prompt(filepath, code, &humanize_metric_name(metric_name), description);

        let response = self
            .oracle
            .invoke(&prompt)
            .await
            .map_err(|source| PipelineError::Oracle {
                file_id: file_id.to_string(),
                filepath: filepath.to_string(),
                metric: metric_name.to_string(),
                source,
            })?;

        let quantity = parse_score(&response);
        if quantity == SENTINEL_QUANTITY {
            self.reporter.warn(&format!(
                "Error parsing oracle response for file_id={file_id} path={filepath} metric={metric_name}: no score found in {response:?}"
            ));
        }

        self.persist(MetricRecord::new(file_id, metric_name, quantity, response))
            .await?;
        Ok(quantity)
    }

    /// Store writes block on SQLite, so they run on the blocking pool.
    async fn persist(&self, record: MetricRecord) -> PipelineResult<()> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.write_metrics(&record)).await?
    }

    /// Record a score computed outside the oracle.
    pub fn submit_precomputed_metric(
        &self,
        file_id: &str,
        metric_name: &str,
        quantity: i64,
        reasoning_text: &str,
    ) -> PipelineResult<MetricRecord> {
        if self.registry.describe(metric_name).is_none() {
            return Err(PipelineError::Validation(format!("unknown metric {metric_name}")));
        }
        if quantity != SENTINEL_QUANTITY && !(0..=10).contains(&quantity) {
            return Err(PipelineError::Validation(format!(
                "quantity {quantity} for metric {metric_name} is outside 0..=10"
            )));
        }

        let record = MetricRecord::new(file_id, metric_name, quantity, reasoning_text.to_string());
        self.store.write_metrics(&record)?;
        Ok(record)
    }

    /// Ingest a collected project and score every registry metric per file.
    ///
    /// Each (file, metric) unit runs independently; oracle failures are
    /// collected into the summary rather than aborting the batch. Records
    /// already written stay in place if the batch is dropped midway.
    pub async fn extract_project(
        self: &Arc<Self>,
        owner: &str,
        project: &str,
        sources: &BTreeMap<String, String>,
        policy: BatchPolicy,
    ) -> PipelineResult<BatchSummary> {
        let mut summary = BatchSummary {
            session_id: uuid::Uuid::new_v4().to_string(),
            ..BatchSummary::default()
        };
        self.reporter.info(&format!(
            "Starting extraction for {owner}:{project} session={}",
            summary.session_id
        ));

        let semaphore = Arc::new(Semaphore::new(policy.max_concurrency.max(1)));
        let mut units: JoinSet<(String, String, PipelineResult<i64>)> = JoinSet::new();

        for (path, content) in sources {
            if content.lines().count() <= policy.min_lines {
                summary.files_skipped += 1;
                continue;
            }

            let file = SourceFile::new(owner, project, &summary.session_id, path, content, timestamp_now());
            self.store.insert_file(&file)?;
            summary.files_scored += 1;

            let code: Arc<str> = Arc::from(content.as_str());
            let metric_names: Vec<String> = self.registry.metric_names().map(str::to_string).collect();
            for metric_name in metric_names {
                let permit = Arc::clone(&semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|e| PipelineError::Configuration(format!("extraction pool closed: {e}")))?;
                let extractor = Arc::clone(self);
                let file_id = file.file_id.clone();
                let path = path.clone();
                let code = Arc::clone(&code);

                self.reporter.info(&format!("Extracting {path}:{metric_name}"));
                units.spawn(async move {
                    let result = extractor.extract(&file_id, &path, &code, &metric_name).await;
                    drop(permit);
                    (path, metric_name, result)
                });
            }
        }

        while let Some(joined) = units.join_next().await {
            match joined {
                Ok((_, _, Ok(quantity))) => {
                    summary.records_written += 1;
                    if quantity == SENTINEL_QUANTITY {
                        summary.unparseable += 1;
                    }
                }
                Ok((file_path, metric_name, Err(error))) => {
                    self.reporter.error(&error.to_string());
                    summary.failures.push(UnitFailure {
                        file_path,
                        metric_name,
                        error: error.to_string(),
                    });
                }
                Err(join_error) => {
                    self.reporter.error(&format!("Extraction task aborted: {join_error}"));
                    summary.failures.push(UnitFailure {
                        file_path: String::new(),
                        metric_name: String::new(),
                        error: join_error.to_string(),
                    });
                }
            }
        }

        summary
            .failures
            .sort_by(|a, b| (&a.file_path, &a.metric_name).cmp(&(&b.file_path, &b.metric_name)));
        self.reporter.info(&format!(
            "Completed extraction for {owner}:{project}: {} files scored, {} skipped, {} records, {} failures",
            summary.files_scored,
            summary.files_skipped,
            summary.records_written,
            summary.failures.len()
        ));
        Ok(summary)
    }
}
