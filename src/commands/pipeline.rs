use crate::commands::analytics::MetricsAggregator;
use crate::commands::collect::{collect_sources, IgnoreRules};
use crate::commands::db::SqliteStore;
use crate::commands::extract::{BatchSummary, MetricExtractor};
use crate::commands::oracle::{HttpOracle, ScoringOracle};
use crate::commands::settings::{load_effective_settings, EffectiveSettings};
use crate::error::{PipelineError, PipelineResult};
use crate::models::chart::ChartSpec;
use crate::models::series::WeightedSeries;
use crate::report::Reporter;
use std::path::Path;
use std::sync::Arc;

/// Pipeline stages wired from a workspace's settings and state database.
pub struct Pipeline {
    pub settings: EffectiveSettings,
    pub store: Arc<SqliteStore>,
    pub extractor: Arc<MetricExtractor>,
    pub aggregator: MetricsAggregator,
    reporter: Arc<dyn Reporter>,
}

impl Pipeline {
    pub fn open(
        workspace_path: &str,
        oracle: Arc<dyn ScoringOracle>,
        reporter: Arc<dyn Reporter>,
    ) -> PipelineResult<Self> {
        let settings = load_effective_settings(workspace_path)?;
        let store = Arc::new(SqliteStore::open(workspace_path)?);
        let registry = Arc::new(settings.registry.clone());

        let extractor = MetricExtractor::new(oracle, store.clone(), registry, reporter.clone())
            .with_template(settings.template.clone());
        let aggregator = MetricsAggregator::new(store.clone(), reporter.clone());

        Ok(Pipeline {
            settings,
            store,
            extractor: Arc::new(extractor),
            aggregator,
            reporter,
        })
    }

    /// Uses the OpenAI-compatible oracle configured in settings.
    pub fn open_with_http_oracle(workspace_path: &str, reporter: Arc<dyn Reporter>) -> PipelineResult<Self> {
        let settings = load_effective_settings(workspace_path)?;
        let oracle = HttpOracle::new(settings.oracle)
            .map_err(|e| PipelineError::Configuration(format!("oracle client: {e}")))?;
        Self::open(workspace_path, Arc::new(oracle), reporter)
    }

    /// Collect sources under `root` and score them as one extraction run.
    pub async fn score_directory(&self, owner: &str, project: &str, root: &Path) -> PipelineResult<BatchSummary> {
        let rules = IgnoreRules::for_root(root, &self.settings.ignore_patterns);
        let sources = collect_sources(root, &self.settings.extensions, &rules)?;
        if sources.is_empty() {
            self.reporter
                .warn(&format!("No source files matched under {}", root.display()));
        }
        self.extractor
            .extract_project(owner, project, &sources, self.settings.policy)
            .await
    }

    pub fn series(&self, owner: &str, project: &str) -> PipelineResult<WeightedSeries> {
        self.aggregator.aggregate(owner, project)
    }

    pub fn charts(&self, owner: &str, project: &str) -> PipelineResult<Vec<ChartSpec>> {
        self.aggregator
            .project_analytics(self.extractor.registry(), owner, project)
    }
}
