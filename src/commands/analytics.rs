use crate::analysis::aggregate::compute_weighted_series;
use crate::analysis::chart::build_charts;
use crate::analysis::registry::MetricRegistry;
use crate::commands::db::MetricsStore;
use crate::error::{PipelineError, PipelineResult};
use crate::models::chart::ChartSpec;
use crate::models::series::WeightedSeries;
use crate::report::Reporter;
use std::sync::Arc;

/// Builds loc-weighted daily series from one store snapshot per request.
pub struct MetricsAggregator {
    store: Arc<dyn MetricsStore>,
    reporter: Arc<dyn Reporter>,
}

impl MetricsAggregator {
    pub fn new(store: Arc<dyn MetricsStore>, reporter: Arc<dyn Reporter>) -> Self {
        MetricsAggregator { store, reporter }
    }

    pub fn aggregate(&self, user_email: &str, project_name: &str) -> PipelineResult<WeightedSeries> {
        let files = self.store.get_files(user_email, project_name)?;
        if files.is_empty() {
            return Err(PipelineError::NotFound(format!(
                "user_email={user_email}, project_name={project_name} combination not found"
            )));
        }

        let file_ids: Vec<String> = files.iter().map(|f| f.file_id.clone()).collect();
        let metrics = self.store.get_metrics(&file_ids)?;
        if metrics.is_empty() {
            return Err(PipelineError::NotFound(format!(
                "No metrics found for user_email={user_email}, project_name={project_name} combination"
            )));
        }

        let sentinels = metrics.iter().filter(|m| m.is_sentinel()).count();
        if sentinels > 0 {
            self.reporter.warn(&format!(
                "{sentinels} unparsed score(s) included in aggregation for {user_email}:{project_name}"
            ));
        }

        compute_weighted_series(&files, &metrics)
    }

    /// Aggregate, then turn each metric series into a chart spec.
    pub fn project_analytics(
        &self,
        registry: &MetricRegistry,
        user_email: &str,
        project_name: &str,
    ) -> PipelineResult<Vec<ChartSpec>> {
        let series = self.aggregate(user_email, project_name)?;
        build_charts(&series, registry)
    }
}
