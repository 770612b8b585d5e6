use crate::analysis::registry::{chart_title, MetricRegistry};
use crate::error::PipelineResult;
use crate::models::chart::ChartSpec;
use crate::models::series::WeightedSeries;

/// One chart spec per metric, in series order.
///
/// Every metric in the series must be described by the registry; a missing
/// entry means the registry and the extraction metrics have drifted apart.
pub fn build_charts(series: &WeightedSeries, registry: &MetricRegistry) -> PipelineResult<Vec<ChartSpec>> {
    series
        .iter()
        .map(|metric| {
            let description = registry.require(&metric.metric_name)?;
            Ok(ChartSpec {
                metric: metric.metric_name.clone(),
                title: chart_title(&metric.metric_name),
                x: metric.points.keys().copied().collect(),
                y: metric.points.values().copied().collect(),
                description: description.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use chrono::NaiveDate;

    #[test]
    fn emits_titles_descriptions_and_points_per_metric() {
        let d1 = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let mut series = WeightedSeries::default();
        series.insert("design_quality", d2, 6.5);
        series.insert("design_quality", d1, 5.0);
        series.insert("readability", d1, 7.0);

        let registry = MetricRegistry::from_pairs([
            ("readability", "Easy to follow"),
            ("design_quality", "Sound structure"),
        ]);
        let charts = build_charts(&series, &registry).expect("charts");

        assert_eq!(charts.len(), 2);
        assert_eq!(charts[0].title, "Design quality");
        assert_eq!(charts[0].x, vec![d1, d2]);
        assert_eq!(charts[0].y, vec![5.0, 6.5]);
        assert_eq!(charts[0].description, "Sound structure");
        assert_eq!(charts[1].title, "Readability");
    }

    #[test]
    fn unknown_metric_is_a_configuration_error() {
        let mut series = WeightedSeries::default();
        series.insert("vibes", NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(), 3.0);

        let err = build_charts(&series, &MetricRegistry::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn empty_series_yields_no_charts() {
        let charts = build_charts(&WeightedSeries::default(), &MetricRegistry::default()).expect("charts");
        assert!(charts.is_empty());
    }
}
