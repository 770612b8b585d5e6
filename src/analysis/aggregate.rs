use crate::error::{PipelineError, PipelineResult};
use crate::models::metric_record::MetricRecord;
use crate::models::series::{JoinedRecord, MetricGroups, WeightedSeries};
use crate::models::source_file::SourceFile;
use chrono::{DateTime, NaiveDate};
use std::collections::HashMap;

const TIMESTAMP_FMT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Join metric records with their files on `file_id`.
///
/// File attributes win over the record's own: the joined timestamp is the
/// file's, so every metric of one file lands in the same daily bucket.
/// Records without a matching file are dropped.
pub fn join_records(files: &[SourceFile], metrics: &[MetricRecord]) -> Vec<JoinedRecord> {
    let by_id: HashMap<&str, &SourceFile> = files.iter().map(|f| (f.file_id.as_str(), f)).collect();

    metrics
        .iter()
        .filter_map(|metric| {
            let file = by_id.get(metric.file_id.as_str())?;
            Some(JoinedRecord {
                file_id: metric.file_id.clone(),
                path: file.path.clone(),
                metric_name: metric.metric_name.clone(),
                score: metric.quantity,
                loc: file.loc,
                timestamp: file.timestamp.clone(),
            })
        })
        .collect()
}

/// Calendar date of a timestamp, taken in the timestamp's own offset.
pub fn record_date(timestamp: &str) -> PipelineResult<NaiveDate> {
    let parsed = DateTime::parse_from_rfc3339(timestamp)
        .or_else(|_| DateTime::parse_from_str(timestamp, TIMESTAMP_FMT))
        .map_err(|e| PipelineError::MalformedRecord(format!("timestamp {timestamp:?}: {e}")))?;
    Ok(parsed.date_naive())
}

/// Partition joined records by metric (first-seen order), then by date.
pub fn group_records(records: Vec<JoinedRecord>) -> PipelineResult<MetricGroups> {
    let mut groups = MetricGroups::default();
    for record in records {
        let date = record_date(&record.timestamp)?;
        groups.push(date, record);
    }
    Ok(groups)
}

/// `Σ(score * loc) / Σ(loc)`, or `None` when the bucket has no lines of code.
pub fn weighted_score(records: &[JoinedRecord]) -> Option<f64> {
    let total_loc: usize = records.iter().map(|r| r.loc).sum();
    if total_loc == 0 {
        return None;
    }

    let weighted_sum: f64 = records
        .iter()
        .map(|r| r.score as f64 * r.loc as f64)
        .sum();
    Some(weighted_sum / total_loc as f64)
}

pub fn weight_groups(groups: &MetricGroups) -> WeightedSeries {
    let mut series = WeightedSeries::default();
    for group in groups.iter() {
        for (date, records) in &group.buckets {
            match weighted_score(records) {
                Some(score) => series.insert(&group.metric_name, *date, score),
                None => log::debug!(
                    "Skipping zero-loc bucket metric={} date={date}",
                    group.metric_name
                ),
            }
        }
    }
    series
}

/// Join, group and weight one snapshot of files and metric records.
pub fn compute_weighted_series(
    files: &[SourceFile],
    metrics: &[MetricRecord],
) -> PipelineResult<WeightedSeries> {
    let joined = join_records(files, metrics);
    let groups = group_records(joined)?;
    Ok(weight_groups(&groups))
}
