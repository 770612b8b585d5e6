use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A metric record joined with the file it was scored against.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRecord {
    pub file_id: String,
    pub path: String,
    pub metric_name: String,
    pub score: i64,
    pub loc: usize,
    pub timestamp: String,
}

/// Joined records of one metric, bucketed by calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricGroup {
    pub metric_name: String,
    pub buckets: BTreeMap<NaiveDate, Vec<JoinedRecord>>,
}

/// Metric groups in first-seen order of the joined record stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricGroups {
    groups: Vec<MetricGroup>,
}

impl MetricGroups {
    pub fn push(&mut self, date: NaiveDate, record: JoinedRecord) {
        let index = match self
            .groups
            .iter()
            .position(|group| group.metric_name == record.metric_name)
        {
            Some(index) => index,
            None => {
                self.groups.push(MetricGroup {
                    metric_name: record.metric_name.clone(),
                    buckets: BTreeMap::new(),
                });
                self.groups.len() - 1
            }
        };

        self.groups[index]
            .buckets
            .entry(date)
            .or_default()
            .push(record);
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub metric_name: String,
    pub points: BTreeMap<NaiveDate, f64>,
}

/// `metric_name -> (date -> weighted_score)`, metrics kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedSeries {
    metrics: Vec<MetricSeries>,
}

impl WeightedSeries {
    pub fn insert(&mut self, metric_name: &str, date: NaiveDate, score: f64) {
        match self.metrics.iter_mut().find(|s| s.metric_name == metric_name) {
            Some(series) => {
                series.points.insert(date, score);
            }
            None => {
                let mut points = BTreeMap::new();
                points.insert(date, score);
                self.metrics.push(MetricSeries {
                    metric_name: metric_name.to_string(),
                    points,
                });
            }
        }
    }

    pub fn get(&self, metric_name: &str) -> Option<&BTreeMap<NaiveDate, f64>> {
        self.metrics
            .iter()
            .find(|s| s.metric_name == metric_name)
            .map(|s| &s.points)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSeries> {
        self.metrics.iter()
    }

    pub fn metric_names(&self) -> Vec<&str> {
        self.metrics.iter().map(|s| s.metric_name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
