use serde::{Deserialize, Serialize};

/// Quantity recorded when the oracle response holds no `n/10` score.
pub const SENTINEL_QUANTITY: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub file_id: String,
    pub metric_name: String,
    pub quantity: i64, // 0..=10, or SENTINEL_QUANTITY
    pub reasoning_text: String,
    pub timestamp: String,
}

impl MetricRecord {
    pub fn new(file_id: &str, metric_name: &str, quantity: i64, reasoning_text: String) -> Self {
        MetricRecord {
            file_id: file_id.to_string(),
            metric_name: metric_name.to_string(),
            quantity,
            reasoning_text,
            timestamp: super::timestamp_now(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.quantity == SENTINEL_QUANTITY
    }
}

/// Drops records whose quantity is the parse-failure sentinel.
///
/// Aggregation weights sentinel values like any other score; callers that
/// want clean aggregates filter with this first.
pub fn without_sentinels(records: Vec<MetricRecord>) -> Vec<MetricRecord> {
    records.into_iter().filter(|r| !r.is_sentinel()).collect()
}
