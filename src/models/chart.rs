use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Renderer-agnostic description of one metric's time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub metric: String,
    pub title: String,
    pub x: Vec<NaiveDate>,
    pub y: Vec<f64>,
    pub description: String,
}
