use crate::models::metric_record::SENTINEL_QUANTITY;
use regex::Regex;
use std::sync::OnceLock;

fn score_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"([0-9]{1,2})/10").expect("score pattern is valid"))
}

/// Parse a 0–10 score from free oracle text.
///
/// Takes the first one- or two-digit ASCII integer immediately followed by `/10`.
/// Returns `SENTINEL_QUANTITY` when no such pattern exists, or when the first
/// match lies outside 0..=10 (e.g. `"42/10"`).
pub fn parse_score(text: &str) -> i64 {
    score_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .filter(|n| (0..=10).contains(n))
        .unwrap_or(SENTINEL_QUANTITY)
}
