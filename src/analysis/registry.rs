use crate::error::{PipelineError, PipelineResult};
use serde_json::{Map, Value};

/// Static metric -> description mapping, loaded once at startup and shared
/// read-only (wrap in `Arc` when handing to concurrent extraction).
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRegistry {
    entries: Vec<(String, String)>,
}

impl MetricRegistry {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries: Vec<(String, String)> = Vec::new();
        for (name, description) in pairs {
            let name = name.into();
            let description = description.into();
            match entries.iter_mut().find(|(existing, _)| *existing == name) {
                Some(entry) => entry.1 = description,
                None => entries.push((name, description)),
            }
        }
        MetricRegistry { entries }
    }

    /// Build from the `metrics` object of the settings file.
    pub fn from_settings_value(metrics: &Value) -> PipelineResult<Self> {
        let obj = metrics.as_object().ok_or_else(|| {
            PipelineError::Configuration("metrics must be an object of name -> description".to_string())
        })?;

        let mut pairs = Vec::with_capacity(obj.len());
        for (name, description) in obj {
            let description = description.as_str().ok_or_else(|| {
                PipelineError::Configuration(format!("description for metric {name} must be a string"))
            })?;
            pairs.push((name.clone(), description.to_string()));
        }

        if pairs.is_empty() {
            return Err(PipelineError::Configuration("metric registry is empty".to_string()));
        }
        Ok(Self::from_pairs(pairs))
    }

    pub fn describe(&self, metric_name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == metric_name)
            .map(|(_, description)| description.as_str())
    }

    /// Description lookup that treats a missing metric as a configuration error.
    pub fn require(&self, metric_name: &str) -> PipelineResult<&str> {
        self.describe(metric_name).ok_or_else(|| {
            PipelineError::Configuration(format!(
                "metric {metric_name} has no entry in the description registry"
            ))
        })
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::from_pairs(default_metric_descriptions())
    }
}

pub fn default_metric_descriptions() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "readability",
            "How easily a new reader can follow the code: naming, layout, comments where they help, and the absence of clever tricks.",
        ),
        (
            "design_quality",
            "Whether responsibilities are well separated, abstractions fit the problem, and modules can change without ripple effects.",
        ),
        (
            "testability",
            "How easily the code can be exercised in isolation: injectable dependencies, small pure functions, few hidden side effects.",
        ),
        (
            "consistency",
            "Uniformity of style, naming conventions, and error handling patterns across the file.",
        ),
        (
            "debug_error_handling",
            "Quality of error propagation, logging, and diagnostics when something goes wrong at runtime.",
        ),
    ]
}

pub fn default_metrics_value() -> Value {
    let mut map = Map::new();
    for (name, description) in default_metric_descriptions() {
        map.insert(name.to_string(), Value::String(description.to_string()));
    }
    Value::Object(map)
}

/// `design_quality` -> `design quality`
pub fn humanize_metric_name(metric_name: &str) -> String {
    metric_name.replace('_', " ")
}

/// `design_quality` -> `Design quality`
pub fn chart_title(metric_name: &str) -> String {
    let spaced = humanize_metric_name(metric_name);
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn humanizes_and_titles_metric_names() {
        assert_eq!(humanize_metric_name("debug_error_handling"), "debug error handling");
        assert_eq!(chart_title("debug_error_handling"), "Debug error handling");
        assert_eq!(chart_title("readability"), "Readability");
        assert_eq!(chart_title(""), "");
    }

    #[test]
    fn require_reports_missing_metric_as_configuration_error() {
        let registry = MetricRegistry::default();
        assert!(registry.require("readability").is_ok());
        assert!(matches!(
            registry.require("cyclomatic_mood"),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn later_pairs_override_earlier_descriptions() {
        let registry = MetricRegistry::from_pairs([("a", "first"), ("b", "bee"), ("a", "second")]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.describe("a"), Some("second"));
    }

    #[test]
    fn builds_from_settings_object() {
        let registry = MetricRegistry::from_settings_value(&json!({
            "readability": "Easy to read"
        }))
        .expect("registry");
        assert_eq!(registry.describe("readability"), Some("Easy to read"));

        assert!(MetricRegistry::from_settings_value(&json!({})).is_err());
        assert!(MetricRegistry::from_settings_value(&json!({ "x": 3 })).is_err());
        assert!(MetricRegistry::from_settings_value(&json!(["readability"])).is_err());
    }
}
