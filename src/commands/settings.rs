use crate::analysis::registry::{default_metrics_value, MetricRegistry};
use crate::commands::extract::BatchPolicy;
use crate::commands::oracle::{OracleConfig, PromptTemplate, DEFAULT_PROMPT_TEMPLATE};
use crate::error::PipelineResult;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_SCHEMA_VERSION: i64 = 2;
const SETTINGS_DIR: &str = ".maintainability";

/// Settings resolved into the types each pipeline stage consumes.
#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    pub oracle: OracleConfig,
    pub template: PromptTemplate,
    pub policy: BatchPolicy,
    pub extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub registry: MetricRegistry,
}

pub fn get_settings(workspace_path: &str) -> PipelineResult<Value> {
    load_settings_from_disk(workspace_path)
}

pub fn save_settings(workspace_path: &str, settings: Value) -> PipelineResult<Value> {
    save_settings_to_disk(workspace_path, settings)
}

pub fn load_effective_settings(workspace_path: &str) -> PipelineResult<EffectiveSettings> {
    let settings = load_settings_from_disk(workspace_path)?;
    effective_settings(&settings)
}

pub fn effective_settings(settings: &Value) -> PipelineResult<EffectiveSettings> {
    let str_of = |key: &str| settings.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
    let usize_of = |key: &str| settings.get(key).and_then(Value::as_u64).unwrap_or(0) as usize;

    let registry = MetricRegistry::from_settings_value(settings.get("metrics").unwrap_or(&Value::Null))?;

    Ok(EffectiveSettings {
        oracle: OracleConfig {
            endpoint: str_of("oracleEndpoint"),
            model: str_of("modelName"),
            temperature: settings.get("temperature").and_then(Value::as_f64).unwrap_or(0.0) as f32,
            api_key_env: str_of("apiKeyEnv"),
        },
        template: PromptTemplate::new(str_of("promptTemplate")),
        policy: BatchPolicy {
            min_lines: usize_of("minLines"),
            max_concurrency: usize_of("maxConcurrency").max(1),
        },
        extensions: string_list(settings, "extensions"),
        ignore_patterns: string_list(settings, "ignorePatterns"),
        registry,
    })
}

pub fn load_settings_from_disk(workspace_path: &str) -> PipelineResult<Value> {
    let path = settings_path(workspace_path);
    ensure_settings_dir(workspace_path)?;

    let original = if path.exists() {
        let raw = fs::read_to_string(&path)?;
        serde_json::from_str::<Value>(&raw).unwrap_or_else(|e| {
            log::warn!("settings.json is not valid JSON ({e}); falling back to defaults");
            json!({})
        })
    } else {
        json!({})
    };

    let migrated = migrate_settings(original.clone());
    if migrated != original || !path.exists() {
        write_settings_file(&path, &migrated)?;
    }

    Ok(migrated)
}

pub fn save_settings_to_disk(workspace_path: &str, settings: Value) -> PipelineResult<Value> {
    let path = settings_path(workspace_path);
    ensure_settings_dir(workspace_path)?;

    let mut merged = load_settings_from_disk(workspace_path).unwrap_or_else(|_| default_settings());
    merge_settings(&mut merged, &settings);

    let migrated = migrate_settings(merged);
    effective_settings(&migrated)?;
    write_settings_file(&path, &migrated)?;
    Ok(migrated)
}

fn settings_path(workspace_path: &str) -> PathBuf {
    Path::new(workspace_path).join(SETTINGS_DIR).join("settings.json")
}

fn ensure_settings_dir(workspace_path: &str) -> PipelineResult<()> {
    fs::create_dir_all(Path::new(workspace_path).join(SETTINGS_DIR))?;
    Ok(())
}

fn write_settings_file(path: &Path, settings: &Value) -> PipelineResult<()> {
    let raw = serde_json::to_string_pretty(settings)?;
    fs::write(path, raw)?;
    Ok(())
}

fn migrate_settings(input: Value) -> Value {
    let defaults = default_settings();
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    let version = out
        .get("schema_version")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    if version < 1 {
        // Unversioned configs used the CLI's snake_case keys.
        rename_key(&mut out, "prompt", "promptTemplate");
        rename_key(&mut out, "model_name", "modelName");
        rename_key(&mut out, "min_lines", "minLines");
    }

    if version < 2 {
        // V2 introduces bounded concurrency and the ignore list.
        ensure_key(&mut out, "maxConcurrency", json!(4));
        ensure_key(&mut out, "ignorePatterns", json!([]));
    }

    deep_merge_defaults(&mut out, &defaults);
    sanitize_settings(&mut out);
    if let Some(obj) = out.as_object_mut() {
        obj.insert("schema_version".to_string(), json!(SETTINGS_SCHEMA_VERSION));
    }

    out
}

fn default_settings() -> Value {
    json!({
        "schema_version": SETTINGS_SCHEMA_VERSION,
        "modelName": "gpt-4",
        "temperature": 0.0,
        "oracleEndpoint": "https://api.openai.com/v1",
        "apiKeyEnv": "OPENAI_API_KEY",
        "promptTemplate": DEFAULT_PROMPT_TEMPLATE,
        "minLines": 10,
        "maxConcurrency": 4,
        "extensions": [".py", ".rs", ".js", ".ts", ".go", ".java"],
        "ignorePatterns": [],
        "metrics": default_metrics_value()
    })
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        // The metric set is replaced wholesale, never merged per key.
        if key == "metrics" && target_obj.contains_key(key) {
            continue;
        }
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

fn ensure_key(target: &mut Value, key: &str, value: Value) {
    if let Some(obj) = target.as_object_mut() {
        obj.entry(key.to_string()).or_insert(value);
    }
}

fn rename_key(target: &mut Value, from: &str, to: &str) {
    let Some(obj) = target.as_object_mut() else {
        return;
    };
    if let Some(value) = obj.remove(from) {
        obj.entry(to.to_string()).or_insert(value);
    }
}

fn merge_settings(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_obj), Value::Object(incoming_obj)) => {
            for (key, value) in incoming_obj {
                match target_obj.get_mut(key) {
                    Some(existing) if key != "metrics" => merge_settings(existing, value),
                    _ => {
                        target_obj.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target_slot, incoming_value) => {
            *target_slot = incoming_value.clone();
        }
    }
}

fn sanitize_settings(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    clamp_u64(obj, "minLines", 0, 10_000, 10);
    clamp_u64(obj, "maxConcurrency", 1, 64, 4);
    clamp_f64(obj, "temperature", 0.0, 2.0, 0.0);

    ensure_string(obj, "modelName", "gpt-4");
    ensure_string(obj, "oracleEndpoint", "https://api.openai.com/v1");
    ensure_string(obj, "apiKeyEnv", "OPENAI_API_KEY");
    ensure_string(obj, "promptTemplate", DEFAULT_PROMPT_TEMPLATE);

    let extensions: Vec<Value> = string_list_of(obj.get("extensions"))
        .into_iter()
        .map(|ext| {
            if ext.starts_with('.') {
                json!(ext)
            } else {
                json!(format!(".{ext}"))
            }
        })
        .collect();
    obj.insert("extensions".to_string(), Value::Array(extensions));

    let patterns: Vec<Value> = string_list_of(obj.get("ignorePatterns"))
        .into_iter()
        .map(Value::String)
        .collect();
    obj.insert("ignorePatterns".to_string(), Value::Array(patterns));

    let metrics_valid = obj
        .get("metrics")
        .and_then(Value::as_object)
        .map(|m| !m.is_empty() && m.values().all(Value::is_string))
        .unwrap_or(false);
    if !metrics_valid {
        obj.insert("metrics".to_string(), default_metrics_value());
    }
}

fn clamp_u64(map: &mut Map<String, Value>, key: &str, min: u64, max: u64, default: u64) {
    let raw = map.get(key).and_then(Value::as_u64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn clamp_f64(map: &mut Map<String, Value>, key: &str, min: f64, max: f64, default: f64) {
    let raw = map.get(key).and_then(Value::as_f64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn ensure_string(map: &mut Map<String, Value>, key: &str, default: &str) {
    let valid = map
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(default)
        .to_string();
    map.insert(key.to_string(), json!(valid));
}

fn string_list_of(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn string_list(settings: &Value, key: &str) -> Vec<String> {
    string_list_of(settings.get(key))
}
