use std::collections::BTreeSet;

use serde_json::{Map, Value};

use super::{as_number, describe};
use crate::types::{DisplayRenderConfig, NormalizeSpec, NormalizeStrategy};

fn key_field(map: &Map<String, Value>, field: &str, default: &str) -> Result<String, String> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(default.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(format!("'{field}' must be a string, got {}", describe(other))),
    }
}

fn require_key(key: &str, available: &BTreeSet<String>) -> Result<(), String> {
    if available.contains(key) {
        Ok(())
    } else {
        Err(format!(
            "statistics key '{key}' is not available (have: {})",
            available.iter().cloned().collect::<Vec<_>>().join(", ")
        ))
    }
}

/// `{minKey, maxKey, strategy}`; `true` means min/max per band per time and
/// `false` disables normalization.
pub fn parse_normalize(value: &Value, available: &BTreeSet<String>) -> Result<Option<NormalizeSpec>, String> {
    let spec = match value {
        Value::Bool(false) => return Ok(None),
        Value::Bool(true) => NormalizeSpec {
            min_key: "min".to_string(),
            max_key: "max".to_string(),
            strategy: NormalizeStrategy::default(),
        },
        Value::Object(map) => {
            let strategy = match map.get("strategy") {
                None | Some(Value::Null) => NormalizeStrategy::default(),
                Some(Value::String(s)) => s.parse()?,
                Some(other) => {
                    return Err(format!("'strategy' must be a string, got {}", describe(other)))
                }
            };
            NormalizeSpec {
                min_key: key_field(map, "minKey", "min")?,
                max_key: key_field(map, "maxKey", "max")?,
                strategy,
            }
        }
        other => {
            return Err(format!(
                "expected an object or a boolean, got {}",
                describe(other)
            ))
        }
    };

    require_key(&spec.min_key, available)?;
    require_key(&spec.max_key, available)?;
    Ok(Some(spec))
}

/// `{strategy: "normalize", minKey, maxKey}` or
/// `{strategy: "std-stretch", meanKey, stdKey, slope}`. A bare strategy name
/// takes the default keys.
pub fn parse_display_render_config(
    value: &Value,
    available: &BTreeSet<String>,
) -> Result<DisplayRenderConfig, String> {
    let empty = Map::new();
    let (strategy, map) = match value {
        Value::String(s) => (s.as_str(), &empty),
        Value::Object(map) => {
            let strategy = map
                .get("strategy")
                .and_then(Value::as_str)
                .ok_or_else(|| "missing 'strategy'".to_string())?;
            (strategy, map)
        }
        other => {
            return Err(format!(
                "expected an object or a strategy name, got {}",
                describe(other)
            ))
        }
    };

    match strategy.trim().to_lowercase().replace('_', "-").as_str() {
        "normalize" => {
            let min_key = key_field(map, "minKey", "min")?;
            let max_key = key_field(map, "maxKey", "max")?;
            require_key(&min_key, available)?;
            require_key(&max_key, available)?;
            Ok(DisplayRenderConfig::Normalize { min_key, max_key })
        }
        "std-stretch" => {
            let mean_key = key_field(map, "meanKey", "mean")?;
            let std_key = key_field(map, "stdKey", "std")?;
            require_key(&mean_key, available)?;
            require_key(&std_key, available)?;
            let slope = match map.get("slope") {
                None | Some(Value::Null) => 1.0,
                Some(v) => as_number(v).ok_or_else(|| format!("'slope' must be a number, got {}", describe(v)))?,
            };
            if !(slope.is_finite() && slope > 0.0) {
                return Err(format!("'slope' must be positive, got {slope}"));
            }
            Ok(DisplayRenderConfig::StdStretch {
                mean_key,
                std_key,
                slope,
            })
        }
        other => Err(format!(
            "strategy must be 'normalize' or 'std-stretch', got '{other}'"
        )),
    }
}
