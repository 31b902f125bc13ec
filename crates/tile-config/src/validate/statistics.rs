use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use super::{as_index, describe};
use crate::statistics::StatisticsKeys;

/// `{name: column}` with at least `min` and `max`, unique columns.
pub fn parse_statistics_keys(value: &Value) -> Result<StatisticsKeys, String> {
    let map = value
        .as_object()
        .ok_or_else(|| format!("expected an object of key indices, got {}", describe(value)))?;

    let mut keys = BTreeMap::new();
    let mut columns = HashSet::new();
    for (name, index) in map {
        let column = as_index(index)
            .map(|c| c as usize)
            .ok_or_else(|| format!("index of '{name}' must be a non-negative integer, got {index}"))?;
        if !columns.insert(column) {
            return Err(format!("index {column} is used by more than one key"));
        }
        keys.insert(name.clone(), column);
    }

    for required in ["min", "max"] {
        if !keys.contains_key(required) {
            return Err(format!("missing required key '{required}'"));
        }
    }
    Ok(StatisticsKeys::new(keys))
}
