use std::collections::HashSet;

use serde_json::Value;

use super::{as_index, describe};
use crate::time::parse_iso_date;
use crate::types::TimeKey;

/// A positive count `n` (ids `0..n`), or a uniform array of integer ids,
/// date strings or opaque string ids.
///
/// A string array becomes dates only when every element parses as one.
/// When `time_dim` is known the number of keys must match it.
pub fn parse_timestamps(value: &Value, time_dim: Option<usize>) -> Result<Vec<TimeKey>, String> {
    let keys = match value {
        Value::Number(_) => {
            let n = as_index(value)
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("a timestamp count must be a positive integer, got {value}"))?;
            (0..n as i64).map(TimeKey::Id).collect()
        }
        Value::Array(items) => parse_array(items)?,
        other => {
            return Err(format!(
                "expected a positive integer or an array, got {}",
                describe(other)
            ))
        }
    };

    if let Some(dim) = time_dim {
        if keys.len() != dim {
            return Err(format!(
                "{} timestamps given but the time dimension has {dim} steps",
                keys.len()
            ));
        }
    }
    Ok(keys)
}

fn parse_array(items: &[Value]) -> Result<Vec<TimeKey>, String> {
    if items.is_empty() {
        return Err("timestamp array is empty".to_string());
    }

    let keys: Vec<TimeKey> = if items.iter().all(Value::is_number) {
        items
            .iter()
            .map(|item| {
                item.as_i64()
                    .map(TimeKey::Id)
                    .ok_or_else(|| format!("integer ids expected, got {item}"))
            })
            .collect::<Result<_, _>>()?
    } else if items.iter().all(Value::is_string) {
        let strings: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
        let dates: Option<Vec<_>> = strings.iter().map(|s| parse_iso_date(s)).collect();
        match dates {
            Some(dates) => dates.into_iter().map(TimeKey::Date).collect(),
            None => strings.iter().map(|s| TimeKey::Name(s.to_string())).collect(),
        }
    } else {
        return Err("timestamps must all be integers or all be strings".to_string());
    };

    check_distinct(&keys)?;
    Ok(keys)
}

/// Every key must name a distinct instant.
pub fn check_distinct(keys: &[TimeKey]) -> Result<(), String> {
    let mut seen = HashSet::with_capacity(keys.len());
    match keys.iter().find(|k| !seen.insert(*k)) {
        Some(dup) => Err(format!("timestamp '{dup}' appears more than once")),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_count_form() {
        assert_eq!(
            parse_timestamps(&json!(3), None).unwrap(),
            vec![TimeKey::Id(0), TimeKey::Id(1), TimeKey::Id(2)]
        );
        assert!(parse_timestamps(&json!(0), None).is_err());
        assert!(parse_timestamps(&json!(2.5), None).is_err());
    }

    #[test]
    fn test_uniform_arrays() {
        assert_eq!(
            parse_timestamps(&json!([10, 20]), None).unwrap(),
            vec![TimeKey::Id(10), TimeKey::Id(20)]
        );

        let dates = parse_timestamps(&json!(["2024-01-01", "2024-01-02T00:00:00Z"]), None).unwrap();
        assert!(dates.iter().all(|k| matches!(k, TimeKey::Date(_))));

        let names = parse_timestamps(&json!(["2024-01-01", "run-b"]), None).unwrap();
        assert_eq!(
            names,
            vec![TimeKey::Name("2024-01-01".into()), TimeKey::Name("run-b".into())]
        );
    }

    #[test]
    fn test_rejections() {
        assert!(parse_timestamps(&json!([1, "a"]), None).is_err());
        assert!(parse_timestamps(&json!([1, 1]), None).is_err());
        assert!(parse_timestamps(&json!(["2024-01-01", "2024-01-01T00:00:00Z"]), None).is_err());
        assert!(parse_timestamps(&json!([]), None).is_err());
        assert!(parse_timestamps(&json!([1.5]), None).is_err());
        assert!(parse_timestamps(&json!({"a": 1}), None).is_err());
    }

    #[test]
    fn test_count_must_match_time_dimension() {
        assert!(parse_timestamps(&json!(4), Some(4)).is_ok());
        assert!(parse_timestamps(&json!([0, 1]), Some(3)).is_err());
    }
}
