use serde_json::Value;

use super::{as_index, as_number, describe, expect_array};

/// Resolutions closer than this are treated as equal.
const RESOLUTION_TOLERANCE: f64 = 1e-10;

/// Non-empty, strictly ascending, non-negative integers.
pub fn parse_zoom_levels(value: &Value) -> Result<Vec<u32>, String> {
    let items = expect_array(value, "an array of zoom levels")?;
    if items.is_empty() {
        return Err("at least one zoom level is required".to_string());
    }

    let mut levels = Vec::with_capacity(items.len());
    for item in items {
        let level = as_index(item)
            .and_then(|z| u32::try_from(z).ok())
            .ok_or_else(|| format!("zoom levels must be non-negative integers, got {item}"))?;
        if let Some(&prev) = levels.last() {
            if level <= prev {
                return Err(format!(
                    "zoom levels must be unique and ascending, got {level} after {prev}"
                ));
            }
        }
        levels.push(level);
    }
    Ok(levels)
}

/// Positive, strictly descending resolutions, one per zoom level.
pub fn parse_resolutions(value: &Value, zoom_count: usize) -> Result<Vec<f64>, String> {
    let items = expect_array(value, "an array of resolutions")?;
    if items.len() != zoom_count {
        return Err(format!(
            "expected {zoom_count} resolutions (one per zoom level), got {}",
            items.len()
        ));
    }

    let mut resolutions: Vec<f64> = Vec::with_capacity(items.len());
    for item in items {
        let res = as_number(item)
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| format!("resolutions must be positive numbers, got {}", describe(item)))?;
        if let Some(&prev) = resolutions.last() {
            if (prev - res).abs() <= RESOLUTION_TOLERANCE {
                return Err(format!("resolutions must be unique, {res} repeats"));
            }
            if res > prev {
                return Err(format!(
                    "resolutions must descend as zoom ascends, got {res} after {prev}"
                ));
            }
        }
        resolutions.push(res);
    }
    Ok(resolutions)
}
