use serde_json::Value;

use super::{as_index, expect_array};

/// One band (grayscale) or three bands (RGB composite). Repeats are allowed.
pub fn parse_bands(value: &Value, band_count: Option<usize>) -> Result<Vec<usize>, String> {
    let items = expect_array(value, "an array of band indices")?;
    let bands = items
        .iter()
        .map(|item| {
            as_index(item)
                .map(|b| b as usize)
                .ok_or_else(|| format!("band indices must be non-negative integers, got {item}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    check_bands(&bands, band_count)?;
    Ok(bands)
}

/// Arity and bounds check for an already-typed band list.
pub fn check_bands(bands: &[usize], band_count: Option<usize>) -> Result<(), String> {
    if bands.len() != 1 && bands.len() != 3 {
        return Err(format!("expected 1 or 3 indices, got {}", bands.len()));
    }
    if let Some(count) = band_count {
        if let Some(&bad) = bands.iter().find(|&&b| b >= count) {
            return Err(format!("band {bad} out of range, dataset has {count} bands"));
        }
    }
    Ok(())
}
