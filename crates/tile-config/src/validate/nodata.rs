use serde_json::Value;

use super::describe;
use crate::types::Nodata;

fn nodata_scalar(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().eq_ignore_ascii_case("nan") => Some(f64::NAN),
        _ => None,
    }
}

/// A scalar (number or `"nan"`) or an array sized to either the band
/// composition or the dataset's band count. Composition wins a tie.
pub fn parse_nodata(value: &Value, composition: usize, band_count: Option<usize>) -> Result<Nodata, String> {
    match value {
        Value::Array(items) => {
            let values = items
                .iter()
                .map(|item| {
                    nodata_scalar(item)
                        .ok_or_else(|| format!("no-data values must be numbers or \"nan\", got {item}"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            if values.len() == composition {
                Ok(Nodata::PerComposition(values))
            } else if band_count == Some(values.len()) {
                Ok(Nodata::PerDataset(values))
            } else {
                Err(format!(
                    "array of {} values matches neither the composition ({composition}){}",
                    values.len(),
                    band_count
                        .map(|n| format!(" nor the dataset band count ({n})"))
                        .unwrap_or_default()
                ))
            }
        }
        other => nodata_scalar(other).map(Nodata::Scalar).ok_or_else(|| {
            format!(
                "expected a number, \"nan\" or an array, got {}",
                describe(other)
            )
        }),
    }
}
