use serde_json::Value;

use super::{as_number, describe};
use crate::types::Extent;

/// Accepts `{xmin, ymin, xmax, ymax}` or `[xmin, ymin, xmax, ymax]`.
pub fn parse_extent(value: &Value) -> Result<Extent, String> {
    let bounds = match value {
        Value::Array(items) => {
            if items.len() != 4 {
                return Err(format!("expected 4 bounds, got {}", items.len()));
            }
            let mut bounds = [0.0; 4];
            for (i, item) in items.iter().enumerate() {
                bounds[i] = as_number(item)
                    .ok_or_else(|| format!("bound {i} must be a number, got {}", describe(item)))?;
            }
            bounds
        }
        Value::Object(map) => {
            let mut bounds = [0.0; 4];
            for (i, name) in ["xmin", "ymin", "xmax", "ymax"].iter().enumerate() {
                let item = map
                    .get(*name)
                    .ok_or_else(|| format!("missing bound '{name}'"))?;
                bounds[i] = as_number(item)
                    .ok_or_else(|| format!("'{name}' must be a number, got {}", describe(item)))?;
            }
            bounds
        }
        other => {
            return Err(format!(
                "expected an object with xmin/ymin/xmax/ymax or a 4-element array, got {}",
                describe(other)
            ))
        }
    };

    let [xmin, ymin, xmax, ymax] = bounds;
    if bounds.iter().any(|b| !b.is_finite()) {
        return Err("bounds must be finite".to_string());
    }
    if xmin >= xmax {
        return Err(format!("xmin ({xmin}) must be less than xmax ({xmax})"));
    }
    if ymin >= ymax {
        return Err(format!("ymin ({ymin}) must be less than ymax ({ymax})"));
    }
    Ok(Extent::new(xmin, ymin, xmax, ymax))
}
