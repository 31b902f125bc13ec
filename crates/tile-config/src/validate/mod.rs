//! Validators for every configuration property.
//!
//! Validators are pure. They take the raw JSON value (from user input or the
//! dataset attribute document) and return the typed value or a constraint
//! message. The caller attaches the field name and value source.

pub mod bands;
pub mod extent;
pub mod nodata;
pub mod normalize;
pub mod render;
pub mod statistics;
pub mod timestamps;
pub mod zoom;

pub use bands::{check_bands, parse_bands};
pub use extent::parse_extent;
pub use nodata::parse_nodata;
pub use normalize::{parse_display_render_config, parse_normalize};
pub use render::{parse_mask_nodata, parse_nodata_strategy, parse_render_type, parse_replace_value, parse_tile_size};
pub use statistics::parse_statistics_keys;
pub use timestamps::{check_distinct, parse_timestamps};
pub use zoom::{parse_resolutions, parse_zoom_levels};

use serde_json::Value;

/// Short description of a JSON value's type for error messages.
pub fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A JSON number as `f64`.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// A non-negative integer. Floats with no fractional part are accepted.
pub(crate) fn as_index(value: &Value) -> Option<u64> {
    if let Some(i) = value.as_u64() {
        return Some(i);
    }
    value
        .as_f64()
        .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u32::MAX as f64)
        .map(|f| f as u64)
}

pub(crate) fn expect_array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>, String> {
    value
        .as_array()
        .ok_or_else(|| format!("expected {what}, got {}", describe(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_index() {
        assert_eq!(as_index(&json!(3)), Some(3));
        assert_eq!(as_index(&json!(3.0)), Some(3));
        assert_eq!(as_index(&json!(3.5)), None);
        assert_eq!(as_index(&json!(-1)), None);
        assert_eq!(as_index(&json!("3")), None);
    }
}
