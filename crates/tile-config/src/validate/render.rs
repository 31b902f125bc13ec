use serde_json::Value;

use super::{as_index, as_number, describe};
use crate::types::{NodataStrategy, RenderType};

fn name<'a>(value: &'a Value) -> Result<&'a str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected a string, got {}", describe(value)))
}

pub fn parse_render_type(value: &Value) -> Result<RenderType, String> {
    name(value)?.parse()
}

pub fn parse_nodata_strategy(value: &Value) -> Result<NodataStrategy, String> {
    name(value)?.parse()
}

pub fn parse_replace_value(value: &Value) -> Result<f64, String> {
    as_number(value).ok_or_else(|| format!("expected a number, got {}", describe(value)))
}

pub fn parse_mask_nodata(value: &Value) -> Result<bool, String> {
    value
        .as_bool()
        .ok_or_else(|| format!("expected a boolean, got {}", describe(value)))
}

pub fn parse_tile_size(value: &Value) -> Result<u32, String> {
    as_index(value)
        .filter(|s| *s > 0)
        .and_then(|s| u32::try_from(s).ok())
        .ok_or_else(|| format!("expected a positive integer, got {value}"))
}
