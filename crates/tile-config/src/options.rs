//! User-supplied tile source options.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything a caller may set when creating a tile source.
///
/// Only `url` is required. Properties that accept several shapes are kept as
/// raw JSON so the same validators serve user input and dataset attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TileSourceOptions {
    /// Store URL (`s3://bucket/prefix`, `https://...`, a local path).
    pub url: String,
    /// Dataset group path inside the store.
    pub path: String,
    /// Name of the value array inside each zoom group. Default `data`.
    pub variable: Option<String>,
    /// Name of the time coordinate array. Default `time`.
    pub time_variable: Option<String>,
    /// Name of the statistics array. Default `statistics`.
    pub statistics_variable: Option<String>,

    pub extent: Option<Value>,
    pub crs: Option<Value>,
    pub zoom_levels: Option<Value>,
    pub resolutions: Option<Value>,
    pub tile_size: Option<Value>,
    pub bands: Option<Value>,
    pub timestamps: Option<Value>,
    pub nodata: Option<Value>,
    pub statistics: Option<Value>,
    pub statistics_keys: Option<Value>,
    pub normalize: Option<Value>,
    pub render_type: Option<Value>,
    pub nodata_strategy: Option<Value>,
    pub nodata_replace_value: Option<Value>,
    pub mask_nodata: Option<Value>,
    pub display_render_config: Option<Value>,
}

impl TileSourceOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    pub fn with_extent(mut self, extent: [f64; 4]) -> Self {
        self.extent = Some(Value::from(extent.to_vec()));
        self
    }

    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(Value::from(crs.into()));
        self
    }

    pub fn with_zoom_levels(mut self, zoom_levels: Vec<u32>) -> Self {
        self.zoom_levels = Some(Value::from(zoom_levels));
        self
    }

    pub fn with_resolutions(mut self, resolutions: Vec<f64>) -> Self {
        self.resolutions = Some(Value::from(resolutions));
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = Some(Value::from(tile_size));
        self
    }

    pub fn with_bands(mut self, bands: Vec<usize>) -> Self {
        self.bands = Some(Value::from(bands));
        self
    }

    pub fn with_timestamps(mut self, timestamps: Value) -> Self {
        self.timestamps = Some(timestamps);
        self
    }

    pub fn with_nodata(mut self, nodata: Value) -> Self {
        self.nodata = Some(nodata);
        self
    }

    pub fn with_statistics(mut self, statistics: Value) -> Self {
        self.statistics = Some(statistics);
        self
    }

    pub fn with_statistics_keys(mut self, keys: Value) -> Self {
        self.statistics_keys = Some(keys);
        self
    }

    pub fn with_normalize(mut self, normalize: Value) -> Self {
        self.normalize = Some(normalize);
        self
    }

    pub fn with_render_type(mut self, render_type: &str) -> Self {
        self.render_type = Some(Value::from(render_type));
        self
    }

    pub fn with_nodata_strategy(mut self, strategy: &str) -> Self {
        self.nodata_strategy = Some(Value::from(strategy));
        self
    }

    pub fn with_nodata_replace_value(mut self, value: f64) -> Self {
        self.nodata_replace_value = Some(Value::from(value));
        self
    }

    pub fn with_mask_nodata(mut self, mask: bool) -> Self {
        self.mask_nodata = Some(Value::from(mask));
        self
    }

    pub fn with_display_render_config(mut self, config: Value) -> Self {
        self.display_render_config = Some(config);
        self
    }

    pub fn variable_name(&self) -> &str {
        self.variable.as_deref().unwrap_or("data")
    }

    pub fn time_variable_name(&self) -> &str {
        self.time_variable.as_deref().unwrap_or("time")
    }

    pub fn statistics_variable_name(&self) -> &str {
        self.statistics_variable.as_deref().unwrap_or("statistics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_camel_case() {
        let options: TileSourceOptions = serde_json::from_value(json!({
            "url": "s3://bucket/cube.zarr",
            "path": "sentinel",
            "zoomLevels": [0, 1],
            "maskNodata": false,
            "displayRenderConfig": {"strategy": "normalize"}
        }))
        .unwrap();

        assert_eq!(options.url, "s3://bucket/cube.zarr");
        assert_eq!(options.zoom_levels, Some(json!([0, 1])));
        assert_eq!(options.mask_nodata, Some(json!(false)));
        assert_eq!(options.variable_name(), "data");
        assert!(options.extent.is_none());
    }

    #[test]
    fn test_builder() {
        let options = TileSourceOptions::new("/tmp/cube.zarr")
            .with_bands(vec![2, 1, 0])
            .with_extent([0.0, 0.0, 16.0, 16.0])
            .with_render_type("display");
        assert_eq!(options.bands, Some(json!([2, 1, 0])));
        assert_eq!(options.extent, Some(json!([0.0, 0.0, 16.0, 16.0])));
        assert_eq!(options.render_type, Some(json!("display")));
    }
}
