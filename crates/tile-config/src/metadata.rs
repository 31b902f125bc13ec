//! Dataset metadata extraction.
//!
//! Everything here is best-effort except the value array at the highest zoom,
//! whose shape and data type every later stage depends on.

use array_store::{join_path, ArrayData, ArrayMeta, ArrayStore, DataType, Selection};
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};
use crate::options::TileSourceOptions;
use crate::time::decode_time_coordinate;
use crate::types::{TimeKey, ValueSource};
use crate::validate;

/// What the dataset says about itself before any precedence is applied.
#[derive(Debug, Clone)]
pub struct DatasetMetadata {
    pub url: String,
    pub path: String,
    pub variable: String,
    /// Root attribute document, empty when unavailable.
    pub attributes: Map<String, Value>,
    /// Zoom level whose value array was inspected.
    pub highest_zoom: u32,
    /// Metadata of the value array `[time, band, row, column]`.
    pub value_array: ArrayMeta,
    /// Decoded time coordinate, when present and consistent with the value array.
    pub time_keys: Option<Vec<TimeKey>>,
    /// Raw statistics array, `[band, key]` or `[time, band, key]`.
    pub statistics: Option<ArrayData>,
}

impl DatasetMetadata {
    /// Read attributes, the value array metadata and the optional time and
    /// statistics arrays.
    pub async fn extract(store: &dyn ArrayStore, options: &TileSourceOptions) -> Result<Self> {
        let path = join_path(&[options.path.as_str()]);
        let attributes = match store.attributes(&path).await {
            Ok(attrs) => attrs,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Dataset attributes unavailable");
                Map::new()
            }
        };

        let highest_zoom = discover_highest_zoom(options, &attributes);
        let zoom_path = join_path(&[path.as_str(), highest_zoom.to_string().as_str()]);
        let variable = options.variable_name().to_string();
        let value_path = join_path(&[zoom_path.as_str(), variable.as_str()]);

        let value_array = store.open_array(&value_path).await?.meta().clone();
        if value_array.ndim() != 4 {
            return Err(ConfigError::invalid(
                "variable",
                format!(
                    "'{value_path}' must have 4 dimensions [time, band, row, column], has shape {:?}",
                    value_array.shape
                ),
                ValueSource::Dataset,
            ));
        }

        let time_locations = [
            join_path(&[path.as_str(), options.time_variable_name()]),
            join_path(&[zoom_path.as_str(), options.time_variable_name()]),
        ];
        let stats_locations = [
            join_path(&[path.as_str(), options.statistics_variable_name()]),
            join_path(&[zoom_path.as_str(), options.statistics_variable_name()]),
        ];

        let (time, statistics) = futures::join!(
            read_first_available(store, &time_locations),
            read_first_available(store, &stats_locations),
        );

        let time_dim = value_array.shape[0] as usize;
        let time_keys = time.and_then(|(meta, data)| {
            let keys = decode_time_coordinate(&data.values, &meta.attributes);
            match keys {
                Some(keys) if keys.len() == time_dim => match validate::check_distinct(&keys) {
                    Ok(()) => Some(keys),
                    Err(e) => {
                        tracing::warn!(error = %e, "Time coordinate is not usable, ignoring it");
                        None
                    }
                },
                Some(keys) => {
                    tracing::warn!(
                        found = keys.len(),
                        expected = time_dim,
                        "Time coordinate length does not match the value array, ignoring it"
                    );
                    None
                }
                None => {
                    tracing::warn!("Time coordinate could not be decoded, ignoring it");
                    None
                }
            }
        });

        tracing::debug!(
            path = %path,
            zoom = highest_zoom,
            shape = ?value_array.shape,
            dtype = %value_array.dtype,
            has_time = time_keys.is_some(),
            has_statistics = statistics.is_some(),
            "Extracted dataset metadata"
        );

        Ok(Self {
            url: options.url.clone(),
            path,
            variable,
            attributes,
            highest_zoom,
            value_array,
            time_keys,
            statistics: statistics.map(|(_, data)| data),
        })
    }

    pub fn dtype(&self) -> DataType {
        self.value_array.dtype
    }

    pub fn time_dim(&self) -> usize {
        self.value_array.shape[0] as usize
    }

    pub fn band_count(&self) -> usize {
        self.value_array.shape[1] as usize
    }

    pub fn height(&self) -> usize {
        self.value_array.shape[2] as usize
    }

    pub fn width(&self) -> usize {
        self.value_array.shape[3] as usize
    }
}

/// Highest zoom from user input, then the attribute document, else 0.
fn discover_highest_zoom(options: &TileSourceOptions, attributes: &Map<String, Value>) -> u32 {
    let from = |value: Option<&Value>| -> Option<u32> {
        value?
            .as_array()?
            .iter()
            .filter_map(|z| z.as_u64())
            .filter_map(|z| u32::try_from(z).ok())
            .max()
    };
    from(options.zoom_levels.as_ref())
        .or_else(|| from(attributes.get("zoomLevels")))
        .unwrap_or(0)
}

/// Read the whole of the first array that opens and reads successfully.
async fn read_first_available(store: &dyn ArrayStore, locations: &[String]) -> Option<(ArrayMeta, ArrayData)> {
    for location in locations {
        let array = match store.open_array(location).await {
            Ok(array) => array,
            Err(e) => {
                tracing::debug!(path = %location, error = %e, "Optional array not found");
                continue;
            }
        };
        let selection: Vec<Selection> = array
            .meta()
            .shape
            .iter()
            .map(|&dim| Selection::Range(0..dim))
            .collect();
        match array.get(&selection).await {
            Ok(data) => return Some((array.meta().clone(), data)),
            Err(e) => {
                tracing::warn!(path = %location, error = %e, "Optional array unreadable");
            }
        }
    }
    None
}
