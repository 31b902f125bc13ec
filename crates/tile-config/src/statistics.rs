//! Per-band statistics and their five accepted shapes.

use std::collections::{BTreeMap, BTreeSet};

use array_store::{ArrayData, DataType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Statistics keyed by name (`min`, `max`, `mean`, ...).
pub type StatRecord = BTreeMap<String, f64>;

/// Statistics keyed by name, one value per timestep.
pub type StatSeries = BTreeMap<String, Vec<f64>>;

/// Statistics in one of the five supported shapes.
///
/// The shape is decided once during resolution and never re-inferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "case", content = "values", rename_all = "snake_case")]
pub enum Statistics {
    /// One record for every band and time.
    Global(StatRecord),
    /// One record per composition slot.
    PerComposition(Vec<StatRecord>),
    /// One record per dataset band.
    PerDatasetBand(Vec<StatRecord>),
    /// One series per composition slot, indexed by time.
    PerCompositionPerTime(Vec<StatSeries>),
    /// One series per dataset band, indexed by time.
    PerDatasetBandPerTime(Vec<StatSeries>),
}

impl Statistics {
    /// Detect the shape of a statistics document.
    ///
    /// Array-valued keys select the per-time shapes. A length equal to the
    /// composition size selects the per-composition shapes, even when it also
    /// equals the dataset band count.
    pub fn detect(
        value: &Value,
        composition: usize,
        band_count: Option<usize>,
        timestamp_count: usize,
    ) -> Result<Self, String> {
        match value {
            Value::Object(map) => {
                let record = parse_record(map, 0)?;
                Ok(Self::Global(record))
            }
            Value::Array(items) => {
                if items.is_empty() {
                    return Err("statistics array is empty".to_string());
                }
                let per_composition = if items.len() == composition {
                    true
                } else if band_count == Some(items.len()) {
                    false
                } else {
                    return Err(format!(
                        "expected {composition} entries (composition){}, got {}",
                        band_count
                            .map(|n| format!(" or {n} entries (dataset bands)"))
                            .unwrap_or_default(),
                        items.len()
                    ));
                };

                let first = items[0]
                    .as_object()
                    .ok_or_else(|| "statistics entries must be objects".to_string())?;
                let time_varying = first.values().any(Value::is_array);

                if time_varying {
                    let series = items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| {
                            let map = item
                                .as_object()
                                .ok_or_else(|| format!("entry {i} is not an object"))?;
                            parse_series(map, i, timestamp_count)
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(if per_composition {
                        Self::PerCompositionPerTime(series)
                    } else {
                        Self::PerDatasetBandPerTime(series)
                    })
                } else {
                    let records = items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| {
                            let map = item
                                .as_object()
                                .ok_or_else(|| format!("entry {i} is not an object"))?;
                            parse_record(map, i)
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(if per_composition {
                        Self::PerComposition(records)
                    } else {
                        Self::PerDatasetBand(records)
                    })
                }
            }
            other => Err(format!(
                "expected an object or an array of objects, got {}",
                crate::validate::describe(other)
            )),
        }
    }

    /// Build per-dataset-band statistics from a statistics array of shape
    /// `[band, key]` or `[time, band, key]`.
    ///
    /// Returns `None` when the array has another shape or the key mapping
    /// does not fit it.
    pub fn from_array(data: &ArrayData, keys: &StatisticsKeys) -> Option<Self> {
        let columns = *data.shape.last()?;
        let usable: Vec<(&str, usize)> = keys
            .iter()
            .filter(|(_, index)| *index < columns)
            .collect();
        if !usable.iter().any(|(k, _)| *k == "min") || !usable.iter().any(|(k, _)| *k == "max") {
            return None;
        }

        match data.shape.as_slice() {
            [bands, _] => {
                let records = (0..*bands)
                    .map(|b| {
                        usable
                            .iter()
                            .filter_map(|(key, k)| {
                                data.get(&[b, *k]).map(|v| (key.to_string(), v))
                            })
                            .collect::<StatRecord>()
                    })
                    .collect();
                Some(Self::PerDatasetBand(records))
            }
            [times, bands, _] => {
                let series = (0..*bands)
                    .map(|b| {
                        usable
                            .iter()
                            .map(|(key, k)| {
                                let values = (0..*times)
                                    .map(|t| data.get(&[t, b, *k]).unwrap_or(f64::NAN))
                                    .collect();
                                (key.to_string(), values)
                            })
                            .collect::<StatSeries>()
                    })
                    .collect();
                Some(Self::PerDatasetBandPerTime(series))
            }
            _ => None,
        }
    }

    /// The full numeric range of a data type, as global statistics.
    pub fn from_dtype(dtype: DataType) -> Self {
        let (min, max) = dtype.numeric_range();
        Self::Global(StatRecord::from([
            ("min".to_string(), min),
            ("max".to_string(), max),
        ]))
    }

    /// Shape number, 1 to 5.
    pub fn case(&self) -> u8 {
        match self {
            Self::Global(_) => 1,
            Self::PerComposition(_) => 2,
            Self::PerDatasetBand(_) => 3,
            Self::PerCompositionPerTime(_) => 4,
            Self::PerDatasetBandPerTime(_) => 5,
        }
    }

    /// Number of rows (records or series) held.
    pub fn num_rows(&self) -> usize {
        match self {
            Self::Global(_) => 1,
            Self::PerComposition(r) | Self::PerDatasetBand(r) => r.len(),
            Self::PerCompositionPerTime(s) | Self::PerDatasetBandPerTime(s) => s.len(),
        }
    }

    /// The row holding statistics for a composition slot showing `band`.
    pub fn row(&self, slot: usize, band: usize) -> usize {
        match self {
            Self::Global(_) => 0,
            Self::PerComposition(_) | Self::PerCompositionPerTime(_) => slot,
            Self::PerDatasetBand(_) | Self::PerDatasetBandPerTime(_) => band,
        }
    }

    /// Value of `key` in a row at a time index. Time is ignored by the
    /// time-independent shapes.
    pub fn value_at(&self, row: usize, key: &str, time: usize) -> Option<f64> {
        match self {
            Self::Global(record) => record.get(key).copied(),
            Self::PerComposition(r) | Self::PerDatasetBand(r) => {
                r.get(row).and_then(|record| record.get(key)).copied()
            }
            Self::PerCompositionPerTime(s) | Self::PerDatasetBandPerTime(s) => s
                .get(row)
                .and_then(|series| series.get(key))
                .and_then(|values| values.get(time))
                .copied(),
        }
        .filter(|v| !v.is_nan())
    }

    /// Every value of `key` in a row, across all times.
    pub fn row_values(&self, row: usize, key: &str) -> Vec<f64> {
        match self {
            Self::PerCompositionPerTime(s) | Self::PerDatasetBandPerTime(s) => s
                .get(row)
                .and_then(|series| series.get(key))
                .map(|values| values.iter().copied().filter(|v| !v.is_nan()).collect())
                .unwrap_or_default(),
            _ => self.value_at(row, key, 0).into_iter().collect(),
        }
    }

    /// Value of `key` for a composition slot showing `band` at `time`.
    pub fn value(&self, key: &str, slot: usize, band: usize, time: usize) -> Option<f64> {
        self.value_at(self.row(slot, band), key, time)
    }

    /// The full record for a composition slot at a time index.
    pub fn record(&self, slot: usize, band: usize, time: usize) -> Option<StatRecord> {
        let row = self.row(slot, band);
        match self {
            Self::Global(record) => Some(record.clone()),
            Self::PerComposition(r) | Self::PerDatasetBand(r) => r.get(row).cloned(),
            Self::PerCompositionPerTime(s) | Self::PerDatasetBandPerTime(s) => {
                s.get(row).map(|series| {
                    series
                        .iter()
                        .filter_map(|(k, values)| values.get(time).map(|v| (k.clone(), *v)))
                        .collect()
                })
            }
        }
    }

    /// Every key present in any row.
    pub fn keys(&self) -> BTreeSet<String> {
        match self {
            Self::Global(record) => record.keys().cloned().collect(),
            Self::PerComposition(r) | Self::PerDatasetBand(r) => {
                r.iter().flat_map(|record| record.keys().cloned()).collect()
            }
            Self::PerCompositionPerTime(s) | Self::PerDatasetBandPerTime(s) => {
                s.iter().flat_map(|series| series.keys().cloned()).collect()
            }
        }
    }
}

fn require_min_max<V>(map: &BTreeMap<String, V>, entry: usize) -> Result<(), String> {
    for key in ["min", "max"] {
        if !map.contains_key(key) {
            return Err(format!("entry {entry} is missing required key '{key}'"));
        }
    }
    Ok(())
}

fn stat_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.eq_ignore_ascii_case("nan") => Some(f64::NAN),
        Value::Null => Some(f64::NAN),
        _ => None,
    }
}

fn parse_record(map: &serde_json::Map<String, Value>, entry: usize) -> Result<StatRecord, String> {
    let record = map
        .iter()
        .map(|(key, value)| {
            stat_number(value)
                .map(|v| (key.clone(), v))
                .ok_or_else(|| format!("entry {entry}: '{key}' must be a number"))
        })
        .collect::<Result<StatRecord, _>>()?;
    require_min_max(&record, entry)?;
    Ok(record)
}

fn parse_series(
    map: &serde_json::Map<String, Value>,
    entry: usize,
    timestamp_count: usize,
) -> Result<StatSeries, String> {
    let series = map
        .iter()
        .map(|(key, value)| {
            let items = value
                .as_array()
                .ok_or_else(|| format!("entry {entry}: '{key}' must be an array"))?;
            if items.len() != timestamp_count {
                return Err(format!(
                    "entry {entry}: '{key}' has {} values but there are {timestamp_count} timestamps",
                    items.len()
                ));
            }
            let values = items
                .iter()
                .map(|v| {
                    stat_number(v).ok_or_else(|| format!("entry {entry}: '{key}' must hold numbers"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok((key.clone(), values))
        })
        .collect::<Result<StatSeries, _>>()?;
    require_min_max(&series, entry)?;
    Ok(series)
}

/// Mapping from statistic name to its column in the statistics array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsKeys(BTreeMap<String, usize>);

impl Default for StatisticsKeys {
    fn default() -> Self {
        Self(BTreeMap::from([
            ("min".to_string(), 0),
            ("max".to_string(), 1),
            ("mean".to_string(), 2),
            ("std".to_string(), 3),
        ]))
    }
}

impl StatisticsKeys {
    pub fn new(keys: BTreeMap<String, usize>) -> Self {
        Self(keys)
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.0.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_single_object() {
        let stats = Statistics::detect(&json!({"min": 0, "max": 10, "p98": 9.5}), 3, Some(4), 2).unwrap();
        assert_eq!(stats.case(), 1);
        assert_eq!(stats.value("p98", 2, 3, 1), Some(9.5));
    }

    #[test]
    fn test_detect_per_composition_scalars() {
        let doc = json!([{"min": 0, "max": 1}, {"min": 2, "max": 3}, {"min": 4, "max": 5}]);
        let stats = Statistics::detect(&doc, 3, Some(5), 2).unwrap();
        assert_eq!(stats.case(), 2);
        assert_eq!(stats.value("max", 1, 4, 0), Some(3.0));
    }

    #[test]
    fn test_detect_per_dataset_scalars() {
        let doc = json!([{"min": 0, "max": 1}, {"min": 2, "max": 3}, {"min": 4, "max": 5}, {"min": 6, "max": 7}]);
        let stats = Statistics::detect(&doc, 3, Some(4), 2).unwrap();
        assert_eq!(stats.case(), 3);
        assert_eq!(stats.value("min", 0, 3, 0), Some(6.0));
    }

    #[test]
    fn test_detect_per_composition_per_time() {
        let doc = json!([{"min": [0, 1], "max": [10, 11]}]);
        let stats = Statistics::detect(&doc, 1, Some(3), 2).unwrap();
        assert_eq!(stats.case(), 4);
        assert_eq!(stats.value("max", 0, 2, 1), Some(11.0));
        assert_eq!(stats.row_values(0, "min"), vec![0.0, 1.0]);
    }

    #[test]
    fn test_detect_per_dataset_per_time() {
        let doc = json!([{"min": [0], "max": [1]}, {"min": [2], "max": [3]}]);
        let stats = Statistics::detect(&doc, 1, Some(2), 1).unwrap();
        assert_eq!(stats.case(), 5);
    }

    #[test]
    fn test_composition_wins_when_lengths_agree() {
        let doc = json!([{"min": 0, "max": 1}, {"min": 2, "max": 3}, {"min": 4, "max": 5}]);
        let stats = Statistics::detect(&doc, 3, Some(3), 1).unwrap();
        assert_eq!(stats.case(), 2);
    }

    #[test]
    fn test_detect_rejects_bad_documents() {
        assert!(Statistics::detect(&json!({"min": 0}), 1, None, 1).is_err());
        assert!(Statistics::detect(&json!([{"min": 0, "max": 1}, {"min": 0, "max": 1}]), 3, Some(4), 1).is_err());
        assert!(Statistics::detect(&json!([{"min": [0, 1], "max": [1, 2]}]), 1, None, 3).is_err());
        assert!(Statistics::detect(&json!(5), 1, None, 1).is_err());
        assert!(Statistics::detect(&json!([]), 1, None, 1).is_err());
    }

    #[test]
    fn test_from_array_band_key() {
        // 2 bands x 4 keys
        let data = ArrayData::new(vec![2, 4], vec![0.0, 10.0, 5.0, 1.0, 100.0, 200.0, 150.0, 20.0]);
        let stats = Statistics::from_array(&data, &StatisticsKeys::default()).unwrap();
        assert_eq!(stats.case(), 3);
        assert_eq!(stats.value("mean", 0, 1, 0), Some(150.0));
        assert_eq!(stats.keys().len(), 4);
    }

    #[test]
    fn test_from_array_time_band_key() {
        // 2 times x 1 band x 2 keys
        let data = ArrayData::new(vec![2, 1, 2], vec![0.0, 1.0, 5.0, 9.0]);
        let stats = Statistics::from_array(&data, &StatisticsKeys::default()).unwrap();
        assert_eq!(stats.case(), 5);
        assert_eq!(stats.value("max", 0, 0, 1), Some(9.0));
        assert!(!stats.keys().contains("mean"));
    }

    #[test]
    fn test_from_array_requires_min_max_columns() {
        let data = ArrayData::new(vec![2, 1], vec![0.0, 1.0]);
        assert!(Statistics::from_array(&data, &StatisticsKeys::default()).is_none());
    }

    #[test]
    fn test_from_dtype() {
        let stats = Statistics::from_dtype(DataType::UInt8);
        assert_eq!(stats.case(), 1);
        assert_eq!(stats.value("max", 0, 0, 0), Some(255.0));
    }
}
