//! Values derived from the configuration for the current time and bands.

use tile_config::{DisplayStretch, MinMax, ResolvedConfig, StatRecord};

/// Per-slot values memoized on (time index, bands).
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedValues {
    pub time_index: usize,
    pub bands: Vec<usize>,
    /// No-data per slot.
    pub nodata: Option<Vec<f64>>,
    /// Statistics record per slot.
    pub statistics: Vec<Option<StatRecord>>,
    /// Normalization range per slot.
    pub normalization: Option<Vec<MinMax>>,
    /// Display stretch per slot.
    pub display: Option<Vec<DisplayStretch>>,
}

impl DerivedValues {
    pub fn compute(config: &ResolvedConfig, time_index: usize, bands: &[usize]) -> Self {
        let slots = || bands.iter().copied().enumerate();

        let normalization = config
            .normalize
            .as_ref()
            .and_then(|_| {
                slots()
                    .map(|(slot, band)| config.normalization_range(slot, band, time_index))
                    .collect::<Option<Vec<_>>>()
            });

        let display = slots()
            .map(|(slot, band)| config.display_stretch(slot, band, time_index))
            .collect::<Option<Vec<_>>>();

        Self {
            time_index,
            bands: bands.to_vec(),
            nodata: config.nodata.for_bands(bands),
            statistics: slots()
                .map(|(slot, band)| config.statistics.record(slot, band, time_index))
                .collect(),
            normalization,
            display,
        }
    }

    /// Whether these values were computed for `time_index` and `bands`.
    pub fn matches(&self, time_index: usize, bands: &[usize]) -> bool {
        self.time_index == time_index && self.bands == bands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use array_store::{ArrayMeta, DataType};
    use serde_json::json;
    use tile_config::{ConfigResolver, DatasetMetadata, Nodata, TileSourceOptions};

    fn config(options: TileSourceOptions) -> ResolvedConfig {
        let metadata = DatasetMetadata {
            url: options.url.clone(),
            path: String::new(),
            variable: "data".to_string(),
            attributes: Default::default(),
            highest_zoom: 0,
            value_array: ArrayMeta::new(vec![2, 3, 8, 8], DataType::UInt16),
            time_keys: None,
            statistics: None,
        };
        ConfigResolver::new(&options, &metadata).resolve().unwrap()
    }

    #[test]
    fn test_per_time_statistics_follow_time_index() {
        let options = TileSourceOptions::new("memory://a")
            .with_bands(vec![2, 0, 1])
            .with_nodata(json!([1, 2, 3]))
            .with_statistics(json!([
                {"min": [0, 10], "max": [100, 110]},
                {"min": [1, 11], "max": [101, 111]},
                {"min": [2, 12], "max": [102, 112]}
            ]))
            .with_normalize(json!(true));
        let config = config(options);
        assert_eq!(config.nodata, Nodata::PerComposition(vec![1.0, 2.0, 3.0]));

        let derived = DerivedValues::compute(&config, 1, &config.bands);
        assert_eq!(derived.nodata, Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(
            derived.normalization,
            Some(vec![
                MinMax::new(10.0, 110.0),
                MinMax::new(11.0, 111.0),
                MinMax::new(12.0, 112.0)
            ])
        );
        assert_eq!(derived.statistics[2].as_ref().unwrap()["max"], 112.0);
        assert_eq!(derived.display, None);
        assert!(derived.matches(1, &[2, 0, 1]));
        assert!(!derived.matches(0, &[2, 0, 1]));
    }

    #[test]
    fn test_without_normalization() {
        let config = config(TileSourceOptions::new("memory://a").with_bands(vec![1]));
        let derived = DerivedValues::compute(&config, 0, &[1]);
        assert_eq!(derived.normalization, None);
        assert_eq!(derived.nodata, None);
        assert_eq!(derived.bands, vec![1]);
    }
}
