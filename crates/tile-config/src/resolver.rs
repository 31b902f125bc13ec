//! Configuration resolution.
//!
//! Every property is declared once as a [`Field`] and evaluated with the same
//! precedence: user value, then dataset metadata, then a derived default.

use std::collections::BTreeMap;

use array_store::{join_path, DataType, StoreConnector};

use crate::aggregates::NormalizationAggregates;
use crate::error::Result;
use crate::grid::TileGrid;
use crate::metadata::DatasetMetadata;
use crate::options::TileSourceOptions;
use crate::precedence::{Field, ResolveContext, Resolved};
use crate::statistics::{Statistics, StatisticsKeys};
use crate::types::{
    DisplayRenderConfig, DisplayStretch, Extent, MinMax, Nodata, NodataStrategy, NormalizeSpec,
    NormalizeStrategy, RenderType, TimeKey, ValueSource,
};
use crate::validate;

const DEFAULT_TILE_SIZE: u32 = 256;
const DEFAULT_CRS: &str = "EPSG:3857";

const EXTENT: Field<Extent> = Field {
    name: "extent",
    attribute: Some("extent"),
    validate: |v, _| validate::parse_extent(v),
};

const CRS: Field<String> = Field {
    name: "crs",
    attribute: Some("crs"),
    validate: |v, _| match v.as_str().map(str::trim) {
        Some(crs) if !crs.is_empty() => Ok(crs.to_string()),
        _ => Err(format!("expected a non-empty string, got {}", validate::describe(v))),
    },
};

const ZOOM_LEVELS: Field<Vec<u32>> = Field {
    name: "zoomLevels",
    attribute: Some("zoomLevels"),
    validate: |v, _| validate::parse_zoom_levels(v),
};

const RESOLUTIONS: Field<Vec<f64>> = Field {
    name: "resolutions",
    attribute: Some("resolutions"),
    validate: |v, ctx| validate::parse_resolutions(v, ctx.zoom_count),
};

const TILE_SIZE: Field<u32> = Field {
    name: "tileSize",
    attribute: Some("tileSize"),
    validate: |v, _| validate::parse_tile_size(v),
};

const BANDS: Field<Vec<usize>> = Field {
    name: "bands",
    attribute: Some("bands"),
    validate: |v, ctx| validate::parse_bands(v, Some(ctx.band_count)),
};

const TIMESTAMPS: Field<Vec<TimeKey>> = Field {
    name: "timestamps",
    attribute: Some("timestamps"),
    validate: |v, ctx| validate::parse_timestamps(v, Some(ctx.time_dim)),
};

const NODATA: Field<Nodata> = Field {
    name: "nodata",
    attribute: Some("nodata"),
    validate: |v, ctx| validate::parse_nodata(v, ctx.composition, Some(ctx.band_count)),
};

const STATISTICS_KEYS: Field<StatisticsKeys> = Field {
    name: "statisticsKeys",
    attribute: Some("statisticsKeys"),
    validate: |v, _| validate::parse_statistics_keys(v),
};

const STATISTICS: Field<Statistics> = Field {
    name: "statistics",
    attribute: Some("statistics"),
    validate: |v, ctx| {
        Statistics::detect(v, ctx.composition, Some(ctx.band_count), ctx.timestamp_count)
    },
};

const NORMALIZE: Field<Option<NormalizeSpec>> = Field {
    name: "normalize",
    attribute: Some("normalize"),
    validate: |v, ctx| validate::parse_normalize(v, &ctx.statistics_keys),
};

const RENDER_TYPE: Field<RenderType> = Field {
    name: "renderType",
    attribute: Some("renderType"),
    validate: |v, _| validate::parse_render_type(v),
};

const NODATA_STRATEGY: Field<NodataStrategy> = Field {
    name: "nodataStrategy",
    attribute: Some("nodataStrategy"),
    validate: |v, _| validate::parse_nodata_strategy(v),
};

const NODATA_REPLACE_VALUE: Field<f64> = Field {
    name: "nodataReplaceValue",
    attribute: Some("nodataReplaceValue"),
    validate: |v, _| validate::parse_replace_value(v),
};

const MASK_NODATA: Field<bool> = Field {
    name: "maskNodata",
    attribute: Some("maskNodata"),
    validate: |v, _| validate::parse_mask_nodata(v),
};

const DISPLAY_RENDER_CONFIG: Field<Option<DisplayRenderConfig>> = Field {
    name: "displayRenderConfig",
    attribute: Some("displayRenderConfig"),
    validate: |v, ctx| validate::parse_display_render_config(v, &ctx.statistics_keys).map(Some),
};

/// The frozen configuration of one tile source.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub url: String,
    pub path: String,
    pub variable: String,
    pub extent: Extent,
    pub crs: String,
    pub zoom_levels: Vec<u32>,
    pub resolutions: Vec<f64>,
    pub tile_size: u32,
    /// Shape of the value array at the highest zoom.
    pub shape: Vec<u64>,
    pub band_count: usize,
    pub dtype: DataType,
    pub fill_value: Option<f64>,
    pub bands: Vec<usize>,
    pub timestamps: Vec<TimeKey>,
    pub nodata: Nodata,
    pub statistics: Statistics,
    pub statistics_keys: StatisticsKeys,
    pub normalize: Option<NormalizeSpec>,
    pub aggregates: Option<NormalizationAggregates>,
    pub render_type: RenderType,
    pub nodata_strategy: NodataStrategy,
    pub nodata_replace_value: f64,
    pub mask_nodata: bool,
    pub display_render_config: Option<DisplayRenderConfig>,
    /// Which source supplied each field.
    pub sources: BTreeMap<&'static str, ValueSource>,
}

impl ResolvedConfig {
    /// Connect to the store, extract metadata and resolve.
    pub async fn load(options: &TileSourceOptions, connector: &dyn StoreConnector) -> Result<Self> {
        let store = connector.connect(&options.url)?;
        let metadata = DatasetMetadata::extract(store.as_ref(), options).await?;
        ConfigResolver::new(options, &metadata).resolve()
    }

    pub fn grid(&self) -> TileGrid {
        TileGrid::new(self.extent, &self.zoom_levels, &self.resolutions, self.tile_size)
    }

    pub fn supports_zoom(&self, zoom: u32) -> bool {
        self.zoom_levels.binary_search(&zoom).is_ok()
    }

    pub fn source_of(&self, field: &str) -> Option<ValueSource> {
        self.sources.get(field).copied()
    }

    /// The alpha channel exists when masking is on and no-data is configured.
    pub fn has_alpha(&self) -> bool {
        self.mask_nodata && !self.nodata.is_none()
    }

    pub fn dtype_range(&self) -> MinMax {
        let (min, max) = self.dtype.numeric_range();
        MinMax::new(min, max)
    }

    /// Path of the value array at a zoom level.
    pub fn value_array_path(&self, zoom: u32) -> String {
        join_path(&[self.path.as_str(), zoom.to_string().as_str(), self.variable.as_str()])
    }

    fn stat_range(&self, min_key: &str, max_key: &str, slot: usize, band: usize, time: usize) -> MinMax {
        match (
            self.statistics.value(min_key, slot, band, time),
            self.statistics.value(max_key, slot, band, time),
        ) {
            (Some(min), Some(max)) => MinMax::new(min, max),
            _ => self.dtype_range(),
        }
    }

    /// Normalization range for a composition slot showing `band` at `time`,
    /// or `None` when normalization is not configured.
    pub fn normalization_range(&self, slot: usize, band: usize, time: usize) -> Option<MinMax> {
        let spec = self.normalize.as_ref()?;
        let range = match (spec.strategy, self.aggregates.as_ref()) {
            (NormalizeStrategy::PerBandPerTime, _) | (_, None) => {
                self.stat_range(&spec.min_key, &spec.max_key, slot, band, time)
            }
            (NormalizeStrategy::Global, Some(agg)) => agg.global,
            (NormalizeStrategy::GlobalBandPerTime, Some(agg)) => agg.for_time(time),
            (NormalizeStrategy::PerBandGlobalTime, Some(agg)) => {
                agg.for_row(self.statistics.row(slot, band))
            }
        };
        Some(range)
    }

    /// Display stretch for a composition slot, only for the display render type.
    pub fn display_stretch(&self, slot: usize, band: usize, time: usize) -> Option<DisplayStretch> {
        if self.render_type != RenderType::Display {
            return None;
        }
        let stretch = match self.display_render_config.as_ref()? {
            DisplayRenderConfig::Normalize { min_key, max_key } => {
                let range = self.stat_range(min_key, max_key, slot, band, time);
                DisplayStretch::Normalize {
                    min: range.min,
                    max: range.max,
                }
            }
            DisplayRenderConfig::StdStretch {
                mean_key,
                std_key,
                slope,
            } => match (
                self.statistics.value(mean_key, slot, band, time),
                self.statistics.value(std_key, slot, band, time),
            ) {
                (Some(mean), Some(std)) => DisplayStretch::StdStretch {
                    mean,
                    std,
                    slope: *slope,
                },
                _ => {
                    let range = self.dtype_range();
                    DisplayStretch::Normalize {
                        min: range.min,
                        max: range.max,
                    }
                }
            },
        };
        Some(stretch)
    }
}

/// Applies the precedence chain to every field.
pub struct ConfigResolver<'a> {
    options: &'a TileSourceOptions,
    metadata: &'a DatasetMetadata,
    sources: BTreeMap<&'static str, ValueSource>,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(options: &'a TileSourceOptions, metadata: &'a DatasetMetadata) -> Self {
        Self {
            options,
            metadata,
            sources: BTreeMap::new(),
        }
    }

    fn record<T>(&mut self, name: &'static str, resolved: Resolved<T>) -> T {
        self.sources.insert(name, resolved.source);
        resolved.value
    }

    pub fn resolve(mut self) -> Result<ResolvedConfig> {
        let options = self.options;
        let metadata = self.metadata;
        let mut ctx = ResolveContext {
            attributes: metadata.attributes.clone(),
            dtype: metadata.dtype(),
            time_dim: metadata.time_dim(),
            band_count: metadata.band_count(),
            height: metadata.height(),
            width: metadata.width(),
            zoom_count: 0,
            composition: 0,
            timestamp_count: 0,
            statistics_keys: Default::default(),
        };

        let r = EXTENT.evaluate(&ctx, options.extent.as_ref(), None, |ctx| {
            Some(Extent::new(0.0, 0.0, ctx.width as f64, ctx.height as f64))
        })?;
        let extent = self.record(EXTENT.name, r);

        let r = CRS.evaluate(&ctx, options.crs.as_ref(), None, |_| Some(DEFAULT_CRS.to_string()))?;
        let crs = self.record(CRS.name, r);

        let r = ZOOM_LEVELS.evaluate(&ctx, options.zoom_levels.as_ref(), None, |_| Some(vec![0]))?;
        let zoom_levels = self.record(ZOOM_LEVELS.name, r);
        ctx.zoom_count = zoom_levels.len();

        let r = RESOLUTIONS.evaluate(&ctx, options.resolutions.as_ref(), None, |ctx| {
            // the highest zoom maps one array column to one pixel
            let base = extent.width() / ctx.width.max(1) as f64;
            let top = zoom_levels.last().copied().unwrap_or(0);
            Some(
                zoom_levels
                    .iter()
                    .map(|&z| base * 2f64.powi((top - z) as i32))
                    .collect(),
            )
        })?;
        let resolutions = self.record(RESOLUTIONS.name, r);

        let r = TILE_SIZE.evaluate(&ctx, options.tile_size.as_ref(), None, |_| Some(DEFAULT_TILE_SIZE))?;
        let tile_size = self.record(TILE_SIZE.name, r);

        let r = BANDS.evaluate(&ctx, options.bands.as_ref(), None, |ctx| {
            Some(if ctx.band_count >= 3 { vec![0, 1, 2] } else { vec![0] })
        })?;
        let bands = self.record(BANDS.name, r);
        ctx.composition = bands.len();

        let r = TIMESTAMPS.evaluate(
            &ctx,
            options.timestamps.as_ref(),
            metadata.time_keys.clone(),
            |ctx| Some((0..ctx.time_dim as i64).map(TimeKey::Id).collect()),
        )?;
        let timestamps = self.record(TIMESTAMPS.name, r);
        ctx.timestamp_count = timestamps.len();

        // the fill value only marks unwritten chunks, it is not a no-data sentinel
        let r = NODATA.evaluate(&ctx, options.nodata.as_ref(), None, |_| Some(Nodata::None))?;
        let nodata = self.record(NODATA.name, r);

        let r = STATISTICS_KEYS.evaluate(&ctx, options.statistics_keys.as_ref(), None, |_| {
            Some(StatisticsKeys::default())
        })?;
        let statistics_keys = self.record(STATISTICS_KEYS.name, r);

        let from_array = self.statistics_from_array(&statistics_keys, &ctx);
        let r = STATISTICS.evaluate(&ctx, options.statistics.as_ref(), from_array, |ctx| {
            Some(Statistics::from_dtype(ctx.dtype))
        })?;
        let statistics = self.record(STATISTICS.name, r);
        ctx.statistics_keys = statistics.keys();

        let r = NORMALIZE.evaluate(&ctx, options.normalize.as_ref(), None, |_| Some(None))?;
        let normalize = self.record(NORMALIZE.name, r);

        let r = RENDER_TYPE.evaluate(&ctx, options.render_type.as_ref(), None, |_| {
            Some(RenderType::default())
        })?;
        let render_type = self.record(RENDER_TYPE.name, r);

        let r = NODATA_STRATEGY.evaluate(&ctx, options.nodata_strategy.as_ref(), None, |_| {
            Some(NodataStrategy::default())
        })?;
        let nodata_strategy = self.record(NODATA_STRATEGY.name, r);

        let r = NODATA_REPLACE_VALUE.evaluate(&ctx, options.nodata_replace_value.as_ref(), None, |_| {
            Some(0.0)
        })?;
        let nodata_replace_value = self.record(NODATA_REPLACE_VALUE.name, r);

        let r = MASK_NODATA.evaluate(&ctx, options.mask_nodata.as_ref(), None, |_| Some(true))?;
        let mask_nodata = self.record(MASK_NODATA.name, r);

        let r = DISPLAY_RENDER_CONFIG.evaluate(
            &ctx,
            options.display_render_config.as_ref(),
            None,
            |_| {
                Some((render_type == RenderType::Display).then(|| DisplayRenderConfig::Normalize {
                    min_key: "min".to_string(),
                    max_key: "max".to_string(),
                }))
            },
        )?;
        let display_render_config = self.record(DISPLAY_RENDER_CONFIG.name, r);

        let (dtype_min, dtype_max) = ctx.dtype.numeric_range();
        let aggregates = normalize.as_ref().map(|spec| {
            NormalizationAggregates::compute(
                &statistics,
                &spec.min_key,
                &spec.max_key,
                timestamps.len(),
                MinMax::new(dtype_min, dtype_max),
            )
        });

        let config = ResolvedConfig {
            url: metadata.url.clone(),
            path: metadata.path.clone(),
            variable: metadata.variable.clone(),
            extent,
            crs,
            zoom_levels,
            resolutions,
            tile_size,
            shape: metadata.value_array.shape.clone(),
            band_count: ctx.band_count,
            dtype: ctx.dtype,
            fill_value: metadata.value_array.fill_value,
            bands,
            timestamps,
            nodata,
            statistics,
            statistics_keys,
            normalize,
            aggregates,
            render_type,
            nodata_strategy,
            nodata_replace_value,
            mask_nodata,
            display_render_config,
            sources: self.sources,
        };

        tracing::debug!(
            path = %config.path,
            bands = ?config.bands,
            timestamps = config.timestamps.len(),
            statistics_case = config.statistics.case(),
            render_type = ?config.render_type,
            sources = ?config.sources,
            "Resolved tile source configuration"
        );

        Ok(config)
    }

    /// Per-dataset-band statistics from the statistics array, when its shape
    /// agrees with the value array.
    fn statistics_from_array(&self, keys: &StatisticsKeys, ctx: &ResolveContext) -> Option<Statistics> {
        let data = self.metadata.statistics.as_ref()?;
        let consistent = match data.shape.as_slice() {
            [bands, _] => *bands == ctx.band_count,
            [times, bands, _] => *bands == ctx.band_count && *times == ctx.timestamp_count,
            _ => false,
        };
        if !consistent {
            tracing::warn!(
                shape = ?data.shape,
                bands = ctx.band_count,
                timestamps = ctx.timestamp_count,
                "Statistics array does not match the dataset, ignoring it"
            );
            return None;
        }
        let statistics = Statistics::from_array(data, keys);
        if statistics.is_none() {
            tracing::warn!(shape = ?data.shape, "Statistics keys do not fit the statistics array, ignoring it");
        }
        statistics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use array_store::{ArrayMeta, MemoryArrayStore};
    use serde_json::{json, Map, Value};

    async fn metadata_for(store: &MemoryArrayStore, options: &TileSourceOptions) -> DatasetMetadata {
        DatasetMetadata::extract(store, options).await.unwrap()
    }

    fn cube_store(shape: Vec<u64>, dtype: DataType) -> MemoryArrayStore {
        let store = MemoryArrayStore::new();
        let len = shape.iter().product::<u64>() as usize;
        store
            .insert_array("ds/0/data", ArrayMeta::new(shape, dtype), vec![0.0; len])
            .unwrap();
        store
    }

    async fn resolve(store: &MemoryArrayStore, options: TileSourceOptions) -> Result<ResolvedConfig> {
        let options = options.with_path("ds");
        let metadata = metadata_for(store, &options).await;
        ConfigResolver::new(&options, &metadata).resolve()
    }

    #[tokio::test]
    async fn test_fallbacks() {
        let store = cube_store(vec![3, 4, 8, 16], DataType::UInt8);
        let config = resolve(&store, TileSourceOptions::new("mem://")).await.unwrap();

        assert_eq!(config.extent, Extent::new(0.0, 0.0, 16.0, 8.0));
        assert_eq!(config.crs, "EPSG:3857");
        assert_eq!(config.zoom_levels, vec![0]);
        assert_eq!(config.resolutions, vec![1.0]);
        assert_eq!(config.tile_size, 256);
        assert_eq!(config.bands, vec![0, 1, 2]);
        assert_eq!(config.timestamps, vec![TimeKey::Id(0), TimeKey::Id(1), TimeKey::Id(2)]);
        assert_eq!(config.nodata, Nodata::None);
        assert_eq!(config.statistics, Statistics::from_dtype(DataType::UInt8));
        assert_eq!(config.render_type, RenderType::Raw);
        assert_eq!(config.nodata_strategy, NodataStrategy::Raw);
        assert_eq!(config.nodata_replace_value, 0.0);
        assert!(config.mask_nodata);
        assert!(!config.has_alpha());
        assert!(config.display_render_config.is_none());
        assert!(config.normalize.is_none());
        assert_eq!(config.source_of("bands"), Some(ValueSource::Fallback));
    }

    #[tokio::test]
    async fn test_single_band_dataset_defaults_to_band_zero() {
        let store = cube_store(vec![1, 2, 4, 4], DataType::Float32);
        let config = resolve(&store, TileSourceOptions::new("mem://")).await.unwrap();
        assert_eq!(config.bands, vec![0]);
    }

    #[tokio::test]
    async fn test_user_beats_attributes() {
        let store = cube_store(vec![1, 3, 4, 4], DataType::Float32);
        let mut attrs = Map::new();
        attrs.insert("crs".into(), json!("EPSG:4326"));
        attrs.insert("bands".into(), json!([2]));
        attrs.insert("nodata".into(), json!(-1));
        store.set_attributes("ds", attrs);

        let config = resolve(&store, TileSourceOptions::new("mem://").with_bands(vec![1])).await.unwrap();
        assert_eq!(config.crs, "EPSG:4326");
        assert_eq!(config.source_of("crs"), Some(ValueSource::Dataset));
        assert_eq!(config.bands, vec![1]);
        assert_eq!(config.source_of("bands"), Some(ValueSource::User));
        assert_eq!(config.nodata, Nodata::Scalar(-1.0));
        assert!(config.has_alpha());
    }

    #[tokio::test]
    async fn test_fill_value_is_not_nodata() {
        let store = MemoryArrayStore::new();
        store
            .insert_array(
                "ds/0/data",
                ArrayMeta::new(vec![1, 1, 2, 2], DataType::UInt8).with_fill_value(0.0),
                vec![0.0, 1.0, 2.0, 3.0],
            )
            .unwrap();
        let config = resolve(&store, TileSourceOptions::new("mem://")).await.unwrap();
        assert_eq!(config.fill_value, Some(0.0));
        assert_eq!(config.nodata, Nodata::None);
        assert_eq!(config.source_of("nodata"), Some(ValueSource::Fallback));
        assert!(!config.has_alpha());

        let mut attrs = Map::new();
        attrs.insert("nodata".into(), json!(0));
        store.set_attributes("ds", attrs);
        let config = resolve(&store, TileSourceOptions::new("mem://")).await.unwrap();
        assert_eq!(config.nodata, Nodata::Scalar(0.0));
        assert_eq!(config.source_of("nodata"), Some(ValueSource::Dataset));
    }

    #[tokio::test]
    async fn test_invalid_input_names_field_and_source() {
        let store = cube_store(vec![1, 3, 4, 4], DataType::Float32);
        let err = resolve(&store, TileSourceOptions::new("mem://").with_bands(vec![0, 1]))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("bands"));
        assert!(err.to_string().contains("user input"));

        let mut attrs = Map::new();
        attrs.insert("extent".into(), json!([0, 0, -1, 1]));
        store.set_attributes("ds", attrs);
        let err = resolve(&store, TileSourceOptions::new("mem://")).await.unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { ref field, origin: ValueSource::Dataset, .. } if field == "extent"
        ));
    }

    #[tokio::test]
    async fn test_derived_resolutions_follow_zoom_levels() {
        let store = MemoryArrayStore::new();
        store
            .insert_array("ds/2/data", ArrayMeta::new(vec![1, 1, 16, 16], DataType::Float32), vec![0.0; 256])
            .unwrap();
        let options = TileSourceOptions::new("mem://")
            .with_zoom_levels(vec![0, 1, 2])
            .with_extent([0.0, 0.0, 32.0, 32.0]);
        let config = resolve(&store, options).await.unwrap();
        assert_eq!(config.resolutions, vec![8.0, 4.0, 2.0]);
        assert_eq!(config.value_array_path(2), "ds/2/data");
    }

    #[tokio::test]
    async fn test_statistics_array_is_used_per_dataset_band() {
        let store = cube_store(vec![1, 2, 4, 4], DataType::Float32);
        store
            .insert_array(
                "ds/statistics",
                ArrayMeta::new(vec![2, 4], DataType::Float64),
                vec![0.0, 10.0, 5.0, 2.0, 100.0, 300.0, 200.0, 50.0],
            )
            .unwrap();
        let options = TileSourceOptions::new("mem://")
            .with_bands(vec![1])
            .with_normalize(json!({"minKey": "min", "maxKey": "max"}));
        let config = resolve(&store, options).await.unwrap();

        assert_eq!(config.statistics.case(), 3);
        assert_eq!(config.normalization_range(0, 1, 0), Some(MinMax::new(100.0, 300.0)));
    }

    #[tokio::test]
    async fn test_normalization_strategies() {
        let store = cube_store(vec![2, 3, 4, 4], DataType::UInt16);
        let statistics = json!([
            {"min": [0, 10], "max": [100, 110]},
            {"min": [5, -5], "max": [50, 500]},
            {"min": [1, 2], "max": [3, 4]},
        ]);
        let base = TileSourceOptions::new("mem://").with_statistics(statistics);

        let with = |strategy: &str| {
            base.clone()
                .with_normalize(json!({"strategy": strategy}))
        };

        let config = resolve(&store, with("per-band-per-time")).await.unwrap();
        assert_eq!(config.statistics.case(), 4);
        assert_eq!(config.normalization_range(1, 1, 1), Some(MinMax::new(-5.0, 500.0)));

        let config = resolve(&store, with("global")).await.unwrap();
        assert_eq!(config.normalization_range(0, 0, 0), Some(MinMax::new(-5.0, 500.0)));

        let config = resolve(&store, with("global-band-per-time")).await.unwrap();
        assert_eq!(config.normalization_range(2, 2, 0), Some(MinMax::new(0.0, 100.0)));

        let config = resolve(&store, with("per-band-global-time")).await.unwrap();
        assert_eq!(config.normalization_range(2, 2, 0), Some(MinMax::new(1.0, 4.0)));
    }

    #[tokio::test]
    async fn test_display_defaults_and_stretch() {
        let store = cube_store(vec![1, 1, 4, 4], DataType::UInt8);
        let options = TileSourceOptions::new("mem://").with_render_type("display");
        let config = resolve(&store, options).await.unwrap();
        assert_eq!(
            config.display_render_config,
            Some(DisplayRenderConfig::Normalize {
                min_key: "min".into(),
                max_key: "max".into()
            })
        );
        assert_eq!(
            config.display_stretch(0, 0, 0),
            Some(DisplayStretch::Normalize { min: 0.0, max: 255.0 })
        );

        let options = TileSourceOptions::new("mem://")
            .with_render_type("display")
            .with_statistics(json!({"min": 0, "max": 10, "mean": 4, "std": 2}))
            .with_display_render_config(json!({"strategy": "std-stretch", "slope": 3}));
        let config = resolve(&store, options).await.unwrap();
        assert_eq!(
            config.display_stretch(0, 0, 0),
            Some(DisplayStretch::StdStretch { mean: 4.0, std: 2.0, slope: 3.0 })
        );
    }

    #[tokio::test]
    async fn test_std_stretch_requires_keys() {
        let store = cube_store(vec![1, 1, 4, 4], DataType::UInt8);
        let options = TileSourceOptions::new("mem://")
            .with_render_type("display")
            .with_display_render_config(Value::from("std-stretch"));
        let err = resolve(&store, options).await.unwrap_err();
        assert_eq!(err.field(), Some("displayRenderConfig"));
    }
}
