//! Tile source configuration for 4-D chunked array datasets.
//!
//! Reconciles three sources for every property, in order:
//!
//! 1. options supplied by the caller ([`TileSourceOptions`])
//! 2. the dataset itself: its attribute document, time coordinate,
//!    statistics array and value array fill value ([`DatasetMetadata`])
//! 3. derived defaults (dtype range, generated timestamps, ...)
//!
//! The result is a frozen [`ResolvedConfig`] carrying typed statistics
//! ([`Statistics`], one of five shapes), tagged no-data ([`Nodata`]) and the
//! pre-computed normalization aggregates.
//!
//! # Example
//!
//! ```ignore
//! use array_store::ZarrStoreConnector;
//! use tile_config::{ResolvedConfig, TileSourceOptions};
//!
//! let options = TileSourceOptions::new("s3://bucket/cube.zarr")
//!     .with_path("sentinel2")
//!     .with_bands(vec![3, 2, 1])
//!     .with_render_type("display");
//! let config = ResolvedConfig::load(&options, &ZarrStoreConnector::from_env()).await?;
//! assert!(config.supports_zoom(0));
//! ```

pub mod aggregates;
pub mod error;
pub mod grid;
pub mod metadata;
pub mod options;
pub mod precedence;
pub mod resolver;
pub mod statistics;
pub mod time;
pub mod types;
pub mod validate;

pub use aggregates::NormalizationAggregates;
pub use error::{ConfigError, Result};
pub use grid::{full_resolution_table, TileGrid, TileRange};
pub use metadata::DatasetMetadata;
pub use options::TileSourceOptions;
pub use precedence::{Field, ResolveContext, Resolved};
pub use resolver::{ConfigResolver, ResolvedConfig};
pub use statistics::{StatRecord, StatSeries, Statistics, StatisticsKeys};
pub use time::{decode_time_coordinate, parse_iso_date, CfTimeUnits};
pub use types::{
    DisplayRenderConfig, DisplayStretch, Extent, MinMax, Nodata, NodataStrategy, NormalizeSpec,
    NormalizeStrategy, RenderType, TimeKey, ValueSource,
};
