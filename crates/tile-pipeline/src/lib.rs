//! Map tiles from 4-D chunked arrays.
//!
//! A [`TileSource`] owns the view state of one dataset (time index and band
//! composition) on top of a frozen [`tile_config::ResolvedConfig`]. Each tile
//! request becomes a self-contained [`TileRequest`] that a [`WorkerUnit`]
//! from the [`WorkerPool`] turns into an interleaved pixel buffer with the
//! [`PixelProcessor`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use array_store::ZarrStoreConnector;
//! use tile_config::TileSourceOptions;
//! use tile_pipeline::{TileSource, WorkerPool, WorkerPoolConfig};
//!
//! let pool = Arc::new(WorkerPool::new(
//!     WorkerPoolConfig::from_env(),
//!     Arc::new(ZarrStoreConnector::from_env()),
//! ));
//! let options = TileSourceOptions::new("s3://bucket/cube.zarr").with_bands(vec![3, 2, 1]);
//! let mut source = TileSource::create(&options, pool).await?;
//!
//! if let Some(tile) = source.load_tile(4, 3, 7) {
//!     let tile = tile.await?;
//!     upload(tile.as_bytes());
//! }
//! ```

pub mod derived;
pub mod error;
pub mod pixel;
pub mod pool;
pub mod processor;
pub mod protocol;
pub mod source;
pub mod worker;

pub use derived::DerivedValues;
pub use error::{Result, TileError};
pub use pixel::{is_nodata, tile_axis_range, transform, Pixel, PixelOptions, Sample, SlotParams};
pub use pool::{WorkerPool, WorkerPoolConfig};
pub use processor::{HandleCacheStats, PixelProcessor};
pub use protocol::{PixelBuffer, TileData, TileRequest, WorkerResponse};
pub use source::TileSource;
pub use worker::WorkerUnit;
