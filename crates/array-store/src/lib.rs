//! Read-only access to chunked N-dimensional arrays.
//!
//! The tile pipeline only needs three things from a chunked array store:
//! array metadata, group attribute documents, and hyper-rectangular reads.
//! This crate puts those behind the [`ArrayStore`] / [`ArrayHandle`] traits
//! and provides two implementations:
//!
//! - [`ZarrArrayStore`]: Zarr (V2 and V3) through `zarrs`, over the local
//!   filesystem or an `object_store` backend (S3, HTTP)
//! - [`MemoryArrayStore`]: fully decoded arrays held in memory
//!
//! # Example
//!
//! ```ignore
//! use array_store::{ArrayStore, Selection, ZarrArrayStore};
//!
//! let store = ZarrArrayStore::filesystem("/data/cube.zarr")?;
//! let array = store.open_array("dataset/3/data").await?;
//!
//! // time 0, band 2, a 256x256 window
//! let slice = array
//!     .get(&[
//!         Selection::Index(0),
//!         Selection::Index(2),
//!         Selection::Range(0..256),
//!         Selection::Range(256..512),
//!     ])
//!     .await?;
//! ```

pub mod connector;
pub mod error;
pub mod memory;
pub mod traits;
pub mod types;
pub mod zarr;

pub use connector::{S3Config, StaticStoreConnector, StoreConnector, StoreLocation, ZarrStoreConnector};
pub use error::{Result, StoreError};
pub use memory::MemoryArrayStore;
pub use traits::{join_path, ArrayHandle, ArrayStore};
pub use types::{ArrayData, ArrayMeta, DataType, Hyperslab, Selection};
pub use zarr::{ZarrArrayHandle, ZarrArrayStore};
