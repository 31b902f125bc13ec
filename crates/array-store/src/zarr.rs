//! Zarr implementation of the store traits.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use zarrs::array::{Array, DataType as ZarrDataType};
use zarrs::array_subset::ArraySubset;
use zarrs::group::Group;
use zarrs::storage::{ReadableStorage, ReadableStorageTraits};
use zarrs_filesystem::FilesystemStore;

use crate::error::{Result, StoreError};
use crate::traits::{join_path, ArrayHandle, ArrayStore};
use crate::types::{ArrayData, ArrayMeta, DataType, Hyperslab, Selection};

/// Array store backed by any readable zarrs storage (filesystem, S3, HTTP).
///
/// Reads are synchronous in zarrs, so every `get` runs on the blocking pool to
/// keep concurrent band reads from stalling the async workers.
#[derive(Clone)]
pub struct ZarrArrayStore {
    storage: ReadableStorage,
}

impl ZarrArrayStore {
    pub fn new(storage: ReadableStorage) -> Self {
        Self { storage }
    }

    /// Open a store rooted at a local directory.
    pub fn filesystem(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let store = FilesystemStore::new(root).map_err(|e| {
            StoreError::connect_failed(root.display().to_string(), e.to_string())
        })?;
        Ok(Self::new(Arc::new(store)))
    }
}

/// zarrs wants absolute node paths.
fn node_path(path: &str) -> String {
    format!("/{}", join_path(&[path]))
}

#[async_trait]
impl ArrayStore for ZarrArrayStore {
    async fn open_array(&self, path: &str) -> Result<Arc<dyn ArrayHandle>> {
        let node = node_path(path);
        let array = Array::open(self.storage.clone(), &node)
            .map_err(|e| StoreError::open_failed(&node, e.to_string()))?;

        let meta = extract_meta(&array)?;

        tracing::debug!(
            path = %node,
            shape = ?meta.shape,
            dtype = %meta.dtype,
            "Opened zarr array"
        );

        Ok(Arc::new(ZarrArrayHandle {
            array: Arc::new(array),
            meta,
        }))
    }

    async fn attributes(&self, path: &str) -> Result<Map<String, Value>> {
        let node = node_path(path);
        let group = Group::open(self.storage.clone(), &node)
            .map_err(|e| StoreError::open_failed(&node, e.to_string()))?;
        Ok(group.attributes().clone())
    }
}

fn map_data_type(data_type: &ZarrDataType) -> Result<DataType> {
    let dtype = match data_type {
        ZarrDataType::Int8 => DataType::Int8,
        ZarrDataType::Int16 => DataType::Int16,
        ZarrDataType::Int32 => DataType::Int32,
        ZarrDataType::Int64 => DataType::Int64,
        ZarrDataType::UInt8 => DataType::UInt8,
        ZarrDataType::UInt16 => DataType::UInt16,
        ZarrDataType::UInt32 => DataType::UInt32,
        ZarrDataType::UInt64 => DataType::UInt64,
        ZarrDataType::Float32 => DataType::Float32,
        ZarrDataType::Float64 => DataType::Float64,
        other => return Err(StoreError::UnsupportedDataType(format!("{other:?}"))),
    };
    Ok(dtype)
}

fn extract_meta<S: ?Sized + ReadableStorageTraits>(array: &Array<S>) -> Result<ArrayMeta> {
    let dtype = map_data_type(array.data_type())?;
    let fill_value = dtype.decode_ne(array.fill_value().as_ne_bytes());

    Ok(ArrayMeta {
        shape: array.shape().to_vec(),
        dtype,
        fill_value,
        attributes: array.attributes().clone(),
    })
}

/// An opened zarr array.
pub struct ZarrArrayHandle {
    array: Arc<Array<dyn ReadableStorageTraits>>,
    meta: ArrayMeta,
}

#[async_trait]
impl ArrayHandle for ZarrArrayHandle {
    fn meta(&self) -> &ArrayMeta {
        &self.meta
    }

    async fn get(&self, selection: &[Selection]) -> Result<ArrayData> {
        let slab = Hyperslab::resolve(&self.meta.shape, selection)?;
        let array = self.array.clone();
        let dtype = self.meta.dtype;
        let output_shape = slab.output_shape.clone();

        let values = tokio::task::spawn_blocking(move || read_slab(&array, dtype, &slab))
            .await
            .map_err(|e| StoreError::read_failed(format!("read task failed: {e}")))??;

        Ok(ArrayData::new(output_shape, values))
    }
}

fn read_slab(
    array: &Array<dyn ReadableStorageTraits>,
    dtype: DataType,
    slab: &Hyperslab,
) -> Result<Vec<f64>> {
    let subset = ArraySubset::new_with_start_shape(slab.start.clone(), slab.lengths.clone())
        .map_err(|e| StoreError::invalid_selection(e.to_string()))?;

    macro_rules! retrieve {
        ($t:ty) => {
            array
                .retrieve_array_subset_elements::<$t>(&subset)
                .map(|v| v.into_iter().map(|x| x as f64).collect())
                .map_err(|e| StoreError::read_failed(e.to_string()))
        };
    }

    match dtype {
        DataType::Int8 => retrieve!(i8),
        DataType::Int16 => retrieve!(i16),
        DataType::Int32 => retrieve!(i32),
        DataType::Int64 => retrieve!(i64),
        DataType::UInt8 => retrieve!(u8),
        DataType::UInt16 => retrieve!(u16),
        DataType::UInt32 => retrieve!(u32),
        DataType::UInt64 => retrieve!(u64),
        DataType::Float32 => retrieve!(f32),
        DataType::Float64 => retrieve!(f64),
    }
}
