//! In-process array store.
//!
//! Holds fully decoded arrays in memory. Useful for pre-loaded datasets and for
//! exercising the tile pipeline without touching a filesystem.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};
use crate::traits::{join_path, ArrayHandle, ArrayStore};
use crate::types::{ArrayData, ArrayMeta, Hyperslab, Selection};

#[derive(Default)]
struct Inner {
    arrays: HashMap<String, Arc<MemoryArray>>,
    groups: HashMap<String, Map<String, Value>>,
}

/// Thread-safe in-memory store.
#[derive(Clone, Default)]
pub struct MemoryArrayStore {
    inner: Arc<RwLock<Inner>>,
    unreadable: Arc<RwLock<HashSet<String>>>,
}

impl MemoryArrayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an array. `values` are row-major and must match the shape.
    pub fn insert_array(&self, path: &str, meta: ArrayMeta, values: Vec<f64>) -> Result<()> {
        let expected = meta.shape.iter().product::<u64>() as usize;
        if values.len() != expected {
            return Err(StoreError::invalid_selection(format!(
                "array '{path}' has shape {:?} ({expected} elements) but {} values were given",
                meta.shape,
                values.len()
            )));
        }
        let key = join_path(&[path]);
        self.inner.write().arrays.insert(
            key.clone(),
            Arc::new(MemoryArray {
                path: key,
                meta,
                values,
                unreadable: self.unreadable.clone(),
            }),
        );
        Ok(())
    }

    /// Set the attribute document of a group.
    pub fn set_attributes(&self, path: &str, attributes: Map<String, Value>) {
        self.inner
            .write()
            .groups
            .insert(join_path(&[path]), attributes);
    }

    /// Make every subsequent read of an array fail.
    pub fn mark_unreadable(&self, path: &str) {
        self.unreadable.write().insert(join_path(&[path]));
    }
}

#[async_trait]
impl ArrayStore for MemoryArrayStore {
    async fn open_array(&self, path: &str) -> Result<Arc<dyn ArrayHandle>> {
        let key = join_path(&[path]);
        let array = self
            .inner
            .read()
            .arrays
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("array '{key}'")))?;
        Ok(array as Arc<dyn ArrayHandle>)
    }

    async fn attributes(&self, path: &str) -> Result<Map<String, Value>> {
        let key = join_path(&[path]);
        let inner = self.inner.read();
        if let Some(attrs) = inner.groups.get(&key) {
            return Ok(attrs.clone());
        }
        if let Some(array) = inner.arrays.get(&key) {
            return Ok(array.meta.attributes.clone());
        }
        Err(StoreError::NotFound(format!("group '{key}'")))
    }
}

struct MemoryArray {
    path: String,
    meta: ArrayMeta,
    values: Vec<f64>,
    unreadable: Arc<RwLock<HashSet<String>>>,
}

#[async_trait]
impl ArrayHandle for MemoryArray {
    fn meta(&self) -> &ArrayMeta {
        &self.meta
    }

    async fn get(&self, selection: &[Selection]) -> Result<ArrayData> {
        if self.unreadable.read().contains(&self.path) {
            return Err(StoreError::read_failed(format!(
                "array '{}' is unreadable",
                self.path
            )));
        }

        let slab = Hyperslab::resolve(&self.meta.shape, selection)?;
        let mut values = Vec::with_capacity(slab.num_elements());
        if self.meta.shape.is_empty() {
            values.extend(self.values.first().copied());
        } else if slab.num_elements() > 0 {
            gather(&self.meta.shape, &self.values, &slab, 0, 0, &mut values);
        }
        Ok(ArrayData::new(slab.output_shape, values))
    }
}

/// Copy the selected elements in row-major order.
fn gather(shape: &[u64], src: &[f64], slab: &Hyperslab, axis: usize, offset: usize, out: &mut Vec<f64>) {
    let stride: usize = shape[axis + 1..].iter().product::<u64>() as usize;
    let start = slab.start[axis] as usize;
    let len = slab.lengths[axis] as usize;

    if axis + 1 == shape.len() {
        let base = offset + start;
        out.extend_from_slice(&src[base..base + len]);
        return;
    }

    for i in start..start + len {
        gather(shape, src, slab, axis + 1, offset + i * stride, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn cube_store() -> MemoryArrayStore {
        // [time=2, band=2, rows=3, cols=4], value = t*1000 + b*100 + r*10 + c
        let mut values = Vec::new();
        for t in 0..2 {
            for b in 0..2 {
                for r in 0..3 {
                    for c in 0..4 {
                        values.push((t * 1000 + b * 100 + r * 10 + c) as f64);
                    }
                }
            }
        }
        let store = MemoryArrayStore::new();
        store
            .insert_array("ds/0/data", ArrayMeta::new(vec![2, 2, 3, 4], DataType::Float32), values)
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_get_slice() {
        let store = cube_store();
        let array = store.open_array("/ds/0/data").await.unwrap();
        let data = array
            .get(&[
                Selection::Index(1),
                Selection::Index(0),
                Selection::Range(1..3),
                Selection::Range(2..4),
            ])
            .await
            .unwrap();

        assert_eq!(data.shape, vec![2, 2]);
        assert_eq!(data.values, vec![1012.0, 1013.0, 1022.0, 1023.0]);
    }

    #[tokio::test]
    async fn test_insert_rejects_wrong_length() {
        let store = MemoryArrayStore::new();
        let meta = ArrayMeta::new(vec![2, 2], DataType::UInt8);
        assert!(store.insert_array("a", meta, vec![1.0; 3]).is_err());
    }

    #[tokio::test]
    async fn test_unreadable_array() {
        let store = cube_store();
        let array = store.open_array("ds/0/data").await.unwrap();
        store.mark_unreadable("ds/0/data");
        let result = array
            .get(&[
                Selection::Index(0),
                Selection::Index(0),
                Selection::Range(0..1),
                Selection::Range(0..1),
            ])
            .await;
        assert!(matches!(result, Err(StoreError::ReadFailed(_))));
    }

    #[tokio::test]
    async fn test_attributes() {
        let store = cube_store();
        let mut attrs = Map::new();
        attrs.insert("crs".to_string(), Value::from("EPSG:4326"));
        store.set_attributes("ds", attrs);

        let found = store.attributes("/ds/").await.unwrap();
        assert_eq!(found.get("crs"), Some(&Value::from("EPSG:4326")));
        assert!(store.attributes("missing").await.is_err());
    }
}
