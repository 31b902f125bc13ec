//! Zarr dataset fixtures.
//!
//! Writes small multi-zoom `[time, band, row, col]` datasets to disk with the
//! group layout the tile pipeline reads:
//!
//! ```text
//! <path>/                 group, dataset attributes
//! <path>/time             optional time coordinate
//! <path>/statistics       optional statistics array
//! <path>/<zoom>/<var>     value array per zoom level
//! ```

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use zarrs::array::{ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs_filesystem::FilesystemStore;

use crate::generators::create_test_cube;

/// Description of a dataset to write.
#[derive(Debug, Clone)]
pub struct ZarrCubeFixture {
    pub path: String,
    pub variable: String,
    pub times: usize,
    pub bands: usize,
    /// `(zoom, rows, cols)` per level.
    pub levels: Vec<(u32, usize, usize)>,
    pub chunk_size: u64,
    pub fill_value: f32,
    pub attributes: Map<String, Value>,
    /// Time coordinate values and their CF units attribute.
    pub time_coordinate: Option<(Vec<f64>, String)>,
    /// Statistics array shape and values, written at the dataset root.
    pub statistics: Option<(Vec<u64>, Vec<f64>)>,
}

impl ZarrCubeFixture {
    pub fn new(path: &str, times: usize, bands: usize) -> Self {
        Self {
            path: path.trim_matches('/').to_string(),
            variable: "data".to_string(),
            times,
            bands,
            levels: Vec::new(),
            chunk_size: 4,
            fill_value: f32::NAN,
            attributes: Map::new(),
            time_coordinate: None,
            statistics: None,
        }
    }

    pub fn with_level(mut self, zoom: u32, rows: usize, cols: usize) -> Self {
        self.levels.push((zoom, rows, cols));
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_fill_value(mut self, fill_value: f32) -> Self {
        self.fill_value = fill_value;
        self
    }

    pub fn with_attribute(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    pub fn with_time_coordinate(mut self, values: Vec<f64>, units: &str) -> Self {
        self.time_coordinate = Some((values, units.to_string()));
        self
    }

    pub fn with_statistics(mut self, shape: Vec<u64>, values: Vec<f64>) -> Self {
        self.statistics = Some((shape, values));
        self
    }

    /// Write the dataset under `root`. Values follow [`create_test_cube`].
    pub fn write(&self, root: &Path) -> Result<(), Box<dyn Error>> {
        std::fs::create_dir_all(root)?;
        let store = Arc::new(FilesystemStore::new(root)?);
        let base = format!("/{}", self.path);

        GroupBuilder::new()
            .attributes(self.attributes.clone())
            .build(store.clone(), &base)?
            .store_metadata()?;

        for &(zoom, rows, cols) in &self.levels {
            let level = format!("{base}/{zoom}");
            GroupBuilder::new()
                .build(store.clone(), &level)?
                .store_metadata()?;

            let array = ArrayBuilder::new(
                vec![self.times as u64, self.bands as u64, rows as u64, cols as u64],
                DataType::Float32,
                vec![1, 1, self.chunk_size, self.chunk_size].try_into()?,
                FillValue::from(self.fill_value),
            )
            .build(store.clone(), &format!("{level}/{}", self.variable))?;
            array.store_metadata()?;

            let data: Vec<f32> = create_test_cube(self.times, self.bands, rows, cols)
                .into_iter()
                .map(|v| v as f32)
                .collect();
            let subset = ArraySubset::new_with_start_shape(
                vec![0, 0, 0, 0],
                vec![self.times as u64, self.bands as u64, rows as u64, cols as u64],
            )?;
            array.store_array_subset_elements(&subset, &data)?;
        }

        if let Some((values, units)) = &self.time_coordinate {
            let mut attrs = Map::new();
            attrs.insert("units".to_string(), Value::from(units.as_str()));
            write_f64_array(&store, &format!("{base}/time"), vec![values.len() as u64], values, attrs)?;
        }

        if let Some((shape, values)) = &self.statistics {
            write_f64_array(&store, &format!("{base}/statistics"), shape.clone(), values, Map::new())?;
        }

        Ok(())
    }
}

fn write_f64_array(
    store: &Arc<FilesystemStore>,
    path: &str,
    shape: Vec<u64>,
    values: &[f64],
    attributes: Map<String, Value>,
) -> Result<(), Box<dyn Error>> {
    let start = vec![0; shape.len()];
    let array = ArrayBuilder::new(
        shape.clone(),
        DataType::Float64,
        shape.clone().try_into()?,
        FillValue::from(f64::NAN),
    )
    .attributes(attributes)
    .build(store.clone(), path)?;
    array.store_metadata()?;

    let subset = ArraySubset::new_with_start_shape(start, shape)?;
    array.store_array_subset_elements(&subset, values)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_writes_levels() {
        let dir = tempfile::tempdir().unwrap();
        ZarrCubeFixture::new("cube", 1, 2)
            .with_level(0, 4, 4)
            .with_level(1, 8, 8)
            .write(dir.path())
            .unwrap();

        assert!(dir.path().join("cube").exists());
        assert!(dir.path().join("cube/0/data").exists());
        assert!(dir.path().join("cube/1/data").exists());
    }
}
