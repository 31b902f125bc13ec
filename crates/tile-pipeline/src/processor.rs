//! Produces one tile buffer from one [`TileRequest`].
//!
//! The processor resolves the request's store URL through its
//! [`StoreConnector`], opens the value array at the request zoom (handles
//! are kept in a small LRU cache), reads one 2-D slice per composition slot
//! and writes the transformed pixels into an interleaved buffer.

use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use array_store::{join_path, ArrayHandle, Selection, StoreConnector};
use futures::future::try_join_all;
use lru::LruCache;
use parking_lot::Mutex;
use tile_config::RenderType;
use tracing::debug;

use crate::error::{Result, TileError};
use crate::pixel::{tile_axis_range, transform, Pixel, PixelOptions, Sample, SlotParams};
use crate::protocol::{PixelBuffer, TileData, TileRequest};

/// Cache key: (store url, array path).
pub type HandleKey = (String, String);

/// Hit/miss counters of the handle cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// LRU cache of opened array handles.
struct HandleCache {
    cache: Mutex<LruCache<HandleKey, Arc<dyn ArrayHandle>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl HandleCache {
    fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn get(&self, key: &HandleKey) -> Option<Arc<dyn ArrayHandle>> {
        let found = self.cache.lock().get(key).cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    fn insert(&self, key: HandleKey, handle: Arc<dyn ArrayHandle>) {
        self.cache.lock().put(key, handle);
    }

    fn stats(&self) -> HandleCacheStats {
        HandleCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.lock().len(),
        }
    }
}

/// Stateless apart from the handle cache; safe to share between tasks.
pub struct PixelProcessor {
    connector: Arc<dyn StoreConnector>,
    handles: HandleCache,
}

impl PixelProcessor {
    pub fn new(connector: Arc<dyn StoreConnector>, handle_cache_size: usize) -> Self {
        Self {
            connector,
            handles: HandleCache::new(handle_cache_size),
        }
    }

    pub fn cache_stats(&self) -> HandleCacheStats {
        self.handles.stats()
    }

    async fn open(&self, url: &str, path: &str) -> Result<Arc<dyn ArrayHandle>> {
        let key = (url.to_string(), path.to_string());
        if let Some(handle) = self.handles.get(&key) {
            return Ok(handle);
        }

        let store = self.connector.connect(url)?;
        let handle = store.open_array(path).await?;
        self.handles.insert(key, handle.clone());
        Ok(handle)
    }

    /// Produce the tile described by `request`.
    pub async fn process(&self, request: &TileRequest) -> Result<TileData> {
        let started = Instant::now();
        check_request(request)?;

        let zoom = request.zoom.to_string();
        let path = join_path(&[
            request.store_path.as_str(),
            zoom.as_str(),
            request.variable.as_str(),
        ]);
        let handle = self.open(&request.store_url, &path).await?;
        let shape = handle.meta().shape.clone();
        check_shape(&shape, request)?;

        let rows = tile_axis_range(
            request.tile_y,
            request.tile_range.max_y,
            request.tile_size,
            shape[2],
        );
        let cols = tile_axis_range(
            request.tile_x,
            request.tile_range.max_x,
            request.tile_size,
            shape[3],
        );

        let options = PixelOptions {
            render_type: request.render_type,
            nodata_strategy: request.nodata_strategy,
            nodata_replace_value: request.nodata_replace_value,
        };
        let slots = slot_params(request);

        let slices = if rows.is_empty() || cols.is_empty() {
            Vec::new()
        } else {
            try_join_all(request.bands.iter().zip(&slots).map(|(&band, slot)| {
                let handle = handle.clone();
                let selection = [
                    Selection::Index(request.time_index as u64),
                    Selection::Index(band as u64),
                    Selection::Range(rows.clone()),
                    Selection::Range(cols.clone()),
                ];
                async move {
                    let data = handle.get(&selection).await?;
                    Ok::<_, TileError>(
                        data.values
                            .iter()
                            .map(|&v| transform(v, slot, &options))
                            .collect::<Vec<_>>(),
                    )
                }
            }))
            .await?
        };

        let pixels = match request.render_type {
            RenderType::Display => PixelBuffer::Uint8(compose(request, &cols, &slices)),
            RenderType::Raw => PixelBuffer::Float32(compose(request, &cols, &slices)),
        };

        debug!(
            zoom = request.zoom,
            x = request.tile_x,
            y = request.tile_y,
            time = request.time_index,
            bands = ?request.bands,
            rows = ?rows,
            cols = ?cols,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Processed tile"
        );

        Ok(TileData {
            tile_size: request.tile_size,
            channels: request.channels(),
            pixels,
        })
    }
}

fn check_request(request: &TileRequest) -> Result<()> {
    if request.tile_size == 0 {
        return Err(TileError::processing("tile size must be positive"));
    }
    if request.bands.is_empty() {
        return Err(TileError::processing("no bands requested"));
    }
    let slots = request.bands.len();
    let lengths = [
        ("nodata", request.nodata.as_ref().map(Vec::len)),
        ("normalization", request.normalization.as_ref().map(Vec::len)),
        ("displayParams", request.display_params.as_ref().map(Vec::len)),
    ];
    for (name, len) in lengths {
        if let Some(len) = len {
            if len != slots {
                return Err(TileError::processing(format!(
                    "{name} has {len} entries for {slots} bands"
                )));
            }
        }
    }
    Ok(())
}

fn check_shape(shape: &[u64], request: &TileRequest) -> Result<()> {
    if shape.len() != 4 {
        return Err(TileError::shape(format!(
            "expected 4 dimensions [time, band, row, col], got {}",
            shape.len()
        )));
    }
    if request.time_index as u64 >= shape[0] {
        return Err(TileError::shape(format!(
            "time index {} out of range for {} timesteps",
            request.time_index, shape[0]
        )));
    }
    if let Some(&band) = request.bands.iter().find(|&&b| b as u64 >= shape[1]) {
        return Err(TileError::shape(format!(
            "band {band} out of range for {} bands",
            shape[1]
        )));
    }
    Ok(())
}

fn slot_params(request: &TileRequest) -> Vec<SlotParams> {
    (0..request.bands.len())
        .map(|slot| SlotParams {
            nodata: request.nodata.as_ref().and_then(|v| v.get(slot).copied()),
            normalization: request
                .normalization
                .as_ref()
                .and_then(|v| v.get(slot).copied()),
            display: request
                .display_params
                .as_ref()
                .and_then(|v| v.get(slot).copied()),
        })
        .collect()
}

/// Interleave slot slices into a tile buffer. Slices cover the top-left
/// `rows x cols` window; the rest keeps the background.
fn compose<T: Sample>(request: &TileRequest, cols: &Range<u64>, slices: &[Vec<Pixel>]) -> Vec<T> {
    let size = request.tile_size as usize;
    let channels = request.channels();
    let alpha = request.has_alpha().then(|| channels - 1);

    let mut buffer = vec![T::default(); size * size * channels];
    if let Some(alpha) = alpha {
        for pixel in buffer.chunks_exact_mut(channels) {
            pixel[alpha] = T::OPAQUE;
        }
    }

    let width = (cols.end - cols.start) as usize;
    if width == 0 {
        return buffer;
    }
    for (slot, pixels) in slices.iter().enumerate() {
        for (i, pixel) in pixels.iter().enumerate() {
            let base = ((i / width) * size + i % width) * channels;
            buffer[base + slot] = T::from_pixel(pixel);
            if let Some(alpha) = alpha {
                if slot == 0 && pixel.nodata {
                    buffer[base + alpha] = T::TRANSPARENT;
                }
            }
        }
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use array_store::{ArrayMeta, DataType, MemoryArrayStore, StaticStoreConnector};
    use tile_config::{MinMax, NodataStrategy, TileRange};

    const URL: &str = "memory://cube";

    /// 1 time, 2 bands, 16x16 with value `band * 1000 + row * 16 + col`.
    fn store() -> MemoryArrayStore {
        let store = MemoryArrayStore::new();
        let mut values = Vec::new();
        for band in 0..2 {
            for row in 0..16 {
                for col in 0..16 {
                    values.push((band * 1000 + row * 16 + col) as f64);
                }
            }
        }
        store
            .insert_array(
                "cube/2/data",
                ArrayMeta::new(vec![1, 2, 16, 16], DataType::Float32),
                values,
            )
            .unwrap();
        store
    }

    fn processor(store: MemoryArrayStore) -> PixelProcessor {
        let connector = StaticStoreConnector::single(URL, Arc::new(store));
        PixelProcessor::new(Arc::new(connector), 4)
    }

    fn request(x: u32, y: u32) -> TileRequest {
        TileRequest {
            zoom: 2,
            tile_x: x,
            tile_y: y,
            tile_size: 4,
            tile_range: TileRange { max_x: 3, max_y: 3 },
            bands: vec![0],
            time_index: 0,
            nodata: None,
            normalization: None,
            render_type: RenderType::Raw,
            nodata_strategy: NodataStrategy::Raw,
            nodata_replace_value: 0.0,
            mask_nodata: false,
            display_params: None,
            store_url: URL.to_string(),
            store_path: "cube".to_string(),
            variable: "data".to_string(),
        }
    }

    #[tokio::test]
    async fn test_raw_tile_is_verbatim() {
        let tile = processor(store()).process(&request(1, 2)).await.unwrap();
        assert_eq!(tile.channels, 1);
        let values = tile.as_f32().unwrap();
        assert_eq!(values.len(), 16);
        // rows 8..12, cols 4..8
        assert_eq!(values[0], (8 * 16 + 4) as f32);
        assert_eq!(values[15], (11 * 16 + 7) as f32);
    }

    #[tokio::test]
    async fn test_band_order_follows_composition() {
        let mut req = request(0, 0);
        req.bands = vec![1, 0];
        let tile = processor(store()).process(&req).await.unwrap();
        assert_eq!(tile.channels, 2);
        assert_eq!(tile.get(0, 1, 0), Some(1001.0));
        assert_eq!(tile.get(0, 1, 1), Some(1.0));
    }

    #[tokio::test]
    async fn test_normalized_raw_tile() {
        let mut req = request(0, 0);
        req.normalization = Some(vec![MinMax::new(0.0, 255.0)]);
        let tile = processor(store()).process(&req).await.unwrap();
        let values = tile.as_f32().unwrap();
        assert_eq!(values[0], 0.0);
        assert!((values[1] - 1.0 / 255.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_display_tile_is_u8() {
        let mut req = request(0, 0);
        req.render_type = RenderType::Display;
        req.display_params = Some(vec![tile_config::DisplayStretch::Normalize {
            min: 0.0,
            max: 51.0,
        }]);
        let tile = processor(store()).process(&req).await.unwrap();
        let values = tile.as_u8().unwrap();
        // value 51 (row 3, col 3) hits the top of the stretch
        assert_eq!(values[0], 0);
        assert_eq!(values[3 * 4 + 3], 255);
        assert_eq!(values[1], 5);
    }

    #[tokio::test]
    async fn test_nodata_mask() {
        // value 5 sits at row 0, col 5: local (0, 1) of tile (1, 0)
        let mut req = request(1, 0);
        req.nodata = Some(vec![5.0]);
        req.mask_nodata = true;
        req.nodata_strategy = NodataStrategy::Replace;
        req.nodata_replace_value = -1.0;
        let tile = processor(store()).process(&req).await.unwrap();
        assert_eq!(tile.channels, 2);
        assert_eq!(tile.get(0, 1, 0), Some(-1.0));
        assert_eq!(tile.get(0, 1, 1), Some(0.0));
        assert_eq!(tile.get(0, 0, 1), Some(1.0));
    }

    #[tokio::test]
    async fn test_raw_strategy_nodata_is_normalized() {
        let mut req = request(1, 0);
        req.nodata = Some(vec![5.0]);
        req.mask_nodata = true;
        req.normalization = Some(vec![MinMax::new(0.0, 10.0)]);
        let tile = processor(store()).process(&req).await.unwrap();
        assert_eq!(tile.get(0, 1, 0), Some(0.5));
        assert_eq!(tile.get(0, 1, 1), Some(0.0));
        assert_eq!(tile.get(0, 0, 0), Some(0.4f32 as f64));
        assert_eq!(tile.get(0, 0, 1), Some(1.0));
    }

    #[tokio::test]
    async fn test_edge_tile_keeps_background() {
        let store = MemoryArrayStore::new();
        store
            .insert_array(
                "cube/0/data",
                ArrayMeta::new(vec![1, 1, 6, 6], DataType::Float32),
                vec![7.0; 36],
            )
            .unwrap();
        let mut req = request(1, 1);
        req.zoom = 0;
        req.tile_range = TileRange { max_x: 1, max_y: 1 };
        req.nodata = Some(vec![-9999.0]);
        req.mask_nodata = true;

        let tile = processor(store).process(&req).await.unwrap();
        // rows/cols 4..6 are data, the rest is padding
        assert_eq!(tile.get(0, 0, 0), Some(7.0));
        assert_eq!(tile.get(1, 1, 0), Some(7.0));
        assert_eq!(tile.get(1, 2, 0), Some(0.0));
        assert_eq!(tile.get(3, 3, 0), Some(0.0));
        assert_eq!(tile.get(3, 3, 1), Some(1.0));
    }

    #[tokio::test]
    async fn test_shape_errors() {
        let p = processor(store());

        let mut req = request(0, 0);
        req.time_index = 1;
        assert!(matches!(p.process(&req).await, Err(TileError::Shape(_))));

        let mut req = request(0, 0);
        req.bands = vec![2];
        assert!(matches!(p.process(&req).await, Err(TileError::Shape(_))));

        let store = MemoryArrayStore::new();
        store
            .insert_array(
                "cube/2/data",
                ArrayMeta::new(vec![16, 16], DataType::Float32),
                vec![0.0; 256],
            )
            .unwrap();
        let err = processor(store).process(&request(0, 0)).await.unwrap_err();
        assert!(matches!(err, TileError::Shape(_)));
    }

    #[tokio::test]
    async fn test_read_failure_aborts_tile() {
        let store = store();
        store.mark_unreadable("cube/2/data");
        let mut req = request(0, 0);
        req.bands = vec![0, 1];
        let err = processor(store).process(&req).await.unwrap_err();
        assert!(matches!(err, TileError::Store(_)));
    }

    #[tokio::test]
    async fn test_mismatched_slot_params() {
        let mut req = request(0, 0);
        req.nodata = Some(vec![0.0, 1.0]);
        let err = processor(store()).process(&req).await.unwrap_err();
        assert!(matches!(err, TileError::Processing(_)));
    }

    #[tokio::test]
    async fn test_handles_are_cached() {
        let p = processor(store());
        p.process(&request(0, 0)).await.unwrap();
        p.process(&request(1, 0)).await.unwrap();
        let stats = p.cache_stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
    }
}
