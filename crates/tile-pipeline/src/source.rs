//! The tile source: view state over one resolved dataset.
//!
//! A source is created asynchronously (configuration resolution) and then
//! only changes through its view state: the time index and the band
//! composition. Any change invalidates the derived values and bumps a
//! revision counter that hosts watch to re-request visible tiles. Derived
//! values are recomputed lazily on the next tile request.

use std::future::Future;
use std::sync::Arc;

use tile_config::{validate, ResolvedConfig, TileGrid, TileSourceOptions, TimeKey};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::derived::DerivedValues;
use crate::error::{Result, TileError};
use crate::pool::WorkerPool;
use crate::protocol::{TileData, TileRequest};

pub struct TileSource {
    config: Arc<ResolvedConfig>,
    grid: TileGrid,
    pool: Arc<WorkerPool>,
    time_index: usize,
    bands: Vec<usize>,
    derived: Option<DerivedValues>,
    revision: watch::Sender<u64>,
}

impl TileSource {
    /// Resolve the configuration through the pool's store connector.
    pub async fn create(options: &TileSourceOptions, pool: Arc<WorkerPool>) -> Result<Self> {
        let connector = pool.connector();
        let config = ResolvedConfig::load(options, connector.as_ref()).await?;

        info!(
            url = %config.url,
            path = %config.path,
            shape = ?config.shape,
            zoom_levels = ?config.zoom_levels,
            bands = ?config.bands,
            timestamps = config.timestamps.len(),
            render_type = ?config.render_type,
            "Created tile source"
        );

        Ok(Self::from_config(config, pool))
    }

    /// Wrap an already resolved configuration.
    pub fn from_config(config: ResolvedConfig, pool: Arc<WorkerPool>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            grid: config.grid(),
            bands: config.bands.clone(),
            config: Arc::new(config),
            pool,
            time_index: 0,
            derived: None,
            revision,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn time_index(&self) -> usize {
        self.time_index
    }

    pub fn bands(&self) -> &[usize] {
        &self.bands
    }

    pub fn current_timestamp(&self) -> Option<&TimeKey> {
        self.config.timestamps.get(self.time_index)
    }

    /// Receiver that observes a new revision after every view change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn last_time_index(&self) -> usize {
        self.config.timestamps.len().saturating_sub(1)
    }

    fn mark_dirty(&mut self) {
        self.derived = None;
        self.revision.send_modify(|r| *r += 1);
        debug!(
            time_index = self.time_index,
            bands = ?self.bands,
            revision = *self.revision.borrow(),
            "Tile source view changed"
        );
    }

    /// Move to a time index, clamped to the available timestamps.
    /// Returns whether the index changed.
    pub fn set_time_index(&mut self, index: i64) -> bool {
        let index = index.clamp(0, self.last_time_index() as i64) as usize;
        if index == self.time_index {
            return false;
        }
        self.time_index = index;
        self.mark_dirty();
        true
    }

    /// Replace the band composition. The number of bands is fixed by the
    /// configuration.
    pub fn set_bands(&mut self, bands: Vec<usize>) -> Result<bool> {
        if bands.len() != self.config.bands.len() {
            return Err(TileError::invalid_state(format!(
                "expected {} bands, got {}",
                self.config.bands.len(),
                bands.len()
            )));
        }
        validate::check_bands(&bands, Some(self.config.band_count))
            .map_err(TileError::invalid_state)?;
        if bands == self.bands {
            return Ok(false);
        }
        self.bands = bands;
        self.mark_dirty();
        Ok(true)
    }

    /// Move to the index of a known timestamp.
    pub fn set_timestamp(&mut self, key: &TimeKey) -> Result<bool> {
        let index = self
            .config
            .timestamps
            .iter()
            .position(|k| k == key)
            .ok_or_else(|| TileError::invalid_state(format!("unknown timestamp {key}")))?;
        Ok(self.set_time_index(index as i64))
    }

    pub fn next_timestep(&mut self) -> bool {
        self.step(1)
    }

    pub fn previous_timestep(&mut self) -> bool {
        self.step(-1)
    }

    pub fn next_timesteps(&mut self, n: i64) -> Result<bool> {
        Ok(self.step(check_step(n)?))
    }

    pub fn previous_timesteps(&mut self, n: i64) -> Result<bool> {
        Ok(self.step(-check_step(n)?))
    }

    fn step(&mut self, delta: i64) -> bool {
        self.set_time_index((self.time_index as i64).saturating_add(delta))
    }

    /// Derived values for the current view, recomputed when stale.
    pub fn derived(&mut self) -> &DerivedValues {
        let fresh = matches!(
            &self.derived,
            Some(d) if d.matches(self.time_index, &self.bands)
        );
        if !fresh {
            debug!(time_index = self.time_index, bands = ?self.bands, "Recomputing derived values");
            self.derived = None;
        }
        self.derived
            .get_or_insert_with(|| DerivedValues::compute(&self.config, self.time_index, &self.bands))
    }

    /// Build the worker request for a tile, or `None` for unsupported zooms.
    pub fn tile_request(&mut self, zoom: u32, x: u32, y: u32) -> Option<TileRequest> {
        let tile_range = self.grid.tile_range(zoom)?;
        let derived = self.derived().clone();
        let config = &self.config;
        Some(TileRequest {
            zoom,
            tile_x: x,
            tile_y: y,
            tile_size: config.tile_size,
            tile_range,
            bands: derived.bands,
            time_index: derived.time_index,
            nodata: derived.nodata,
            normalization: derived.normalization,
            render_type: config.render_type,
            nodata_strategy: config.nodata_strategy,
            nodata_replace_value: config.nodata_replace_value,
            mask_nodata: config.mask_nodata,
            display_params: derived.display,
            store_url: config.url.clone(),
            store_path: config.path.clone(),
            variable: config.variable.clone(),
        })
    }

    /// Load a tile. Returns `None` without dispatching when the zoom level
    /// is not supported; otherwise a future resolving to the tile.
    pub fn load_tile(
        &mut self,
        zoom: u32,
        x: u32,
        y: u32,
    ) -> Option<impl Future<Output = Result<TileData>> + Send + 'static> {
        let request = self.tile_request(zoom, x, y)?;
        let pool = self.pool.clone();
        Some(async move { pool.dispatch(request).await })
    }
}

fn check_step(n: i64) -> Result<i64> {
    if n < 0 {
        return Err(TileError::invalid_state(format!(
            "step count must not be negative, got {n}"
        )));
    }
    Ok(n)
}

impl std::fmt::Debug for TileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileSource")
            .field("url", &self.config.url)
            .field("path", &self.config.path)
            .field("time_index", &self.time_index)
            .field("bands", &self.bands)
            .field("revision", &self.revision())
            .finish()
    }
}
