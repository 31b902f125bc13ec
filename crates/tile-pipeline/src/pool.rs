//! Worker pool.
//!
//! Acquisition never waits: an idle unit is reused when there is one,
//! otherwise a new unit is spawned. Released units go back to the idle set
//! until it reaches `max_idle`; beyond that they are dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use array_store::StoreConnector;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, TileError};
use crate::protocol::{TileData, TileRequest, WorkerResponse};
use crate::worker::WorkerUnit;

/// Pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Maximum number of idle units kept for reuse.
    pub max_idle: usize,

    /// Opened array handles cached per unit.
    pub handle_cache_size: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            max_idle: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            handle_cache_size: 32,
        }
    }
}

impl WorkerPoolConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("TILE_WORKER_POOL_SIZE") {
            if let Ok(size) = val.parse() {
                config.max_idle = size;
            }
        }

        if let Ok(val) = std::env::var("TILE_WORKER_HANDLE_CACHE") {
            if let Ok(size) = val.parse() {
                config.handle_cache_size = size;
            }
        }

        config
    }

    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }
}

/// Pool of [`WorkerUnit`]s sharing one store connector.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    connector: Arc<dyn StoreConnector>,
    idle: Mutex<Vec<WorkerUnit>>,
    spawned: AtomicUsize,
}

impl WorkerPool {
    pub fn new(config: WorkerPoolConfig, connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            config,
            connector,
            idle: Mutex::new(Vec::new()),
            spawned: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    pub fn connector(&self) -> Arc<dyn StoreConnector> {
        self.connector.clone()
    }

    /// Take an idle unit or spawn a new one. Must run inside a tokio runtime.
    pub fn acquire(&self) -> WorkerUnit {
        loop {
            let reused = self.idle.lock().pop();
            match reused {
                Some(unit) if unit.is_alive() => return unit,
                Some(unit) => debug!(worker = unit.id(), "Discarding dead worker"),
                None => break,
            }
        }
        let id = self.spawned.fetch_add(1, Ordering::Relaxed);
        WorkerUnit::spawn(id, self.connector.clone(), self.config.handle_cache_size)
    }

    /// Return a unit to the pool, or drop it when the idle set is full.
    pub fn release(&self, unit: WorkerUnit) {
        let mut idle = self.idle.lock();
        if idle.len() < self.config.max_idle {
            idle.push(unit);
        } else {
            debug!(worker = unit.id(), "Idle set full, dropping worker");
        }
    }

    /// Drop every idle unit. Returns how many were dropped.
    pub fn drain(&self) -> usize {
        let drained = std::mem::take(&mut *self.idle.lock());
        let count = drained.len();
        info!(count, "Drained worker pool");
        count
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Total units spawned over the pool's lifetime.
    pub fn spawned_count(&self) -> usize {
        self.spawned.load(Ordering::Relaxed)
    }

    /// Run one request on a pooled unit.
    ///
    /// The unit is released once it has replied, whether the tile succeeded
    /// or failed. A unit that disconnected is not returned to the pool.
    pub async fn dispatch(&self, request: TileRequest) -> Result<TileData> {
        let unit = self.acquire();
        debug!(
            worker = unit.id(),
            zoom = request.zoom,
            x = request.tile_x,
            y = request.tile_y,
            "Dispatching tile"
        );
        let response = unit.submit(request).await?;
        self.release(unit);
        match response {
            WorkerResponse::Success { tile_data } => Ok(tile_data),
            WorkerResponse::Failure { error } => Err(TileError::Processing(error)),
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("idle", &self.idle_count())
            .field("spawned", &self.spawned_count())
            .finish()
    }
}
