//! A worker unit: one task that processes tile requests sequentially.
//!
//! Requests reach the task over an `mpsc` channel together with a `oneshot`
//! reply sender. Dropping the unit closes the channel and the task exits
//! after the request it is working on.

use std::sync::Arc;

use array_store::StoreConnector;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{Result, TileError};
use crate::processor::PixelProcessor;
use crate::protocol::{TileRequest, WorkerResponse};

struct Job {
    request: TileRequest,
    reply: oneshot::Sender<WorkerResponse>,
}

/// Handle to a running worker task.
#[derive(Debug)]
pub struct WorkerUnit {
    id: usize,
    sender: mpsc::Sender<Job>,
}

impl WorkerUnit {
    /// Spawn the worker task on the current tokio runtime.
    pub fn spawn(id: usize, connector: Arc<dyn StoreConnector>, handle_cache_size: usize) -> Self {
        let (sender, receiver) = mpsc::channel(1);
        let processor = PixelProcessor::new(connector, handle_cache_size);
        tokio::spawn(run(id, receiver, processor));
        debug!(worker = id, "Spawned tile worker");
        Self { id, sender }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Whether the task is still receiving.
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Send a request and wait for the reply.
    pub async fn submit(&self, request: TileRequest) -> Result<WorkerResponse> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Job { request, reply })
            .await
            .map_err(|_| TileError::WorkerDisconnected(self.id))?;
        response
            .await
            .map_err(|_| TileError::WorkerDisconnected(self.id))
    }
}

async fn run(id: usize, mut receiver: mpsc::Receiver<Job>, processor: PixelProcessor) {
    while let Some(Job { request, reply }) = receiver.recv().await {
        let response = match processor.process(&request).await {
            Ok(tile_data) => WorkerResponse::Success { tile_data },
            Err(e) => {
                warn!(
                    worker = id,
                    zoom = request.zoom,
                    x = request.tile_x,
                    y = request.tile_y,
                    error = %e,
                    "Tile processing failed"
                );
                WorkerResponse::Failure {
                    error: e.to_string(),
                }
            }
        };
        // the caller may have dropped its future
        let _ = reply.send(response);
    }
    debug!(worker = id, "Tile worker stopped");
}
