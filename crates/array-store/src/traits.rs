//! Store traits.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::types::{ArrayData, ArrayMeta, Selection};

/// A chunked array store: a tree of groups and arrays addressed by path.
///
/// Paths are `/`-separated and relative to the store root; leading and
/// trailing slashes are ignored.
#[async_trait]
pub trait ArrayStore: Send + Sync {
    /// Open an array node and read its metadata.
    async fn open_array(&self, path: &str) -> Result<Arc<dyn ArrayHandle>>;

    /// Read the attribute document of a group (or array) node.
    async fn attributes(&self, path: &str) -> Result<Map<String, Value>>;
}

/// An opened array.
#[async_trait]
pub trait ArrayHandle: Send + Sync {
    /// Shape, dtype, fill value and attributes.
    fn meta(&self) -> &ArrayMeta;

    /// Read a hyper-rectangular selection, one entry per axis.
    async fn get(&self, selection: &[Selection]) -> Result<ArrayData>;
}

/// Join path segments into a normalized store path (no leading slash).
pub fn join_path(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|p| p.split('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
