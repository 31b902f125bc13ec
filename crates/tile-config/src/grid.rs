//! Tile grid geometry: resolutions per zoom and tile index bounds.

use serde::{Deserialize, Serialize};

use crate::types::Extent;

/// Highest valid tile index along each axis at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileRange {
    pub max_x: u32,
    pub max_y: u32,
}

/// Resolution for every zoom from 0 to the highest supported level.
///
/// Supported levels keep their exact resolution. Levels below the lowest
/// supported zoom double per step. Gaps between supported levels are filled
/// geometrically, so the table never increases with zoom.
pub fn full_resolution_table(zoom_levels: &[u32], resolutions: &[f64]) -> Vec<f64> {
    let (Some(&first_zoom), Some(&last_zoom)) = (zoom_levels.first(), zoom_levels.last()) else {
        return Vec::new();
    };

    let mut table = Vec::with_capacity(last_zoom as usize + 1);
    for z in 0..=last_zoom {
        let res = if z <= first_zoom {
            resolutions[0] * 2f64.powi((first_zoom - z) as i32)
        } else {
            // index of the first supported level at or above z
            let upper = zoom_levels.partition_point(|&level| level < z);
            if zoom_levels[upper] == z {
                resolutions[upper]
            } else {
                let (z0, z1) = (zoom_levels[upper - 1], zoom_levels[upper]);
                let (r0, r1) = (resolutions[upper - 1], resolutions[upper]);
                let t = (z - z0) as f64 / (z1 - z0) as f64;
                r0 * (r1 / r0).powf(t)
            }
        };
        table.push(res);
    }
    table
}

/// The tile grid of a resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    extent: Extent,
    zoom_levels: Vec<u32>,
    tile_size: u32,
    table: Vec<f64>,
}

impl TileGrid {
    /// `zoom_levels` and `resolutions` must already be validated.
    pub fn new(extent: Extent, zoom_levels: &[u32], resolutions: &[f64], tile_size: u32) -> Self {
        Self {
            extent,
            zoom_levels: zoom_levels.to_vec(),
            tile_size,
            table: full_resolution_table(zoom_levels, resolutions),
        }
    }

    pub fn supports(&self, zoom: u32) -> bool {
        self.zoom_levels.binary_search(&zoom).is_ok()
    }

    pub fn zoom_levels(&self) -> &[u32] {
        &self.zoom_levels
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn max_zoom(&self) -> Option<u32> {
        self.zoom_levels.last().copied()
    }

    /// Resolution at any zoom up to the highest supported level.
    pub fn resolution(&self, zoom: u32) -> Option<f64> {
        self.table.get(zoom as usize).copied()
    }

    pub fn resolutions(&self) -> &[f64] {
        &self.table
    }

    /// Tile index bounds at a zoom level.
    pub fn tile_range(&self, zoom: u32) -> Option<TileRange> {
        let res = self.resolution(zoom)?;
        let tiles = |span: f64| -> u32 {
            let pixels = (span / res).round().max(1.0);
            ((pixels / self.tile_size as f64).ceil() as u32).saturating_sub(1)
        };
        Some(TileRange {
            max_x: tiles(self.extent.width()),
            max_y: tiles(self.extent.height()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_exact_at_supported_levels() {
        let zooms = [2, 3, 6];
        let res = [1000.0, 500.0, 62.5];
        let table = full_resolution_table(&zooms, &res);

        assert_eq!(table.len(), 7);
        assert_eq!(table[0], 4000.0);
        assert_eq!(table[1], 2000.0);
        for (z, r) in zooms.iter().zip(res) {
            assert_eq!(table[*z as usize], r);
        }
        assert!((table[4] - 250.0).abs() < 1e-9);
        for pair in table.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
    }

    #[test]
    fn test_table_empty_input() {
        assert!(full_resolution_table(&[], &[]).is_empty());
    }

    #[test]
    fn test_tile_range_divisible_extent() {
        let grid = TileGrid::new(Extent::new(0.0, 0.0, 16.0, 16.0), &[0, 1, 2], &[4.0, 2.0, 1.0], 4);
        assert!(grid.supports(2));
        assert!(!grid.supports(3));
        assert_eq!(grid.tile_range(2), Some(TileRange { max_x: 3, max_y: 3 }));
        assert_eq!(grid.tile_range(1), Some(TileRange { max_x: 1, max_y: 1 }));
        assert_eq!(grid.tile_range(0), Some(TileRange { max_x: 0, max_y: 0 }));
        assert_eq!(grid.tile_range(3), None);
    }

    #[test]
    fn test_tile_range_partial_tile() {
        let grid = TileGrid::new(Extent::new(0.0, 0.0, 10.0, 6.0), &[0], &[1.0], 4);
        assert_eq!(grid.tile_range(0), Some(TileRange { max_x: 2, max_y: 1 }));
    }
}
