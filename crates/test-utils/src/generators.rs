//! Test data generators for synthetic band cubes.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

/// Value stored at `(time, band, row, col)` by [`create_test_cube`].
///
/// `t * 1_000_000 + b * 10_000 + row * 100 + col`, so any value read back
/// identifies exactly where it came from (for grids up to 100x100).
pub fn cube_value(time: usize, band: usize, row: usize, col: usize) -> f64 {
    (time * 1_000_000 + band * 10_000 + row * 100 + col) as f64
}

/// Creates a `[times, bands, rows, cols]` cube, row-major.
///
/// # Example
///
/// ```
/// use test_utils::{create_test_cube, cube_value};
///
/// let cube = create_test_cube(2, 3, 4, 5);
/// assert_eq!(cube.len(), 2 * 3 * 4 * 5);
/// assert_eq!(cube[0], 0.0);
/// assert_eq!(cube[1], cube_value(0, 0, 0, 1));
/// assert_eq!(cube[5], cube_value(0, 0, 1, 0));
/// ```
pub fn create_test_cube(times: usize, bands: usize, rows: usize, cols: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(times * bands * rows * cols);
    for t in 0..times {
        for b in 0..bands {
            for row in 0..rows {
                for col in 0..cols {
                    data.push(cube_value(t, b, row, col));
                }
            }
        }
    }
    data
}

/// Creates a cube filled with a constant.
pub fn create_constant_cube(times: usize, bands: usize, rows: usize, cols: usize, value: f64) -> Vec<f64> {
    vec![value; times * bands * rows * cols]
}

/// Replaces the values at the given `(time, band, row, col)` positions.
///
/// Useful for planting no-data sentinels into an otherwise regular cube.
pub fn plant_values(
    cube: &mut [f64],
    shape: [usize; 4],
    positions: &[(usize, usize, usize, usize)],
    value: f64,
) {
    let [_, bands, rows, cols] = shape;
    for &(t, b, r, c) in positions {
        let idx = ((t * bands + b) * rows + r) * cols + c;
        if idx < cube.len() {
            cube[idx] = value;
        }
    }
}

/// Per-band statistics `[bands, keys]` with keys `[min, max, mean, std]`
/// matching [`create_test_cube`] for a single time step.
pub fn cube_band_statistics(bands: usize, rows: usize, cols: usize) -> Vec<f64> {
    let mut stats = Vec::with_capacity(bands * 4);
    for b in 0..bands {
        let min = cube_value(0, b, 0, 0);
        let max = cube_value(0, b, rows - 1, cols - 1);
        stats.extend([min, max, (min + max) / 2.0, (max - min) / 4.0]);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_layout() {
        let cube = create_test_cube(2, 2, 3, 4);
        let idx = ((1 * 2 + 1) * 3 + 2) * 4 + 3;
        assert_eq!(cube[idx], cube_value(1, 1, 2, 3));
    }

    #[test]
    fn test_plant_values() {
        let mut cube = create_test_cube(1, 1, 2, 2);
        plant_values(&mut cube, [1, 1, 2, 2], &[(0, 0, 1, 1)], -9999.0);
        assert_eq!(cube, vec![0.0, 1.0, 100.0, -9999.0]);
    }

    #[test]
    fn test_band_statistics() {
        let stats = cube_band_statistics(2, 4, 4);
        assert_eq!(stats.len(), 8);
        assert_eq!(stats[0], 0.0);
        assert_eq!(stats[1], 303.0);
        assert_eq!(stats[4], 10_000.0);
    }
}
