//! Cross-band and cross-time normalization ranges.
//!
//! Computed once at resolution time so that the non-local normalization
//! strategies cost nothing per tile.

use serde::{Deserialize, Serialize};

use crate::statistics::Statistics;
use crate::types::MinMax;

/// Pre-computed min/max reductions over the statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationAggregates {
    /// Across every band and every time.
    pub global: MinMax,
    /// One per timestep, across bands.
    pub per_time: Vec<MinMax>,
    /// One per statistics row, across times.
    pub per_band: Vec<MinMax>,
    fallback: MinMax,
}

fn reduce(mins: impl IntoIterator<Item = f64>, maxs: impl IntoIterator<Item = f64>) -> Option<MinMax> {
    let min = mins
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))?;
    let max = maxs
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))?;
    Some(MinMax::new(min, max))
}

impl NormalizationAggregates {
    /// Reduce `statistics` using `min_key` for lower bounds and `max_key` for
    /// upper bounds. Anything that cannot be computed becomes `fallback`.
    pub fn compute(
        statistics: &Statistics,
        min_key: &str,
        max_key: &str,
        timestamp_count: usize,
        fallback: MinMax,
    ) -> Self {
        let rows = 0..statistics.num_rows();

        let per_band: Vec<MinMax> = rows
            .clone()
            .map(|row| {
                reduce(
                    statistics.row_values(row, min_key),
                    statistics.row_values(row, max_key),
                )
                .unwrap_or(fallback)
            })
            .collect();

        let per_time: Vec<MinMax> = (0..timestamp_count)
            .map(|t| {
                reduce(
                    rows.clone().filter_map(|row| statistics.value_at(row, min_key, t)),
                    rows.clone().filter_map(|row| statistics.value_at(row, max_key, t)),
                )
                .unwrap_or(fallback)
            })
            .collect();

        let global = reduce(
            rows.clone()
                .flat_map(|row| statistics.row_values(row, min_key)),
            rows.flat_map(|row| statistics.row_values(row, max_key)),
        )
        .unwrap_or(fallback);

        tracing::debug!(
            min_key,
            max_key,
            global_min = global.min,
            global_max = global.max,
            bands = per_band.len(),
            times = per_time.len(),
            "Computed normalization aggregates"
        );

        Self {
            global,
            per_time,
            per_band,
            fallback,
        }
    }

    pub fn for_time(&self, time: usize) -> MinMax {
        self.per_time.get(time).copied().unwrap_or(self.fallback)
    }

    pub fn for_row(&self, row: usize) -> MinMax {
        self.per_band.get(row).copied().unwrap_or(self.fallback)
    }
}
