//! Core configuration types.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    User,
    Dataset,
    Fallback,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user input"),
            Self::Dataset => write!(f, "dataset metadata"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Spatial extent of the dataset in CRS units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

/// A key along the time axis. Uniform within one dataset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeKey {
    Id(i64),
    Date(DateTime<Utc>),
    Name(String),
}

impl std::fmt::Display for TimeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Date(date) => write!(f, "{}", date.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

/// No-data configuration, tagged with its shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "format", content = "values", rename_all = "snake_case")]
pub enum Nodata {
    #[default]
    None,
    /// One value for every band.
    Scalar(f64),
    /// One value per composition slot.
    PerComposition(Vec<f64>),
    /// One value per dataset band.
    PerDataset(Vec<f64>),
}

impl Nodata {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// No-data value for each slot of the given band composition.
    ///
    /// Returns `None` when no-data is not configured.
    pub fn for_bands(&self, bands: &[usize]) -> Option<Vec<f64>> {
        match self {
            Self::None => None,
            Self::Scalar(v) => Some(vec![*v; bands.len()]),
            Self::PerComposition(values) => Some(
                (0..bands.len())
                    .map(|slot| values.get(slot).copied().unwrap_or(f64::NAN))
                    .collect(),
            ),
            Self::PerDataset(values) => Some(
                bands
                    .iter()
                    .map(|&b| values.get(b).copied().unwrap_or(f64::NAN))
                    .collect(),
            ),
        }
    }
}

/// A closed value range used for normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

impl MinMax {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `(value - min) / (max - min)`, unclamped. A degenerate range maps to 0.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span == 0.0 {
            0.0
        } else {
            (value - self.min) / span
        }
    }

    /// Inverse of [`MinMax::normalize`].
    pub fn denormalize(&self, normalized: f64) -> f64 {
        self.min + normalized * (self.max - self.min)
    }

}

fn canonical_name(s: &str) -> String {
    s.trim().to_lowercase().replace('-', "_")
}

/// How pixels are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderType {
    /// Scientific values as 32-bit floats.
    #[default]
    Raw,
    /// Display-ready 8-bit values.
    Display,
}

impl FromStr for RenderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical_name(s).as_str() {
            "raw" => Ok(Self::Raw),
            "display" => Ok(Self::Display),
            other => Err(format!("expected 'raw' or 'display', got '{other}'")),
        }
    }
}

/// What happens to a pixel that matches no-data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodataStrategy {
    /// Pass the value through unchanged.
    #[default]
    Raw,
    /// Apply the band normalization.
    Normalize,
    /// Apply the band normalization, clamped to `[0, 1]`.
    NormalizeClamp,
    /// Substitute a fixed value.
    Replace,
}

impl FromStr for NodataStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical_name(s).as_str() {
            "raw" => Ok(Self::Raw),
            "normalize" => Ok(Self::Normalize),
            "normalize_clamp" => Ok(Self::NormalizeClamp),
            "replace" => Ok(Self::Replace),
            other => Err(format!(
                "expected one of raw, normalize, normalize_clamp, replace; got '{other}'"
            )),
        }
    }
}

/// Scope over which normalization ranges are taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeStrategy {
    /// One range across all bands and all times.
    Global,
    /// One range per time step, across bands.
    GlobalBandPerTime,
    /// One range per band, across times.
    PerBandGlobalTime,
    /// The band's own statistics at the current time.
    #[default]
    PerBandPerTime,
}

impl FromStr for NormalizeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical_name(s).as_str() {
            "global" => Ok(Self::Global),
            "global_band_per_time" => Ok(Self::GlobalBandPerTime),
            "per_band_global_time" => Ok(Self::PerBandGlobalTime),
            "per_band_per_time" => Ok(Self::PerBandPerTime),
            other => Err(format!(
                "expected one of global, global-band-per-time, per-band-global-time, per-band-per-time; got '{other}'"
            )),
        }
    }
}

/// Normalization: which statistics keys bound the range, and their scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeSpec {
    pub min_key: String,
    pub max_key: String,
    pub strategy: NormalizeStrategy,
}

/// Display stretch applied for the `display` render type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum DisplayRenderConfig {
    Normalize {
        min_key: String,
        max_key: String,
    },
    StdStretch {
        mean_key: String,
        std_key: String,
        slope: f64,
    },
}

/// Display stretch parameters resolved for one band at one time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayStretch {
    Normalize { min: f64, max: f64 },
    StdStretch { mean: f64, std: f64, slope: f64 },
}

impl DisplayStretch {
    /// Map a value into `[0, 1]`.
    pub fn apply(&self, value: f64) -> f64 {
        match *self {
            Self::Normalize { min, max } => MinMax::new(min, max).normalize(value).clamp(0.0, 1.0),
            Self::StdStretch { mean, std, slope } => {
                let spread = slope * std;
                if spread == 0.0 {
                    0.5
                } else {
                    (0.5 + (value - mean) / spread).clamp(0.0, 1.0)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_stretch() {
        let normalize = DisplayStretch::Normalize { min: 0.0, max: 200.0 };
        assert_eq!(normalize.apply(50.0), 0.25);
        assert_eq!(normalize.apply(-10.0), 0.0);
        assert_eq!(normalize.apply(400.0), 1.0);

        let stretch = DisplayStretch::StdStretch { mean: 100.0, std: 10.0, slope: 2.0 };
        assert_eq!(stretch.apply(100.0), 0.5);
        assert_eq!(stretch.apply(110.0), 1.0);
        assert_eq!(stretch.apply(95.0), 0.25);
        assert_eq!(stretch.apply(0.0), 0.0);
    }

    #[test]
    fn test_normalize_round_trip() {
        let range = MinMax::new(-20.0, 45.0);
        for value in [-20.0, -3.5, 0.0, 12.25, 45.0, 100.0] {
            let n = range.normalize(value);
            assert!((range.denormalize(n) - value).abs() < 1e-9);
        }
        assert_eq!(range.normalize(-20.0), 0.0);
        assert_eq!(range.normalize(45.0), 1.0);
    }

    #[test]
    fn test_normalize_degenerate_range() {
        assert_eq!(MinMax::new(5.0, 5.0).normalize(7.0), 0.0);
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!("per-band-per-time".parse(), Ok(NormalizeStrategy::PerBandPerTime));
        assert_eq!("GLOBAL_BAND_PER_TIME".parse(), Ok(NormalizeStrategy::GlobalBandPerTime));
        assert_eq!("normalize-clamp".parse(), Ok(NodataStrategy::NormalizeClamp));
        assert_eq!("Display".parse(), Ok(RenderType::Display));
        assert!("median".parse::<NormalizeStrategy>().is_err());
    }

    #[test]
    fn test_nodata_for_bands() {
        let bands = [2, 0, 2];
        assert_eq!(Nodata::None.for_bands(&bands), None);
        assert_eq!(Nodata::Scalar(-1.0).for_bands(&bands), Some(vec![-1.0; 3]));
        assert_eq!(
            Nodata::PerComposition(vec![1.0, 2.0, 3.0]).for_bands(&bands),
            Some(vec![1.0, 2.0, 3.0])
        );
        assert_eq!(
            Nodata::PerDataset(vec![10.0, 11.0, 12.0, 13.0]).for_bands(&bands),
            Some(vec![12.0, 10.0, 12.0])
        );
    }

    #[test]
    fn test_time_key_display() {
        let date = DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(TimeKey::Id(4).to_string(), "4");
        assert_eq!(TimeKey::Date(date).to_string(), "2024-03-01T00:00:00Z");
        assert_eq!(TimeKey::Name("run-a".into()).to_string(), "run-a");
    }
}
