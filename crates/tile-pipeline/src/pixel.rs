//! Per-pixel arithmetic and tile-to-array index mapping.

use std::ops::Range;

use tile_config::{DisplayStretch, MinMax, NodataStrategy, RenderType};

/// True when `value` is the no-data value. A NaN no-data matches NaN.
#[inline]
pub fn is_nodata(value: f64, nodata: f64) -> bool {
    if nodata.is_nan() {
        value.is_nan()
    } else {
        value == nodata
    }
}

/// Array index range covered by tile `index` along one axis.
///
/// The last tile is shortened by the padding `tile_size - dim % tile_size`
/// when the dimension is not a multiple of the tile size. The result is
/// always clipped to `dim` and may be empty.
pub fn tile_axis_range(index: u32, max_index: u32, tile_size: u32, dim: u64) -> Range<u64> {
    let size = tile_size as u64;
    let start = index as u64 * size;
    let mut end = start + size;

    let remainder = dim % size;
    if index == max_index && remainder != 0 {
        end -= size - remainder;
    }
    let end = end.min(dim);

    if start >= end {
        start..start
    } else {
        start..end
    }
}

/// Parameters of one composition slot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SlotParams {
    pub nodata: Option<f64>,
    pub normalization: Option<MinMax>,
    pub display: Option<DisplayStretch>,
}

impl SlotParams {
    /// Range used when a no-data pixel must be normalized. Falls back to the
    /// display range when only a display normalize stretch is configured.
    fn nodata_range(&self) -> Option<MinMax> {
        self.normalization.or(match self.display {
            Some(DisplayStretch::Normalize { min, max }) => Some(MinMax::new(min, max)),
            _ => None,
        })
    }
}

/// Options shared by every slot of a tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelOptions {
    pub render_type: RenderType,
    pub nodata_strategy: NodataStrategy,
    pub nodata_replace_value: f64,
}

/// A transformed pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixel {
    pub value: f64,
    /// Value lies on the `[0, 1]` scale.
    pub scaled: bool,
    pub nodata: bool,
}

/// Apply the no-data strategy, then the value transform.
///
/// Flagged pixels keep their strategy value, except under the raw strategy
/// where the value goes through the same transform as valid data.
pub fn transform(value: f64, slot: &SlotParams, options: &PixelOptions) -> Pixel {
    let flagged = slot.nodata.is_some_and(|nodata| is_nodata(value, nodata));
    if flagged {
        let resolved = match options.nodata_strategy {
            NodataStrategy::Raw => None,
            NodataStrategy::Normalize => Some(match slot.nodata_range() {
                Some(range) => (range.normalize(value), true),
                None => (value, false),
            }),
            NodataStrategy::NormalizeClamp => Some(match slot.nodata_range() {
                Some(range) => (range.normalize(value).clamp(0.0, 1.0), true),
                None => (value, false),
            }),
            NodataStrategy::Replace => Some((options.nodata_replace_value, false)),
        };
        if let Some((value, scaled)) = resolved {
            return Pixel {
                value,
                scaled,
                nodata: true,
            };
        }
    }

    let (value, scaled) = match (options.render_type, slot.display, slot.normalization) {
        (RenderType::Display, Some(stretch), _) => (stretch.apply(value), true),
        (RenderType::Raw, _, Some(range)) => (range.normalize(value), true),
        _ => (value, false),
    };
    Pixel {
        value,
        scaled,
        nodata: flagged,
    }
}

/// Output element type of a tile buffer.
pub trait Sample: Copy + Default + bytemuck::Pod {
    const OPAQUE: Self;
    const TRANSPARENT: Self;

    fn from_pixel(pixel: &Pixel) -> Self;
}

impl Sample for u8 {
    const OPAQUE: Self = 255;
    const TRANSPARENT: Self = 0;

    /// `[0, 1]` values scale to `0..=255`; other values are clamped as-is.
    fn from_pixel(pixel: &Pixel) -> Self {
        let v = if pixel.scaled {
            pixel.value * 255.0
        } else {
            pixel.value
        };
        // NaN saturates to 0
        v.round().clamp(0.0, 255.0) as u8
    }
}

impl Sample for f32 {
    const OPAQUE: Self = 1.0;
    const TRANSPARENT: Self = 0.0;

    fn from_pixel(pixel: &Pixel) -> Self {
        pixel.value as f32
    }
}
