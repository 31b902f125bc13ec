//! Core types shared by every store implementation.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Numeric element type of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl DataType {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// The full representable range of the type, as `(min, max)`.
    ///
    /// Used as the last-resort normalization range when a dataset ships no
    /// statistics.
    pub fn numeric_range(&self) -> (f64, f64) {
        match self {
            Self::Int8 => (i8::MIN as f64, i8::MAX as f64),
            Self::Int16 => (i16::MIN as f64, i16::MAX as f64),
            Self::Int32 => (i32::MIN as f64, i32::MAX as f64),
            Self::Int64 => (i64::MIN as f64, i64::MAX as f64),
            Self::UInt8 => (0.0, u8::MAX as f64),
            Self::UInt16 => (0.0, u16::MAX as f64),
            Self::UInt32 => (0.0, u32::MAX as f64),
            Self::UInt64 => (0.0, u64::MAX as f64),
            Self::Float32 => (f32::MIN as f64, f32::MAX as f64),
            Self::Float64 => (f64::MIN, f64::MAX),
        }
    }

    /// Decode a native-endian scalar of this type.
    pub fn decode_ne(&self, bytes: &[u8]) -> Option<f64> {
        macro_rules! decode {
            ($t:ty) => {
                bytes.try_into().ok().map(|b| <$t>::from_ne_bytes(b) as f64)
            };
        }
        match self {
            Self::Int8 => decode!(i8),
            Self::Int16 => decode!(i16),
            Self::Int32 => decode!(i32),
            Self::Int64 => decode!(i64),
            Self::UInt8 => decode!(u8),
            Self::UInt16 => decode!(u16),
            Self::UInt32 => decode!(u32),
            Self::UInt64 => decode!(u64),
            Self::Float32 => decode!(f32),
            Self::Float64 => decode!(f64),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shape, type and attributes of an opened array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayMeta {
    pub shape: Vec<u64>,
    pub dtype: DataType,
    /// Fill value, `None` when the array declares none.
    pub fill_value: Option<f64>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ArrayMeta {
    pub fn new(shape: Vec<u64>, dtype: DataType) -> Self {
        Self {
            shape,
            dtype,
            fill_value: None,
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = Some(fill_value);
        self
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }
}

/// Selection along one axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    /// A single index; the axis is dropped from the result shape.
    Index(u64),
    /// A half-open range; the axis is kept.
    Range(Range<u64>),
}

impl Selection {
    fn start_and_len(&self) -> (u64, u64) {
        match self {
            Self::Index(i) => (*i, 1),
            Self::Range(r) => (r.start, r.end.saturating_sub(r.start)),
        }
    }
}

/// A validated hyper-rectangle: start and length per axis plus the squeezed
/// output shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperslab {
    pub start: Vec<u64>,
    pub lengths: Vec<u64>,
    pub output_shape: Vec<usize>,
}

impl Hyperslab {
    /// Resolve a selection against an array shape.
    pub fn resolve(shape: &[u64], selection: &[Selection]) -> Result<Self> {
        if selection.len() != shape.len() {
            return Err(StoreError::invalid_selection(format!(
                "selection has {} axes but array has {}",
                selection.len(),
                shape.len()
            )));
        }

        let mut start = Vec::with_capacity(shape.len());
        let mut lengths = Vec::with_capacity(shape.len());
        let mut output_shape = Vec::new();

        for (axis, (sel, &dim)) in selection.iter().zip(shape).enumerate() {
            let (s, len) = sel.start_and_len();
            if let Selection::Range(r) = sel {
                if r.end < r.start {
                    return Err(StoreError::invalid_selection(format!(
                        "axis {axis}: range {}..{} is reversed",
                        r.start, r.end
                    )));
                }
            }
            if s + len > dim {
                return Err(StoreError::invalid_selection(format!(
                    "axis {axis}: {sel:?} exceeds dimension {dim}"
                )));
            }
            start.push(s);
            lengths.push(len);
            if matches!(sel, Selection::Range(_)) {
                output_shape.push(len as usize);
            }
        }

        Ok(Self {
            start,
            lengths,
            output_shape,
        })
    }

    /// Total number of selected elements.
    pub fn num_elements(&self) -> usize {
        self.lengths.iter().product::<u64>() as usize
    }
}

/// Decoded values of a selection, row-major, converted to `f64`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArrayData {
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

impl ArrayData {
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Self {
        Self { shape, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a multi-dimensional index of the (squeezed) result.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0usize;
        for (&i, &dim) in index.iter().zip(&self.shape) {
            if i >= dim {
                return None;
            }
            flat = flat * dim + i;
        }
        self.values.get(flat).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_numeric_range() {
        assert_eq!(DataType::UInt8.numeric_range(), (0.0, 255.0));
        assert_eq!(DataType::Int16.numeric_range(), (-32768.0, 32767.0));
    }

    #[test]
    fn test_decode_ne() {
        let bytes = (-9999i16).to_ne_bytes();
        assert_eq!(DataType::Int16.decode_ne(&bytes), Some(-9999.0));
        assert_eq!(DataType::Int32.decode_ne(&bytes), None);
    }

    #[test]
    fn test_hyperslab_squeezes_index_axes() {
        let shape = [3, 4, 16, 16];
        let selection = [
            Selection::Index(1),
            Selection::Index(2),
            Selection::Range(0..4),
            Selection::Range(8..16),
        ];
        let slab = Hyperslab::resolve(&shape, &selection).unwrap();
        assert_eq!(slab.start, vec![1, 2, 0, 8]);
        assert_eq!(slab.lengths, vec![1, 1, 4, 8]);
        assert_eq!(slab.output_shape, vec![4, 8]);
        assert_eq!(slab.num_elements(), 32);
    }

    #[test]
    fn test_hyperslab_rejects_out_of_bounds() {
        let shape = [2, 16];
        assert!(Hyperslab::resolve(&shape, &[Selection::Index(2), Selection::Range(0..4)]).is_err());
        assert!(Hyperslab::resolve(&shape, &[Selection::Index(0), Selection::Range(8..17)]).is_err());
        assert!(Hyperslab::resolve(&shape, &[Selection::Index(0)]).is_err());
    }

    #[test]
    fn test_array_data_get() {
        let data = ArrayData::new(vec![2, 3], (0..6).map(|v| v as f64).collect());
        assert_eq!(data.get(&[0, 0]), Some(0.0));
        assert_eq!(data.get(&[1, 2]), Some(5.0));
        assert_eq!(data.get(&[2, 0]), None);
    }
}
