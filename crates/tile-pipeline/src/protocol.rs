//! Messages exchanged with workers.
//!
//! Everything here is plain owned data. A request carries all it needs, so
//! the worker never looks back at the tile source.

use serde::{Deserialize, Serialize};
use tile_config::{DisplayStretch, MinMax, NodataStrategy, RenderType, TileRange};

/// One tile to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileRequest {
    pub zoom: u32,
    pub tile_x: u32,
    pub tile_y: u32,
    pub tile_size: u32,
    pub tile_range: TileRange,
    /// Dataset band for each composition slot.
    pub bands: Vec<usize>,
    pub time_index: usize,
    /// No-data per slot, `None` when not configured.
    #[serde(with = "nodata_serde", default)]
    pub nodata: Option<Vec<f64>>,
    /// Normalization range per slot.
    pub normalization: Option<Vec<MinMax>>,
    pub render_type: RenderType,
    pub nodata_strategy: NodataStrategy,
    pub nodata_replace_value: f64,
    pub mask_nodata: bool,
    /// Display stretch per slot, only for the display render type.
    pub display_params: Option<Vec<DisplayStretch>>,
    pub store_url: String,
    pub store_path: String,
    pub variable: String,
}

impl TileRequest {
    pub fn has_alpha(&self) -> bool {
        self.mask_nodata && self.nodata.is_some()
    }

    pub fn channels(&self) -> usize {
        self.bands.len() + usize::from(self.has_alpha())
    }
}

/// Pixel storage of a finished tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum PixelBuffer {
    Uint8(Vec<u8>),
    Float32(Vec<f32>),
}

impl PixelBuffer {
    pub fn len(&self) -> usize {
        match self {
            Self::Uint8(v) => v.len(),
            Self::Float32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A finished tile: `tile_size * tile_size * channels` values, row-major,
/// channels interleaved, alpha last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileData {
    pub tile_size: u32,
    pub channels: usize,
    pub pixels: PixelBuffer,
}

impl TileData {
    /// Raw bytes in native endianness, ready for texture upload.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.pixels {
            PixelBuffer::Uint8(v) => v.as_slice(),
            PixelBuffer::Float32(v) => bytemuck::cast_slice(v.as_slice()),
        }
    }

    pub fn as_u8(&self) -> Option<&[u8]> {
        match &self.pixels {
            PixelBuffer::Uint8(v) => Some(v.as_slice()),
            PixelBuffer::Float32(_) => None,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.pixels {
            PixelBuffer::Float32(v) => Some(v.as_slice()),
            PixelBuffer::Uint8(_) => None,
        }
    }

    /// Value at `(row, col, channel)` widened to `f64`.
    pub fn get(&self, row: usize, col: usize, channel: usize) -> Option<f64> {
        let size = self.tile_size as usize;
        if row >= size || col >= size || channel >= self.channels {
            return None;
        }
        let idx = (row * size + col) * self.channels + channel;
        match &self.pixels {
            PixelBuffer::Uint8(v) => v.get(idx).map(|&x| x as f64),
            PixelBuffer::Float32(v) => v.get(idx).map(|&x| x as f64),
        }
    }
}

/// Worker reply. On the wire it is `{"success": true, "tileData": ...}` or
/// `{"success": false, "error": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ResponseWire", try_from = "ResponseWire")]
pub enum WorkerResponse {
    Success { tile_data: TileData },
    Failure { error: String },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tile_data: Option<TileData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<WorkerResponse> for ResponseWire {
    fn from(response: WorkerResponse) -> Self {
        match response {
            WorkerResponse::Success { tile_data } => Self {
                success: true,
                tile_data: Some(tile_data),
                error: None,
            },
            WorkerResponse::Failure { error } => Self {
                success: false,
                tile_data: None,
                error: Some(error),
            },
        }
    }
}

impl TryFrom<ResponseWire> for WorkerResponse {
    type Error = String;

    fn try_from(wire: ResponseWire) -> Result<Self, Self::Error> {
        match (wire.success, wire.tile_data, wire.error) {
            (true, Some(tile_data), _) => Ok(Self::Success { tile_data }),
            (true, None, _) => Err("successful response without tileData".to_string()),
            (false, _, error) => Ok(Self::Failure {
                error: error.unwrap_or_else(|| "unknown worker error".to_string()),
            }),
        }
    }
}

/// NaN no-data travels as the string `"NaN"`.
mod nodata_serde {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Encoded {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(values: &Option<Vec<f64>>, serializer: S) -> Result<S::Ok, S::Error> {
        values
            .as_ref()
            .map(|values| {
                values
                    .iter()
                    .map(|&v| {
                        if v.is_nan() {
                            Encoded::Text("NaN".to_string())
                        } else {
                            Encoded::Number(v)
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error> {
        let encoded = Option::<Vec<Encoded>>::deserialize(deserializer)?;
        encoded
            .map(|values| {
                values
                    .into_iter()
                    .map(|v| match v {
                        Encoded::Number(n) => Ok(n),
                        Encoded::Text(s) if s.eq_ignore_ascii_case("nan") => Ok(f64::NAN),
                        Encoded::Text(s) => Err(D::Error::custom(format!("invalid no-data value '{s}'"))),
                    })
                    .collect()
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> TileRequest {
        TileRequest {
            zoom: 2,
            tile_x: 1,
            tile_y: 0,
            tile_size: 4,
            tile_range: TileRange { max_x: 3, max_y: 3 },
            bands: vec![0],
            time_index: 0,
            nodata: Some(vec![f64::NAN]),
            normalization: None,
            render_type: RenderType::Raw,
            nodata_strategy: NodataStrategy::Raw,
            nodata_replace_value: 0.0,
            mask_nodata: true,
            display_params: None,
            store_url: "/data/cube.zarr".to_string(),
            store_path: "cube".to_string(),
            variable: "data".to_string(),
        }
    }

    #[test]
    fn test_nan_nodata_is_a_string_on_the_wire() {
        let encoded = serde_json::to_value(request()).unwrap();
        assert_eq!(encoded["nodata"], json!(["NaN"]));
        assert_eq!(encoded["tileRange"], json!({"maxX": 3, "maxY": 3}));

        let decoded: TileRequest = serde_json::from_value(encoded).unwrap();
        assert!(decoded.nodata.unwrap()[0].is_nan());
    }

    #[test]
    fn test_channels() {
        let mut req = request();
        assert_eq!(req.channels(), 2);
        req.mask_nodata = false;
        assert_eq!(req.channels(), 1);
        req.bands = vec![2, 1, 0];
        req.mask_nodata = true;
        assert_eq!(req.channels(), 4);
    }

    #[test]
    fn test_as_bytes() {
        let tile = TileData {
            tile_size: 1,
            channels: 2,
            pixels: PixelBuffer::Float32(vec![1.5, -2.0]),
        };
        let bytes = tile.as_bytes();
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &1.5f32.to_ne_bytes());
        assert_eq!(tile.get(0, 0, 1), Some(-2.0));
        assert_eq!(tile.get(0, 1, 0), None);
    }

    #[test]
    fn test_response_shape() {
        let failure = WorkerResponse::Failure {
            error: "boom".to_string(),
        };
        assert_eq!(
            serde_json::to_value(failure).unwrap(),
            json!({"success": false, "error": "boom"})
        );

        let success = WorkerResponse::Success {
            tile_data: TileData {
                tile_size: 1,
                channels: 1,
                pixels: PixelBuffer::Uint8(vec![7]),
            },
        };
        let encoded = serde_json::to_value(&success).unwrap();
        assert_eq!(encoded["success"], json!(true));
        assert_eq!(encoded["tileData"]["channels"], json!(1));
        assert!(encoded.get("error").is_none());
        assert_eq!(serde_json::from_value::<WorkerResponse>(encoded).unwrap(), success);

        let err = serde_json::from_value::<WorkerResponse>(json!({"success": true})).unwrap_err();
        assert!(err.to_string().contains("tileData"));
    }
}
