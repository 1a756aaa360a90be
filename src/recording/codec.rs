// src/recording/codec.rs
//! Payload encoding
//!
//! ```text
//! RecordGroups → {"cl": [[10,"#foo",4,8,0]], ...} → JSON text
//!                                                     ↓ (compress = true)
//!                                                   zstd → base64
//! ```
//!
//! Empty categories never reach the wire.

use crate::recording::buffer::RecordGroups;
use crate::recording::compressor::Compressor;
use crate::utils::errors::{RecorderError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Value};
use tracing::debug;

/// Turns record groups into sink payloads and back
#[derive(Debug, Clone, Copy)]
pub struct PayloadCodec {
    compress: bool,
    compressor: Compressor,
}

impl PayloadCodec {
    pub fn new(compress: bool) -> Self {
        Self {
            compress,
            compressor: Compressor::default(),
        }
    }

    pub fn compresses(&self) -> bool {
        self.compress
    }

    /// Grouped tuples as a JSON object, skipping empty categories
    pub fn to_object(groups: &RecordGroups) -> Value {
        let mut object = Map::new();
        for (key, records) in groups {
            let tuples: Vec<Value> = records
                .iter()
                .map(|record| Value::Array(record.to_tuple()))
                .collect();
            if !tuples.is_empty() {
                object.insert(key.to_string(), Value::Array(tuples));
            }
        }
        Value::Object(object)
    }

    /// Encode record groups into a payload
    pub fn encode_groups(&self, groups: &RecordGroups) -> Result<String> {
        self.encode_value(&Self::to_object(groups))
    }

    /// Encode any JSON value into a payload
    pub fn encode_value(&self, value: &Value) -> Result<String> {
        let text = serde_json::to_string(value)?;
        if !self.compress {
            return Ok(text);
        }

        let compressed = self.compressor.compress(text.as_bytes())?;
        let encoded = STANDARD.encode(compressed);

        debug!(
            "Compression ratio: {} / {} = {:.2}",
            text.len(),
            encoded.len(),
            text.len() as f64 / encoded.len().max(1) as f64
        );

        Ok(encoded)
    }

    /// Decode a payload produced by this codec
    pub fn decode(&self, payload: &str) -> Result<Value> {
        if !self.compress {
            return Ok(serde_json::from_str(payload)?);
        }

        let compressed = STANDARD
            .decode(payload)
            .map_err(|e| RecorderError::DecodeFailed(format!("invalid base64: {}", e)))?;
        let text = self.compressor.decompress(&compressed)?;

        Ok(serde_json::from_slice(&text)?)
    }
}
