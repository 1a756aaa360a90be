// src/recording/compressor.rs
//! zstd stage of the payload pipeline
//!
//! Payload text is compressed at the highest level zstd supports unless a
//! level is given explicitly. Levels outside zstd's range are clamped.

use crate::utils::errors::{RecorderError, Result};
use std::ops::RangeInclusive;
use tracing::trace;

/// zstd compression at a fixed level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compressor {
    level: i32,
}

impl Compressor {
    /// Levels accepted by the linked zstd
    pub fn supported_levels() -> RangeInclusive<i32> {
        zstd::compression_level_range()
    }

    /// Highest-ratio compressor
    pub fn maximum() -> Self {
        Self {
            level: *Self::supported_levels().end(),
        }
    }

    /// Compressor at `level`, clamped into the supported range
    pub fn with_level(level: i32) -> Self {
        let range = Self::supported_levels();
        Self {
            level: level.clamp(*range.start(), *range.end()),
        }
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn compress(&self, text: &[u8]) -> Result<Vec<u8>> {
        let packed = zstd::bulk::compress(text, self.level)
            .map_err(|e| RecorderError::CompressionFailed(format!("zstd level {}: {}", self.level, e)))?;

        trace!("zstd {} -> {} bytes", text.len(), packed.len());
        Ok(packed)
    }

    pub fn decompress(&self, packed: &[u8]) -> Result<Vec<u8>> {
        zstd::stream::decode_all(packed)
            .map_err(|e| RecorderError::CompressionFailed(format!("zstd decode: {}", e)))
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::maximum()
    }
}
