//! Ingestion and client configuration
//!
//! All configuration is passed by value per call. Nothing here is shared or
//! mutated behind the caller's back: overriding a byte location produces a new
//! [`FieldLayout`].

use crate::compression::{CompressionLevel, CompressionMethod};
use crate::error::{Result, RssError};
use crate::types::SortOrder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Size of the fixed trace header preceding every trace's samples
pub const TRACE_HEADER_SIZE: usize = 240;

/// Default LRU cache bound for bulk chunk reads
pub const DEFAULT_CACHE_SIZE: usize = 512 * 1024 * 1024;

/// Location of one integer field inside a trace header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// 1-based byte position, as printed in SEG-Y documentation
    pub byte: usize,
    /// Width in bytes, 2 or 4
    pub width: usize,
    /// Two's complement when true
    pub signed: bool,
}

impl FieldSpec {
    pub const fn signed(byte: usize, width: usize) -> Self {
        Self {
            byte,
            width,
            signed: true,
        }
    }

    /// Zero-based byte range within the trace header
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self.byte - 1;
        start..start + self.width
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if self.width != 2 && self.width != 4 {
            return Err(RssError::InvalidFieldLayout(format!(
                "{} byte length should be 2 or 4, got {}",
                name, self.width
            )));
        }
        if self.byte == 0 || self.byte - 1 + self.width > TRACE_HEADER_SIZE {
            return Err(RssError::InvalidFieldLayout(format!(
                "{} at byte {} does not fit in the {}-byte trace header",
                name, self.byte, TRACE_HEADER_SIZE
            )));
        }
        Ok(())
    }
}

impl FromStr for FieldSpec {
    type Err = RssError;

    /// Parse an inclusive byte range such as `189-192`
    fn from_str(s: &str) -> Result<Self> {
        let (first, last) = s
            .split_once('-')
            .ok_or_else(|| RssError::InvalidFieldLayout(format!("expected FIRST-LAST, got {}", s)))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<usize>()
                .map_err(|e| RssError::InvalidFieldLayout(format!("{}: {}", s, e)))
        };
        let (first, last) = (parse(first)?, parse(last)?);
        if last < first {
            return Err(RssError::InvalidFieldLayout(format!("empty byte range {}", s)));
        }
        let spec = FieldSpec::signed(first, last - first + 1);
        spec.validate(s)?;
        Ok(spec)
    }
}

/// Trace-header coordinates the scalar can apply to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coordinate {
    CdpX,
    CdpY,
}

/// Where the per-trace fields live in the trace header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    pub inline: FieldSpec,
    pub crossline: FieldSpec,
    pub cdpx: FieldSpec,
    pub cdpy: FieldSpec,
    /// Coordinate scalar (SCALCO)
    pub scalar: FieldSpec,
    /// Coordinates the scalar is applied to
    pub scaled: Vec<Coordinate>,
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self {
            inline: FieldSpec::signed(189, 4),
            crossline: FieldSpec::signed(193, 4),
            cdpx: FieldSpec::signed(181, 4),
            cdpy: FieldSpec::signed(185, 4),
            scalar: FieldSpec::signed(71, 2),
            scaled: vec![Coordinate::CdpX, Coordinate::CdpY],
        }
    }
}

impl FieldLayout {
    pub fn with_inline(mut self, spec: FieldSpec) -> Self {
        self.inline = spec;
        self
    }

    pub fn with_crossline(mut self, spec: FieldSpec) -> Self {
        self.crossline = spec;
        self
    }

    pub fn with_cdpx(mut self, spec: FieldSpec) -> Self {
        self.cdpx = spec;
        self
    }

    pub fn with_cdpy(mut self, spec: FieldSpec) -> Self {
        self.cdpy = spec;
        self
    }

    pub fn with_scalar(mut self, spec: FieldSpec) -> Self {
        self.scalar = spec;
        self
    }

    pub fn with_scaled(mut self, scaled: Vec<Coordinate>) -> Self {
        self.scaled = scaled;
        self
    }

    pub fn is_scaled(&self, coordinate: Coordinate) -> bool {
        self.scaled.contains(&coordinate)
    }

    pub fn validate(&self) -> Result<()> {
        self.inline.validate("inline")?;
        self.crossline.validate("crossline")?;
        self.cdpx.validate("cdpx")?;
        self.cdpy.validate("cdpy")?;
        self.scalar.validate("scalar")
    }
}

/// Chunk tile over the (orthogonal, line) axes; chunks always span every sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkShape {
    pub orthogonal: usize,
    pub line: usize,
}

impl Default for ChunkShape {
    fn default() -> Self {
        Self {
            orthogonal: 100,
            line: 100,
        }
    }
}

/// Configuration for one ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub field_layout: FieldLayout,
    /// Replaces every trace's own coordinate scalar when set
    pub scalar_override: Option<i32>,
    /// Volumes to build from the single scan
    pub sort_orders: Vec<SortOrder>,
    pub chunk_shape: ChunkShape,
    pub compression: CompressionMethod,
    pub compression_level: u8,
    /// Directory for the sample arena; system temp dir when unset
    pub scratch_dir: Option<PathBuf>,
    /// Log scan progress every this many traces
    pub progress_interval: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            field_layout: FieldLayout::default(),
            scalar_override: None,
            sort_orders: vec![SortOrder::Inline],
            chunk_shape: ChunkShape::default(),
            compression: CompressionMethod::Lz4,
            compression_level: CompressionLevel::default().value(),
            scratch_dir: None,
            progress_interval: 10_000,
        }
    }
}

impl IngestConfig {
    /// Load a configuration from a JSON file; missing keys take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let config: IngestConfig = serde_json::from_slice(&data)
            .map_err(|e| RssError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_field_layout(mut self, layout: FieldLayout) -> Self {
        self.field_layout = layout;
        self
    }

    pub fn with_scalar_override(mut self, scalar: Option<i32>) -> Self {
        self.scalar_override = scalar;
        self
    }

    pub fn with_sort_orders(mut self, orders: Vec<SortOrder>) -> Self {
        self.sort_orders = orders;
        self
    }

    pub fn with_chunk_shape(mut self, shape: ChunkShape) -> Self {
        self.chunk_shape = shape;
        self
    }

    pub fn with_compression(mut self, method: CompressionMethod) -> Self {
        self.compression = method;
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.field_layout.validate()?;
        if self.sort_orders.is_empty() {
            return Err(RssError::Configuration(
                "at least one sort order is required".to_string(),
            ));
        }
        if self.chunk_shape.orthogonal == 0 || self.chunk_shape.line == 0 {
            return Err(RssError::Configuration(
                "chunk dimensions must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for a read-side client
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Byte bound of the chunk cache
    pub cache_size: usize,
    /// Value written into padded positions of decoded lines and traces
    pub fill_value: f32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            fill_value: f32::NAN,
        }
    }
}

impl ClientConfig {
    pub fn with_cache_size(mut self, bytes: usize) -> Self {
        self.cache_size = bytes;
        self
    }

    pub fn with_fill_value(mut self, value: f32) -> Self {
        self.fill_value = value;
        self
    }
}
