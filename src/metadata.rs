//! Persisted volume and survey metadata

use crate::compression::CompressionMethod;
use crate::config::FieldLayout;
use crate::header::ReelHeader;
use crate::layout::VolumeLayout;
use crate::types::{AxisDescriptor, Bounds, SortOrder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatVersion {
    pub major: u16,
    pub minor: u16,
}

impl FormatVersion {
    pub const CURRENT: Self = Self { major: 1, minor: 0 };

    pub fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    pub fn is_compatible(&self, other: &Self) -> bool {
        self.major == other.major
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Descriptor of one sort order's seismic array
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeMetadata {
    pub version: FormatVersion,

    pub sort_order: SortOrder,

    /// Shape and chunking
    pub layout: VolumeLayout,

    /// Compression method used for chunks
    pub compression: CompressionMethod,

    pub compression_level: u8,

    /// Sample, orthogonal and line axes, in storage order
    pub axes: Vec<AxisDescriptor>,

    /// Identifier shared by every volume built from the same scan
    pub ingest_id: Uuid,

    pub created_at: DateTime<Utc>,
}

impl VolumeMetadata {
    pub fn new(
        sort_order: SortOrder,
        layout: VolumeLayout,
        reel: &ReelHeader,
        bounds: &Bounds,
        ingest_id: Uuid,
    ) -> Self {
        let samples = reel.sample_count;
        let sample_axis = AxisDescriptor::new(
            samples,
            "Sample",
            "ms",
            0.0,
            samples.saturating_sub(1) as f64 * reel.sample_interval_ms,
        );
        let orthogonal = sort_order.orthogonal();
        Self {
            version: FormatVersion::default(),
            sort_order,
            layout,
            compression: CompressionMethod::Lz4,
            compression_level: 0,
            axes: vec![
                sample_axis,
                AxisDescriptor::for_lines(orthogonal, bounds.range(orthogonal)),
                AxisDescriptor::for_lines(sort_order, bounds.range(sort_order)),
            ],
            ingest_id,
            created_at: Utc::now(),
        }
    }

    /// Set compression method and level
    pub fn with_compression(mut self, method: CompressionMethod, level: u8) -> Self {
        self.compression = method;
        self.compression_level = level;
        self
    }
}

/// Survey-wide metadata shared by both sort orders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyMetadata {
    pub version: FormatVersion,

    pub ingest_id: Uuid,

    /// File name of the ingested SEG-Y
    pub source_name: String,

    /// The 40 card-image lines of the text header
    pub text_header: Vec<String>,

    pub reel_header: ReelHeader,

    /// Trace header layout used during the scan
    pub field_layout: FieldLayout,

    pub scalar_override: Option<i32>,

    /// Sort orders with a stored volume
    pub sort_orders: Vec<SortOrder>,

    pub created_at: DateTime<Utc>,
}

impl SurveyMetadata {
    /// Text header as 40 newline-terminated lines
    pub fn text_header_string(&self) -> String {
        self.text_header
            .iter()
            .map(|line| format!("{}\n", line))
            .collect()
    }
}
