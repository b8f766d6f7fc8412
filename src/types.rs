//! Core data types shared by the write and read paths

use crate::error::{Result, RssError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Axis used to group traces into stored lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Lines are inlines, the orthogonal axis is crossline
    Inline,
    /// Lines are crosslines, the orthogonal axis is inline
    Crossline,
}

impl SortOrder {
    /// Both sort orders, inline first
    pub const ALL: [SortOrder; 2] = [SortOrder::Inline, SortOrder::Crossline];

    /// The axis across a line of this sort order
    pub fn orthogonal(&self) -> Self {
        match self {
            SortOrder::Inline => SortOrder::Crossline,
            SortOrder::Crossline => SortOrder::Inline,
        }
    }

    /// Store group name
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Inline => "inline",
            SortOrder::Crossline => "crossline",
        }
    }

    /// Pick this order's value out of an (inline, crossline) pair
    pub fn select(&self, inline: i32, crossline: i32) -> i32 {
        match self {
            SortOrder::Inline => inline,
            SortOrder::Crossline => crossline,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = RssError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "inline" => Ok(SortOrder::Inline),
            "crossline" => Ok(SortOrder::Crossline),
            _ => Err(RssError::InvalidSortOrder(s.to_string())),
        }
    }
}

/// Inclusive inline/crossline extent of a survey
///
/// Persisted as `[min_inline, min_crossline, max_inline, max_crossline]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct Bounds {
    pub min_inline: i32,
    pub min_crossline: i32,
    pub max_inline: i32,
    pub max_crossline: i32,
}

impl Bounds {
    pub fn new(min_inline: i32, min_crossline: i32, max_inline: i32, max_crossline: i32) -> Self {
        Self {
            min_inline,
            min_crossline,
            max_inline,
            max_crossline,
        }
    }

    /// Inclusive (min, max) along an axis
    pub fn range(&self, axis: SortOrder) -> (i32, i32) {
        match axis {
            SortOrder::Inline => (self.min_inline, self.max_inline),
            SortOrder::Crossline => (self.min_crossline, self.max_crossline),
        }
    }

    /// Number of positions along an axis, gaps included
    pub fn extent(&self, axis: SortOrder) -> usize {
        let (min, max) = self.range(axis);
        (max - min + 1) as usize
    }

    /// Validate a line number and return its zero-based offset
    pub fn offset(&self, axis: SortOrder, value: i32) -> Result<usize> {
        let (min, max) = self.range(axis);
        if value < min || value > max {
            return Err(RssError::Bounds {
                axis,
                requested: value,
                min,
                max,
            });
        }
        Ok((value - min) as usize)
    }
}

impl From<[i32; 4]> for Bounds {
    fn from(v: [i32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Bounds> for [i32; 4] {
    fn from(b: Bounds) -> Self {
        [b.min_inline, b.min_crossline, b.max_inline, b.max_crossline]
    }
}

/// Per-line dynamic range used to quantize and dequantize samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleEntry {
    pub min: f32,
    pub max: f32,
}

impl ScaleEntry {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// True when every sample in the line had the same value
    pub fn is_flat(&self) -> bool {
        self.max == self.min
    }
}

/// Axis descriptor with name, unit, and coordinate information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisDescriptor {
    /// Number of samples along this axis
    pub num_samples: usize,
    /// Name of the axis ("Sample", "Crossline", "Inline")
    pub name: String,
    /// Unit of measurement (e.g., "ms", "unitless")
    pub unit: String,
    /// Coordinate minimum
    pub coord_min: f64,
    /// Coordinate maximum
    pub coord_max: f64,
}

impl AxisDescriptor {
    /// Create a new axis descriptor
    pub fn new(
        num_samples: usize,
        name: impl Into<String>,
        unit: impl Into<String>,
        coord_min: f64,
        coord_max: f64,
    ) -> Self {
        Self {
            num_samples,
            name: name.into(),
            unit: unit.into(),
            coord_min,
            coord_max,
        }
    }

    /// Descriptor for a line axis spanning an inclusive line-number range
    pub fn for_lines(axis: SortOrder, (min, max): (i32, i32)) -> Self {
        let name = match axis {
            SortOrder::Inline => "Inline",
            SortOrder::Crossline => "Crossline",
        };
        Self::new((max - min + 1) as usize, name, "unitless", min as f64, max as f64)
    }
}
