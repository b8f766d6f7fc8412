//! Volume layout - how the (sample, orthogonal, line) volume is tiled into chunks

use crate::config::ChunkShape;
use crate::error::{Result, RssError};
use serde::{Deserialize, Serialize};

/// Axis positions inside the stored array
pub const SAMPLE_AXIS: usize = 0;
pub const ORTHOGONAL_AXIS: usize = 1;
pub const LINE_AXIS: usize = 2;

/// Bytes per stored element (u16)
pub const ELEMENT_SIZE: usize = 2;

/// Shape and chunking of one sort order's seismic array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeLayout {
    /// (samples, orthogonal lines, lines)
    pub shape: [usize; 3],

    /// Chunk extent per axis; the sample axis is never split
    pub chunks: [usize; 3],
}

impl VolumeLayout {
    /// Create a layout for a volume of `samples x orthogonal x lines`
    pub fn new(samples: usize, orthogonal: usize, lines: usize, tile: ChunkShape) -> Result<Self> {
        if samples == 0 || orthogonal == 0 || lines == 0 {
            return Err(RssError::InvalidVolume(format!(
                "volume shape {}x{}x{} has an empty axis",
                samples, orthogonal, lines
            )));
        }
        if tile.orthogonal == 0 || tile.line == 0 {
            return Err(RssError::Configuration(
                "chunk dimensions must be non-zero".to_string(),
            ));
        }
        Ok(Self {
            shape: [samples, orthogonal, lines],
            chunks: [samples, tile.orthogonal, tile.line],
        })
    }

    pub fn samples(&self) -> usize {
        self.shape[SAMPLE_AXIS]
    }

    pub fn orthogonal(&self) -> usize {
        self.shape[ORTHOGONAL_AXIS]
    }

    pub fn lines(&self) -> usize {
        self.shape[LINE_AXIS]
    }

    /// Get the number of chunks in each dimension
    pub fn chunk_count(&self) -> [usize; 3] {
        let mut count = [0; 3];
        for (i, c) in count.iter_mut().enumerate() {
            *c = self.shape[i].div_ceil(self.chunks[i]);
        }
        count
    }

    /// Get the total number of chunks
    pub fn total_chunks(&self) -> usize {
        self.chunk_count().iter().product()
    }

    /// Element range covered by a chunk along each axis; edge chunks are trimmed
    pub fn chunk_range(&self, coords: &[usize; 3]) -> [(usize, usize); 3] {
        let mut range = [(0, 0); 3];
        for (i, r) in range.iter_mut().enumerate() {
            let start = coords[i] * self.chunks[i];
            *r = (start, (start + self.chunks[i]).min(self.shape[i]));
        }
        range
    }

    /// Actual (trimmed) dimensions of a chunk
    pub fn chunk_dims(&self, coords: &[usize; 3]) -> [usize; 3] {
        self.chunk_range(coords).map(|(start, end)| end - start)
    }

    /// Chunks holding every sample of the line at `line_offset`
    pub fn chunks_for_line(&self, line_offset: usize) -> Vec<[usize; 3]> {
        let k = line_offset / self.chunks[LINE_AXIS];
        (0..self.chunk_count()[ORTHOGONAL_AXIS])
            .map(|j| [0, j, k])
            .collect()
    }

    /// Chunk holding the trace at (line, orthogonal) offsets
    pub fn chunk_for_trace(&self, line_offset: usize, orthogonal_offset: usize) -> [usize; 3] {
        [
            0,
            orthogonal_offset / self.chunks[ORTHOGONAL_AXIS],
            line_offset / self.chunks[LINE_AXIS],
        ]
    }

    /// Check if element coordinates are within bounds
    pub fn is_in_bounds(&self, coords: &[usize; 3]) -> bool {
        coords.iter().zip(self.shape.iter()).all(|(&c, &n)| c < n)
    }

    /// Calculate the total volume size in bytes (uncompressed)
    pub fn total_size_bytes(&self) -> usize {
        self.shape.iter().product::<usize>() * ELEMENT_SIZE
    }

    /// Get a summary string of the layout
    pub fn summary(&self) -> String {
        format!(
            "{} x {} x {} (u16), {} chunks of {} x {} x {}, {:.2} MB uncompressed",
            self.shape[0],
            self.shape[1],
            self.shape[2],
            self.total_chunks(),
            self.chunks[0],
            self.chunks[1],
            self.chunks[2],
            self.total_size_bytes() as f64 / (1024.0 * 1024.0)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_layout() -> VolumeLayout {
        VolumeLayout::new(1126, 605, 385, ChunkShape::default()).unwrap()
    }

    #[test]
    fn test_chunk_count() {
        let layout = create_test_layout();
        assert_eq!(layout.chunk_count(), [1, 7, 4]);
        assert_eq!(layout.total_chunks(), 28);
        assert_eq!(layout.chunks, [1126, 100, 100]);
    }

    #[test]
    fn test_edge_chunks_are_trimmed() {
        let layout = create_test_layout();
        assert_eq!(
            layout.chunk_range(&[0, 0, 0]),
            [(0, 1126), (0, 100), (0, 100)]
        );
        assert_eq!(
            layout.chunk_range(&[0, 6, 3]),
            [(0, 1126), (600, 605), (300, 385)]
        );
        assert_eq!(layout.chunk_dims(&[0, 6, 3]), [1126, 5, 85]);
    }

    #[test]
    fn test_line_and_trace_chunks() {
        let layout = create_test_layout();
        let chunks = layout.chunks_for_line(250);
        assert_eq!(chunks.len(), 7);
        assert!(chunks.iter().all(|c| c[LINE_AXIS] == 2));
        assert_eq!(layout.chunk_for_trace(250, 604), [0, 6, 2]);
    }

    #[test]
    fn test_rejects_empty_axis() {
        assert!(VolumeLayout::new(10, 0, 5, ChunkShape::default()).is_err());
        assert!(VolumeLayout::new(
            10,
            5,
            5,
            ChunkShape {
                orthogonal: 0,
                line: 1
            }
        )
        .is_err());
    }

    #[test]
    fn test_is_in_bounds() {
        let layout = create_test_layout();
        assert!(layout.is_in_bounds(&[1125, 604, 384]));
        assert!(!layout.is_in_bounds(&[0, 605, 0]));
    }
}
