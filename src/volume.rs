//! Chunked storage of one sort order's quantized seismic array

use crate::compression::{get_compressor, CompressionLevel};
use crate::error::{Result, RssError};
use crate::io::IOManager;
use crate::layout::{VolumeLayout, ELEMENT_SIZE, LINE_AXIS, ORTHOGONAL_AXIS};
use crate::metadata::{FormatVersion, VolumeMetadata};
use crate::types::SortOrder;
use crate::utils::{chunk_path, le_bytes_to_u16s, seismic_metadata_path, u16s_to_le_bytes};
use futures::future::try_join_all;
use ndarray::{s, Array1, Array2, Array3, Axis};
use std::sync::Arc;

/// The `{order}/seismic` array of a store
pub struct SeismicVolume {
    store: Arc<dyn IOManager>,
    metadata: VolumeMetadata,
}

impl SeismicVolume {
    /// Write the array metadata and return a handle for writing chunks
    pub async fn create(store: Arc<dyn IOManager>, metadata: VolumeMetadata) -> Result<Self> {
        let json = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| RssError::Metadata(e.to_string()))?;
        store
            .write(&seismic_metadata_path(metadata.sort_order), &json)
            .await?;
        Ok(Self { store, metadata })
    }

    /// Read and check the `{order}/seismic` metadata document
    pub async fn load_metadata(store: &dyn IOManager, order: SortOrder) -> Result<VolumeMetadata> {
        let bytes = store.read(&seismic_metadata_path(order)).await?;
        let metadata: VolumeMetadata =
            serde_json::from_slice(&bytes).map_err(|e| RssError::Metadata(e.to_string()))?;
        if !metadata.version.is_compatible(&FormatVersion::CURRENT) {
            return Err(RssError::Metadata(format!(
                "unsupported format version {}.{}",
                metadata.version.major, metadata.version.minor
            )));
        }
        if metadata.sort_order != order {
            return Err(RssError::Metadata(format!(
                "{} array describes a {} volume",
                order, metadata.sort_order
            )));
        }
        Ok(metadata)
    }

    /// Handle reading chunks through `store`, with metadata loaded elsewhere
    pub fn with_metadata(store: Arc<dyn IOManager>, metadata: VolumeMetadata) -> Self {
        Self { store, metadata }
    }

    pub fn metadata(&self) -> &VolumeMetadata {
        &self.metadata
    }

    pub fn layout(&self) -> &VolumeLayout {
        &self.metadata.layout
    }

    pub fn sort_order(&self) -> SortOrder {
        self.metadata.sort_order
    }

    /// Compress and store one chunk given in C order
    pub async fn write_chunk(&self, coords: [usize; 3], values: &[u16]) -> Result<usize> {
        let expected: usize = self.layout().chunk_dims(&coords).iter().product();
        if values.len() != expected {
            return Err(RssError::InvalidVolume(format!(
                "chunk {:?} needs {} values, got {}",
                coords,
                expected,
                values.len()
            )));
        }
        let compressor = get_compressor(self.metadata.compression);
        let compressed = compressor.compress(
            &u16s_to_le_bytes(values),
            CompressionLevel::new(self.metadata.compression_level),
        )?;
        self.store
            .write(&chunk_path(self.sort_order(), &coords), &compressed)
            .await?;
        Ok(compressed.len())
    }

    /// Read and decompress one chunk
    pub async fn read_chunk(&self, coords: [usize; 3]) -> Result<Array3<u16>> {
        let dims = self.layout().chunk_dims(&coords);
        let compressed = self.store.read(&chunk_path(self.sort_order(), &coords)).await?;
        let compressor = get_compressor(self.metadata.compression);
        let raw = compressor.decompress(&compressed, Some(dims.iter().product::<usize>() * ELEMENT_SIZE))?;
        let values = le_bytes_to_u16s(&raw)?;
        Array3::from_shape_vec((dims[0], dims[1], dims[2]), values)
            .map_err(|e| RssError::InvalidVolume(format!("chunk {:?}: {}", coords, e)))
    }

    /// Store a tile of whole lines covering line-chunk column `k`
    ///
    /// `tile` has shape (samples, orthogonal, lines in the column). Returns the
    /// compressed byte count.
    pub async fn write_line_tile(&self, k: usize, tile: &Array3<u16>) -> Result<usize> {
        let layout = *self.layout();
        let expected = layout.chunk_dims(&[0, 0, k]);
        if tile.dim() != (layout.samples(), layout.orthogonal(), expected[LINE_AXIS]) {
            return Err(RssError::InvalidVolume(format!(
                "tile {:?} does not match line column {} of {:?}",
                tile.dim(),
                k,
                layout.shape
            )));
        }

        let writes = (0..layout.chunk_count()[ORTHOGONAL_AXIS]).map(|j| {
            let coords = [0, j, k];
            let (o0, o1) = layout.chunk_range(&coords)[ORTHOGONAL_AXIS];
            let values: Vec<u16> = tile.slice(s![.., o0..o1, ..]).iter().copied().collect();
            async move { self.write_chunk(coords, &values).await }
        });
        Ok(try_join_all(writes).await?.into_iter().sum())
    }

    /// Stored values of one line as (samples, orthogonal)
    pub async fn read_line(&self, line_offset: usize) -> Result<Array2<u16>> {
        let layout = *self.layout();
        if line_offset >= layout.lines() {
            return Err(RssError::InvalidVolume(format!(
                "line offset {} outside {} lines",
                line_offset,
                layout.lines()
            )));
        }

        let coords = layout.chunks_for_line(line_offset);
        let chunks = try_join_all(coords.iter().map(|&c| self.read_chunk(c))).await?;

        let mut slab = Array2::<u16>::zeros((layout.samples(), layout.orthogonal()));
        for (c, chunk) in coords.iter().zip(chunks.iter()) {
            let range = layout.chunk_range(c);
            let (o0, o1) = range[ORTHOGONAL_AXIS];
            let local = line_offset - range[LINE_AXIS].0;
            slab.slice_mut(s![.., o0..o1])
                .assign(&chunk.index_axis(Axis(2), local));
        }
        Ok(slab)
    }

    /// Stored values of one trace
    pub async fn read_trace(&self, line_offset: usize, orthogonal_offset: usize) -> Result<Array1<u16>> {
        let layout = *self.layout();
        if !layout.is_in_bounds(&[0, orthogonal_offset, line_offset]) {
            return Err(RssError::InvalidVolume(format!(
                "trace ({}, {}) outside {:?}",
                line_offset, orthogonal_offset, layout.shape
            )));
        }
        let coords = layout.chunk_for_trace(line_offset, orthogonal_offset);
        let range = layout.chunk_range(&coords);
        let chunk = self.read_chunk(coords).await?;
        Ok(chunk
            .slice(s![
                ..,
                orthogonal_offset - range[ORTHOGONAL_AXIS].0,
                line_offset - range[LINE_AXIS].0
            ])
            .to_owned())
    }
}
