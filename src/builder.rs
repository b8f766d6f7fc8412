//! Writes quantized, chunked volumes from a finished scan

use crate::compression::CompressionMethod;
use crate::config::{ChunkShape, IngestConfig};
use crate::error::{Result, RssError};
use crate::io::IOManager;
use crate::layout::{VolumeLayout, LINE_AXIS};
use crate::metadata::{SurveyMetadata, VolumeMetadata};
use crate::quantize::quantize;
use crate::reorganize::{Line, LineSet, SampleArena, SurveyScan};
use crate::types::{Bounds, ScaleEntry, SortOrder};
use crate::utils::{
    format_bytes, scalers_path, BOUNDS_PATH, COORDS_CDPX, COORDS_CDPY, COORDS_CROSSLINE,
    COORDS_INLINE, SURVEY_PATH,
};
use crate::volume::SeismicVolume;
use ndarray::{Array2, Array3, ArrayView1, Axis};
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Outcome of building one sort order's volume
#[derive(Debug, Clone)]
pub struct BuildStats {
    pub sort_order: SortOrder,
    pub layout: VolumeLayout,
    /// Lines holding at least one trace
    pub populated_lines: usize,
    pub chunks_written: usize,
    pub compressed_bytes: usize,
}

impl BuildStats {
    pub fn summary(&self) -> String {
        format!(
            "{} volume {}: {} populated lines, {} chunks, {} compressed",
            self.sort_order,
            self.layout.summary(),
            self.populated_lines,
            self.chunks_written,
            format_bytes(self.compressed_bytes),
        )
    }
}

/// Builder for the per-order arrays and the survey-wide arrays of a store
pub struct ChunkedVolumeBuilder {
    store: Arc<dyn IOManager>,
    chunk_shape: ChunkShape,
    compression: CompressionMethod,
    compression_level: u8,
    ingest_id: Uuid,
}

impl ChunkedVolumeBuilder {
    pub fn new(store: Arc<dyn IOManager>, config: &IngestConfig, ingest_id: Uuid) -> Self {
        Self {
            store,
            chunk_shape: config.chunk_shape,
            compression: config.compression,
            compression_level: config.compression_level,
            ingest_id,
        }
    }

    /// Write bounds, flat coordinates and survey metadata
    pub async fn write_survey(&self, scan: &SurveyScan, survey: &SurveyMetadata) -> Result<()> {
        let bounds = serde_json::to_vec(&scan.bounds)?;
        self.store.write(BOUNDS_PATH, &bounds).await?;

        let coords = &scan.coordinates;
        self.store
            .write(COORDS_INLINE, &bincode::serialize(&coords.inline)?)
            .await?;
        self.store
            .write(COORDS_CROSSLINE, &bincode::serialize(&coords.crossline)?)
            .await?;
        self.store
            .write(COORDS_CDPX, &bincode::serialize(&coords.cdpx)?)
            .await?;
        self.store
            .write(COORDS_CDPY, &bincode::serialize(&coords.cdpy)?)
            .await?;

        let json =
            serde_json::to_vec_pretty(survey).map_err(|e| RssError::Metadata(e.to_string()))?;
        self.store.write(SURVEY_PATH, &json).await?;
        debug!(traces = coords.len(), "survey arrays written");
        Ok(())
    }

    /// Quantize every line of `lines` and write the `{order}` arrays
    ///
    /// Line-chunk columns are processed one at a time so only one tile of
    /// quantized data is resident.
    pub async fn build(&self, scan: Arc<SurveyScan>, lines: Arc<LineSet>) -> Result<BuildStats> {
        let started = Instant::now();
        let order = lines.sort_order;
        let bounds = scan.bounds;
        let layout = VolumeLayout::new(
            scan.reel.sample_count,
            bounds.extent(order.orthogonal()),
            bounds.extent(order),
            self.chunk_shape,
        )?;
        info!(sort_order = %order, layout = %layout.summary(), "building volume");

        let metadata = VolumeMetadata::new(order, layout, &scan.reel, &bounds, self.ingest_id)
            .with_compression(self.compression, self.compression_level);
        let volume = SeismicVolume::create(self.store.clone(), metadata).await?;

        let mut scales = vec![ScaleEntry::default(); layout.lines()];
        let mut compressed_bytes = 0;
        let columns = layout.chunk_count()[LINE_AXIS];

        for k in 0..columns {
            let (l0, l1) = layout.chunk_range(&[0, 0, k])[LINE_AXIS];
            let (scan, lines) = (scan.clone(), lines.clone());
            let (tile, tile_scales) = tokio::task::spawn_blocking(move || {
                quantize_tile(&scan.arena, &lines, &scan.bounds, l0..l1)
            })
            .await??;

            compressed_bytes += volume.write_line_tile(k, &tile).await?;
            scales[l0..l1].copy_from_slice(&tile_scales);
            debug!(sort_order = %order, column = k + 1, columns, "tile written");
        }

        self.store
            .write(&scalers_path(order), &bincode::serialize(&scales)?)
            .await?;

        let stats = BuildStats {
            sort_order: order,
            layout,
            populated_lines: lines.len(),
            chunks_written: layout.total_chunks(),
            compressed_bytes,
        };
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "{}",
            stats.summary()
        );
        Ok(stats)
    }
}

/// Quantized tile of the lines at offsets `offsets`, with their scales
///
/// Lines without traces come back as all-padding with a `(0, 0)` scale.
pub fn quantize_tile(
    arena: &SampleArena,
    lines: &LineSet,
    bounds: &Bounds,
    offsets: Range<usize>,
) -> Result<(Array3<u16>, Vec<ScaleEntry>)> {
    let order = lines.sort_order;
    let (first_line, _) = bounds.range(order);
    let dims = (arena.samples_per_trace(), bounds.extent(order.orthogonal()));

    let slab_for = |offset: usize| -> Result<(Array2<u16>, ScaleEntry)> {
        match lines.get(first_line + offset as i32) {
            Some(line) => quantize_line(arena, line, bounds, order),
            None => Ok((Array2::zeros(dims), ScaleEntry::default())),
        }
    };

    #[cfg(feature = "parallel")]
    let slabs: Vec<Result<(Array2<u16>, ScaleEntry)>> = {
        use rayon::prelude::*;
        offsets.clone().into_par_iter().map(slab_for).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let slabs: Vec<Result<(Array2<u16>, ScaleEntry)>> = offsets.clone().map(slab_for).collect();

    let mut tile = Array3::zeros((dims.0, dims.1, offsets.len()));
    let mut scales = Vec::with_capacity(offsets.len());
    for (l, slab) in slabs.into_iter().enumerate() {
        let (slab, scale) = slab?;
        tile.index_axis_mut(Axis(2), l).assign(&slab);
        scales.push(scale);
    }
    Ok((tile, scales))
}

/// Quantize one line and scatter its traces to their orthogonal positions
///
/// Traces repeating an orthogonal position overwrite earlier ones.
pub fn quantize_line(
    arena: &SampleArena,
    line: &Line,
    bounds: &Bounds,
    order: SortOrder,
) -> Result<(Array2<u16>, ScaleEntry)> {
    let samples = arena.samples_per_trace();
    let orthogonal = order.orthogonal();
    let (values, scale) = quantize(&arena.line_samples(line)?);

    let mut slab = Array2::zeros((samples, bounds.extent(orthogonal)));
    for (trace, &position) in line.orthogonal.iter().enumerate() {
        let column = bounds.offset(orthogonal, position)?;
        let values = ArrayView1::from(&values[trace * samples..(trace + 1) * samples]);
        slab.column_mut(column).assign(&values);
    }
    Ok((slab, scale))
}
