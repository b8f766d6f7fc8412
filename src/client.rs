//! Read-side client over an ingested store

use crate::cache::{CacheStats, CachedStore};
use crate::compression::CompressionMethod;
use crate::config::ClientConfig;
use crate::decoder::{load_scales, LineSlab, Trace, TraceDecoder};
use crate::error::{Result, RssError};
use crate::header::ReelHeader;
use crate::io::{create_io_manager, IOManager};
use crate::metadata::{FormatVersion, SurveyMetadata};
use crate::reorganize::TraceCoordinates;
use crate::spatial::{Neighbor, SpatialIndex};
use crate::types::{Bounds, SortOrder};
use crate::utils::{
    format_bytes, BOUNDS_PATH, COORDS_CDPX, COORDS_CDPY, COORDS_CROSSLINE, COORDS_INLINE,
    SURVEY_PATH,
};
use crate::volume::SeismicVolume;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::info;

/// Main interface for reading an ingested survey
pub struct VolumeClient {
    survey: SurveyMetadata,
    bounds: Bounds,
    coordinates: TraceCoordinates,
    cache: Arc<CachedStore>,
    decoders: Vec<TraceDecoder>,
    spatial: SpatialIndex,
}

async fn read_bincode<T: DeserializeOwned>(store: &dyn IOManager, path: &str) -> Result<T> {
    Ok(bincode::deserialize(&store.read(path).await?)?)
}

impl VolumeClient {
    /// Open a store by URL (`file://`, bare path, or `https://` with `http-client`)
    pub async fn open(url: &str, config: ClientConfig) -> Result<Self> {
        let store = create_io_manager(url).await?;
        Self::from_store(store, config).await
    }

    /// Open over an existing backing store
    pub async fn from_store(store: Arc<dyn IOManager>, config: ClientConfig) -> Result<Self> {
        let survey_bytes = store.read(SURVEY_PATH).await?;
        let survey: SurveyMetadata = serde_json::from_slice(&survey_bytes)
            .map_err(|e| RssError::Metadata(e.to_string()))?;
        if !survey.version.is_compatible(&FormatVersion::CURRENT) {
            return Err(RssError::Metadata(format!(
                "unsupported format version {}.{}",
                survey.version.major, survey.version.minor
            )));
        }

        let bounds: Bounds = serde_json::from_slice(&store.read(BOUNDS_PATH).await?)?;
        let coordinates = TraceCoordinates {
            inline: read_bincode(store.as_ref(), COORDS_INLINE).await?,
            crossline: read_bincode(store.as_ref(), COORDS_CROSSLINE).await?,
            cdpx: read_bincode(store.as_ref(), COORDS_CDPX).await?,
            cdpy: read_bincode(store.as_ref(), COORDS_CDPY).await?,
        };
        let n = coordinates.len();
        if coordinates.crossline.len() != n || coordinates.cdpx.len() != n || coordinates.cdpy.len() != n {
            return Err(RssError::InvalidVolume(
                "coordinate arrays differ in length".to_string(),
            ));
        }

        let cache = Arc::new(CachedStore::new(store.clone(), config.cache_size));
        let mut decoders = Vec::with_capacity(survey.sort_orders.len());
        for &order in &survey.sort_orders {
            let metadata = SeismicVolume::load_metadata(store.as_ref(), order).await?;
            let volume = SeismicVolume::with_metadata(cache.clone(), metadata);
            let scales = load_scales(store.as_ref(), order).await?;
            decoders.push(TraceDecoder::new(volume, scales, bounds, config.fill_value)?);
        }
        if decoders.is_empty() {
            return Err(RssError::InvalidVolume("store holds no volume".to_string()));
        }

        let points = coordinates
            .cdpx
            .iter()
            .zip(&coordinates.cdpy)
            .map(|(&x, &y)| [x, y])
            .collect();
        let lines = coordinates
            .inline
            .iter()
            .zip(&coordinates.crossline)
            .map(|(&il, &xl)| (il, xl))
            .collect();

        info!(
            source = %survey.source_name,
            traces = n,
            sort_orders = ?survey.sort_orders,
            "opened survey"
        );
        Ok(Self {
            survey,
            bounds,
            coordinates,
            cache,
            decoders,
            spatial: SpatialIndex::new(points, lines),
        })
    }

    fn decoder(&self, order: SortOrder) -> Option<&TraceDecoder> {
        self.decoders.iter().find(|d| d.sort_order() == order)
    }

    /// Sort orders with a stored volume
    pub fn sort_orders(&self) -> Vec<SortOrder> {
        self.decoders.iter().map(|d| d.sort_order()).collect()
    }

    /// Decode one inline or crossline
    pub async fn line(&self, number: i32, order: SortOrder) -> Result<LineSlab> {
        match self.decoder(order) {
            Some(decoder) => decoder.get_line(number).await,
            None => Err(RssError::NotFound(format!("{} volume", order))),
        }
    }

    /// Decode one trace, preferring the inline volume
    pub async fn trace(&self, inline: i32, crossline: i32) -> Result<Trace> {
        let decoder = self
            .decoder(SortOrder::Inline)
            .or_else(|| self.decoder(SortOrder::Crossline))
            .ok_or_else(|| RssError::NotFound("seismic volume".to_string()))?;
        decoder.get_trace(inline, crossline).await
    }

    /// The `k` traces nearest to ground point `(x, y)`
    pub fn query_by_xy(&mut self, point: [f64; 2], k: usize) -> Vec<Neighbor> {
        self.spatial.query(point, k)
    }

    /// EBCDIC text header as 40 newline-terminated lines
    pub fn text_header(&self) -> String {
        self.survey.text_header_string()
    }

    pub fn reel_header(&self) -> &ReelHeader {
        &self.survey.reel_header
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn survey(&self) -> &SurveyMetadata {
        &self.survey
    }

    /// Per-trace coordinates in file order
    pub fn coordinates(&self) -> &TraceCoordinates {
        &self.coordinates
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Get statistics about the survey and its volumes
    pub fn stats(&self) -> SurveyStats {
        SurveyStats {
            trace_count: self.coordinates.len(),
            bounds: self.bounds,
            volumes: self
                .decoders
                .iter()
                .map(|d| VolumeStats::from_volume(d.volume()))
                .collect(),
            cache: self.cache.stats(),
        }
    }
}

/// Volume statistics
#[derive(Debug, Clone)]
pub struct VolumeStats {
    pub sort_order: SortOrder,
    pub shape: [usize; 3],
    pub total_chunks: usize,
    pub uncompressed_size: usize,
    pub compression_method: CompressionMethod,
}

impl VolumeStats {
    fn from_volume(volume: &SeismicVolume) -> Self {
        let layout = volume.layout();
        Self {
            sort_order: volume.sort_order(),
            shape: layout.shape,
            total_chunks: layout.total_chunks(),
            uncompressed_size: layout.total_size_bytes(),
            compression_method: volume.metadata().compression,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} volume: {}x{}x{} samples, {} chunks, {} uncompressed ({:?})",
            self.sort_order,
            self.shape[0],
            self.shape[1],
            self.shape[2],
            self.total_chunks,
            format_bytes(self.uncompressed_size),
            self.compression_method,
        )
    }
}

/// Survey statistics
#[derive(Debug, Clone)]
pub struct SurveyStats {
    pub trace_count: usize,
    pub bounds: Bounds,
    pub volumes: Vec<VolumeStats>,
    pub cache: CacheStats,
}
