//! real-simple-seismic - SEG-Y into chunked, quantized volumes
//!
//! Ingests a 3D post-stack SEG-Y file into a chunked store of 16-bit quantized
//! lines and reads it back by inline, crossline, trace or ground position.
//!
//! # Features
//!
//! - Single sequential scan of the source, regrouped by inline and/or crossline
//! - Per-line 16-bit quantization with a padding sentinel for missing traces
//! - LZ4, Zstd or Deflate compressed chunks spanning the full sample axis
//! - Byte-bounded LRU chunk cache and lazy R-tree lookup by (x, y)
//! - Local filesystem backend; read-only HTTP(S) with the `http-client` feature
//!
//! # Example
//!
//! ```rust,ignore
//! use rss::{ingest, ClientConfig, IngestConfig, SortOrder, VolumeClient};
//! use rss::io::FileSystemIOManager;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(FileSystemIOManager::new("/data/survey"));
//! ingest("/data/survey.sgy", store, IngestConfig::default()).await?;
//!
//! let mut client = VolumeClient::open("/data/survey", ClientConfig::default()).await?;
//! let line = client.line(1200, SortOrder::Inline).await?;
//! let nearest = client.query_by_xy([605_000.0, 6_073_000.0], 4);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod cache;
pub mod client;
pub mod compression;
pub mod config;
pub mod decoder;
pub mod ebcdic;
pub mod error;
pub mod header;
pub mod ingest;
pub mod io;
pub mod layout;
pub mod metadata;
pub mod quantize;
pub mod reorganize;
pub mod spatial;
pub mod types;
pub mod utils;
pub mod volume;

// Re-exports
pub use builder::{BuildStats, ChunkedVolumeBuilder};
pub use cache::{CacheStats, CachedStore};
pub use client::{SurveyStats, VolumeClient, VolumeStats};
pub use compression::{CompressionMethod, Compressor};
pub use config::{ChunkShape, ClientConfig, FieldLayout, FieldSpec, IngestConfig};
pub use decoder::{LineSlab, Trace, TraceDecoder};
pub use error::{Result, RssError};
pub use header::{ReelHeader, SampleFormat, TraceHeader};
pub use ingest::{ingest, IngestSummary};
pub use io::{IOManager, StorageBackend};
pub use layout::VolumeLayout;
pub use reorganize::{LineReorganizer, LineSet, SurveyScan};
pub use spatial::{Neighbor, SpatialIndex};
pub use types::{Bounds, ScaleEntry, SortOrder};

/// Version of the crate
pub const RSS_VERSION: &str = env!("CARGO_PKG_VERSION");
