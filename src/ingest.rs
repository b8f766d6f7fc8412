//! One-call ingestion of a SEG-Y file into a store

use crate::builder::{BuildStats, ChunkedVolumeBuilder};
use crate::config::IngestConfig;
use crate::error::Result;
use crate::io::IOManager;
use crate::metadata::{FormatVersion, SurveyMetadata};
use crate::reorganize::LineReorganizer;
use crate::types::{Bounds, SortOrder};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use uuid::Uuid;

/// What an ingestion run produced
#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub ingest_id: Uuid,
    pub trace_count: usize,
    pub bounds: Bounds,
    pub volumes: Vec<BuildStats>,
    pub elapsed: Duration,
}

/// Scan `source` once and build a volume per configured sort order
pub async fn ingest(
    source: impl AsRef<Path>,
    store: Arc<dyn IOManager>,
    config: IngestConfig,
) -> Result<IngestSummary> {
    let started = Instant::now();
    config.validate()?;
    let source = source.as_ref().to_path_buf();

    let mut orders: Vec<SortOrder> = Vec::with_capacity(config.sort_orders.len());
    for order in &config.sort_orders {
        if !orders.contains(order) {
            orders.push(*order);
        }
    }

    let reorganizer = LineReorganizer::from_config(&config);
    let scan_source = source.clone();
    let scan = tokio::task::spawn_blocking(move || reorganizer.scan(&scan_source)).await??;
    let scan = Arc::new(scan);

    let ingest_id = Uuid::new_v4();
    let builder = ChunkedVolumeBuilder::new(store, &config, ingest_id);
    let mut volumes = Vec::with_capacity(orders.len());
    for &order in &orders {
        let lines = scan.lines_for(order)?;
        volumes.push(builder.build(scan.clone(), lines).await?);
    }

    let survey = SurveyMetadata {
        version: FormatVersion::CURRENT,
        ingest_id,
        source_name: source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        text_header: scan.text_header.clone(),
        reel_header: scan.reel,
        field_layout: config.field_layout.clone(),
        scalar_override: config.scalar_override,
        sort_orders: orders,
        created_at: Utc::now(),
    };
    builder.write_survey(&scan, &survey).await?;

    let summary = IngestSummary {
        ingest_id,
        trace_count: scan.coordinates.len(),
        bounds: scan.bounds,
        volumes,
        elapsed: started.elapsed(),
    };
    info!(
        source = %source.display(),
        traces = summary.trace_count,
        volumes = summary.volumes.len(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "ingestion complete"
    );
    Ok(summary)
}
