use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rss::config::{ChunkShape, FieldSpec, IngestConfig};
use rss::io::create_io_manager;
use rss::{ingest, SortOrder};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortOrderArg {
    Inline,
    Crossline,
    Both,
}

impl SortOrderArg {
    fn orders(self) -> Vec<SortOrder> {
        match self {
            SortOrderArg::Inline => vec![SortOrder::Inline],
            SortOrderArg::Crossline => vec![SortOrder::Crossline],
            SortOrderArg::Both => SortOrder::ALL.to_vec(),
        }
    }
}

#[derive(Parser)]
#[command(author, version, about = "Ingest a SEG-Y file into a chunked seismic store")]
struct Cli {
    /// SEG-Y file to ingest
    segy: PathBuf,

    /// Trace header bytes of the inline number, 1-based inclusive
    #[arg(long, value_name = "FIRST-LAST")]
    inline: Option<FieldSpec>,

    /// Trace header bytes of the crossline number
    #[arg(long, value_name = "FIRST-LAST")]
    crossline: Option<FieldSpec>,

    /// Trace header bytes of the CDP x coordinate
    #[arg(long, value_name = "FIRST-LAST")]
    cdpx: Option<FieldSpec>,

    /// Trace header bytes of the CDP y coordinate
    #[arg(long, value_name = "FIRST-LAST")]
    cdpy: Option<FieldSpec>,

    /// Coordinate scalar applied to every trace instead of its own
    #[arg(long = "override-scalco", value_name = "N", allow_hyphen_values = true)]
    override_scalco: Option<i32>,

    /// Volumes to build
    #[arg(long, value_enum)]
    sort_order: Option<SortOrderArg>,

    /// Store directory or URL; defaults to the file stem
    #[arg(long)]
    output: Option<String>,

    /// JSON ingestion config; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Chunk edge along the line and orthogonal axes
    #[arg(long, value_name = "N")]
    chunk: Option<usize>,
}

impl Cli {
    fn ingest_config(&self) -> Result<IngestConfig> {
        let mut config = match &self.config {
            Some(path) => IngestConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => IngestConfig::default(),
        };

        let mut layout = config.field_layout.clone();
        if let Some(spec) = self.inline {
            layout = layout.with_inline(spec);
        }
        if let Some(spec) = self.crossline {
            layout = layout.with_crossline(spec);
        }
        if let Some(spec) = self.cdpx {
            layout = layout.with_cdpx(spec);
        }
        if let Some(spec) = self.cdpy {
            layout = layout.with_cdpy(spec);
        }
        config = config.with_field_layout(layout);

        if self.override_scalco.is_some() {
            config = config.with_scalar_override(self.override_scalco);
        }
        if let Some(order) = self.sort_order {
            config = config.with_sort_orders(order.orders());
        }
        if let Some(n) = self.chunk {
            config = config.with_chunk_shape(ChunkShape {
                orthogonal: n,
                line: n,
            });
        }
        config.validate()?;
        Ok(config)
    }

    fn output(&self) -> Result<String> {
        if let Some(output) = &self.output {
            return Ok(output.clone());
        }
        let stem = self
            .segy
            .file_stem()
            .with_context(|| format!("{} has no file name", self.segy.display()))?;
        Ok(stem.to_string_lossy().into_owned())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.ingest_config()?;
    let output = cli.output()?;
    let store = create_io_manager(&output)
        .await
        .with_context(|| format!("opening store {}", output))?;

    let summary = ingest(&cli.segy, store, config)
        .await
        .with_context(|| format!("ingesting {}", cli.segy.display()))?;

    println!(
        "{} traces, inlines {}..={}, crosslines {}..={}",
        summary.trace_count,
        summary.bounds.min_inline,
        summary.bounds.max_inline,
        summary.bounds.min_crossline,
        summary.bounds.max_crossline,
    );
    for volume in &summary.volumes {
        println!("{}", volume.summary());
    }
    Ok(())
}
