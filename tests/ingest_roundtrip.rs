//! End-to-end ingestion of synthetic SEG-Y files and read-back through the client

use byteorder::{BigEndian, ByteOrder};
use rss::config::{ChunkShape, ClientConfig, IngestConfig};
use rss::io::{FileSystemIOManager, IOManager};
use rss::{ebcdic, ingest, Bounds, RssError, SortOrder, VolumeClient};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const SAMPLES: usize = 5;
const INLINES: std::ops::RangeInclusive<i32> = 10..=12;
const CROSSLINES: std::ops::RangeInclusive<i32> = 20..=23;
/// Position left out of the grid
const GAP: (i32, i32) = (11, 22);

/// Sample `s` of trace (il, xl); every line starts at 0
fn sample(il: i32, xl: i32, s: usize) -> f32 {
    s as f32 * (xl - 19) as f32 * (il - 9) as f32 * 0.5
}

/// Inline 11 holds one constant value; the rest follow `sample`
fn flat_inline(il: i32, xl: i32, s: usize) -> f32 {
    if il == 11 {
        3.0
    } else {
        sample(il, xl, s)
    }
}

type SampleFn = fn(i32, i32, usize) -> f32;

fn to_ibm(v: f64) -> u32 {
    if v == 0.0 {
        return 0;
    }
    let sign = if v < 0.0 { 1u32 << 31 } else { 0 };
    let mut m = v.abs();
    let mut e = 64i32;
    while m >= 1.0 {
        m /= 16.0;
        e += 1;
    }
    while m < 1.0 / 16.0 {
        m *= 16.0;
        e -= 1;
    }
    sign | ((e as u32) << 24) | (m * 16_777_216.0) as u32
}

struct Fixture {
    _dir: TempDir,
    segy: PathBuf,
    store_dir: PathBuf,
}

fn trace_bytes(il: i32, xl: i32, format: u16, values: SampleFn) -> Vec<u8> {
    let mut trace = vec![0u8; 240 + SAMPLES * 4];
    BigEndian::write_i16(&mut trace[70..72], -10);
    BigEndian::write_i32(&mut trace[180..184], il * 1000);
    BigEndian::write_i32(&mut trace[184..188], xl * 500);
    BigEndian::write_i32(&mut trace[188..192], il);
    BigEndian::write_i32(&mut trace[192..196], xl);
    for s in 0..SAMPLES {
        let word = &mut trace[240 + s * 4..244 + s * 4];
        let value = values(il, xl, s);
        match format {
            1 => BigEndian::write_u32(word, to_ibm(value as f64)),
            _ => BigEndian::write_f32(word, value),
        }
    }
    trace
}

/// Crossline-fastest survey with one gap and one trace numbered 0
fn write_segy(path: &Path, format: u16, values: SampleFn) {
    let mut data = Vec::new();
    for card in 1..=40 {
        let text = if card == 1 {
            "C 1 SYNTHETIC SURVEY".to_string()
        } else {
            format!("C{:2}", card)
        };
        data.extend(ebcdic::encode(&format!("{:<80}", text)));
    }

    let mut reel = vec![0u8; 400];
    BigEndian::write_u16(&mut reel[16..18], 4000);
    BigEndian::write_u16(&mut reel[20..22], SAMPLES as u16);
    BigEndian::write_u16(&mut reel[24..26], format);
    BigEndian::write_u16(&mut reel[54..56], 1);
    data.extend(reel);

    for il in INLINES {
        for xl in CROSSLINES {
            if (il, xl) != GAP {
                data.extend(trace_bytes(il, xl, format, values));
            }
        }
    }
    data.extend(trace_bytes(0, 21, format, values));
    std::fs::write(path, data).unwrap();
}

fn fixture(format: u16) -> Fixture {
    fixture_with(format, sample)
}

fn fixture_with(format: u16, values: SampleFn) -> Fixture {
    let dir = TempDir::new().unwrap();
    let segy = dir.path().join("synthetic.sgy");
    write_segy(&segy, format, values);
    let store_dir = dir.path().join("synthetic");
    Fixture {
        _dir: dir,
        segy,
        store_dir,
    }
}

async fn ingest_fixture(fx: &Fixture, config: IngestConfig) -> VolumeClient {
    let store: Arc<dyn IOManager> = Arc::new(FileSystemIOManager::new(&fx.store_dir));
    ingest(&fx.segy, store, config).await.unwrap();
    VolumeClient::open(fx.store_dir.to_str().unwrap(), ClientConfig::default())
        .await
        .unwrap()
}

fn assert_close(actual: f32, expected: f32, range: f32) {
    assert!(
        (actual - expected).abs() <= range * 1e-4,
        "{} vs {}",
        actual,
        expected
    );
}

#[tokio::test]
async fn test_ingest_reports_bounds_and_headers() {
    let fx = fixture(5);
    let store: Arc<dyn IOManager> = Arc::new(FileSystemIOManager::new(&fx.store_dir));
    let summary = ingest(&fx.segy, store.clone(), IngestConfig::default())
        .await
        .unwrap();

    assert_eq!(summary.trace_count, 12);
    assert_eq!(summary.bounds, Bounds::new(10, 20, 12, 23));
    assert_eq!(summary.volumes.len(), 1);
    assert_eq!(summary.volumes[0].layout.shape, [SAMPLES, 4, 3]);
    for path in ["bounds", "coords/cdpx", "inline/scalers", "survey.json"] {
        assert!(store.exists(path).await.unwrap(), "{} missing", path);
    }
    assert!(!store.exists("crossline/scalers").await.unwrap());

    let client = VolumeClient::open(fx.store_dir.to_str().unwrap(), ClientConfig::default())
        .await
        .unwrap();
    let text = client.text_header();
    assert!(text.starts_with("C 1 SYNTHETIC SURVEY"));
    assert_eq!(text.lines().count(), 40);
    assert_eq!(client.reel_header().sample_count, SAMPLES);
    assert_eq!(client.reel_header().sample_interval_ms, 4.0);
    assert_eq!(client.stats().trace_count, 12);
    assert_eq!(client.coordinates().cdpx[0], 1000.0);
    assert_eq!(client.coordinates().inline[11], 0);
}

#[tokio::test]
async fn test_inline_read_back_masks_gap() {
    let fx = fixture(5);
    let client = ingest_fixture(&fx, IngestConfig::default()).await;

    let line = client.line(11, SortOrder::Inline).await.unwrap();
    assert_eq!(line.traces.dim(), (SAMPLES, 4));
    for (o, xl) in CROSSLINES.enumerate() {
        let gap = (11, xl) == GAP;
        assert!(line.mask.column(o).iter().all(|&m| m == gap));
        for s in 0..SAMPLES {
            if gap {
                assert!(line.traces[[s, o]].is_nan());
            } else {
                assert_close(line.traces[[s, o]], sample(11, xl, s), 16.0);
            }
        }
    }
}

#[tokio::test]
async fn test_flat_line_stays_live() {
    let fx = fixture_with(5, flat_inline);
    let client = ingest_fixture(&fx, IngestConfig::default()).await;

    let line = client.line(11, SortOrder::Inline).await.unwrap();
    for (o, xl) in CROSSLINES.enumerate() {
        let gap = (11, xl) == GAP;
        assert!(line.mask.column(o).iter().all(|&m| m == gap), "crossline {}", xl);
        for s in 0..SAMPLES {
            if gap {
                assert!(line.traces[[s, o]].is_nan());
            } else {
                assert_eq!(line.traces[[s, o]], 3.0);
            }
        }
    }
    assert!(client.trace(11, 21).await.unwrap().is_live());
    assert!(!client.trace(GAP.0, GAP.1).await.unwrap().is_live());

    let ramp = client.line(12, SortOrder::Inline).await.unwrap();
    assert!(!ramp.mask.iter().any(|&m| m));
}

#[tokio::test]
async fn test_bounds_are_checked() {
    let fx = fixture(5);
    let client = ingest_fixture(&fx, IngestConfig::default()).await;

    assert!(client.line(10, SortOrder::Inline).await.is_ok());
    assert!(client.line(12, SortOrder::Inline).await.is_ok());
    assert!(matches!(
        client.line(13, SortOrder::Inline).await,
        Err(RssError::Bounds { requested: 13, min: 10, max: 12, .. })
    ));
    assert!(client.line(9, SortOrder::Inline).await.is_err());
    assert!(client.trace(10, 24).await.is_err());
    assert!(matches!(
        client.line(21, SortOrder::Crossline).await,
        Err(RssError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_trace_liveness() {
    let fx = fixture(5);
    let client = ingest_fixture(&fx, IngestConfig::default()).await;

    let dead = client.trace(GAP.0, GAP.1).await.unwrap();
    assert!(!dead.is_live());
    assert!(dead.samples.iter().all(|v| v.is_nan()));

    let live = client.trace(12, 23).await.unwrap();
    assert!(live.is_live());
    for s in 0..SAMPLES {
        assert_close(live.samples[s], sample(12, 23, s), 24.0);
    }
}

#[tokio::test]
async fn test_query_by_xy() {
    let fx = fixture(5);
    let mut client = ingest_fixture(&fx, IngestConfig::default()).await;

    let hits = client.query_by_xy([1205.0, 1149.0], 2);
    assert_eq!(hits.len(), 2);
    assert_eq!((hits[0].inline, hits[0].crossline), (12, 23));
    assert_eq!((hits[0].x, hits[0].y), (1200.0, 1150.0));
    assert!((hits[0].distance - 26f64.sqrt()).abs() < 1e-9);
    assert!(hits[1].distance >= hits[0].distance);
}

#[tokio::test]
async fn test_both_sort_orders_share_one_scan() {
    let fx = fixture(5);
    let config = IngestConfig::default()
        .with_sort_orders(vec![SortOrder::Inline, SortOrder::Crossline])
        .with_chunk_shape(ChunkShape {
            orthogonal: 2,
            line: 3,
        });
    let client = ingest_fixture(&fx, config).await;
    assert_eq!(client.sort_orders(), SortOrder::ALL.to_vec());

    let line = client.line(22, SortOrder::Crossline).await.unwrap();
    assert_eq!(line.traces.dim(), (SAMPLES, 3));
    assert!(line.mask.column(1).iter().all(|&m| m));
    assert!(!line.mask.column(0).iter().any(|&m| m));
    for (o, il) in INLINES.enumerate() {
        if (il, 22) != GAP {
            assert_close(line.traces[[4, o]], sample(il, 22, 4), 12.0);
        }
    }

    let inline = client.line(12, SortOrder::Inline).await.unwrap();
    assert_close(inline.traces[[4, 2]], sample(12, 22, 4), 24.0);
}

#[tokio::test]
async fn test_crossline_only_store_serves_traces() {
    let fx = fixture(5);
    let config = IngestConfig::default().with_sort_orders(vec![SortOrder::Crossline]);
    let client = ingest_fixture(&fx, config).await;
    assert_eq!(client.sort_orders(), vec![SortOrder::Crossline]);
    assert_eq!(client.survey().sort_orders, vec![SortOrder::Crossline]);

    let live = client.trace(12, 23).await.unwrap();
    assert!(live.is_live());
    for s in 0..SAMPLES {
        assert_close(live.samples[s], sample(12, 23, s), 24.0);
    }
    let dead = client.trace(GAP.0, GAP.1).await.unwrap();
    assert!(!dead.is_live());
    assert!(dead.samples.iter().all(|v| v.is_nan()));

    assert!(client.line(22, SortOrder::Crossline).await.is_ok());
    assert!(matches!(
        client.line(11, SortOrder::Inline).await,
        Err(RssError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_ibm_samples_decode() {
    let fx = fixture(1);
    let client = ingest_fixture(&fx, IngestConfig::default()).await;

    let line = client.line(10, SortOrder::Inline).await.unwrap();
    for (o, xl) in CROSSLINES.enumerate() {
        for s in 0..SAMPLES {
            assert_close(line.traces[[s, o]], sample(10, xl, s), 8.0);
        }
    }
}

#[tokio::test]
async fn test_open_leaves_cache_to_chunks() {
    let fx = fixture(5);
    let client = ingest_fixture(&fx, IngestConfig::default()).await;
    let stats = client.cache_stats();
    assert_eq!((stats.hits, stats.misses, stats.entries), (0, 0, 0));

    client.line(10, SortOrder::Inline).await.unwrap();
    let stats = client.cache_stats();
    assert!(stats.misses > 0);
    assert_eq!(stats.entries as u64, stats.misses);
}

#[tokio::test]
async fn test_repeated_reads_hit_cache() {
    let fx = fixture(5);
    let client = ingest_fixture(&fx, IngestConfig::default()).await;

    client.line(10, SortOrder::Inline).await.unwrap();
    let misses = client.cache_stats().misses;
    client.line(10, SortOrder::Inline).await.unwrap();
    let stats = client.cache_stats();
    assert_eq!(stats.misses, misses);
    assert!(stats.hits > 0);
}

#[tokio::test]
async fn test_ragged_file_is_rejected() {
    let fx = fixture(5);
    let mut data = std::fs::read(&fx.segy).unwrap();
    data.extend([0u8; 7]);
    std::fs::write(&fx.segy, data).unwrap();

    let store: Arc<dyn IOManager> = Arc::new(FileSystemIOManager::new(&fx.store_dir));
    let err = ingest(&fx.segy, store, IngestConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RssError::VariableTraceLength { .. }));
}
