//! Line reorganization: one sequential scan regrouping traces into lines
//!
//! Pass 1 streams every trace once, parks its samples in a pre-sized scratch
//! arena (one slot per trace, in file order) and records which line it belongs
//! to. Pass 2 runs after the global bounds are known and builds each line's
//! presence bitmap over the orthogonal axis.

use crate::config::{FieldLayout, IngestConfig, TRACE_HEADER_SIZE};
use crate::error::{Result, RssError};
use crate::header::{
    decode_samples_into, parse_trace_header, text_header_lines, ReelHeader, DATA_START,
    REEL_HEADER_SIZE, SAMPLE_SIZE, TEXT_HEADER_SIZE,
};
use crate::types::{Bounds, SortOrder};
use byteorder::{ByteOrder, LittleEndian};
use memmap2::Mmap;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Scratch storage holding every trace's decoded samples, indexed by slot
pub struct SampleArena {
    map: Option<Mmap>,
    samples_per_trace: usize,
    slots: usize,
}

/// Sequential writer filling a pre-sized arena during pass 1
pub struct ArenaWriter {
    writer: BufWriter<File>,
    samples_per_trace: usize,
    slots: usize,
    next: usize,
    buf: Vec<u8>,
}

impl ArenaWriter {
    /// Create an arena for `slots` traces of `samples_per_trace` samples
    pub fn create(dir: Option<&Path>, slots: usize, samples_per_trace: usize) -> Result<Self> {
        let file = match dir {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };
        file.set_len((slots * samples_per_trace * SAMPLE_SIZE) as u64)?;
        Ok(Self {
            writer: BufWriter::with_capacity(1 << 20, file),
            samples_per_trace,
            slots,
            next: 0,
            buf: vec![0u8; samples_per_trace * SAMPLE_SIZE],
        })
    }

    /// Store one trace's samples in its slot
    pub fn write(&mut self, slot: usize, samples: &[f32]) -> Result<()> {
        if slot >= self.slots || samples.len() != self.samples_per_trace {
            return Err(RssError::InvalidVolume(format!(
                "arena slot {} with {} samples does not fit {} slots of {}",
                slot,
                samples.len(),
                self.slots,
                self.samples_per_trace
            )));
        }
        if slot != self.next {
            let offset = (slot * self.samples_per_trace * SAMPLE_SIZE) as u64;
            self.writer.seek(SeekFrom::Start(offset))?;
        }
        LittleEndian::write_f32_into(samples, &mut self.buf);
        self.writer.write_all(&self.buf)?;
        self.next = slot + 1;
        Ok(())
    }

    /// Flush and map the arena for random-access reads
    pub fn finish(self) -> Result<SampleArena> {
        let file = self
            .writer
            .into_inner()
            .map_err(|e| RssError::Io(e.into_error()))?;
        let map = if self.slots * self.samples_per_trace == 0 {
            None
        } else {
            // SAFETY: the file is an unlinked temporary owned by this arena;
            // nothing else can truncate or write it while mapped.
            Some(unsafe { Mmap::map(&file)? })
        };
        Ok(SampleArena {
            map,
            samples_per_trace: self.samples_per_trace,
            slots: self.slots,
        })
    }
}

impl SampleArena {
    pub fn samples_per_trace(&self) -> usize {
        self.samples_per_trace
    }

    /// Copy one trace's samples into `out`
    pub fn read_into(&self, slot: usize, out: &mut [f32]) -> Result<()> {
        let stride = self.samples_per_trace * SAMPLE_SIZE;
        match &self.map {
            Some(map) if slot < self.slots && out.len() == self.samples_per_trace => {
                LittleEndian::read_f32_into(&map[slot * stride..(slot + 1) * stride], out);
                Ok(())
            }
            _ => Err(RssError::InvalidVolume(format!(
                "arena slot {} outside {} slots",
                slot, self.slots
            ))),
        }
    }

    /// Samples of every trace in a line, concatenated in line order
    pub fn line_samples(&self, line: &Line) -> Result<Vec<f32>> {
        let mut out = vec![0.0; line.slots.len() * self.samples_per_trace];
        for (chunk, &slot) in out.chunks_mut(self.samples_per_trace).zip(&line.slots) {
            self.read_into(slot, chunk)?;
        }
        Ok(out)
    }
}

/// Traces sharing one value on the sort axis
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub number: i32,
    /// Arena slots, in file order
    pub slots: Vec<usize>,
    /// Orthogonal-axis value of each trace in `slots`
    pub orthogonal: Vec<i32>,
    /// Live positions over the whole orthogonal extent; filled by pass 2
    pub presence: Vec<bool>,
}

impl Line {
    fn new(number: i32) -> Self {
        Self {
            number,
            slots: Vec::new(),
            orthogonal: Vec::new(),
            presence: Vec::new(),
        }
    }
}

/// Lines of one sort order
#[derive(Debug, Clone)]
pub struct LineSet {
    pub sort_order: SortOrder,
    lines: BTreeMap<i32, Line>,
}

impl LineSet {
    pub fn new(sort_order: SortOrder) -> Self {
        Self {
            sort_order,
            lines: BTreeMap::new(),
        }
    }

    /// Append a trace to the line it belongs to
    pub fn push(&mut self, line: i32, slot: usize, orthogonal: i32) {
        let entry = self.lines.entry(line).or_insert_with(|| Line::new(line));
        entry.slots.push(slot);
        entry.orthogonal.push(orthogonal);
    }

    /// Pass 2: build presence bitmaps sized to the orthogonal extent
    pub fn finalize(&mut self, bounds: &Bounds) -> Result<()> {
        let orthogonal = self.sort_order.orthogonal();
        let extent = bounds.extent(orthogonal);
        for line in self.lines.values_mut() {
            let mut presence = vec![false; extent];
            for &value in &line.orthogonal {
                presence[bounds.offset(orthogonal, value)?] = true;
            }
            line.presence = presence;
        }
        Ok(())
    }

    pub fn get(&self, number: i32) -> Option<&Line> {
        self.lines.get(&number)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Flat per-trace coordinates, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceCoordinates {
    pub inline: Vec<i32>,
    pub crossline: Vec<i32>,
    pub cdpx: Vec<f64>,
    pub cdpy: Vec<f64>,
}

impl TraceCoordinates {
    fn with_capacity(n: usize) -> Self {
        Self {
            inline: Vec::with_capacity(n),
            crossline: Vec::with_capacity(n),
            cdpx: Vec::with_capacity(n),
            cdpy: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.inline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inline.is_empty()
    }

    /// Bounds over positive inline and crossline numbers
    pub fn bounds(&self) -> Option<Bounds> {
        let (min_il, max_il) = positive_range(&self.inline)?;
        let (min_xl, max_xl) = positive_range(&self.crossline)?;
        Some(Bounds::new(min_il, min_xl, max_il, max_xl))
    }

    /// Traces usable for gridding: both line numbers positive
    pub fn is_gridded(&self, index: usize) -> bool {
        self.inline[index] > 0 && self.crossline[index] > 0
    }
}

fn positive_range(values: &[i32]) -> Option<(i32, i32)> {
    values
        .iter()
        .filter(|&&v| v > 0)
        .fold(None, |acc: Option<(i32, i32)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Everything pass 1 and pass 2 learn about a source file
pub struct SurveyScan {
    pub text_header: Vec<String>,
    pub reel: ReelHeader,
    pub coordinates: TraceCoordinates,
    pub bounds: Bounds,
    pub arena: SampleArena,
    /// Lines of the sort order requested for the scan
    pub lines: Arc<LineSet>,
}

impl SurveyScan {
    /// Lines for any sort order, regrouped from the flat coordinates if needed
    pub fn lines_for(&self, order: SortOrder) -> Result<Arc<LineSet>> {
        if order == self.lines.sort_order {
            return Ok(Arc::clone(&self.lines));
        }
        let coords = &self.coordinates;
        let mut lines = LineSet::new(order);
        for slot in (0..coords.len()).filter(|&i| coords.is_gridded(i)) {
            let (il, xl) = (coords.inline[slot], coords.crossline[slot]);
            lines.push(order.select(il, xl), slot, order.orthogonal().select(il, xl));
        }
        lines.finalize(&self.bounds)?;
        Ok(Arc::new(lines))
    }
}

/// Sequential two-pass scanner
#[derive(Debug, Clone)]
pub struct LineReorganizer {
    field_layout: FieldLayout,
    scalar_override: Option<i32>,
    sort_order: SortOrder,
    scratch_dir: Option<PathBuf>,
    progress_interval: usize,
}

impl LineReorganizer {
    /// Scanner for the first sort order of a configuration
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            field_layout: config.field_layout.clone(),
            scalar_override: config.scalar_override,
            sort_order: config.sort_orders.first().copied().unwrap_or(SortOrder::Inline),
            scratch_dir: config.scratch_dir.clone(),
            progress_interval: config.progress_interval.max(1),
        }
    }

    /// Run both passes over a SEG-Y file
    pub fn scan(&self, source: impl AsRef<Path>) -> Result<SurveyScan> {
        let source = source.as_ref();
        self.field_layout.validate()?;

        let mut file = File::open(source)?;
        let file_size = file.metadata()?.len();
        if file_size < DATA_START {
            return Err(RssError::TruncatedFile {
                expected: DATA_START,
                actual: file_size,
            });
        }
        let mut headers = vec![0u8; DATA_START as usize];
        file.read_exact(&mut headers)?;
        let text_header = text_header_lines(&headers[..TEXT_HEADER_SIZE])?;
        let reel = ReelHeader::from_bytes(
            &headers[TEXT_HEADER_SIZE..TEXT_HEADER_SIZE + REEL_HEADER_SIZE],
            file_size,
        )?;
        info!(
            source = %source.display(),
            traces = reel.trace_count,
            samples = reel.sample_count,
            format = ?reel.format,
            "scanning traces"
        );

        let mut arena = ArenaWriter::create(
            self.scratch_dir.as_deref(),
            reel.trace_count,
            reel.sample_count,
        )?;
        let mut coordinates = TraceCoordinates::with_capacity(reel.trace_count);
        let mut lines = LineSet::new(self.sort_order);
        let orthogonal = self.sort_order.orthogonal();

        let mut reader = BufReader::with_capacity(1 << 20, file);
        let mut trace = vec![0u8; reel.trace_size];
        let mut samples = vec![0.0f32; reel.sample_count];
        let mut skipped = 0usize;

        for slot in 0..reel.trace_count {
            reader.read_exact(&mut trace)?;
            let header = parse_trace_header(
                &trace[..TRACE_HEADER_SIZE],
                &self.field_layout,
                self.scalar_override,
            )?;
            decode_samples_into(&trace[TRACE_HEADER_SIZE..], reel.format, &mut samples)?;
            arena.write(slot, &samples)?;

            coordinates.inline.push(header.inline);
            coordinates.crossline.push(header.crossline);
            coordinates.cdpx.push(header.cdpx);
            coordinates.cdpy.push(header.cdpy);

            if header.inline > 0 && header.crossline > 0 {
                lines.push(
                    self.sort_order.select(header.inline, header.crossline),
                    slot,
                    orthogonal.select(header.inline, header.crossline),
                );
            } else {
                skipped += 1;
            }

            if (slot + 1) % self.progress_interval == 0 {
                debug!(done = slot + 1, total = reel.trace_count, "scan progress");
            }
        }

        let arena = arena.finish()?;
        let bounds = coordinates.bounds().ok_or_else(|| {
            RssError::InvalidVolume(
                "no trace has positive inline and crossline numbers".to_string(),
            )
        })?;
        if skipped > 0 {
            warn!(skipped, "traces with non-positive line numbers left out of the grid");
        }

        lines.finalize(&bounds)?;
        info!(
            lines = lines.len(),
            sort_order = %self.sort_order,
            min_inline = bounds.min_inline,
            max_inline = bounds.max_inline,
            min_crossline = bounds.min_crossline,
            max_crossline = bounds.max_crossline,
            "scan complete"
        );

        Ok(SurveyScan {
            text_header,
            reel,
            coordinates,
            bounds,
            arena,
            lines: Arc::new(lines),
        })
    }
}
