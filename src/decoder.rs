//! Decoding stored lines and traces back to floats

use crate::error::{Result, RssError};
use crate::io::IOManager;
use crate::quantize::{dequantize_value, QUANT_MIN};
use crate::types::{Bounds, ScaleEntry, SortOrder};
use crate::utils::scalers_path;
use crate::volume::SeismicVolume;
use ndarray::{Array1, Array2, Axis, Zip};

/// One decoded line, (samples, orthogonal positions)
#[derive(Debug, Clone)]
pub struct LineSlab {
    pub traces: Array2<f32>,
    /// `true` where the position held no trace
    pub mask: Array2<bool>,
}

impl LineSlab {
    /// Orthogonal positions with at least one live sample
    pub fn live_positions(&self) -> usize {
        self.mask
            .axis_iter(Axis(1))
            .filter(|column| column.iter().any(|&m| !m))
            .count()
    }
}

/// One decoded trace
#[derive(Debug, Clone)]
pub struct Trace {
    pub samples: Array1<f32>,
    pub mask: Array1<bool>,
}

impl Trace {
    /// A trace is live when no sample is padding
    pub fn is_live(&self) -> bool {
        !self.mask.iter().any(|&m| m)
    }
}

/// Read the per-line scale table of one sort order
pub async fn load_scales(store: &dyn IOManager, order: SortOrder) -> Result<Vec<ScaleEntry>> {
    let bytes = store.read(&scalers_path(order)).await?;
    Ok(bincode::deserialize(&bytes)?)
}

/// Dequantizing reader over one sort order's volume
pub struct TraceDecoder {
    volume: SeismicVolume,
    scales: Vec<ScaleEntry>,
    bounds: Bounds,
    fill_value: f32,
}

impl TraceDecoder {
    pub fn new(
        volume: SeismicVolume,
        scales: Vec<ScaleEntry>,
        bounds: Bounds,
        fill_value: f32,
    ) -> Result<Self> {
        let order = volume.sort_order();
        let layout = volume.layout();
        if scales.len() != layout.lines()
            || layout.lines() != bounds.extent(order)
            || layout.orthogonal() != bounds.extent(order.orthogonal())
        {
            return Err(RssError::InvalidVolume(format!(
                "{} volume {:?} with {} scales does not match bounds {:?}",
                order,
                layout.shape,
                scales.len(),
                bounds
            )));
        }
        Ok(Self {
            volume,
            scales,
            bounds,
            fill_value,
        })
    }

    pub fn sort_order(&self) -> SortOrder {
        self.volume.sort_order()
    }

    pub fn volume(&self) -> &SeismicVolume {
        &self.volume
    }

    /// Decode line `number` of this decoder's sort order
    pub async fn get_line(&self, number: i32) -> Result<LineSlab> {
        let offset = self.bounds.offset(self.sort_order(), number)?;
        let stored = self.volume.read_line(offset).await?;
        let scale = self.scales[offset];

        let mask = stored.mapv(|q| q < QUANT_MIN);
        let mut traces = Array2::from_elem(stored.dim(), self.fill_value);
        Zip::from(&mut traces)
            .and(&stored)
            .for_each(|x, &q| {
                if q >= QUANT_MIN {
                    *x = dequantize_value(q, scale);
                }
            });
        Ok(LineSlab { traces, mask })
    }

    /// Decode the trace at (`inline`, `crossline`)
    pub async fn get_trace(&self, inline: i32, crossline: i32) -> Result<Trace> {
        let il = self.bounds.offset(SortOrder::Inline, inline)?;
        let xl = self.bounds.offset(SortOrder::Crossline, crossline)?;
        let order = self.sort_order();
        let (line, orthogonal) = match order {
            SortOrder::Inline => (il, xl),
            SortOrder::Crossline => (xl, il),
        };

        let stored = self.volume.read_trace(line, orthogonal).await?;
        let scale = self.scales[line];
        let mask = stored.mapv(|q| q < QUANT_MIN);
        let samples = stored.mapv(|q| {
            if q < QUANT_MIN {
                self.fill_value
            } else {
                dequantize_value(q, scale)
            }
        });
        Ok(Trace { samples, mask })
    }
}
