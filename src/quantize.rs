//! Per-line 16-bit quantization
//!
//! Samples map into `[1, 65535]`; `0` is never produced and marks padding.
//!
//! The inverse mapping scales by `max` rather than by `max - min`, so it only
//! reproduces the forward mapping exactly when `min == 0`. Stored volumes depend
//! on this pair of formulas, so both are kept as they are.

use crate::types::ScaleEntry;

/// Stored value for positions without a trace
pub const PADDING: u16 = 0;

/// Smallest quantized value for live samples
pub const QUANT_MIN: u16 = 1;

/// Width of the live quantized range
pub const QUANT_SPAN: f64 = 65534.0;

/// Min and max over the finite samples; `(0, 0)` when there are none
pub fn scale_for<'a>(samples: impl IntoIterator<Item = &'a f32>) -> ScaleEntry {
    let (min, max) = samples
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if min > max {
        ScaleEntry::default()
    } else {
        ScaleEntry::new(min, max)
    }
}

/// Forward mapping of one sample
#[inline]
pub fn quantize_value(x: f32, scale: ScaleEntry) -> u16 {
    if scale.is_flat() || !x.is_finite() {
        return QUANT_MIN;
    }
    let range = scale.max as f64 - scale.min as f64;
    let q = (1.0 + QUANT_SPAN * (x as f64 - scale.min as f64) / range).round();
    q.clamp(QUANT_MIN as f64, u16::MAX as f64) as u16
}

/// Inverse mapping of one stored value
#[inline]
pub fn dequantize_value(q: u16, scale: ScaleEntry) -> f32 {
    (scale.min as f64 + (q as f64 - 1.0) * scale.max as f64 / QUANT_SPAN) as f32
}

/// Quantize a whole line's samples, returning the values and their scale
pub fn quantize(samples: &[f32]) -> (Vec<u16>, ScaleEntry) {
    let scale = scale_for(samples);
    let values = samples.iter().map(|&x| quantize_value(x, scale)).collect();
    (values, scale)
}

/// Dequantize stored values; padding positions become `fill`
pub fn dequantize(values: &[u16], scale: ScaleEntry, fill: f32) -> Vec<f32> {
    values
        .iter()
        .map(|&q| {
            if q < QUANT_MIN {
                fill
            } else {
                dequantize_value(q, scale)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extremes_map_to_range_ends() {
        let (q, scale) = quantize(&[-3.0, 0.0, 5.0]);
        assert_eq!(scale, ScaleEntry::new(-3.0, 5.0));
        assert_eq!(q[0], 1);
        assert_eq!(q[2], 65535);
    }

    #[test]
    fn test_flat_line_is_all_ones() {
        let (q, scale) = quantize(&[0.0; 16]);
        assert!(scale.is_flat());
        assert!(q.iter().all(|&v| v == 1));
        assert_eq!(dequantize(&q, scale, f32::NAN), vec![0.0; 16]);

        let (q, scale) = quantize(&[2.5; 4]);
        assert!(q.iter().all(|&v| v == 1));
        assert_eq!(dequantize_value(q[0], scale), 2.5);
    }

    #[test]
    fn test_round_trip_when_min_is_zero() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.37).sin().abs() * 80.0).collect();
        let mut with_zero = samples.clone();
        with_zero.push(0.0);
        let (q, scale) = quantize(&with_zero);
        assert_eq!(scale.min, 0.0);
        let back = dequantize(&q, scale, f32::NAN);
        let range = scale.max - scale.min;
        for (a, b) in with_zero.iter().zip(back.iter()) {
            assert!(((a - b) / range).abs() < 1e-4, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_inverse_scales_by_max_not_range() {
        let (q, scale) = quantize(&[10.0, 20.0]);
        assert_eq!(q, vec![1, 65535]);
        assert_eq!(dequantize_value(q[0], scale), 10.0);
        // forward spans (max - min) = 10, inverse spans max = 20
        assert_eq!(dequantize_value(q[1], scale), 30.0);
    }

    #[test]
    fn test_padding_takes_fill_value() {
        let scale = ScaleEntry::new(0.0, 1.0);
        let out = dequantize(&[0, 1, 65535], scale, -999.0);
        assert_eq!(out, vec![-999.0, 0.0, 1.0]);
    }

    #[test]
    fn test_non_finite_samples() {
        let (q, scale) = quantize(&[f32::NAN, 1.0, 3.0]);
        assert_eq!(scale, ScaleEntry::new(1.0, 3.0));
        assert_eq!(q[0], 1);
        assert_eq!(scale_for(&[f32::NAN]), ScaleEntry::default());
    }

    proptest! {
        #[test]
        fn prop_quantized_never_padding(samples in prop::collection::vec(-1.0e6f32..1.0e6, 1..256)) {
            let (q, _) = quantize(&samples);
            prop_assert!(q.iter().all(|&v| v >= QUANT_MIN));
        }

        #[test]
        fn prop_quantize_is_monotonic(samples in prop::collection::vec(-1.0e3f32..1.0e3, 2..128)) {
            let scale = scale_for(&samples);
            let mut sorted = samples.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let q: Vec<u16> = sorted.iter().map(|&x| quantize_value(x, scale)).collect();
            prop_assert!(q.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
