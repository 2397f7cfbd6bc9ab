//! Linear convolution engine.
//!
//! Two forms of the same O(N·M) sum:
//! - input side ([`convolve`]): each `x[n]` is scattered across `y[n..n + M)`
//! - output side ([`convolve_parallel`]): each `y[k]` is gathered on its own, so
//!   disjoint output segments can be computed by independent workers
//!
//! Both add the contributions to a cell in ascending `n` starting from 0.0, so
//! they produce bit-identical output.

use crate::math::peak_abs;

#[cfg(feature = "parallel")]
use crate::constants::PARALLEL_SEGMENT;

/// Convolution output plus the largest absolute sample in it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvolutionResult {
    pub signal: Vec<f32>,
    pub peak: f32,
}

impl ConvolutionResult {
    fn empty() -> Self {
        Self {
            signal: Vec::new(),
            peak: 0.0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.signal.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }
}

/// `N + M - 1`, or 0 when either input is empty.
#[must_use]
pub fn output_len(n: usize, m: usize) -> usize {
    if n == 0 || m == 0 { 0 } else { n + m - 1 }
}

/// Direct linear convolution of `x` with `h`.
#[must_use]
pub fn convolve(x: &[f32], h: &[f32]) -> ConvolutionResult {
    let len = output_len(x.len(), h.len());
    if len == 0 {
        return ConvolutionResult::empty();
    }

    let mut y = vec![0.0f32; len];
    for (n, &xn) in x.iter().enumerate() {
        for (yk, &hm) in y[n..n + h.len()].iter_mut().zip(h) {
            *yk += xn * hm;
        }
    }

    // Cells are only final here, so the peak is a separate pass.
    let peak = peak_abs(&y);
    ConvolutionResult { signal: y, peak }
}

/// Fill `out` with `y[start..start + out.len())` using the output-side form.
fn convolve_segment(out: &mut [f32], start: usize, x: &[f32], h: &[f32]) {
    let last_n = x.len() - 1;
    let last_m = h.len() - 1;
    for (i, yk) in out.iter_mut().enumerate() {
        let k = start + i;
        let mut acc = 0.0f32;
        for n in k.saturating_sub(last_m)..=k.min(last_n) {
            acc += x[n] * h[k - n];
        }
        *yk = acc;
    }
}

/// Linear convolution split across the rayon pool in disjoint output segments.
///
/// Matches [`convolve`] bit for bit.
#[cfg(feature = "parallel")]
#[must_use]
pub fn convolve_parallel(x: &[f32], h: &[f32]) -> ConvolutionResult {
    use rayon::prelude::*;

    let len = output_len(x.len(), h.len());
    if len == 0 {
        return ConvolutionResult::empty();
    }

    let mut y = vec![0.0f32; len];
    let peak = y
        .par_chunks_mut(PARALLEL_SEGMENT)
        .enumerate()
        .map(|(seg, out)| {
            convolve_segment(out, seg * PARALLEL_SEGMENT, x, h);
            peak_abs(out)
        })
        .reduce(|| 0.0f32, f32::max);

    ConvolutionResult { signal: y, peak }
}

/// Sequential fallback when the `parallel` feature is disabled.
#[cfg(not(feature = "parallel"))]
#[must_use]
pub fn convolve_parallel(x: &[f32], h: &[f32]) -> ConvolutionResult {
    let len = output_len(x.len(), h.len());
    if len == 0 {
        return ConvolutionResult::empty();
    }
    let mut y = vec![0.0f32; len];
    convolve_segment(&mut y, 0, x, h);
    let peak = peak_abs(&y);
    ConvolutionResult { signal: y, peak }
}
