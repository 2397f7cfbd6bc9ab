//! int16 <-> f32 sample conversion.

use crate::constants::{HEADROOM_FACTOR, PCM_SCALE};

/// Map an int16 sample into `[-1.0, 1.0)`.
#[inline]
#[must_use]
pub fn to_normalized(sample: i16) -> f32 {
    f32::from(sample) / PCM_SCALE
}

/// Rescale `value` so that `peak` lands at `1 / HEADROOM_FACTOR` of full scale.
///
/// A zero (or non-finite) peak means the signal is silent; the result is 0 rather
/// than a division by zero.
#[inline]
#[must_use]
pub fn to_scaled_sample(value: f32, peak: f32) -> i16 {
    if peak == 0.0 || !peak.is_finite() {
        return 0;
    }
    let scaled = (value / (peak * HEADROOM_FACTOR)) * PCM_SCALE;
    scaled
        .clamp(f32::from(i16::MIN), f32::from(i16::MAX))
        .round() as i16
}

#[must_use]
pub fn normalize(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| to_normalized(s)).collect()
}

/// Element-wise [`to_scaled_sample`] over a whole buffer.
#[must_use]
pub fn rescale(signal: &[f32], peak: f32) -> Vec<i16> {
    signal.iter().map(|&v| to_scaled_sample(v, peak)).collect()
}
