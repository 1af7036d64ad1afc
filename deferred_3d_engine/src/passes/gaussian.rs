/// Gaussian blur kernel for the bloom passes
///
/// The separable blur samples each axis once per pair of taps by letting
/// the bilinear filter blend two texels: a K-wide kernel collapses to
/// `1 + K / 2` (offset, weight) pairs, 22 for the 43-wide default.

use crate::error::{Error, Result};
use crate::engine_error;

/// Number of (offset, weight) pairs the blur shaders read
pub const GAUSSIAN_TAPS: usize = 22;

fn invalid(message: String) -> Error {
    engine_error!("deferred3d::Gaussian", "{}", message);
    Error::InvalidResource(message)
}

/// Normalised 1D Gaussian weights for x in [-size/2, size/2]
///
/// # Errors
///
/// `size` must be odd and `sigma` positive.
pub fn gaussian_kernel_1d(sigma: f32, size: usize) -> Result<Vec<f32>> {
    if size % 2 == 0 {
        return Err(invalid(format!("Gaussian kernel size must be odd, got {}", size)));
    }
    if sigma <= 0.0 || !sigma.is_finite() {
        return Err(invalid(format!("Gaussian sigma must be positive, got {}", sigma)));
    }

    let half = (size / 2) as i32;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let norm = 1.0 / (std::f32::consts::PI * two_sigma_sq);
    let mut weights: Vec<f32> = (-half..=half)
        .map(|x| norm * (-((x * x) as f32) / two_sigma_sq).exp())
        .collect();

    let sum: f32 = weights.iter().sum();
    for weight in &mut weights {
        *weight /= sum;
    }
    Ok(weights)
}

/// Collapse symmetric taps into bilinear sample pairs
///
/// The centre tap keeps offset 0 and its weight. Every distance `i` from
/// the centre becomes one sample with weight `w[c+i] + w[c-i]` at offset
/// `(i * w[c+i] + (i + 1) * w[c-i]) / weight`. Returns `(offsets, weights)`.
pub fn reduce_for_linear_sampling(weights: &[f32]) -> (Vec<f32>, Vec<f32>) {
    if weights.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let centre = weights.len() / 2;
    let mut offsets = vec![0.0];
    let mut combined = vec![weights[centre]];

    for i in 1..=centre {
        let w1 = weights[centre + i];
        let w2 = weights[centre - i];
        let weight = w1 + w2;
        let offset = if weight > 0.0 {
            (i as f32 * w1 + (i + 1) as f32 * w2) / weight
        } else {
            i as f32
        };
        offsets.push(offset);
        combined.push(weight);
    }
    (offsets, combined)
}

/// Uniform block read by the blur shaders (std140: two float arrays)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GaussianWeights {
    pub weights: [f32; GAUSSIAN_TAPS],
    pub offsets: [f32; GAUSSIAN_TAPS],
}

impl GaussianWeights {
    /// Build the reduced kernel; unused trailing taps stay zero
    ///
    /// # Errors
    ///
    /// Fails if the kernel is invalid or reduces to more than
    /// [`GAUSSIAN_TAPS`] pairs.
    pub fn new(sigma: f32, size: usize) -> Result<Self> {
        let (offsets, weights) = reduce_for_linear_sampling(&gaussian_kernel_1d(sigma, size)?);
        if weights.len() > GAUSSIAN_TAPS {
            return Err(invalid(format!(
                "Kernel of size {} reduces to {} taps, at most {} fit the uniform block",
                size, weights.len(), GAUSSIAN_TAPS
            )));
        }
        let mut block: Self = bytemuck::Zeroable::zeroed();
        block.weights[..weights.len()].copy_from_slice(&weights);
        block.offsets[..offsets.len()].copy_from_slice(&offsets);
        Ok(block)
    }
}

#[cfg(test)]
#[path = "gaussian_tests.rs"]
mod tests;
