// Centralized tolerances and numeric guards for tolerance-based topology

use serde::{Deserialize, Serialize};

pub const EPS_LEN: f32 = 1e-6;            // zero-length vector threshold
pub const EPS_DENOM: f32 = 1e-8;          // denominator guard for LS/ratios

// Sampling caps per curve
pub const MIN_CURVE_SEGMENTS: u32 = 4;
pub const MAX_CURVE_SEGMENTS: u32 = 4096;

/// Geometric tolerances supplied by the caller. The graph reads them but never
/// changes them.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Two points closer than this are the same point.
    pub point_merge_dist: f32,
    /// Max deviation when refitting a curve to samples.
    pub curve_fitting_tol: f32,
    /// Arc-length step used to sample curves.
    pub curve_sample_step: f32,
}

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances {
            point_merge_dist: 1e-2,
            curve_fitting_tol: 1e-3,
            curve_sample_step: 1e-2,
        }
    }
}

#[inline] pub fn clamp01(x: f32) -> f32 { x.max(0.0).min(1.0) }

/// Number of parameter-uniform segments for a curve of `length` sampled at `step`.
pub fn segments_for(length: f32, step: f32) -> u32 {
    if !(length.is_finite() && step.is_finite()) || step <= 0.0 {
        return MIN_CURVE_SEGMENTS;
    }
    let n = (length / step).ceil();
    if n >= MAX_CURVE_SEGMENTS as f32 {
        MAX_CURVE_SEGMENTS
    } else {
        (n as u32).max(MIN_CURVE_SEGMENTS)
    }
}
