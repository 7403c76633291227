//! Rebuild a single curve from a dense point sequence.
//!
//! A straight run becomes a line; anything else becomes one cubic fitted by
//! least squares with fixed end points, refined with a few Newton
//! re-parameterization passes.

use super::math::{bezier_point, seg_distance_sq};
use super::tolerance::{clamp01, EPS_DENOM, EPS_LEN};
use crate::model::Vec2;

const REPARAM_ITERS: usize = 4;

/// Key point positions of the fitted curve: 2 for a line, 4 for a cubic.
/// The first and last entries are always the first and last samples.
pub fn fit_one_curve(samples: &[Vec2], tolerance: f32) -> Vec<Vec2> {
    let pts = dedup(samples);
    if pts.len() < 3 {
        return match (samples.first(), samples.last()) {
            (Some(a), Some(b)) => vec![*a, *b],
            _ => Vec::new(),
        };
    }
    let a = pts[0];
    let b = pts[pts.len() - 1];
    let chord_dev = pts
        .iter()
        .map(|p| seg_distance_sq(*p, a, b).0)
        .fold(0.0f32, f32::max)
        .sqrt();
    if chord_dev <= tolerance {
        return vec![a, b];
    }

    let mut params = chord_params(&pts);
    let mut ctrl = least_squares_cubic(&pts, &params, a, b);
    for _ in 0..REPARAM_ITERS {
        if max_error(&pts, &params, &ctrl) <= tolerance {
            break;
        }
        reparameterize(&pts, &mut params, &ctrl);
        ctrl = least_squares_cubic(&pts, &params, a, b);
    }
    ctrl.to_vec()
}

fn dedup(samples: &[Vec2]) -> Vec<Vec2> {
    let mut out: Vec<Vec2> = Vec::with_capacity(samples.len());
    for p in samples {
        if out.last().map_or(true, |q| q.distance(*p) > EPS_LEN) {
            out.push(*p);
        }
    }
    out
}

fn chord_params(pts: &[Vec2]) -> Vec<f32> {
    let mut acc = vec![0.0f32; pts.len()];
    for i in 1..pts.len() {
        acc[i] = acc[i - 1] + pts[i].distance(pts[i - 1]);
    }
    let total = acc[acc.len() - 1];
    if total <= EPS_LEN {
        let n = (pts.len() - 1) as f32;
        return (0..pts.len()).map(|i| i as f32 / n).collect();
    }
    acc.iter().map(|d| d / total).collect()
}

fn basis(t: f32) -> [f32; 4] {
    let mt = 1.0 - t;
    [mt * mt * mt, 3.0 * t * mt * mt, 3.0 * t * t * mt, t * t * t]
}

fn least_squares_cubic(pts: &[Vec2], params: &[f32], a: Vec2, b: Vec2) -> [Vec2; 4] {
    let mut c11 = 0.0f32;
    let mut c12 = 0.0f32;
    let mut c22 = 0.0f32;
    let mut x1 = Vec2::default();
    let mut x2 = Vec2::default();
    for (p, &t) in pts.iter().zip(params) {
        let bs = basis(t);
        let r = *p - a * bs[0] - b * bs[3];
        c11 += bs[1] * bs[1];
        c12 += bs[1] * bs[2];
        c22 += bs[2] * bs[2];
        x1 = x1 + r * bs[1];
        x2 = x2 + r * bs[2];
    }
    let det = c11 * c22 - c12 * c12;
    let thirds = [a, a.lerp(b, 1.0 / 3.0), a.lerp(b, 2.0 / 3.0), b];
    if det.abs() <= EPS_DENOM {
        return thirds;
    }
    let p1 = (x1 * c22 - x2 * c12) * (1.0 / det);
    let p2 = (x2 * c11 - x1 * c12) * (1.0 / det);
    if !p1.is_finite() || !p2.is_finite() {
        return thirds;
    }
    [a, p1, p2, b]
}

fn max_error(pts: &[Vec2], params: &[f32], ctrl: &[Vec2; 4]) -> f32 {
    pts.iter()
        .zip(params)
        .map(|(p, &t)| bezier_point(ctrl, t).distance(*p))
        .fold(0.0f32, f32::max)
}

fn reparameterize(pts: &[Vec2], params: &mut [f32], ctrl: &[Vec2; 4]) {
    let d1 = [
        (ctrl[1] - ctrl[0]) * 3.0,
        (ctrl[2] - ctrl[1]) * 3.0,
        (ctrl[3] - ctrl[2]) * 3.0,
    ];
    let d2 = [(d1[1] - d1[0]) * 2.0, (d1[2] - d1[1]) * 2.0];
    let last = params.len() - 1;
    for i in 1..last {
        let t = params[i];
        let diff = bezier_point(ctrl, t) - pts[i];
        let q1 = bezier_point(&d1, t);
        let q2 = bezier_point(&d2, t);
        let num = diff.dot(q1);
        let den = q1.dot(q1) + diff.dot(q2);
        if den.abs() > EPS_DENOM {
            params[i] = clamp01(t - num / den);
        }
    }
}
