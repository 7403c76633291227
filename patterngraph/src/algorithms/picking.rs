use crate::{Graph, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Pick {
    #[serde(rename = "keypoint")]
    KeyPoint { id: u32, dist: f32 },
    #[serde(rename = "curve")]
    Curve { id: u32, t: f32, dist: f32 },
}

pub fn pick_impl(g: &Graph, pos: Vec2, tol: f32) -> Option<Pick> {
    // Key points first; interior control points included
    let mut best_point: Option<(u32, f32)> = None;
    for p in g.points.values() {
        let d = p.position.distance(pos);
        if d <= tol && best_point.map_or(true, |(_, bd)| d < bd) { best_point = Some((p.id, d)); }
    }
    if let Some((id, dist)) = best_point { return Some(Pick::KeyPoint { id, dist }); }
    // Curves by their sampled polyline
    let step = g.tol.curve_sample_step;
    let mut best_curve: Option<(u32, f32, f32)> = None;
    for c in g.curves.values() {
        let (d, t) = c.nearest(&g.points, step, pos);
        if d <= tol && best_curve.map_or(true, |(_, bd, _)| d < bd) { best_curve = Some((c.id, d, t)); }
    }
    if let Some((id, dist, t)) = best_curve { return Some(Pick::Curve { id, t, dist }); }
    None
}

impl Graph {
    /// Nearest key point within `tol` of `pos`, else the nearest curve.
    pub fn pick(&self, pos: Vec2, tol: f32) -> Option<Pick> {
        pick_impl(self, pos, tol)
    }
}
