//! Geometric queries on curves. Key point positions live in the graph, so
//! every query borrows the point map.

use crate::geometry::math::{bezier_point, polyline_length, seg_distance_sq};
use crate::geometry::tolerance::segments_for;
use crate::model::{Curve, KeyPoint, SampleCache, Vec2};
use crate::object::ObjectId;
use std::collections::BTreeMap;

pub type PointMap = BTreeMap<ObjectId, KeyPoint>;

// Control polygon resolution used to estimate length before sampling.
const LENGTH_PROBE_SEGMENTS: u32 = 16;

impl Curve {
    pub fn start(&self) -> ObjectId {
        self.points[0]
    }
    pub fn end(&self) -> ObjectId {
        self.points[self.points.len() - 1]
    }

    pub fn is_end_points_same(&self, other: &Curve) -> bool {
        self.start() == other.start() && self.end() == other.end()
    }
    pub fn is_end_points_reversed(&self, other: &Curve) -> bool {
        self.start() == other.end() && self.end() == other.start()
    }
    /// Same or reversed end point pair.
    pub fn joins_same_points(&self, other: &Curve) -> bool {
        self.is_end_points_same(other) || self.is_end_points_reversed(other)
    }

    pub fn has_end_point(&self, p: ObjectId) -> bool {
        self.start() == p || self.end() == p
    }

    pub fn other_end(&self, p: ObjectId) -> Option<ObjectId> {
        if self.start() == p {
            Some(self.end())
        } else if self.end() == p {
            Some(self.start())
        } else {
            None
        }
    }

    pub fn is_interior_point(&self, p: ObjectId) -> bool {
        let n = self.points.len();
        self.points[1..n - 1].contains(&p)
    }

    /// End point this curve shares with `other`, if exactly one.
    pub fn shared_end_point(&self, other: &Curve) -> Option<ObjectId> {
        let a = other.has_end_point(self.start());
        let b = other.has_end_point(self.end());
        match (a, b) {
            (true, false) => Some(self.start()),
            (false, true) => Some(self.end()),
            _ => None,
        }
    }

    pub fn reverse(&mut self) {
        self.points.reverse();
        self.require_resample();
    }

    pub fn require_resample(&self) {
        *self.samples.borrow_mut() = None;
    }

    pub(crate) fn control_polygon(&self, points: &PointMap) -> Vec<Vec2> {
        self.points
            .iter()
            .map(|id| points.get(id).map(|p| p.position).unwrap_or_default())
            .collect()
    }

    pub fn point_at(&self, points: &PointMap, t: f32) -> Vec2 {
        bezier_point(&self.control_polygon(points), t)
    }

    /// Parameter-uniform polyline with roughly `step` spacing, first sample
    /// at the start point and last at the end point. Cached until the next
    /// `require_resample`.
    pub fn sample(&self, points: &PointMap, step: f32) -> Vec<Vec2> {
        if let Some(cache) = self.samples.borrow().as_ref() {
            if cache.step == step {
                return cache.points.clone();
            }
        }
        let ctrl = self.control_polygon(points);
        let estimate = if ctrl.len() == 2 {
            ctrl[0].distance(ctrl[1])
        } else {
            let probe: Vec<Vec2> = (0..=LENGTH_PROBE_SEGMENTS)
                .map(|i| bezier_point(&ctrl, i as f32 / LENGTH_PROBE_SEGMENTS as f32))
                .collect();
            polyline_length(&probe)
        };
        let n = segments_for(estimate, step);
        let out: Vec<Vec2> = (0..=n)
            .map(|i| bezier_point(&ctrl, i as f32 / n as f32))
            .collect();
        *self.samples.borrow_mut() = Some(SampleCache {
            step,
            points: out.clone(),
        });
        out
    }

    /// Samples walked in loop order: reversed when the loop enters at the end point.
    pub fn oriented_samples(&self, points: &PointMap, step: f32, reversed: bool) -> Vec<Vec2> {
        let mut s = self.sample(points, step);
        if reversed {
            s.reverse();
        }
        s
    }

    pub fn length(&self, points: &PointMap, step: f32) -> f32 {
        polyline_length(&self.sample(points, step))
    }

    /// Distance from `pos` to the sampled curve and the curve parameter of
    /// the nearest sample-segment point.
    pub fn nearest(&self, points: &PointMap, step: f32, pos: Vec2) -> (f32, f32) {
        let s = self.sample(points, step);
        let n = s.len().saturating_sub(1).max(1);
        let mut best = (f32::INFINITY, 0.0f32);
        for (i, w) in s.windows(2).enumerate() {
            let (d2, u) = seg_distance_sq(pos, w[0], w[1]);
            if d2 < best.0 {
                best = (d2, (i as f32 + u) / n as f32);
            }
        }
        (best.0.sqrt(), best.1)
    }

    /// Widen `bmin`/`bmax` to cover this curve's samples.
    pub fn union_bound(&self, points: &PointMap, step: f32, bmin: &mut Vec2, bmax: &mut Vec2) {
        for p in self.sample(points, step) {
            bmin.x = bmin.x.min(p.x);
            bmin.y = bmin.y.min(p.y);
            bmax.x = bmax.x.max(p.x);
            bmax.y = bmax.y.max(p.y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CurveKind;

    fn map(pts: &[(ObjectId, f32, f32)]) -> PointMap {
        pts.iter()
            .map(|&(id, x, y)| (id, KeyPoint::new(id, Vec2::new(x, y))))
            .collect()
    }

    #[test]
    fn endpoints_and_reversal() {
        let mut c = Curve::new(10, CurveKind::Cubic, vec![1, 2, 3, 4]);
        let d = Curve::new(11, CurveKind::Line, vec![4, 1]);
        assert_eq!((c.start(), c.end()), (1, 4));
        assert!(c.is_end_points_reversed(&d));
        assert!(c.joins_same_points(&d));
        assert!(c.is_interior_point(2));
        assert!(!c.is_interior_point(4));
        assert_eq!(c.other_end(4), Some(1));
        assert_eq!(c.other_end(2), None);
        c.reverse();
        assert_eq!(c.key_points(), &[4, 3, 2, 1]);
        assert!(c.is_end_points_same(&d));
        assert_eq!(c.shared_end_point(&d), None);
    }

    #[test]
    fn line_sampling_and_length() {
        let pts = map(&[(1, 0.0, 0.0), (2, 1.0, 0.0)]);
        let c = Curve::new(10, CurveKind::Line, vec![1, 2]);
        let s = c.sample(&pts, 0.1);
        assert_eq!(s.len(), 11);
        assert_eq!(s[0], Vec2::new(0.0, 0.0));
        assert_eq!(s[10], Vec2::new(1.0, 0.0));
        assert!((c.length(&pts, 0.1) - 1.0).abs() < 1e-5);
        let (d, t) = c.nearest(&pts, 0.1, Vec2::new(0.25, 0.5));
        assert!((d - 0.5).abs() < 1e-5);
        assert!((t - 0.25).abs() < 1e-5);
    }

    #[test]
    fn resample_after_move() {
        let mut pts = map(&[(1, 0.0, 0.0), (2, 1.0, 0.0)]);
        let c = Curve::new(10, CurveKind::Line, vec![1, 2]);
        assert_eq!(c.sample(&pts, 0.25).last().copied(), Some(Vec2::new(1.0, 0.0)));
        pts.get_mut(&2).unwrap().position = Vec2::new(2.0, 0.0);
        // stale until invalidated
        assert_eq!(c.sample(&pts, 0.25).last().copied(), Some(Vec2::new(1.0, 0.0)));
        c.require_resample();
        assert_eq!(c.sample(&pts, 0.25).last().copied(), Some(Vec2::new(2.0, 0.0)));
    }

    #[test]
    fn bound_covers_bulge() {
        let pts = map(&[(1, 0.0, 0.0), (2, 0.5, 1.0), (3, 1.0, 0.0)]);
        let c = Curve::new(10, CurveKind::Quadratic, vec![1, 2, 3]);
        let mut bmin = Vec2::new(f32::INFINITY, f32::INFINITY);
        let mut bmax = Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        c.union_bound(&pts, 0.05, &mut bmin, &mut bmax);
        assert!((bmax.y - 0.5).abs() < 1e-3);
        assert_eq!(bmin, Vec2::new(0.0, 0.0));
    }
}
