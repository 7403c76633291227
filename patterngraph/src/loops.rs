//! Loop traversal. A loop only stores its start curve; order comes from the
//! curves' disk links and direction from the end points consecutive curves
//! share.

use crate::curve::PointMap;
use crate::geometry::math::polygon_area;
use crate::model::{Curve, Loop, LoopEdge, Vec2};
use crate::object::ObjectId;
use std::collections::BTreeMap;

pub type CurveMap = BTreeMap<ObjectId, Curve>;

/// Direction of each curve in a head-to-tail chain. The first curve's
/// direction is fixed by the end point it shares with the second; every later
/// curve must enter where the previous one left. On failure returns the pair
/// that does not connect.
pub(crate) fn chain_orientation(chain: &[&Curve]) -> Result<Vec<bool>, (ObjectId, ObjectId)> {
    let mut out = Vec::with_capacity(chain.len());
    let Some(first) = chain.first() else {
        return Ok(out);
    };
    if chain.len() == 1 {
        out.push(false);
        return Ok(out);
    }
    let second = chain[1];
    let first_rev = if second.has_end_point(first.end()) {
        false
    } else if second.has_end_point(first.start()) {
        true
    } else {
        return Err((first.id, second.id));
    };
    out.push(first_rev);
    let mut exit = if first_rev { first.start() } else { first.end() };
    for w in chain.windows(2) {
        let c = w[1];
        let rev = if c.start() == exit {
            false
        } else if c.end() == exit {
            true
        } else {
            return Err((w[0].id, c.id));
        };
        exit = if rev { c.start() } else { c.end() };
        out.push(rev);
    }
    Ok(out)
}

/// Entry and exit key points of an oriented chain.
pub(crate) fn chain_ends(chain: &[&Curve], reversed: &[bool]) -> Option<(ObjectId, ObjectId)> {
    let (first, last) = (chain.first()?, chain.last()?);
    let entry = if reversed[0] { first.end() } else { first.start() };
    let exit = if reversed[reversed.len() - 1] {
        last.start()
    } else {
        last.end()
    };
    Some((entry, exit))
}

impl Loop {
    /// Curves in traversal order, starting from `start`.
    pub fn curve_ids(&self, curves: &CurveMap) -> Vec<ObjectId> {
        self.walk(curves).0
    }

    /// True when following `next` returns to the start curve.
    pub fn is_closed(&self, curves: &CurveMap) -> bool {
        self.walk(curves).1
    }

    fn walk(&self, curves: &CurveMap) -> (Vec<ObjectId>, bool) {
        let mut out = Vec::new();
        let Some(start) = self.start else {
            return (out, false);
        };
        let mut cur = start;
        // guard against corrupt links
        let limit = curves.len() + 1;
        loop {
            let Some(link) = curves.get(&cur).and_then(|c| c.link(self.id)) else {
                return (out, false);
            };
            out.push(cur);
            match link.next {
                Some(n) if n == start => return (out, true),
                Some(n) if out.len() < limit => cur = n,
                _ => return (out, false),
            }
        }
    }

    pub fn edges(&self, curves: &CurveMap) -> Vec<LoopEdge> {
        let ids = self.curve_ids(curves);
        let chain: Vec<&Curve> = ids.iter().filter_map(|id| curves.get(id)).collect();
        match chain_orientation(&chain) {
            Ok(rev) => ids
                .iter()
                .zip(rev)
                .map(|(&curve, reversed)| LoopEdge { curve, reversed })
                .collect(),
            Err(_) => ids
                .iter()
                .map(|&curve| LoopEdge {
                    curve,
                    reversed: false,
                })
                .collect(),
        }
    }

    /// Concatenated samples in traversal order, shared end points emitted once.
    pub fn samples(&self, curves: &CurveMap, points: &PointMap, step: f32) -> Vec<Vec2> {
        self.samples_with_owner(curves, points, step)
            .into_iter()
            .map(|(p, _)| p)
            .collect()
    }

    /// Like [`Loop::samples`] with the curve each sample came from.
    pub fn samples_with_owner(
        &self,
        curves: &CurveMap,
        points: &PointMap,
        step: f32,
    ) -> Vec<(Vec2, ObjectId)> {
        let mut out: Vec<(Vec2, ObjectId)> = Vec::new();
        for e in self.edges(curves) {
            let Some(c) = curves.get(&e.curve) else {
                continue;
            };
            let s = c.oriented_samples(points, step, e.reversed);
            let skip = usize::from(!out.is_empty());
            out.extend(s.into_iter().skip(skip).map(|p| (p, e.curve)));
        }
        out
    }

    /// Shoelace area of the sampled boundary; positive when counter-clockwise.
    pub fn signed_area(&self, curves: &CurveMap, points: &PointMap, step: f32) -> f32 {
        polygon_area(&self.samples(curves, points, step))
    }
}
