//! Global repair after bulk edits: pick the bounding loop and stitch
//! dangling curve ends onto nearby closed loops.

use crate::error::{GraphError, Result};
use crate::geometry::math::point_in_polygon;
use crate::object::ObjectId;
use crate::sewing::SewingId;
use crate::{Graph, Vec2};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidityReport {
    /// Loop flagged as bounding afterwards.
    pub bounding_loop: Option<ObjectId>,
    /// Dangling end points attached to a closed loop.
    pub fused_points: usize,
    /// Attachments that were found but refused.
    pub failed: usize,
}

impl Graph {
    fn closed_loops(&self) -> Vec<ObjectId> {
        self.loops
            .values()
            .filter(|l| l.is_closed(&self.curves))
            .map(|l| l.id)
            .collect()
    }

    /// Flag the closed loop with the largest absolute area as bounding and
    /// clear the flag everywhere else. Leaves flags alone when no loop is
    /// closed.
    pub fn choose_bounding_loop(&mut self) -> Option<ObjectId> {
        let step = self.tol.curve_sample_step;
        let mut best: Option<(ObjectId, f32)> = None;
        for lid in self.closed_loops() {
            let area = self.loops[&lid]
                .signed_area(&self.curves, &self.points, step)
                .abs();
            if area > best.map_or(0.0, |b| b.1) {
                best = Some((lid, area));
            }
        }
        let (chosen, _) = best?;
        for l in self.loops.values_mut() {
            l.bounding = l.id == chosen;
        }
        Some(chosen)
    }

    /// Curves that are not the interior of any chain (no loop has both a
    /// predecessor and a successor for them).
    fn open_curves(&self) -> Vec<ObjectId> {
        self.curves
            .values()
            .filter(|c| !c.links.values().any(|k| k.prev.is_some() && k.next.is_some()))
            .map(|c| c.id)
            .collect()
    }

    /// Closest (point, curve, distance) among `candidates` lying within the
    /// merge distance of a closed loop boundary.
    fn nearest_boundary_hit(&self, candidates: &[ObjectId]) -> Option<(ObjectId, ObjectId, f32)> {
        let step = self.tol.curve_sample_step;
        let merge = self.tol.point_merge_dist;
        let mut best: Option<(ObjectId, ObjectId, f32)> = None;
        for lid in self.closed_loops() {
            let mut poly: Vec<Vec2> = Vec::new();
            let mut owner: Vec<ObjectId> = Vec::new();
            for (p, c) in self.loops[&lid].samples_with_owner(&self.curves, &self.points, step) {
                if let (Some(last), Some(first)) = (poly.last(), poly.first()) {
                    if p.distance(*last) < merge || p.distance(*first) < merge {
                        continue;
                    }
                }
                poly.push(p);
                owner.push(c);
            }
            for &pid in candidates {
                let Some(kp) = self.points.get(&pid) else {
                    continue;
                };
                let (_, edge, dist) = point_in_polygon(&poly, kp.position);
                if dist < merge && best.map_or(true, |b| dist < b.2) {
                    if let Some(&c) = owner.get(edge) {
                        best = Some((pid, c, dist));
                    }
                }
            }
        }
        best
    }

    /// Repair global structure after merging graphs or loading: choose the
    /// bounding loop, then attach every dangling curve end that lies on a
    /// closed loop's boundary to that boundary.
    pub fn make_graph_valid(&mut self) -> Result<ValidityReport> {
        let mut report = ValidityReport {
            bounding_loop: self.choose_bounding_loop(),
            ..Default::default()
        };

        for cid in self.open_curves() {
            let Some(c) = self.curves.get(&cid) else {
                continue;
            };
            let ends: BTreeSet<ObjectId> = [c.start(), c.end()]
                .into_iter()
                .filter(|p| self.points.get(p).map_or(false, |k| k.degree() == 1))
                .collect();
            if ends.is_empty() {
                continue;
            }
            let ends: Vec<ObjectId> = ends.into_iter().collect();
            let Some((pid, target, dist)) = self.nearest_boundary_hit(&ends) else {
                continue;
            };
            if self.curves.get(&target).map_or(true, |t| t.has_end_point(pid)) {
                continue;
            }
            match self.merge_curve_point(target, pid) {
                Ok(()) => {
                    info!(point = pid, curve = target, dist, "attached dangling end point");
                    report.fused_points += 1;
                }
                Err(err) => {
                    warn!(point = pid, curve = target, %err, "could not attach end point");
                    report.failed += 1;
                }
            }
        }

        report.bounding_loop = self.bounding_loop()?;
        info!(
            bounding = ?report.bounding_loop,
            fused = report.fused_points,
            failed = report.failed,
            "make_graph_valid"
        );
        Ok(report)
    }

    /// Absorb every entity of `other`, then repair. Entities whose ids are
    /// already taken are absorbed from a re-numbered copy; sewn curves keep
    /// their sewings under the new id and a swap event is queued for each.
    pub fn merge_graph(&mut self, mut other: Graph) -> Result<ValidityReport> {
        let collides = other.points.keys().any(|id| self.contains(*id))
            || other.curves.keys().any(|id| self.contains(*id))
            || other.loops.keys().any(|id| self.contains(*id));
        self.sewing_events.append(&mut other.sewing_events);
        let mut other = if collides {
            let (mut copy, map) = other.duplicate_with_map()?;
            for c in other.curves.values().filter(|c| !c.sewings.is_empty()) {
                let new = map.get(&c.id).copied().ok_or(GraphError::UnmappedClone(c.id))?;
                if let Some(nc) = copy.curves.get_mut(&new) {
                    nc.sewings = c.sewings.clone();
                }
                let sewings: Vec<SewingId> = c.sewings.iter().copied().collect();
                self.emit_swap(c.id, &sewings, &[new]);
            }
            copy
        } else {
            other
        };
        self.points.append(&mut other.points);
        self.curves.append(&mut other.curves);
        self.loops.append(&mut other.loops);
        self.touch();
        self.make_graph_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sewing::SewingEvent;

    fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    fn rect(g: &mut Graph, x0: f32, y0: f32, x1: f32, y1: f32) -> ObjectId {
        let p = [v(x0, y0), v(x1, y0), v(x1, y1), v(x0, y1)];
        let cs: Vec<ObjectId> = (0..4)
            .map(|i| g.add_curve(&[p[i], p[(i + 1) % 4]]).unwrap())
            .collect();
        g.add_loop(&cs, false).unwrap()
    }

    #[test]
    fn largest_closed_loop_becomes_bounding() {
        let mut g = Graph::new();
        let small = rect(&mut g, 0.2, 0.2, 0.4, 0.4);
        let big = rect(&mut g, -1.0, -1.0, 2.0, 2.0);
        let r = g.make_graph_valid().unwrap();
        assert_eq!(r.bounding_loop, Some(big));
        assert!(!g.get_loop(small).unwrap().is_bounding());
        g.validate().unwrap();
    }

    #[test]
    fn dangling_dart_is_attached() {
        let mut g = Graph::new();
        let outline = rect(&mut g, 0.0, 0.0, 1.0, 1.0);
        // dart tip just short of the bottom edge
        let dart = g.add_curve(&[v(0.5, 0.4), v(0.5, 0.004)]).unwrap();
        let r = g.make_graph_valid().unwrap();
        assert_eq!(r.fused_points, 1);
        assert_eq!(g.loop_curves(outline).unwrap().len(), 5);
        let tip = g.get_curve(dart).unwrap().end();
        assert_eq!(g.get_key_point(tip).unwrap().degree(), 3);
        g.validate().unwrap();
        // nothing left to do
        assert_eq!(g.make_graph_valid().unwrap().fused_points, 0);
    }

    #[test]
    fn far_ends_are_left_alone() {
        let mut g = Graph::new();
        rect(&mut g, 0.0, 0.0, 1.0, 1.0);
        g.add_curve(&[v(0.5, 0.4), v(0.5, 0.2)]).unwrap();
        let before = g.curve_count();
        let r = g.make_graph_valid().unwrap();
        assert_eq!(r.fused_points, 0);
        assert_eq!(g.curve_count(), before);
    }

    #[test]
    fn merging_graphs_keeps_one_bounding_loop() {
        let mut a = Graph::new();
        let la = rect(&mut a, 0.0, 0.0, 1.0, 1.0);
        a.choose_bounding_loop();
        let mut b = Graph::new();
        rect(&mut b, 3.0, 0.0, 6.0, 3.0);
        b.choose_bounding_loop();
        let r = a.merge_graph(b).unwrap();
        assert_eq!(a.loop_count(), 2);
        assert_ne!(r.bounding_loop, Some(la));
        a.validate().unwrap();

        // a clone shares ids and is re-numbered on the way in
        let copy = a.clone();
        a.merge_graph(copy).unwrap();
        assert_eq!(a.loop_count(), 4);
        a.validate().unwrap();
    }

    #[test]
    fn renumbered_curves_keep_their_sewings() {
        let mut g = Graph::new();
        let c = g.add_curve(&[v(0.0, 0.0), v(1.0, 0.0)]).unwrap();
        g.attach_sewing(c, 77).unwrap();
        let copy = g.clone();
        g.merge_graph(copy).unwrap();
        assert_eq!(g.curve_count(), 2);
        let sewn: Vec<ObjectId> = g
            .curves()
            .filter(|x| x.sewings().any(|s| s == 77))
            .map(|x| x.id())
            .collect();
        assert_eq!(sewn.len(), 2);
        let moved = sewn.iter().copied().find(|x| *x != c).unwrap();
        assert_eq!(
            g.take_sewing_events(),
            vec![SewingEvent::SwapCurve { sewing: 77, old: c, new: vec![moved] }]
        );
        g.validate().unwrap();
    }
}
