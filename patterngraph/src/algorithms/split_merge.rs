//! Split a curve at a position, fuse adjacent curves, fuse key points.
//!
//! All checks run before the first mutation, so a refusal leaves the graph
//! as it was. New shapes come from resampling the originals and refitting
//! with `fit_one_curve`.

use crate::error::{GraphError, Rejection, Result};
use crate::geometry::fitting::fit_one_curve;
use crate::model::{CurveKind, DiskLink, Vec2};
use crate::object::{next_id, ObjectId};
use crate::Graph;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SplitResult {
    /// The new key point between the two halves.
    pub point: ObjectId,
    /// `[start half, end half]` in the original curve's direction.
    pub curves: [ObjectId; 2],
}

impl Graph {
    /// Build a curve from `a` to `b` whose interior control points come from
    /// `fitted` (first and last entries are the end point positions).
    fn curve_from_fit(&mut self, a: ObjectId, b: ObjectId, fitted: &[Vec2]) -> ObjectId {
        let interior: &[Vec2] = if fitted.len() == 4 { &fitted[1..3] } else { &[] };
        let mut ids = vec![a];
        for p in interior {
            ids.push(self.add_key_point(*p, false));
        }
        ids.push(b);
        let kind = CurveKind::from_point_count(ids.len()).unwrap_or(CurveKind::Line);
        self.link_curve(next_id(), kind, ids)
    }

    /// Loop id -> whether the loop walks `curve` backwards.
    fn traversal_directions(&self, curve: ObjectId) -> BTreeMap<ObjectId, bool> {
        let mut out = BTreeMap::new();
        let Some(c) = self.curves.get(&curve) else {
            return out;
        };
        for lid in c.links.keys() {
            let rev = self
                .loops
                .get(lid)
                .and_then(|l| l.edges(&self.curves).into_iter().find(|e| e.curve == curve))
                .map_or(false, |e| e.reversed);
            out.insert(*lid, rev);
        }
        out
    }

    fn set_link(&mut self, curve: ObjectId, lid: ObjectId, f: impl FnOnce(&mut DiskLink)) {
        if let Some(k) = self.curves.get_mut(&curve).and_then(|c| c.links.get_mut(&lid)) {
            f(k);
        }
    }

    /// Drop a curve whose loop position and sewings were handed to its
    /// replacements.
    fn retire_curve(&mut self, id: ObjectId) {
        if let Some(c) = self.curves.get_mut(&id) {
            c.links.clear();
            c.sewings.clear();
        }
        self.remove_curve(id);
    }

    /// Split `curve` at the sample nearest to `pos`. The halves take over the
    /// curve's place in every loop, its sewings and its selection state.
    pub fn split_edge(&mut self, curve: ObjectId, pos: Vec2) -> Result<SplitResult> {
        let step = self.tol.curve_sample_step;
        let c = self.curves.get(&curve).ok_or(GraphError::UnknownCurve(curve))?;
        let samples = c.sample(&self.points, step);
        let segs = samples.len() - 1;
        let (_, t) = c.nearest(&self.points, step, pos);
        let split_at = c.point_at(&self.points, t);
        let (s, e) = (c.start(), c.end());
        let near = |id: ObjectId| {
            self.points
                .get(&id)
                .map_or(false, |p| p.position.distance(split_at) < self.tol.point_merge_dist)
        };
        if near(s) || near(e) {
            return Err(Rejection::TooCloseToEndpoint(curve).into());
        }

        let i = ((t * segs as f32).floor() as usize).min(segs - 1);
        let mut head: Vec<Vec2> = samples[..=i].to_vec();
        head.push(split_at);
        let mut tail = vec![split_at];
        tail.extend_from_slice(&samples[i + 1..]);

        let links: Vec<(ObjectId, DiskLink)> = c.links.iter().map(|(l, k)| (*l, *k)).collect();
        let sewings: Vec<_> = c.sewings.iter().copied().collect();
        let selected = c.flags.selected;
        let dirs = self.traversal_directions(curve);
        let fit_head = fit_one_curve(&head, self.tol.curve_fitting_tol);
        let fit_tail = fit_one_curve(&tail, self.tol.curve_fitting_tol);

        let p = self.add_key_point(split_at, false);
        let c1 = self.curve_from_fit(s, p, &fit_head);
        let c2 = self.curve_from_fit(p, e, &fit_tail);
        for half in [c1, c2] {
            if let Some(h) = self.curves.get_mut(&half) {
                h.sewings = sewings.iter().copied().collect();
                h.flags.selected = selected;
            }
        }

        for (lid, link) in links {
            let reversed = dirs.get(&lid).copied().unwrap_or(false);
            // walk order through the gap
            let (first, second) = if reversed { (c2, c1) } else { (c1, c2) };
            if let Some(h) = self.curves.get_mut(&first) {
                h.links.insert(lid, DiskLink { prev: link.prev, next: Some(second) });
            }
            if let Some(h) = self.curves.get_mut(&second) {
                h.links.insert(lid, DiskLink { prev: Some(first), next: link.next });
            }
            if let Some(prev) = link.prev {
                self.set_link(prev, lid, |k| k.next = Some(first));
            }
            if let Some(next) = link.next {
                self.set_link(next, lid, |k| k.prev = Some(second));
            }
            if let Some(l) = self.loops.get_mut(&lid) {
                if l.start == Some(curve) {
                    l.start = Some(first);
                }
            }
        }

        self.emit_swap(curve, &sewings, &[c1, c2]);
        self.retire_curve(curve);
        debug!(curve, point = p, halves = ?[c1, c2], "split_edge");
        Ok(SplitResult {
            point: p,
            curves: [c1, c2],
        })
    }

    /// Attach `point` to `curve`: fuse with a curve end point when it is
    /// within the merge distance, otherwise split the curve there and fuse
    /// with the new point.
    pub fn merge_curve_point(&mut self, curve: ObjectId, point: ObjectId) -> Result<()> {
        let c = self.curves.get(&curve).ok_or(GraphError::UnknownCurve(curve))?;
        let pos = self.key_point_position(point)?;
        if c.has_end_point(point) {
            return Err(Rejection::AlreadyEndpoint(point, curve).into());
        }
        let merge_dist = self.tol.point_merge_dist;
        for end in [c.start(), c.end()] {
            if self.key_point_position(end)?.distance(pos) < merge_dist {
                return self.merge_key_points(point, end);
            }
        }
        self.transact(|g| {
            let split = g.split_edge(curve, pos)?;
            g.merge_key_points(split.point, point)
        })
    }

    /// Fuse two curves sharing exactly one end point into one refitted curve.
    /// The merged curve takes `c1`'s loop positions, sewings and selection.
    pub fn merge_curve(&mut self, c1: ObjectId, c2: ObjectId) -> Result<ObjectId> {
        let a = self.curves.get(&c1).ok_or(GraphError::UnknownCurve(c1))?;
        let b = self.curves.get(&c2).ok_or(GraphError::UnknownCurve(c2))?;
        if c1 == c2 {
            return Err(Rejection::SameCurve.into());
        }
        if a.joins_same_points(b) {
            return Err(GraphError::DuplicateCurves(c1, c2));
        }
        let shared = a
            .shared_end_point(b)
            .ok_or(Rejection::NotConnected(c1, c2))?;
        if !a.links.keys().eq(b.links.keys()) {
            return Err(Rejection::LoopsDiffer(c1, c2).into());
        }
        if a.sewings != b.sewings {
            return Err(Rejection::SewingsDiffer(c1, c2).into());
        }
        let mut joined: Vec<(ObjectId, DiskLink)> = Vec::new();
        for (lid, la) in &a.links {
            let lb = b.links[lid];
            let merged = if la.next == Some(c2) {
                DiskLink { prev: la.prev, next: lb.next }
            } else if lb.next == Some(c1) {
                DiskLink { prev: lb.prev, next: la.next }
            } else {
                return Err(Rejection::NotAdjacentInLoop(*lid).into());
            };
            joined.push((*lid, merged));
        }
        let (f1, f2) = match (a.other_end(shared), b.other_end(shared)) {
            (Some(x), Some(y)) => (x, y),
            _ => return Err(GraphError::NotConnected(c1, c2)),
        };
        if self.find_curve_between(f1, f2).is_some() {
            return Err(Rejection::WouldDuplicateCurve(f1, f2).into());
        }

        let step = self.tol.curve_sample_step;
        let mut samples = a.oriented_samples(&self.points, step, a.start() == shared);
        let tail = b.oriented_samples(&self.points, step, b.end() == shared);
        samples.extend(tail.into_iter().skip(1));
        let fitted = fit_one_curve(&samples, self.tol.curve_fitting_tol);
        let sewings: Vec<_> = a.sewings.iter().copied().collect();
        let selected = a.flags.selected;

        let m = self.curve_from_fit(f1, f2, &fitted);
        if let Some(mc) = self.curves.get_mut(&m) {
            mc.sewings = sewings.iter().copied().collect();
            mc.flags.selected = selected;
        }
        for (lid, link) in joined {
            if let Some(mc) = self.curves.get_mut(&m) {
                mc.links.insert(lid, link);
            }
            if let Some(prev) = link.prev {
                self.set_link(prev, lid, |k| k.next = Some(m));
            }
            if let Some(next) = link.next {
                self.set_link(next, lid, |k| k.prev = Some(m));
            }
            if let Some(l) = self.loops.get_mut(&lid) {
                if l.start == Some(c1) || l.start == Some(c2) {
                    l.start = Some(m);
                }
            }
        }
        self.emit_swap(c1, &sewings, &[m]);
        self.emit_remove(c2, &sewings);
        self.retire_curve(c1);
        self.retire_curve(c2);
        debug!(c1, c2, merged = m, "merge_curve");
        Ok(m)
    }

    /// Fuse `p2` into `p1`. Both must be curve end points only. When both
    /// are the free ends of one open chain, the chain is joined there.
    pub fn merge_key_points(&mut self, p1: ObjectId, p2: ObjectId) -> Result<()> {
        if p1 == p2 {
            return Err(Rejection::SamePoint.into());
        }
        let k1 = self.points.get(&p1).ok_or(GraphError::UnknownKeyPoint(p1))?;
        let k2 = self.points.get(&p2).ok_or(GraphError::UnknownKeyPoint(p2))?;
        for (p, k) in [(p1, k1), (p2, k2)] {
            if k.curves.iter().any(|c| self.curves.get(c).map_or(false, |c| c.is_interior_point(p))) {
                return Err(Rejection::DegeneratePoint(p).into());
            }
        }
        if !k1.curves.is_disjoint(&k2.curves) {
            return Err(Rejection::SharedCurve(p1, p2).into());
        }
        let loops_of = |curves: &BTreeSet<ObjectId>| -> BTreeSet<ObjectId> {
            curves
                .iter()
                .filter_map(|c| self.curves.get(c))
                .flat_map(|c| c.links.keys().copied())
                .collect()
        };
        let common: Vec<ObjectId> = loops_of(&k1.curves)
            .intersection(&loops_of(&k2.curves))
            .copied()
            .collect();
        if !common.is_empty() && (k1.curves.len() > 1 || k2.curves.len() > 1) {
            return Err(Rejection::AmbiguousBranch(p1, p2).into());
        }
        for cid in &k2.curves {
            let other = self.curves.get(cid).and_then(|c| c.other_end(p2));
            if let Some(o) = other {
                if self.find_curve_between(p1, o).is_some() {
                    return Err(Rejection::WouldDuplicateCurve(p1, o).into());
                }
            }
        }
        let e1 = k1.curves.iter().next().copied();
        let e2 = k2.curves.iter().next().copied();
        let moved: Vec<ObjectId> = k2.curves.iter().copied().collect();

        for cid in &moved {
            if let Some(c) = self.curves.get_mut(cid) {
                for kp in c.points.iter_mut() {
                    if *kp == p2 {
                        *kp = p1;
                    }
                }
                c.require_resample();
            }
        }
        if let Some(k) = self.points.get_mut(&p1) {
            k.curves.extend(moved.iter().copied());
        }

        if let (Some(e1), Some(e2)) = (e1, e2) {
            for lid in common {
                let (Some(l1), Some(l2)) = (
                    self.curves.get(&e1).and_then(|c| c.link(lid)),
                    self.curves.get(&e2).and_then(|c| c.link(lid)),
                ) else {
                    continue;
                };
                if l1.prev.is_none() && l2.next.is_none() {
                    self.set_link(e1, lid, |k| k.prev = Some(e2));
                    self.set_link(e2, lid, |k| k.next = Some(e1));
                } else if l1.next.is_none() && l2.prev.is_none() {
                    self.set_link(e1, lid, |k| k.next = Some(e2));
                    self.set_link(e2, lid, |k| k.prev = Some(e1));
                } else {
                    warn!(loop_id = lid, e1, e2, "merge_key_points: curves are not chain ends");
                    continue;
                }
                self.rewind_loop_start(lid);
            }
        }

        if let Some(k) = self.points.get_mut(&p2) {
            k.curves.clear();
        }
        self.points.remove(&p2);
        self.touch();
        debug!(p1, p2, "merge_key_points");
        Ok(())
    }

    /// Move an open loop's start back to the head of its chain.
    fn rewind_loop_start(&mut self, lid: ObjectId) {
        let Some(l) = self.loops.get(&lid) else {
            return;
        };
        if l.is_closed(&self.curves) {
            return;
        }
        let Some(mut cur) = l.start else {
            return;
        };
        for _ in 0..=self.curves.len() {
            match self.curves.get(&cur).and_then(|c| c.link(lid)).and_then(|k| k.prev) {
                Some(p) => cur = p,
                None => break,
            }
        }
        if let Some(l) = self.loops.get_mut(&lid) {
            l.start = Some(cur);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::math::point_seg_distance;

    fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    fn square(g: &mut Graph) -> (Vec<ObjectId>, ObjectId) {
        let p = [v(0.0, 0.0), v(1.0, 0.0), v(1.0, 1.0), v(0.0, 1.0)];
        let cs: Vec<ObjectId> = (0..4)
            .map(|i| g.add_curve(&[p[i], p[(i + 1) % 4]]).unwrap())
            .collect();
        let l = g.add_loop(&cs, true).unwrap();
        (cs, l)
    }

    #[test]
    fn split_square_edge() {
        let mut g = Graph::new();
        let (cs, l) = square(&mut g);
        let r = g.split_edge(cs[0], v(0.5, 0.02)).unwrap();
        assert!(g.get_curve(cs[0]).is_none());
        let at = g.key_point_position(r.point).unwrap();
        assert!(at.distance(v(0.5, 0.0)) < 1e-4);
        assert_eq!(g.loop_curves(l).unwrap(), vec![r.curves[0], r.curves[1], cs[1], cs[2], cs[3]]);
        assert!((g.loop_area(l).unwrap() - 1.0).abs() < 1e-3);
        assert_eq!(g.get_curve(r.curves[0]).unwrap().kind(), CurveKind::Line);
        g.validate().unwrap();
    }

    #[test]
    fn split_in_reversed_loop_keeps_order() {
        let mut g = Graph::new();
        let (cs, l) = square(&mut g);
        // merging the halves in swapped order leaves a curve the loop walks backwards
        let r = g.split_edge(cs[0], v(0.5, 0.0)).unwrap();
        let m = g.merge_curve(r.curves[1], r.curves[0]).unwrap();
        assert!(g.loop_edges(l).unwrap().iter().any(|e| e.curve == m && e.reversed));
        let r2 = g.split_edge(m, v(0.25, 0.0)).unwrap();
        assert!(g.is_loop_closed(l).unwrap());
        let order = g.loop_curves(l).unwrap();
        assert_eq!(order[..2], [r2.curves[1], r2.curves[0]]);
        assert!(g.loop_edges(l).unwrap().iter().all(|e| e.reversed == (e.curve == r2.curves[0] || e.curve == r2.curves[1])));
        assert!((g.loop_area(l).unwrap() - 1.0).abs() < 1e-3);
        g.validate().unwrap();
    }

    #[test]
    fn split_refuses_near_endpoints() {
        let mut g = Graph::new();
        let (cs, _) = square(&mut g);
        let before = g.curve_count();
        assert_eq!(
            g.split_edge(cs[0], v(0.004, 0.0)),
            Err(Rejection::TooCloseToEndpoint(cs[0]).into())
        );
        assert_eq!(g.curve_count(), before);
        assert_eq!(g.split_edge(u32::MAX, v(0.0, 0.0)), Err(GraphError::UnknownCurve(u32::MAX)));
    }

    #[test]
    fn split_then_merge_restores_shape() {
        let mut g = Graph::new();
        let c = g
            .add_curve(&[v(0.0, 0.0), v(0.2, 1.0), v(0.8, 1.0), v(1.0, 0.0)])
            .unwrap();
        let original = g.curve_samples(c).unwrap();
        let r = g.split_edge(c, v(0.5, 0.8)).unwrap();
        let m = g.merge_curve(r.curves[0], r.curves[1]).unwrap();
        assert_eq!(g.curve_count(), 1);
        assert_eq!(g.key_point_count(), 4);
        let merged = g.curve_samples(m).unwrap();
        for p in &original {
            let d = merged
                .windows(2)
                .map(|w| point_seg_distance(*p, w[0], w[1]))
                .fold(f32::INFINITY, f32::min);
            assert!(d < 1e-2, "deviation {d}");
        }
    }

    #[test]
    fn merge_collinear_free_curves() {
        let mut g = Graph::new();
        let a = g.add_curve(&[v(1.0, 0.0), v(2.0, 0.0)]).unwrap();
        let b = g.add_curve(&[v(2.0, 0.0), v(3.0, 0.0)]).unwrap();
        let far = g.add_curve(&[v(5.0, 0.0), v(6.0, 0.0)]).unwrap();
        assert_eq!(g.merge_curve(a, far), Err(Rejection::NotConnected(a, far).into()));
        assert_eq!(g.curve_count(), 3);
        let m = g.merge_curve(a, b).unwrap();
        let pos = g.curve_positions(m).unwrap();
        assert_eq!(pos, vec![v(1.0, 0.0), v(3.0, 0.0)]);
        assert!(g.find_near_point(v(2.0, 0.0)).is_none());
        g.validate().unwrap();
    }

    #[test]
    fn merge_inside_loop_rethreads() {
        let mut g = Graph::new();
        let (cs, l) = square(&mut g);
        let r = g.split_edge(cs[2], v(0.5, 1.0)).unwrap();
        let m = g.merge_curve(r.curves[1], r.curves[0]).unwrap();
        assert_eq!(g.loop_curves(l).unwrap().len(), 4);
        assert!(g.is_loop_closed(l).unwrap());
        assert!(g.get_curve(m).unwrap().loops().eq([l]));
        assert!((g.loop_area(l).unwrap() - 1.0).abs() < 1e-3);
        g.validate().unwrap();
    }

    #[test]
    fn merge_refusals() {
        let mut g = Graph::new();
        let (cs, _) = square(&mut g);
        let tail = g.add_curve(&[v(1.0, 1.0), v(2.0, 2.0)]).unwrap();
        assert_eq!(g.merge_curve(cs[0], cs[0]), Err(Rejection::SameCurve.into()));
        assert_eq!(g.merge_curve(cs[1], tail), Err(Rejection::LoopsDiffer(cs[1], tail).into()));
        g.attach_sewing(cs[0], 4).unwrap();
        assert_eq!(g.merge_curve(cs[0], cs[1]), Err(Rejection::SewingsDiffer(cs[0], cs[1]).into()));
        assert_eq!(g.curve_count(), 5);
    }

    #[test]
    fn triangle_merge_would_duplicate() {
        let mut g = Graph::new();
        let a = g.add_curve(&[v(0.0, 0.0), v(1.0, 0.0)]).unwrap();
        let b = g.add_curve(&[v(1.0, 0.0), v(0.0, 1.0)]).unwrap();
        g.add_curve(&[v(0.0, 1.0), v(0.0, 0.0)]).unwrap();
        assert!(matches!(
            g.merge_curve(a, b),
            Err(GraphError::Rejected(Rejection::WouldDuplicateCurve(_, _)))
        ));
    }

    #[test]
    fn rejoin_opened_loop_by_merging_points() {
        let mut g = Graph::new();
        let (cs, l) = square(&mut g);
        let gap = g.get_curve(cs[1]).unwrap();
        let (s, e) = (gap.start(), gap.end());
        g.remove_curve(cs[1]);
        assert!(!g.is_loop_closed(l).unwrap());
        g.merge_key_points(s, e).unwrap();
        assert!(g.get_key_point(e).is_none());
        assert!(g.is_loop_closed(l).unwrap());
        assert_eq!(g.loop_curves(l).unwrap().len(), 3);
        g.validate().unwrap();
    }

    #[test]
    fn key_point_merge_refusals() {
        let mut g = Graph::new();
        let (cs, _) = square(&mut g);
        let c0 = g.get_curve(cs[0]).unwrap().clone();
        let c2 = g.get_curve(cs[2]).unwrap().clone();
        assert_eq!(g.merge_key_points(c0.start(), c0.start()), Err(Rejection::SamePoint.into()));
        assert_eq!(
            g.merge_key_points(c0.start(), c0.end()),
            Err(Rejection::SharedCurve(c0.start(), c0.end()).into())
        );
        // opposite corners of a closed loop: both have two curves in it
        assert_eq!(
            g.merge_key_points(c0.start(), c2.start()),
            Err(Rejection::AmbiguousBranch(c0.start(), c2.start()).into())
        );
        let cubic = g
            .add_curve(&[v(3.0, 0.0), v(3.2, 1.0), v(3.8, 1.0), v(4.0, 0.0)])
            .unwrap();
        let inner = g.get_curve(cubic).unwrap().key_points()[1];
        let free = g.add_key_point(v(9.0, 9.0), false);
        assert_eq!(g.merge_key_points(free, inner), Err(Rejection::DegeneratePoint(inner).into()));
        g.validate().unwrap();
    }

    #[test]
    fn curve_point_merge_splits_or_fuses() {
        let mut g = Graph::new();
        let (cs, l) = square(&mut g);
        let dart = g.add_curve(&[v(0.5, 0.5), v(0.5, 0.0)]).unwrap();
        let tip = g.get_curve(dart).unwrap().end();
        g.merge_curve_point(cs[0], tip).unwrap();
        assert!(g.get_curve(cs[0]).is_none());
        assert_eq!(g.loop_curves(l).unwrap().len(), 5);
        assert_eq!(g.get_key_point(tip).map(|p| p.degree()), None);
        g.validate().unwrap();

        // near a corner: fuse instead of split
        let end = g.add_key_point(v(1.005, 1.0), false);
        let far = g.add_key_point(v(2.0, 2.0), false);
        g.add_curve_from_points(&[far, end]).unwrap();
        let corner_curve = cs[1];
        g.merge_curve_point(corner_curve, end).unwrap();
        assert_eq!(g.get_key_point(end).unwrap().degree(), 3);
        assert_eq!(
            g.merge_curve_point(corner_curve, end),
            Err(Rejection::AlreadyEndpoint(end, corner_curve).into())
        );
    }
}
