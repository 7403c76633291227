//! Factory operations: key points, curves and loops, with snapping and
//! deduplication.

use crate::error::{GraphError, Result};
use crate::loops::{chain_ends, chain_orientation};
use crate::model::{Curve, CurveKind, DiskLink, KeyPoint, Loop, Vec2};
use crate::object::{next_id, reserve_id, ObjectId};
use crate::Graph;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// How `add_loop_impl` treats curve direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LoopMode {
    /// Reverse free curves so the chain runs head to tail and fold in loops
    /// over the same curves.
    Orient,
    /// Keep every curve and every stored loop as is (used when loading).
    Preserve,
}

impl Graph {
    /// Nearest key point within the merge distance of `pos`.
    pub fn find_near_point(&self, pos: Vec2) -> Option<ObjectId> {
        let r = self.tol.point_merge_dist;
        self.points
            .values()
            .map(|p| (p.id, p.position.distance(pos)))
            .filter(|&(_, d)| d < r)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Create a key point. End points snap to an existing point within the
    /// merge distance instead of creating a new one.
    pub fn add_key_point(&mut self, pos: Vec2, is_endpoint: bool) -> ObjectId {
        if is_endpoint {
            if let Some(id) = self.find_near_point(pos) {
                return id;
            }
        }
        let id = next_id();
        self.points.insert(id, KeyPoint::new(id, pos));
        id
    }

    /// Insert a key point under a known id. An existing key point wins; an id
    /// held by any other object is refused.
    pub fn insert_key_point(&mut self, id: ObjectId, pos: Vec2) -> Result<ObjectId> {
        if self.points.contains_key(&id) {
            warn!(id, "key point already exists");
            return Ok(id);
        }
        if self.contains(id) {
            return Err(GraphError::IdInUse(id));
        }
        reserve_id(id);
        self.points.insert(id, KeyPoint::new(id, pos));
        Ok(id)
    }

    /// Curve joining `a` and `b` (in either direction).
    pub fn find_curve_between(&self, a: ObjectId, b: ObjectId) -> Option<ObjectId> {
        let p = self.points.get(&a)?;
        p.curves
            .iter()
            .filter_map(|cid| self.curves.get(cid))
            .find(|c| (c.start() == a && c.end() == b) || (c.start() == b && c.end() == a))
            .map(|c| c.id)
    }

    /// Add a curve through `positions` (2 to 4 Bézier control points). The
    /// first and last positions snap to existing points; interior points are
    /// always new. A curve already joining the same end points is returned
    /// instead of adding a parallel one.
    pub fn add_curve(&mut self, positions: &[Vec2]) -> Result<ObjectId> {
        let n = positions.len();
        let kind = CurveKind::from_point_count(n).ok_or(GraphError::KeyPointCount(n))?;
        let (first, last) = (positions[0], positions[n - 1]);
        let s = self.find_near_point(first);
        let e = self.find_near_point(last);
        match (s, e) {
            (Some(a), Some(b)) if a == b => return Err(GraphError::OverlappingKeyPoints),
            (None, None) if first.distance(last) < self.tol.point_merge_dist => {
                return Err(GraphError::OverlappingKeyPoints)
            }
            (Some(a), Some(b)) => {
                if let Some(c) = self.find_curve_between(a, b) {
                    debug!(curve = c, "add_curve: reusing curve with same end points");
                    return Ok(c);
                }
            }
            _ => {}
        }
        let start = s.unwrap_or_else(|| self.add_key_point(first, false));
        let mut ids = vec![start];
        for p in &positions[1..n - 1] {
            ids.push(self.add_key_point(*p, false));
        }
        let end = e.unwrap_or_else(|| self.add_key_point(last, false));
        ids.push(end);
        Ok(self.link_curve(next_id(), kind, ids))
    }

    /// Add a curve over existing key points.
    pub fn add_curve_from_points(&mut self, ids: &[ObjectId]) -> Result<ObjectId> {
        self.insert_curve_impl(None, ids)
    }

    /// Insert a curve under a known id. An existing curve id wins; a curve
    /// with the same end points is returned in place of a duplicate.
    pub fn insert_curve(&mut self, id: ObjectId, ids: &[ObjectId]) -> Result<ObjectId> {
        if self.curves.contains_key(&id) {
            warn!(id, "curve already exists");
            return Ok(id);
        }
        if self.contains(id) {
            return Err(GraphError::IdInUse(id));
        }
        self.insert_curve_impl(Some(id), ids)
    }

    fn insert_curve_impl(&mut self, id: Option<ObjectId>, ids: &[ObjectId]) -> Result<ObjectId> {
        let kind = CurveKind::from_point_count(ids.len())
            .ok_or(GraphError::KeyPointCount(ids.len()))?;
        for pid in ids {
            if !self.points.contains_key(pid) {
                return Err(GraphError::UnknownKeyPoint(*pid));
            }
        }
        let distinct: BTreeSet<_> = ids.iter().collect();
        if distinct.len() != ids.len() {
            return Err(GraphError::OverlappingKeyPoints);
        }
        if let Some(c) = self.find_curve_between(ids[0], ids[ids.len() - 1]) {
            debug!(curve = c, "reusing curve with same end points");
            return Ok(c);
        }
        let id = match id {
            Some(id) => {
                reserve_id(id);
                id
            }
            None => next_id(),
        };
        Ok(self.link_curve(id, kind, ids.to_vec()))
    }

    pub(crate) fn link_curve(&mut self, id: ObjectId, kind: CurveKind, ids: Vec<ObjectId>) -> ObjectId {
        for pid in &ids {
            if let Some(p) = self.points.get_mut(pid) {
                p.curves.insert(id);
            }
        }
        self.curves.insert(id, Curve::new(id, kind, ids));
        self.touch();
        id
    }

    /// Build a loop from a head-to-tail chain of existing curves (in either
    /// direction each). The loop is closed when the chain returns to its first
    /// key point. An existing loop already covering these curves is returned;
    /// loops covering a strict subset are replaced.
    pub fn add_loop(&mut self, curves: &[ObjectId], bounding: bool) -> Result<ObjectId> {
        self.add_loop_impl(curves, bounding, None, LoopMode::Orient)
    }

    pub(crate) fn add_loop_impl(
        &mut self,
        curve_ids: &[ObjectId],
        bounding: bool,
        id: Option<ObjectId>,
        mode: LoopMode,
    ) -> Result<ObjectId> {
        if let Some(id) = id {
            if self.loops.contains_key(&id) {
                warn!(id, "loop already exists");
                return Ok(id);
            }
            if self.contains(id) {
                return Err(GraphError::IdInUse(id));
            }
        }
        if curve_ids.is_empty() {
            return Err(GraphError::EmptyLoop);
        }
        let mut members = BTreeSet::new();
        for &c in curve_ids {
            if !self.curves.contains_key(&c) {
                return Err(GraphError::UnknownCurve(c));
            }
            if !members.insert(c) {
                return Err(GraphError::RepeatedCurve(c));
            }
        }

        // existing loops over the same curves, or a subset of them; loading
        // keeps every stored loop as is
        let mut subsets = Vec::new();
        for (lid, l) in self.loops.iter().filter(|_| mode == LoopMode::Orient) {
            let ids: BTreeSet<ObjectId> = l.curve_ids(&self.curves).into_iter().collect();
            if members.is_subset(&ids) {
                debug!(loop_id = lid, "add_loop: existing loop contains the given curves");
                return Ok(*lid);
            }
            if ids.is_subset(&members) {
                subsets.push(*lid);
            }
        }

        let order: Vec<ObjectId> = curve_ids.to_vec();
        let rev = self.orientation(&order)?;

        let closed = {
            let chain: Vec<&Curve> = order.iter().map(|c| &self.curves[c]).collect();
            order.len() > 1 && chain_ends(&chain, &rev).map_or(false, |(a, b)| a == b)
        };
        if bounding && !closed {
            return Err(GraphError::OpenBoundingLoop);
        }
        if bounding
            && self
                .loops
                .values()
                .any(|l| l.bounding && !subsets.contains(&l.id))
        {
            return Err(GraphError::MultipleBoundingLoops);
        }

        // validation done; mutate from here on
        for lid in subsets {
            debug!(loop_id = lid, "add_loop: replacing subset loop");
            self.remove_loop(lid, false);
        }
        if mode == LoopMode::Orient {
            // curves still in another loop keep their direction and are
            // walked backwards
            for (c, r) in order.iter().zip(&rev) {
                match self.curves.get_mut(c) {
                    Some(curve) if *r && curve.links.is_empty() => curve.reverse(),
                    _ => {}
                }
            }
        }
        let id = match id {
            Some(id) => {
                reserve_id(id);
                id
            }
            None => next_id(),
        };
        let n = order.len();
        for (i, c) in order.iter().enumerate() {
            let prev = if i > 0 {
                Some(order[i - 1])
            } else if closed {
                Some(order[n - 1])
            } else {
                None
            };
            let next = if i + 1 < n {
                Some(order[i + 1])
            } else if closed {
                Some(order[0])
            } else {
                None
            };
            if let Some(curve) = self.curves.get_mut(c) {
                curve.links.insert(id, DiskLink { prev, next });
            }
        }
        self.loops.insert(id, Loop::new(id, order[0], bounding));
        debug!(loop_id = id, curves = n, closed, bounding, "loop added");
        Ok(id)
    }

    fn orientation(&self, order: &[ObjectId]) -> Result<Vec<bool>> {
        let chain: Vec<&Curve> = order.iter().map(|c| &self.curves[c]).collect();
        chain_orientation(&chain).map_err(|(a, b)| GraphError::NotConnected(a, b))
    }
}
