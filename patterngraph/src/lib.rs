pub mod error;
pub mod model;
pub mod object;
pub mod sewing;
pub mod curve;
pub mod loops;
pub mod geometry {
    pub mod fitting;
    pub mod limits;
    pub mod math;
    pub mod tolerance;
}
pub mod algorithms {
    pub mod construct;
    pub mod duplicate;
    pub mod picking;
    pub mod remove;
    pub mod selection;
    pub mod split_merge;
    pub mod validity;
}
mod json;

pub use algorithms::picking::Pick;
pub use algorithms::split_merge::SplitResult;
pub use algorithms::validity::ValidityReport;
pub use curve::PointMap;
pub use error::{GraphError, Rejection, Result};
pub use geometry::tolerance::Tolerances;
pub use loops::CurveMap;
pub use model::{Curve, CurveKind, DiskLink, KeyPoint, Loop, LoopEdge, Vec2};
pub use object::{ObjectId, ObjectType, SelectOp};
pub use sewing::{SewingEvent, SewingId, SewingRelation};

use object::Flags;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

pub type Bounds = (f32, f32, f32, f32); // minx,miny,maxx,maxy

/// One pattern piece: key points, curves and loops keyed by id.
///
/// Cloning keeps ids; use [`Graph::duplicate`] for a copy with fresh ids.
#[derive(Clone, Debug)]
pub struct Graph {
    pub(crate) id: ObjectId,
    pub(crate) flags: Flags,
    pub(crate) points: PointMap,
    pub(crate) curves: CurveMap,
    pub(crate) loops: BTreeMap<ObjectId, Loop>,
    pub(crate) tol: Tolerances,
    // cleared by every edit, rebuilt on demand
    pub(crate) bbox: RefCell<Option<Bounds>>,
    pub(crate) sewing_events: Vec<SewingEvent>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::with_tolerances(Tolerances::default())
    }

    pub fn with_tolerances(tol: Tolerances) -> Self {
        Graph {
            id: object::next_id(),
            flags: Flags::default(),
            points: PointMap::new(),
            curves: CurveMap::new(),
            loops: BTreeMap::new(),
            tol,
            bbox: RefCell::new(None),
            sewing_events: Vec::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }
    pub fn tolerances(&self) -> Tolerances {
        self.tol
    }
    pub fn is_selected(&self) -> bool {
        self.flags.selected
    }
    pub fn is_highlighted(&self) -> bool {
        self.flags.highlighted
    }

    /// Drop every entity. Queued sewing events are kept.
    pub fn clear(&mut self) {
        self.points.clear();
        self.curves.clear();
        self.loops.clear();
        self.touch();
    }

    pub(crate) fn touch(&self) {
        *self.bbox.borrow_mut() = None;
    }

    // Lookup
    pub fn key_point_count(&self) -> usize {
        self.points.len()
    }
    pub fn curve_count(&self) -> usize {
        self.curves.len()
    }
    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.curves.is_empty() && self.loops.is_empty()
    }

    pub fn get_key_point(&self, id: ObjectId) -> Option<&KeyPoint> {
        self.points.get(&id)
    }
    pub fn get_curve(&self, id: ObjectId) -> Option<&Curve> {
        self.curves.get(&id)
    }
    pub fn get_loop(&self, id: ObjectId) -> Option<&Loop> {
        self.loops.get(&id)
    }

    pub fn key_points(&self) -> impl Iterator<Item = &KeyPoint> + '_ {
        self.points.values()
    }
    pub fn curves(&self) -> impl Iterator<Item = &Curve> + '_ {
        self.curves.values()
    }
    pub fn loops(&self) -> impl Iterator<Item = &Loop> + '_ {
        self.loops.values()
    }

    pub fn object_type(&self, id: ObjectId) -> Option<ObjectType> {
        if id == self.id {
            Some(ObjectType::Graph)
        } else if self.points.contains_key(&id) {
            Some(ObjectType::KeyPoint)
        } else if self.curves.contains_key(&id) {
            Some(ObjectType::Curve)
        } else if self.loops.contains_key(&id) {
            Some(ObjectType::Loop)
        } else {
            None
        }
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.object_type(id).is_some()
    }

    pub(crate) fn flags_mut(&mut self, id: ObjectId) -> Option<&mut Flags> {
        if id == self.id {
            return Some(&mut self.flags);
        }
        if let Some(p) = self.points.get_mut(&id) {
            return Some(&mut p.flags);
        }
        if let Some(c) = self.curves.get_mut(&id) {
            return Some(&mut c.flags);
        }
        self.loops.get_mut(&id).map(|l| &mut l.flags)
    }

    pub fn key_point_position(&self, id: ObjectId) -> Result<Vec2> {
        self.points
            .get(&id)
            .map(|p| p.position)
            .ok_or(GraphError::UnknownKeyPoint(id))
    }

    /// The loop flagged as bounding, if any. More than one is an invariant violation.
    pub fn bounding_loop(&self) -> Result<Option<ObjectId>> {
        let mut it = self.loops.values().filter(|l| l.bounding).map(|l| l.id);
        let first = it.next();
        if it.next().is_some() {
            return Err(GraphError::MultipleBoundingLoops);
        }
        Ok(first)
    }

    pub fn move_key_point(&mut self, id: ObjectId, pos: Vec2) -> Result<()> {
        let p = self
            .points
            .get_mut(&id)
            .ok_or(GraphError::UnknownKeyPoint(id))?;
        p.position = pos;
        for cid in &p.curves {
            if let Some(c) = self.curves.get(cid) {
                c.require_resample();
            }
        }
        self.touch();
        Ok(())
    }

    // Curve and loop geometry
    pub fn curve_samples(&self, id: ObjectId) -> Result<Vec<Vec2>> {
        let c = self.curves.get(&id).ok_or(GraphError::UnknownCurve(id))?;
        Ok(c.sample(&self.points, self.tol.curve_sample_step))
    }

    pub fn curve_length(&self, id: ObjectId) -> Result<f32> {
        let c = self.curves.get(&id).ok_or(GraphError::UnknownCurve(id))?;
        Ok(c.length(&self.points, self.tol.curve_sample_step))
    }

    pub fn curve_positions(&self, id: ObjectId) -> Result<Vec<Vec2>> {
        let c = self.curves.get(&id).ok_or(GraphError::UnknownCurve(id))?;
        Ok(c.control_polygon(&self.points))
    }

    pub fn loop_curves(&self, id: ObjectId) -> Result<Vec<ObjectId>> {
        let l = self.loops.get(&id).ok_or(GraphError::UnknownLoop(id))?;
        Ok(l.curve_ids(&self.curves))
    }

    pub fn loop_edges(&self, id: ObjectId) -> Result<Vec<LoopEdge>> {
        let l = self.loops.get(&id).ok_or(GraphError::UnknownLoop(id))?;
        Ok(l.edges(&self.curves))
    }

    pub fn is_loop_closed(&self, id: ObjectId) -> Result<bool> {
        let l = self.loops.get(&id).ok_or(GraphError::UnknownLoop(id))?;
        Ok(l.is_closed(&self.curves))
    }

    pub fn loop_samples(&self, id: ObjectId) -> Result<Vec<Vec2>> {
        let l = self.loops.get(&id).ok_or(GraphError::UnknownLoop(id))?;
        Ok(l.samples(&self.curves, &self.points, self.tol.curve_sample_step))
    }

    pub fn loop_area(&self, id: ObjectId) -> Result<f32> {
        let l = self.loops.get(&id).ok_or(GraphError::UnknownLoop(id))?;
        Ok(l.signed_area(&self.curves, &self.points, self.tol.curve_sample_step))
    }

    // Bounds
    pub fn bound(&self) -> Option<Bounds> {
        if let Some(b) = *self.bbox.borrow() {
            return Some(b);
        }
        let b = self.compute_bound();
        *self.bbox.borrow_mut() = b;
        b
    }

    pub fn update_bound(&mut self) -> Option<Bounds> {
        self.touch();
        self.bound()
    }

    fn compute_bound(&self) -> Option<Bounds> {
        if self.curves.is_empty() {
            return None;
        }
        let mut bmin = Vec2::new(f32::INFINITY, f32::INFINITY);
        let mut bmax = Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for c in self.curves.values() {
            c.union_bound(&self.points, self.tol.curve_sample_step, &mut bmin, &mut bmax);
        }
        Some((bmin.x, bmin.y, bmax.x, bmax.y))
    }

    /// Widen caller bounds by this graph's bound.
    pub fn union_bound(&self, bmin: &mut Vec2, bmax: &mut Vec2) {
        if let Some((x0, y0, x1, y1)) = self.bound() {
            bmin.x = bmin.x.min(x0);
            bmin.y = bmin.y.min(y0);
            bmax.x = bmax.x.max(x1);
            bmax.y = bmax.y.max(y1);
        }
    }

    /// Run `f` on a scratch copy and keep the result only if it succeeds.
    pub fn transact<T>(&mut self, f: impl FnOnce(&mut Graph) -> Result<T>) -> Result<T> {
        let mut scratch = self.clone();
        let out = f(&mut scratch)?;
        *self = scratch;
        Ok(out)
    }

    /// Check the structural invariants: one id per object, incidence and
    /// disk-link symmetry, reachable ids, a single bounding loop and no
    /// duplicate curves.
    pub fn validate(&self) -> Result<()> {
        let bad = |m: String| Err(GraphError::Inconsistent(m));
        // one id per object, across every kind
        let mut seen = BTreeSet::from([self.id]);
        for id in self.points.keys().chain(self.curves.keys()).chain(self.loops.keys()) {
            if !seen.insert(*id) {
                return Err(GraphError::IdInUse(*id));
            }
        }
        for (pid, p) in &self.points {
            for cid in &p.curves {
                match self.curves.get(cid) {
                    Some(c) if c.points.contains(pid) => {}
                    _ => return bad(format!("point {pid} lists curve {cid} which does not use it")),
                }
            }
        }
        let mut pairs: BTreeMap<(ObjectId, ObjectId), ObjectId> = BTreeMap::new();
        for (cid, c) in &self.curves {
            if CurveKind::from_point_count(c.points.len()) != Some(c.kind) {
                return bad(format!("curve {cid} has {} key points", c.points.len()));
            }
            let distinct: BTreeSet<_> = c.points.iter().collect();
            if distinct.len() != c.points.len() {
                return Err(GraphError::OverlappingKeyPoints);
            }
            for pid in &c.points {
                match self.points.get(pid) {
                    Some(p) if p.curves.contains(cid) => {}
                    _ => return bad(format!("curve {cid} key point {pid} missing or unlinked")),
                }
            }
            let key = (c.start().min(c.end()), c.start().max(c.end()));
            if let Some(other) = pairs.insert(key, *cid) {
                return Err(GraphError::DuplicateCurves(other, *cid));
            }
            for (lid, link) in &c.links {
                if !self.loops.contains_key(lid) {
                    return bad(format!("curve {cid} links unknown loop {lid}"));
                }
                if let Some(n) = link.next {
                    if self.curves.get(&n).and_then(|x| x.link(*lid)).and_then(|l| l.prev) != Some(*cid) {
                        return bad(format!("loop {lid}: {cid}.next = {n} but not back"));
                    }
                }
                if let Some(p) = link.prev {
                    if self.curves.get(&p).and_then(|x| x.link(*lid)).and_then(|l| l.next) != Some(*cid) {
                        return bad(format!("loop {lid}: {cid}.prev = {p} but not back"));
                    }
                }
            }
        }
        for (lid, l) in &self.loops {
            match l.start {
                Some(s) if self.curves.get(&s).map_or(false, |c| c.links.contains_key(lid)) => {}
                _ => return bad(format!("loop {lid} has no valid start curve")),
            }
            if l.bounding && !l.is_closed(&self.curves) {
                return Err(GraphError::OpenBoundingLoop);
            }
            let members = self.curves.values().filter(|c| c.links.contains_key(lid)).count();
            if members != l.curve_ids(&self.curves).len() {
                return bad(format!("loop {lid} has curves unreachable from its start"));
            }
        }
        self.bounding_loop().map(|_| ())
    }
}
