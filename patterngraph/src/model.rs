use crate::object::{Flags, ObjectId};
use crate::sewing::SewingId;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Add, Mul, Neg, Sub};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }
    pub fn length_sq(self) -> f32 {
        self.x * self.x + self.y * self.y
    }
    pub fn length(self) -> f32 {
        self.length_sq().sqrt()
    }
    pub fn distance(self, o: Vec2) -> f32 {
        (self - o).length()
    }
    pub fn dot(self, o: Vec2) -> f32 {
        self.x * o.x + self.y * o.y
    }
    pub fn cross(self, o: Vec2) -> f32 {
        self.x * o.y - self.y * o.x
    }
    pub fn lerp(self, o: Vec2, t: f32) -> Vec2 {
        Vec2 {
            x: self.x + t * (o.x - self.x),
            y: self.y + t * (o.y - self.y),
        }
    }
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, o: Vec2) -> Vec2 {
        Vec2::new(self.x + o.x, self.y + o.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, o: Vec2) -> Vec2 {
        Vec2::new(self.x - o.x, self.y - o.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, s: f32) -> Vec2 {
        Vec2::new(self.x * s, self.y * s)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// A vertex of the subdivision: a curve endpoint or an interior control point.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyPoint {
    pub(crate) id: ObjectId,
    pub(crate) flags: Flags,
    pub(crate) position: Vec2,
    // back-references, not owned
    pub(crate) curves: BTreeSet<ObjectId>,
}

impl KeyPoint {
    pub(crate) fn new(id: ObjectId, position: Vec2) -> Self {
        KeyPoint {
            id,
            flags: Flags::default(),
            position,
            curves: BTreeSet::new(),
        }
    }
    pub fn id(&self) -> ObjectId {
        self.id
    }
    pub fn position(&self) -> Vec2 {
        self.position
    }
    pub fn curves(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.curves.iter().copied()
    }
    pub fn degree(&self) -> usize {
        self.curves.len()
    }
    pub fn is_selected(&self) -> bool {
        self.flags.selected
    }
    pub fn is_highlighted(&self) -> bool {
        self.flags.highlighted
    }
}

/// Curve variants, told apart by the number of key points (Bézier control points).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveKind {
    Line,
    Quadratic,
    Cubic,
}

impl CurveKind {
    pub fn from_point_count(n: usize) -> Option<CurveKind> {
        match n {
            2 => Some(CurveKind::Line),
            3 => Some(CurveKind::Quadratic),
            4 => Some(CurveKind::Cubic),
            _ => None,
        }
    }
    pub fn point_count(self) -> usize {
        match self {
            CurveKind::Line => 2,
            CurveKind::Quadratic => 3,
            CurveKind::Cubic => 4,
        }
    }
}

/// Neighbours of a curve inside one loop's traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiskLink {
    pub prev: Option<ObjectId>,
    pub next: Option<ObjectId>,
}

#[derive(Clone, Debug)]
pub(crate) struct SampleCache {
    pub step: f32,
    pub points: Vec<Vec2>,
}

#[derive(Clone, Debug)]
pub struct Curve {
    pub(crate) id: ObjectId,
    pub(crate) flags: Flags,
    pub(crate) kind: CurveKind,
    pub(crate) points: Vec<ObjectId>,
    // loop id -> neighbours within that loop
    pub(crate) links: BTreeMap<ObjectId, DiskLink>,
    pub(crate) sewings: BTreeSet<SewingId>,
    pub(crate) samples: RefCell<Option<SampleCache>>,
}

impl Curve {
    pub(crate) fn new(id: ObjectId, kind: CurveKind, points: Vec<ObjectId>) -> Self {
        Curve {
            id,
            flags: Flags::default(),
            kind,
            points,
            links: BTreeMap::new(),
            sewings: BTreeSet::new(),
            samples: RefCell::new(None),
        }
    }
    pub fn id(&self) -> ObjectId {
        self.id
    }
    pub fn kind(&self) -> CurveKind {
        self.kind
    }
    pub fn key_points(&self) -> &[ObjectId] {
        &self.points
    }
    pub fn link(&self, loop_id: ObjectId) -> Option<DiskLink> {
        self.links.get(&loop_id).copied()
    }
    pub fn loops(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.links.keys().copied()
    }
    pub fn sewings(&self) -> impl Iterator<Item = SewingId> + '_ {
        self.sewings.iter().copied()
    }
    pub fn is_selected(&self) -> bool {
        self.flags.selected
    }
    pub fn is_highlighted(&self) -> bool {
        self.flags.highlighted
    }
}

/// A closed cycle or open chain of curves, reached from `start` through the
/// curves' disk links.
#[derive(Clone, Debug)]
pub struct Loop {
    pub(crate) id: ObjectId,
    pub(crate) flags: Flags,
    pub(crate) start: Option<ObjectId>,
    pub(crate) bounding: bool,
}

impl Loop {
    pub(crate) fn new(id: ObjectId, start: ObjectId, bounding: bool) -> Self {
        Loop {
            id,
            flags: Flags::default(),
            start: Some(start),
            bounding,
        }
    }
    pub fn id(&self) -> ObjectId {
        self.id
    }
    pub fn start(&self) -> Option<ObjectId> {
        self.start
    }
    pub fn is_bounding(&self) -> bool {
        self.bounding
    }
    pub fn is_selected(&self) -> bool {
        self.flags.selected
    }
    pub fn is_highlighted(&self) -> bool {
        self.flags.highlighted
    }
}

/// One step of a loop traversal. `reversed` is set when the loop walks the
/// curve from its end point to its start point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopEdge {
    pub curve: ObjectId,
    pub reversed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec2_ops() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(3.0, -1.0);
        assert_eq!(a + b, Vec2::new(4.0, 1.0));
        assert_eq!(b - a, Vec2::new(2.0, -3.0));
        assert_eq!(a * 2.0, Vec2::new(2.0, 4.0));
        assert_eq!(a.cross(b), 1.0 * -1.0 - 2.0 * 3.0);
        assert!((Vec2::new(3.0, 4.0).length() - 5.0).abs() < 1e-6);
        assert_eq!(a.lerp(b, 0.5), Vec2::new(2.0, 0.5));
    }

    #[test]
    fn curve_kind_by_count() {
        assert_eq!(CurveKind::from_point_count(2), Some(CurveKind::Line));
        assert_eq!(CurveKind::from_point_count(4), Some(CurveKind::Cubic));
        assert_eq!(CurveKind::from_point_count(5), None);
        assert_eq!(CurveKind::Quadratic.point_count(), 3);
    }
}
