//! Identity, type tags and selection state shared by every graph entity.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

/// Process-unique id. Points, curves, loops and graphs draw from one counter,
/// so an id alone is enough to find an entity of any kind.
pub type ObjectId = u32;

static OBJECT_COUNTER: AtomicU32 = AtomicU32::new(1);

/// Allocate a fresh id.
pub fn next_id() -> ObjectId {
    OBJECT_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Ensure every id handed out after this call is greater than `id`.
/// Used when entities are loaded with ids that were allocated by another process.
pub fn reserve_id(id: ObjectId) {
    OBJECT_COUNTER.fetch_max(id.saturating_add(1), Ordering::Relaxed);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    Graph,
    KeyPoint,
    Curve,
    Loop,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    pub selected: bool,
    pub highlighted: bool,
}

/// How a selection request combines with the current selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectOp {
    /// Select exactly the given ids.
    This = 0,
    /// Add the given ids to the selection.
    Union = 1,
    /// Toggle the given ids.
    UnionInverse = 2,
    All = 3,
    None = 4,
    Inverse = 5,
}

impl SelectOp {
    pub fn from_u8(v: u8) -> Option<SelectOp> {
        match v {
            0 => Some(SelectOp::This),
            1 => Some(SelectOp::Union),
            2 => Some(SelectOp::UnionInverse),
            3 => Some(SelectOp::All),
            4 => Some(SelectOp::None),
            5 => Some(SelectOp::Inverse),
            _ => None,
        }
    }

    /// New selection state for one object; `in_set` tells whether the object
    /// was named by the request.
    pub fn apply(self, selected: bool, in_set: bool) -> bool {
        match self {
            SelectOp::This => in_set,
            SelectOp::Union => selected || in_set,
            SelectOp::UnionInverse => {
                if in_set {
                    !selected
                } else {
                    selected
                }
            }
            SelectOp::All => true,
            SelectOp::None => false,
            SelectOp::Inverse => !selected,
        }
    }
}
