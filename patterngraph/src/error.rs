//! Error kinds for graph edits.
//!
//! Invariant violations mean the caller handed the graph something it should
//! never see (unknown ids, disconnected loop input, a second bounding loop).
//! [`Rejection`]s are ordinary refusals of an edit request; the graph is left
//! untouched when one is returned.

use crate::object::ObjectId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("key point {0} is not in the graph")]
    UnknownKeyPoint(ObjectId),

    #[error("curve {0} is not in the graph")]
    UnknownCurve(ObjectId),

    #[error("loop {0} is not in the graph")]
    UnknownLoop(ObjectId),

    #[error("a curve needs 2 to 4 key points, got {0}")]
    KeyPointCount(usize),

    #[error("curve key points collapse onto each other")]
    OverlappingKeyPoints,

    #[error("curves {0} and {1} are not connected")]
    NotConnected(ObjectId, ObjectId),

    #[error("curve {0} appears more than once in a loop")]
    RepeatedCurve(ObjectId),

    #[error("a loop needs at least one curve")]
    EmptyLoop,

    #[error("id {0} already names another object")]
    IdInUse(ObjectId),

    #[error("a bounding loop must be closed")]
    OpenBoundingLoop,

    #[error("there can be at most one bounding loop")]
    MultipleBoundingLoops,

    #[error("curves {0} and {1} join the same key points")]
    DuplicateCurves(ObjectId, ObjectId),

    #[error("clone left reference {0} unmapped")]
    UnmappedClone(ObjectId),

    #[error("graph is inconsistent: {0}")]
    Inconsistent(String),

    #[error("invalid document: {0}")]
    Json(String),

    #[error("document exceeds limits: {0}")]
    Limits(String),

    #[error(transparent)]
    Rejected(#[from] Rejection),
}

/// User-facing refusals.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("cannot merge a curve with itself")]
    SameCurve,

    #[error("curves {0} and {1} do not share exactly one end point")]
    NotConnected(ObjectId, ObjectId),

    #[error("curves {0} and {1} do not share the same loops")]
    LoopsDiffer(ObjectId, ObjectId),

    #[error("curves {0} and {1} do not share the same sewings")]
    SewingsDiffer(ObjectId, ObjectId),

    #[error("curves are not neighbours in loop {0}")]
    NotAdjacentInLoop(ObjectId),

    #[error("key points {0} and {1} are already joined by a curve")]
    WouldDuplicateCurve(ObjectId, ObjectId),

    #[error("split position is too close to an end point of curve {0}")]
    TooCloseToEndpoint(ObjectId),

    #[error("key point {0} is an interior control point")]
    DegeneratePoint(ObjectId),

    #[error("key point {0} is already an end point of curve {1}")]
    AlreadyEndpoint(ObjectId, ObjectId),

    #[error("key points {0} and {1} share a curve")]
    SharedCurve(ObjectId, ObjectId),

    #[error("merging key points {0} and {1} would create a branching loop vertex")]
    AmbiguousBranch(ObjectId, ObjectId),

    #[error("the selected curves are not one-way connected")]
    Branching,

    #[error("the selected curves are not connected")]
    Disconnected,

    #[error("the selected curves are closed")]
    ClosedChain,

    #[error("cannot merge a key point with itself")]
    SamePoint,

    #[error("{0}")]
    Selection(&'static str),
}

impl GraphError {
    /// True for caller misuse or corrupt structure, false for refusals and
    /// document errors.
    pub fn is_invariant(&self) -> bool {
        !matches!(
            self,
            GraphError::Rejected(_) | GraphError::Json(_) | GraphError::Limits(_)
        )
    }

    /// Stable short code, used by bindings.
    pub fn code(&self) -> &'static str {
        match self {
            GraphError::UnknownKeyPoint(_)
            | GraphError::UnknownCurve(_)
            | GraphError::UnknownLoop(_) => "invalid_id",
            GraphError::Json(_) => "invalid_json",
            GraphError::Limits(_) => "limits",
            GraphError::Rejected(_) => "rejected",
            _ => "invariant",
        }
    }
}

pub type Result<T, E = GraphError> = std::result::Result<T, E>;
