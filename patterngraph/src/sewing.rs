//! Sewings link curves of different pattern pieces into seams. They are owned
//! outside the graph; the graph only records which sewings reference each
//! curve and queues notifications when those curves are replaced or removed.

use crate::error::{GraphError, Result};
use crate::object::ObjectId;
use crate::Graph;
use serde::Serialize;

pub type SewingId = u32;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SewingEvent {
    /// `old` was replaced by `new` (one curve after a merge, two after a split).
    SwapCurve {
        sewing: SewingId,
        old: ObjectId,
        new: Vec<ObjectId>,
    },
    /// `curve` no longer exists.
    Remove { sewing: SewingId, curve: ObjectId },
}

/// Receiver of sewing notifications.
pub trait SewingRelation {
    fn swap_curve(&mut self, sewing: SewingId, old: ObjectId, new: &[ObjectId]);
    fn remove_curve(&mut self, sewing: SewingId, curve: ObjectId);
}

impl Graph {
    pub fn attach_sewing(&mut self, curve: ObjectId, sewing: SewingId) -> Result<bool> {
        let c = self
            .curves
            .get_mut(&curve)
            .ok_or(GraphError::UnknownCurve(curve))?;
        Ok(c.sewings.insert(sewing))
    }

    pub fn detach_sewing(&mut self, curve: ObjectId, sewing: SewingId) -> Result<bool> {
        let c = self
            .curves
            .get_mut(&curve)
            .ok_or(GraphError::UnknownCurve(curve))?;
        Ok(c.sewings.remove(&sewing))
    }

    pub fn pending_sewing_events(&self) -> &[SewingEvent] {
        &self.sewing_events
    }

    pub fn take_sewing_events(&mut self) -> Vec<SewingEvent> {
        std::mem::take(&mut self.sewing_events)
    }

    /// Deliver and drain queued notifications. Returns how many were sent.
    pub fn dispatch_sewing_events<R: SewingRelation>(&mut self, relation: &mut R) -> usize {
        let events = self.take_sewing_events();
        for ev in &events {
            match ev {
                SewingEvent::SwapCurve { sewing, old, new } => {
                    relation.swap_curve(*sewing, *old, new)
                }
                SewingEvent::Remove { sewing, curve } => relation.remove_curve(*sewing, *curve),
            }
        }
        events.len()
    }

    pub(crate) fn emit_swap(&mut self, old: ObjectId, sewings: &[SewingId], new: &[ObjectId]) {
        for &sewing in sewings {
            self.sewing_events.push(SewingEvent::SwapCurve {
                sewing,
                old,
                new: new.to_vec(),
            });
        }
    }

    pub(crate) fn emit_remove(&mut self, curve: ObjectId, sewings: &[SewingId]) {
        for &sewing in sewings {
            self.sewing_events
                .push(SewingEvent::Remove { sewing, curve });
        }
    }
}
