//! Selection flags and the editing commands that act on the current
//! selection.

use crate::algorithms::split_merge::SplitResult;
use crate::error::{Rejection, Result};
use crate::object::{ObjectId, SelectOp};
use crate::{Graph, Vec2};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

impl Graph {
    /// Apply `op` to every key point, curve, loop and the graph itself.
    /// Returns whether any flag changed.
    pub fn select(&mut self, ids: &BTreeSet<ObjectId>, op: SelectOp) -> bool {
        let mut changed = false;
        let mut apply = |id: ObjectId, selected: &mut bool| {
            let new = op.apply(*selected, ids.contains(&id));
            changed |= new != *selected;
            *selected = new;
        };
        for p in self.points.values_mut() {
            apply(p.id, &mut p.flags.selected);
        }
        for c in self.curves.values_mut() {
            apply(c.id, &mut c.flags.selected);
        }
        for l in self.loops.values_mut() {
            apply(l.id, &mut l.flags.selected);
        }
        apply(self.id, &mut self.flags.selected);
        changed
    }

    pub fn select_one(&mut self, id: ObjectId, op: SelectOp) -> bool {
        self.select(&BTreeSet::from([id]), op)
    }

    /// Highlight `id` and clear the highlight on `last_id`.
    pub fn highlight(&mut self, id: ObjectId, last_id: ObjectId) {
        if let Some(f) = self.flags_mut(id) {
            f.highlighted = true;
        }
        if id != last_id {
            if let Some(f) = self.flags_mut(last_id) {
                f.highlighted = false;
            }
        }
    }

    pub fn selected_key_points(&self) -> Vec<ObjectId> {
        self.points.values().filter(|p| p.flags.selected).map(|p| p.id).collect()
    }
    pub fn selected_curves(&self) -> Vec<ObjectId> {
        self.curves.values().filter(|c| c.flags.selected).map(|c| c.id).collect()
    }
    pub fn selected_loops(&self) -> Vec<ObjectId> {
        self.loops.values().filter(|l| l.flags.selected).map(|l| l.id).collect()
    }

    /// Order `curves` into one simple chain through shared end points.
    /// Returns the order and whether the chain closes on itself.
    pub fn order_curve_chain(&self, curves: &[ObjectId]) -> Result<(Vec<ObjectId>, bool)> {
        let set: BTreeSet<ObjectId> = curves.iter().copied().collect();
        if set.len() <= 1 {
            return Ok((set.into_iter().collect(), false));
        }
        let mut nbrs: BTreeMap<ObjectId, Vec<ObjectId>> = BTreeMap::new();
        for &cid in &set {
            let c = self.curves.get(&cid).ok_or(crate::GraphError::UnknownCurve(cid))?;
            let mut mine = Vec::new();
            for end in [c.start(), c.end()] {
                let at: Vec<ObjectId> = set
                    .iter()
                    .copied()
                    .filter(|o| *o != cid)
                    .filter(|o| self.curves.get(o).map_or(false, |oc| oc.has_end_point(end)))
                    .collect();
                if at.len() > 1 {
                    return Err(Rejection::Branching.into());
                }
                mine.extend(at);
            }
            mine.dedup();
            if mine.is_empty() {
                return Err(Rejection::Disconnected.into());
            }
            nbrs.insert(cid, mine);
        }

        let closed = nbrs.values().all(|n| n.len() == 2);
        let start = nbrs
            .iter()
            .find(|(_, n)| n.len() == 1)
            .map(|(c, _)| *c)
            .or_else(|| set.iter().next().copied())
            .ok_or(Rejection::Disconnected)?;
        let mut order = vec![start];
        let mut visited = BTreeSet::from([start]);
        let mut cur = start;
        while let Some(next) = nbrs
            .get(&cur)
            .and_then(|n| n.iter().copied().find(|c| !visited.contains(c)))
        {
            visited.insert(next);
            order.push(next);
            cur = next;
        }
        if order.len() < set.len() {
            return Err(Rejection::Disconnected.into());
        }
        Ok((order, closed))
    }

    /// Build a loop from the selected curves.
    pub fn selected_curves_to_loop(&mut self, bounding: bool) -> Result<ObjectId> {
        let selected = self.selected_curves();
        if selected.is_empty() {
            return Err(Rejection::Selection("no curves selected").into());
        }
        let (order, _) = self.order_curve_chain(&selected)?;
        self.add_loop(&order, bounding)
    }

    /// Merge the selected open chain of curves into one curve.
    pub fn merge_selected_curves(&mut self) -> Result<ObjectId> {
        let selected = self.selected_curves();
        if selected.len() < 2 {
            return Err(Rejection::Selection("select at least two curves").into());
        }
        let (order, closed) = self.order_curve_chain(&selected)?;
        if closed {
            return Err(Rejection::ClosedChain.into());
        }
        self.transact(|g| {
            let mut merged = order[0];
            for &c in &order[1..] {
                merged = g.merge_curve(merged, c)?;
            }
            debug!(count = order.len(), merged, "merged selected curves");
            Ok(merged)
        })
    }

    pub fn split_selected_curve(&mut self, pos: Vec2) -> Result<SplitResult> {
        match self.selected_curves()[..] {
            [c] => self.split_edge(c, pos),
            _ => Err(Rejection::Selection("select exactly one curve").into()),
        }
    }

    pub fn merge_selected_key_points(&mut self) -> Result<()> {
        match self.selected_key_points()[..] {
            [a, b] => self.merge_key_points(a, b),
            _ => Err(Rejection::Selection("select exactly two key points").into()),
        }
    }

    pub fn merge_selected_key_point_to_curve(&mut self) -> Result<()> {
        match (&self.selected_key_points()[..], &self.selected_curves()[..]) {
            (&[p], &[c]) => self.merge_curve_point(c, p),
            _ => Err(Rejection::Selection("select one key point and one curve").into()),
        }
    }

    /// Remove every loop made only of selected curves. The curves stay.
    pub fn remove_loops_of_selected_curves(&mut self) -> bool {
        let selected: BTreeSet<ObjectId> = self.selected_curves().into_iter().collect();
        if selected.is_empty() {
            return false;
        }
        let doomed: Vec<ObjectId> = self
            .loops
            .values()
            .filter(|l| l.curve_ids(&self.curves).iter().all(|c| selected.contains(c)))
            .map(|l| l.id)
            .collect();
        let mut changed = false;
        for lid in doomed {
            changed |= self.remove_loop(lid, false);
        }
        changed
    }
}
