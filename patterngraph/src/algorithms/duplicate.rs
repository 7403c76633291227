use crate::error::{GraphError, Result};
use crate::model::{Curve, DiskLink, KeyPoint, Loop};
use crate::object::{next_id, Flags, ObjectId};
use crate::Graph;
use std::collections::HashMap;

/// Old id -> new id, built and consumed inside one duplicate call.
type Remap = HashMap<ObjectId, ObjectId>;

fn mapped(map: &Remap, id: ObjectId) -> Result<ObjectId> {
    map.get(&id).copied().ok_or(GraphError::UnmappedClone(id))
}

fn mapped_opt(map: &Remap, id: Option<ObjectId>) -> Result<Option<ObjectId>> {
    id.map(|i| mapped(map, i)).transpose()
}

impl Graph {
    /// Copy with fresh ids for the graph and every entity. Sewing references
    /// are not carried over; the copy is an unsewn piece.
    pub fn duplicate(&self) -> Result<Graph> {
        self.duplicate_with_map().map(|(g, _)| g)
    }

    /// Like [`Graph::duplicate`], also returning the old -> new id table.
    pub fn duplicate_with_map(&self) -> Result<(Graph, HashMap<ObjectId, ObjectId>)> {
        let mut map = Remap::new();
        let mut out = Graph::with_tolerances(self.tol);
        map.insert(self.id, out.id);
        out.flags = Flags {
            selected: self.flags.selected,
            highlighted: false,
        };
        for id in self
            .points
            .keys()
            .chain(self.curves.keys())
            .chain(self.loops.keys())
        {
            map.insert(*id, next_id());
        }

        for p in self.points.values() {
            let id = mapped(&map, p.id)?;
            let mut np = KeyPoint::new(id, p.position);
            np.flags.selected = p.flags.selected;
            np.curves = p
                .curves
                .iter()
                .map(|c| mapped(&map, *c))
                .collect::<Result<_>>()?;
            out.points.insert(id, np);
        }
        for c in self.curves.values() {
            let id = mapped(&map, c.id)?;
            let points = c
                .points
                .iter()
                .map(|p| mapped(&map, *p))
                .collect::<Result<Vec<_>>>()?;
            let mut nc = Curve::new(id, c.kind, points);
            nc.flags.selected = c.flags.selected;
            for (lid, k) in &c.links {
                let link = DiskLink {
                    prev: mapped_opt(&map, k.prev)?,
                    next: mapped_opt(&map, k.next)?,
                };
                nc.links.insert(mapped(&map, *lid)?, link);
            }
            out.curves.insert(id, nc);
        }
        for l in self.loops.values() {
            let id = mapped(&map, l.id)?;
            let mut nl = Loop::new(id, 0, l.bounding);
            nl.start = mapped_opt(&map, l.start)?;
            nl.flags.selected = l.flags.selected;
            out.loops.insert(id, nl);
        }
        *out.bbox.borrow_mut() = *self.bbox.borrow();
        Ok((out, map))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Graph, ObjectId, Vec2};

    fn square() -> (Graph, ObjectId) {
        let mut g = Graph::new();
        let p = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        let cs: Vec<ObjectId> = (0..4)
            .map(|i| g.add_curve(&[p[i], p[(i + 1) % 4]]).unwrap())
            .collect();
        let l = g.add_loop(&cs, true).unwrap();
        (g, l)
    }

    #[test]
    fn duplicate_is_isomorphic_with_fresh_ids() {
        let (g, l) = square();
        let (d, map) = g.duplicate_with_map().unwrap();
        assert_ne!(d.id(), g.id());
        assert_eq!(d.key_point_count(), 4);
        assert_eq!(d.curve_count(), 4);
        let dl = map[&l];
        assert!(d.get_loop(dl).unwrap().is_bounding());
        let expect: Vec<ObjectId> = g.loop_curves(l).unwrap().iter().map(|c| map[c]).collect();
        assert_eq!(d.loop_curves(dl).unwrap(), expect);
        for p in g.key_points() {
            assert!(!d.contains(p.id()));
            assert_eq!(d.key_point_position(map[&p.id()]), Ok(p.position()));
        }
        d.validate().unwrap();
    }

    #[test]
    fn copies_are_independent() {
        let (g, l) = square();
        let mut d = g.duplicate().unwrap();
        let c = d.curves().next().map(|c| c.id()).unwrap();
        d.remove_curve(c);
        assert_eq!(g.curve_count(), 4);
        assert!(g.is_loop_closed(l).unwrap());

        let mut same_ids = g.clone();
        let first = g.loop_curves(l).unwrap()[0];
        same_ids.remove_curve(first);
        assert!(g.get_curve(first).is_some());
        assert!(same_ids.get_curve(first).is_none());
    }
}
