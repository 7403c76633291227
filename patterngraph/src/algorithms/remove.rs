//! Removal with cascades: key point -> curves, curve -> loop relinking and
//! orphaned points, loop -> disk links (and optionally its curves).

use crate::model::Loop;
use crate::object::{next_id, ObjectId, ObjectType};
use crate::Graph;
use tracing::debug;

impl Graph {
    /// Remove by id, whatever the entity type. False for unknown ids and for
    /// the graph's own id.
    pub fn remove(&mut self, id: ObjectId) -> bool {
        match self.object_type(id) {
            Some(ObjectType::KeyPoint) => self.remove_key_point(id),
            Some(ObjectType::Curve) => self.remove_curve(id),
            Some(ObjectType::Loop) => self.remove_loop(id, false),
            Some(ObjectType::Graph) | None => false,
        }
    }

    /// Remove a key point and every curve that uses it.
    pub fn remove_key_point(&mut self, id: ObjectId) -> bool {
        let Some(p) = self.points.get(&id) else {
            return false;
        };
        let incident: Vec<ObjectId> = p.curves.iter().copied().collect();
        for c in incident {
            self.remove_curve(c);
        }
        self.points.remove(&id);
        self.touch();
        true
    }

    /// Remove a curve. Each loop it bordered is cut at the gap: a closed loop
    /// opens, an open chain loses its end or splits in two. Loops left empty
    /// and key points left without curves are removed too.
    pub fn remove_curve(&mut self, id: ObjectId) -> bool {
        let Some(curve) = self.curves.get(&id) else {
            return false;
        };
        let links: Vec<_> = curve.links.iter().map(|(l, k)| (*l, *k)).collect();
        let sewings: Vec<_> = curve.sewings.iter().copied().collect();
        let key_points = curve.points.clone();

        for (lid, link) in links {
            let Some(lp) = self.loops.get(&lid) else {
                continue;
            };
            let closed = lp.is_closed(&self.curves);
            let before: Vec<ObjectId> = if closed {
                Vec::new()
            } else {
                lp.curve_ids(&self.curves)
                    .into_iter()
                    .take_while(|c| *c != id)
                    .collect()
            };

            if let Some(p) = link.prev {
                if let Some(k) = self.curves.get_mut(&p).and_then(|c| c.links.get_mut(&lid)) {
                    k.next = None;
                }
            }
            if let Some(n) = link.next {
                if let Some(k) = self.curves.get_mut(&n).and_then(|c| c.links.get_mut(&lid)) {
                    k.prev = None;
                }
            }

            let (start, split_off) = if closed {
                (link.next, None)
            } else if before.is_empty() {
                (link.next, None)
            } else if link.next.is_none() {
                // removed the tail; the head stays in this loop
                (before.first().copied(), None)
            } else {
                (link.next, Some(before))
            };

            if let Some(lp) = self.loops.get_mut(&lid) {
                lp.start = start;
                if closed {
                    lp.bounding = false;
                }
            }
            if let Some(head) = split_off {
                let nid = next_id();
                for c in &head {
                    if let Some(k) = self.curves.get_mut(c).and_then(|c| c.links.remove(&lid)) {
                        if let Some(c) = self.curves.get_mut(c) {
                            c.links.insert(nid, k);
                        }
                    }
                }
                self.loops.insert(nid, Loop::new(nid, head[0], false));
                debug!(loop_id = lid, new_loop = nid, "remove_curve: open chain split");
            }
        }

        self.emit_remove(id, &sewings);
        if let Some(c) = self.curves.remove(&id) {
            for lid in c.links.keys() {
                let empty = self.loops.get(lid).map_or(false, |l| l.start.is_none());
                if empty {
                    debug!(loop_id = lid, "remove_curve: loop emptied");
                    self.loops.remove(lid);
                }
            }
        }
        for pid in key_points {
            let orphan = match self.points.get_mut(&pid) {
                Some(p) => {
                    p.curves.remove(&id);
                    p.curves.is_empty()
                }
                None => false,
            };
            if orphan {
                self.points.remove(&pid);
            }
        }
        self.touch();
        true
    }

    /// Remove a loop and its disk links. With `cascade`, curves left in no
    /// loop are removed as well.
    pub fn remove_loop(&mut self, id: ObjectId, cascade: bool) -> bool {
        if self.loops.remove(&id).is_none() {
            return false;
        }
        let mut freed = Vec::new();
        for c in self.curves.values_mut() {
            if c.links.remove(&id).is_some() && c.links.is_empty() {
                freed.push(c.id);
            }
        }
        if cascade {
            for c in freed {
                self.remove_curve(c);
            }
        }
        debug!(loop_id = id, cascade, "loop removed");
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::{Graph, ObjectId, Vec2};

    fn chain(g: &mut Graph, n: usize, closed: bool) -> Vec<ObjectId> {
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(-1.0, 1.0),
        ];
        let m = if closed { n } else { n + 1 };
        (0..n)
            .map(|i| g.add_curve(&[pts[i], pts[(i + 1) % m]]).unwrap())
            .collect()
    }

    #[test]
    fn interior_removal_splits_open_chain() {
        let mut g = Graph::new();
        let cs = chain(&mut g, 4, false);
        let l = g.add_loop(&cs, false).unwrap();
        assert!(g.remove_curve(cs[1]));
        assert_eq!(g.loop_count(), 2);
        assert_eq!(g.loop_curves(l).unwrap(), vec![cs[2], cs[3]]);
        let other = g.loops().map(|l| l.id()).find(|id| *id != l).unwrap();
        assert_eq!(g.loop_curves(other).unwrap(), vec![cs[0]]);
        g.validate().unwrap();
    }

    #[test]
    fn tail_and_head_removal_truncate() {
        let mut g = Graph::new();
        let cs = chain(&mut g, 3, false);
        let l = g.add_loop(&cs, false).unwrap();
        g.remove_curve(cs[2]);
        assert_eq!(g.loop_curves(l).unwrap(), vec![cs[0], cs[1]]);
        g.remove_curve(cs[0]);
        assert_eq!(g.loop_curves(l).unwrap(), vec![cs[1]]);
        g.remove_curve(cs[1]);
        assert!(g.get_loop(l).is_none());
        assert_eq!(g.key_point_count(), 0);
    }

    #[test]
    fn closed_loop_opens_and_drops_bounding() {
        let mut g = Graph::new();
        let cs = chain(&mut g, 4, true);
        let l = g.add_loop(&cs, true).unwrap();
        g.remove_curve(cs[0]);
        assert!(!g.is_loop_closed(l).unwrap());
        assert!(!g.get_loop(l).unwrap().is_bounding());
        assert_eq!(g.loop_curves(l).unwrap(), vec![cs[1], cs[2], cs[3]]);
        assert_eq!(g.key_point_count(), 4);
        g.validate().unwrap();
    }

    #[test]
    fn key_point_removal_cascades() {
        let mut g = Graph::new();
        let cs = chain(&mut g, 4, true);
        let l = g.add_loop(&cs, true).unwrap();
        let corner = g.get_curve(cs[0]).unwrap().end();
        assert!(g.remove(corner));
        assert_eq!(g.curve_count(), 2);
        assert_eq!(g.loop_curves(l).unwrap(), vec![cs[2], cs[3]]);
        assert!(!g.remove(corner));
        assert!(!g.remove(g.id()));
        g.validate().unwrap();
    }

    #[test]
    fn loop_removal_optionally_cascades() {
        let mut g = Graph::new();
        let cs = chain(&mut g, 4, true);
        let l = g.add_loop(&cs, false).unwrap();
        assert!(g.remove_loop(l, false));
        assert_eq!(g.curve_count(), 4);
        assert!(g.curves().all(|c| c.loops().count() == 0));
        let l = g.add_loop(&cs, false).unwrap();
        assert!(g.remove_loop(l, true));
        assert!(g.is_empty());
    }
}
