use crate::algorithms::construct::LoopMode;
use crate::error::{GraphError, Result};
use crate::geometry::limits;
use crate::loops::{chain_ends, chain_orientation};
use crate::model::Curve;
use crate::object::{reserve_id, ObjectId};
use crate::sewing::SewingId;
use crate::{Graph, Tolerances, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
enum PointDoc {
    KeyPoint {
        id: ObjectId,
        #[serde(default)]
        selected: bool,
        x: f32,
        y: f32,
    },
}

#[derive(Serialize, Deserialize)]
struct CurveBody {
    id: ObjectId,
    #[serde(default)]
    selected: bool,
    #[serde(rename = "key-points")]
    key_points: Vec<ObjectId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    sewings: Vec<SewingId>,
}

// the tag names the curve kind; the point count must agree with it
#[derive(Serialize, Deserialize)]
enum CurveDoc {
    Line(CurveBody),
    Quadratic(CurveBody),
    Cubic(CurveBody),
}

impl CurveDoc {
    fn body(&self) -> &CurveBody {
        match self {
            CurveDoc::Line(b) | CurveDoc::Quadratic(b) | CurveDoc::Cubic(b) => b,
        }
    }
    fn expected_points(&self) -> usize {
        match self {
            CurveDoc::Line(_) => 2,
            CurveDoc::Quadratic(_) => 3,
            CurveDoc::Cubic(_) => 4,
        }
    }
}

#[derive(Serialize, Deserialize)]
enum LoopDoc {
    Loop {
        id: ObjectId,
        #[serde(default)]
        selected: bool,
        #[serde(default)]
        bounding: bool,
        curves: Vec<ObjectId>,
    },
}

#[derive(Serialize, Deserialize)]
struct GraphDoc {
    version: u32,
    id: ObjectId,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    selected: bool,
    #[serde(default)]
    tolerances: Tolerances,
    #[serde(rename = "key-points", default)]
    key_points: Vec<PointDoc>,
    #[serde(default)]
    curves: Vec<CurveDoc>,
    #[serde(default)]
    loops: Vec<LoopDoc>,
}

pub fn to_json_impl(g: &Graph) -> Value {
    let key_points = g
        .points
        .values()
        .map(|p| PointDoc::KeyPoint {
            id: p.id,
            selected: p.flags.selected,
            x: p.position.x,
            y: p.position.y,
        })
        .collect();
    let curves = g
        .curves
        .values()
        .map(|c| {
            let body = CurveBody {
                id: c.id,
                selected: c.flags.selected,
                key_points: c.points.clone(),
                sewings: c.sewings.iter().copied().collect(),
            };
            match c.kind {
                crate::CurveKind::Line => CurveDoc::Line(body),
                crate::CurveKind::Quadratic => CurveDoc::Quadratic(body),
                crate::CurveKind::Cubic => CurveDoc::Cubic(body),
            }
        })
        .collect();
    let loops = g
        .loops
        .values()
        .map(|l| LoopDoc::Loop {
            id: l.id,
            selected: l.flags.selected,
            bounding: l.bounding,
            curves: l.curve_ids(&g.curves),
        })
        .collect();
    let doc = GraphDoc {
        version: FORMAT_VERSION,
        id: g.id,
        kind: "Graph".into(),
        selected: g.flags.selected,
        tolerances: g.tol,
        key_points,
        curves,
        loops,
    };
    match serde_json::to_value(doc) {
        Ok(v) => v,
        Err(err) => {
            warn!(graph = g.id, %err, "graph document did not serialize");
            Value::Null
        }
    }
}

fn check_limits(doc: &GraphDoc) -> Result<()> {
    if doc.key_points.len() > limits::MAX_KEY_POINTS {
        return Err(GraphError::Limits(format!("key-points>{}", limits::MAX_KEY_POINTS)));
    }
    if doc.curves.len() > limits::MAX_CURVES {
        return Err(GraphError::Limits(format!("curves>{}", limits::MAX_CURVES)));
    }
    if doc.loops.len() > limits::MAX_LOOPS {
        return Err(GraphError::Limits(format!("loops>{}", limits::MAX_LOOPS)));
    }
    for PointDoc::KeyPoint { x, y, .. } in &doc.key_points {
        if !limits::in_coord_bounds(*x) || !limits::in_coord_bounds(*y) {
            return Err(GraphError::Limits("key point coordinate".into()));
        }
    }
    for LoopDoc::Loop { curves, .. } in &doc.loops {
        if curves.len() > limits::MAX_LOOP_CURVES {
            return Err(GraphError::Limits(format!(
                "loop curves>{}",
                limits::MAX_LOOP_CURVES
            )));
        }
    }
    let t = &doc.tolerances;
    let tol_ok = [t.point_merge_dist, t.curve_fitting_tol, t.curve_sample_step]
        .iter()
        .all(|v| v.is_finite() && *v > 0.0);
    if !tol_ok {
        return Err(GraphError::Limits("tolerances must be positive".into()));
    }
    Ok(())
}

// an id may repeat within one kind (the first entity wins) but never across
// kinds
fn check_ids(doc: &GraphDoc) -> Result<()> {
    let mut owner: HashMap<ObjectId, &'static str> = HashMap::new();
    owner.insert(doc.id, "graph");
    let points = doc.key_points.iter().map(|PointDoc::KeyPoint { id, .. }| (*id, "key point"));
    let curves = doc.curves.iter().map(|c| (c.body().id, "curve"));
    let loops = doc.loops.iter().map(|LoopDoc::Loop { id, .. }| (*id, "loop"));
    for (id, kind) in points.chain(curves).chain(loops) {
        match owner.insert(id, kind) {
            Some(prev) if prev != kind => {
                return Err(GraphError::Json(format!("id {id} names both a {prev} and a {kind}")))
            }
            _ => {}
        }
    }
    Ok(())
}

// Split loop members into head-to-tail runs, in document order. A run that
// ends where the first one starts is joined onto it, so a closed loop with
// one curve missing comes back as a single open chain.
fn connected_runs(g: &Graph, members: &[ObjectId]) -> Vec<Vec<ObjectId>> {
    let connects = |run: &[ObjectId]| {
        let chain: Vec<&Curve> = run.iter().filter_map(|c| g.curves.get(c)).collect();
        chain_orientation(&chain).is_ok()
    };
    let mut runs: Vec<Vec<ObjectId>> = Vec::new();
    for &c in members {
        let extends = runs
            .last()
            .map_or(false, |run| connects(&[run.as_slice(), &[c][..]].concat()));
        match runs.last_mut() {
            Some(run) if extends => run.push(c),
            _ => runs.push(vec![c]),
        }
    }
    if runs.len() > 1 {
        let joined = [runs[runs.len() - 1].as_slice(), runs[0].as_slice()].concat();
        if connects(&joined) {
            runs.pop();
            runs[0] = joined;
        }
    }
    runs
}

/// Build a fresh graph from a document. Dangling references are skipped
/// with a warning; structural errors abort the load.
pub fn from_json_impl(v: Value) -> Result<Graph> {
    let doc: GraphDoc = serde_json::from_value(v).map_err(|e| GraphError::Json(e.to_string()))?;
    if doc.kind != "Graph" {
        return Err(GraphError::Json(format!("expected type Graph, got {}", doc.kind)));
    }
    if doc.version > FORMAT_VERSION {
        return Err(GraphError::Json(format!("unsupported version {}", doc.version)));
    }
    check_limits(&doc)?;
    check_ids(&doc)?;

    let mut g = Graph::with_tolerances(doc.tolerances);
    reserve_id(doc.id);
    g.id = doc.id;
    g.flags.selected = doc.selected;

    for PointDoc::KeyPoint { id, selected, x, y } in &doc.key_points {
        let id = g.insert_key_point(*id, Vec2::new(*x, *y))?;
        if let Some(p) = g.points.get_mut(&id) {
            p.flags.selected = *selected;
        }
    }

    // document curve id -> curve actually holding those end points
    let mut curve_ids: HashMap<ObjectId, ObjectId> = HashMap::new();
    for cd in &doc.curves {
        let body = cd.body();
        if body.key_points.len() != cd.expected_points() {
            return Err(GraphError::Json(format!(
                "curve {} has {} key points",
                body.id,
                body.key_points.len()
            )));
        }
        if let Some(missing) = body.key_points.iter().find(|p| !g.points.contains_key(*p)) {
            warn!(curve = body.id, point = missing, "skipping curve with unknown key point");
            continue;
        }
        let id = g.insert_curve(body.id, &body.key_points)?;
        if let Some(c) = g.curves.get_mut(&id) {
            c.flags.selected |= body.selected;
            c.sewings.extend(body.sewings.iter().copied());
        }
        curve_ids.insert(body.id, id);
    }

    for LoopDoc::Loop { id, selected, bounding, curves } in &doc.loops {
        let mut members = Vec::with_capacity(curves.len());
        for c in curves {
            match curve_ids.get(c) {
                Some(m) if !members.contains(m) => members.push(*m),
                Some(_) => {}
                None => warn!(loop_id = id, curve = c, "loop references unknown curve"),
            }
        }
        if members.is_empty() {
            warn!(loop_id = id, "skipping empty loop");
            continue;
        }
        let runs = connected_runs(&g, &members);
        if runs.len() > 1 {
            warn!(loop_id = id, runs = runs.len(), "loop is broken; loading its connected runs");
        }
        for (k, run) in runs.iter().enumerate() {
            let closed = {
                let chain: Vec<&Curve> = run.iter().filter_map(|c| g.curves.get(c)).collect();
                run.len() > 1
                    && chain_orientation(&chain)
                        .ok()
                        .and_then(|rev| chain_ends(&chain, &rev))
                        .map_or(false, |(a, b)| a == b)
            };
            if *bounding && !closed {
                warn!(loop_id = id, "bounding loop is no longer closed; dropping the flag");
            }
            let lid = if k == 0 { Some(*id) } else { None };
            let lid = g.add_loop_impl(run, *bounding && closed, lid, LoopMode::Preserve)?;
            if let Some(l) = g.loops.get_mut(&lid) {
                l.flags.selected = *selected;
            }
        }
    }

    if g.bounding_loop()?.is_none() {
        let closed: Vec<ObjectId> = g
            .loops
            .values()
            .filter(|l| l.is_closed(&g.curves))
            .map(|l| l.id)
            .collect();
        if let [only] = closed[..] {
            if let Some(l) = g.loops.get_mut(&only) {
                l.bounding = true;
            }
        }
    }
    g.update_bound();
    info!(
        points = g.points.len(),
        curves = g.curves.len(),
        loops = g.loops.len(),
        "graph loaded"
    );
    Ok(g)
}

impl Graph {
    pub fn to_json_value(&self) -> Value {
        to_json_impl(self)
    }

    pub fn to_json_string(&self) -> String {
        self.to_json_value().to_string()
    }

    pub fn from_json_value(v: Value) -> Result<Graph> {
        from_json_impl(v)
    }

    pub fn from_json_str(s: &str) -> Result<Graph> {
        let v: Value = serde_json::from_str(s).map_err(|e| GraphError::Json(e.to_string()))?;
        from_json_impl(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    #[test]
    fn document_layout() {
        let mut g = Graph::new();
        let a = g.add_curve(&[v(0.0, 0.0), v(1.0, 0.0)]).unwrap();
        let b = g.add_curve(&[v(1.0, 0.0), v(1.5, 1.0), v(0.0, 0.0)]).unwrap();
        let l = g.add_loop(&[a, b], true).unwrap();
        let doc = g.to_json_value();
        assert_eq!(doc["type"], "Graph");
        assert_eq!(doc["version"], FORMAT_VERSION);
        assert_eq!(doc["key-points"].as_array().unwrap().len(), 3);
        assert!(doc["key-points"][0]["KeyPoint"]["x"].is_number());
        assert_eq!(doc["curves"][0]["Line"]["id"], a);
        assert_eq!(doc["curves"][1]["Quadratic"]["key-points"].as_array().unwrap().len(), 3);
        assert_eq!(doc["loops"][0]["Loop"]["id"], l);
        assert_eq!(doc["loops"][0]["Loop"]["bounding"], true);
    }

    #[test]
    fn round_trip_keeps_ids_and_order() {
        let mut g = Graph::new();
        let p = [v(0.0, 0.0), v(2.0, 0.0), v(2.0, 1.0), v(0.0, 1.0)];
        let cs: Vec<ObjectId> = (0..4).map(|i| g.add_curve(&[p[i], p[(i + 1) % 4]]).unwrap()).collect();
        let l = g.add_loop(&[cs[0], cs[3], cs[2], cs[1]], false).unwrap();
        g.select_one(cs[1], crate::SelectOp::This);
        g.attach_sewing(cs[2], 42).unwrap();

        let back = Graph::from_json_str(&g.to_json_string()).unwrap();
        assert_eq!(back.id(), g.id());
        assert_eq!(back.loop_curves(l).unwrap(), g.loop_curves(l).unwrap());
        assert!(back.get_curve(cs[1]).unwrap().is_selected());
        assert_eq!(back.get_curve(cs[2]).unwrap().sewings().collect::<Vec<_>>(), vec![42]);
        // the only closed loop becomes bounding
        assert_eq!(back.bounding_loop(), Ok(Some(l)));
        assert_eq!(back.bound(), Some((0.0, 0.0, 2.0, 1.0)));
        back.validate().unwrap();
    }

    #[test]
    fn dangling_references_are_skipped() {
        let doc = json!({
            "version": 1, "id": 9000, "type": "Graph",
            "key-points": [
                {"KeyPoint": {"id": 9001, "x": 0.0, "y": 0.0}},
                {"KeyPoint": {"id": 9002, "x": 1.0, "y": 0.0}}
            ],
            "curves": [
                {"Line": {"id": 9010, "key-points": [9001, 9002]}},
                {"Line": {"id": 9011, "key-points": [9002, 9999]}}
            ],
            "loops": [{"Loop": {"id": 9020, "curves": [9010, 9011]}}]
        });
        let g = Graph::from_json_value(doc).unwrap();
        assert_eq!(g.curve_count(), 1);
        assert_eq!(g.loop_curves(9020).unwrap(), vec![9010]);
        assert_eq!(g.bounding_loop(), Ok(None));
    }

    fn line_doc(id: ObjectId, a: ObjectId, b: ObjectId) -> Value {
        json!({"Line": {"id": id, "key-points": [a, b]}})
    }

    #[test]
    fn closed_loop_with_a_gap_loads_as_one_open_chain() {
        let doc = json!({
            "version": 1, "id": 7000, "type": "Graph",
            "key-points": [
                {"KeyPoint": {"id": 7001, "x": 0.0, "y": 0.0}},
                {"KeyPoint": {"id": 7002, "x": 1.0, "y": 0.0}},
                {"KeyPoint": {"id": 7003, "x": 1.0, "y": 1.0}},
                {"KeyPoint": {"id": 7004, "x": 0.0, "y": 1.0}}
            ],
            "curves": [
                line_doc(7011, 7001, 7002),
                line_doc(7012, 7002, 7003),
                line_doc(7013, 7003, 7999),
                line_doc(7014, 7004, 7001)
            ],
            "loops": [{"Loop": {"id": 7020, "bounding": true, "curves": [7011, 7012, 7013, 7014]}}]
        });
        let g = Graph::from_json_value(doc).unwrap();
        assert_eq!(g.loop_count(), 1);
        assert_eq!(g.loop_curves(7020).unwrap(), vec![7014, 7011, 7012]);
        assert!(!g.is_loop_closed(7020).unwrap());
        assert_eq!(g.bounding_loop(), Ok(None));
        g.validate().unwrap();
    }

    #[test]
    fn open_chain_with_a_gap_loads_as_two_chains() {
        let points: Vec<Value> = (0..6)
            .map(|i| json!({"KeyPoint": {"id": 7101 + i, "x": i as f32, "y": 0.0}}))
            .collect();
        let doc = json!({
            "version": 1, "id": 7100, "type": "Graph",
            "key-points": points,
            "curves": [
                line_doc(7111, 7101, 7102),
                line_doc(7112, 7102, 7103),
                line_doc(7113, 7103, 7999),
                line_doc(7114, 7104, 7105),
                line_doc(7115, 7105, 7106)
            ],
            "loops": [{"Loop": {"id": 7120, "curves": [7111, 7112, 7113, 7114, 7115]}}]
        });
        let g = Graph::from_json_value(doc).unwrap();
        assert_eq!(g.loop_count(), 2);
        assert_eq!(g.loop_curves(7120).unwrap(), vec![7111, 7112]);
        let tail = g.loops().map(|l| l.id()).find(|l| *l != 7120).unwrap();
        assert_eq!(g.loop_curves(tail).unwrap(), vec![7114, 7115]);
        g.validate().unwrap();
    }

    #[test]
    fn ids_shared_across_kinds_are_refused() {
        let doc = json!({
            "version": 1, "id": 8000, "type": "Graph",
            "key-points": [
                {"KeyPoint": {"id": 8001, "x": 0.0, "y": 0.0}},
                {"KeyPoint": {"id": 8002, "x": 1.0, "y": 0.0}}
            ],
            "curves": [line_doc(8001, 8001, 8002)]
        });
        assert!(matches!(Graph::from_json_value(doc), Err(GraphError::Json(_))));
        let graph_id_reused = json!({
            "version": 1, "id": 8100, "type": "Graph",
            "key-points": [{"KeyPoint": {"id": 8100, "x": 0.0, "y": 0.0}}]
        });
        assert!(matches!(Graph::from_json_value(graph_id_reused), Err(GraphError::Json(_))));
    }

    #[test]
    fn rejects_bad_documents() {
        assert!(matches!(Graph::from_json_str("{"), Err(GraphError::Json(_))));
        let wrong_type = json!({"version": 1, "id": 1, "type": "Loop"});
        assert!(matches!(Graph::from_json_value(wrong_type), Err(GraphError::Json(_))));
        let bad_count = json!({
            "version": 1, "id": 9100, "type": "Graph",
            "key-points": [
                {"KeyPoint": {"id": 9101, "x": 0.0, "y": 0.0}},
                {"KeyPoint": {"id": 9102, "x": 1.0, "y": 0.0}}
            ],
            "curves": [{"Cubic": {"id": 9110, "key-points": [9101, 9102]}}]
        });
        assert!(matches!(Graph::from_json_value(bad_count), Err(GraphError::Json(_))));
        let far = json!({
            "version": 1, "id": 9200, "type": "Graph",
            "key-points": [{"KeyPoint": {"id": 9201, "x": 1.0e9, "y": 0.0}}]
        });
        assert!(matches!(Graph::from_json_value(far), Err(GraphError::Limits(_))));
    }
}
