use crate::Graph;
use crate::{error, interop};
use js_sys::{Float32Array, Uint32Array};
use patterngraph::{CurveKind, ObjectType, Pick, SelectOp, Tolerances, Vec2};
use std::collections::BTreeSet;
use wasm_bindgen::prelude::*;
type JsValue = wasm_bindgen::JsValue;

#[wasm_bindgen]
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_js<T: serde::Serialize>(v: &T) -> JsValue {
    serde_wasm_bindgen::to_value(v).unwrap_or(JsValue::NULL)
}

fn kind_code(k: CurveKind) -> u8 {
    match k {
        CurveKind::Line => 0,
        CurveKind::Quadratic => 1,
        CurveKind::Cubic => 2,
    }
}

#[wasm_bindgen]
impl Graph {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Graph {
        crate::Graph::rs_new()
    }
    pub fn with_tolerances_res(point_merge_dist: f32, curve_fitting_tol: f32, curve_sample_step: f32) -> JsValue {
        for (name, v) in [
            ("point_merge_dist", point_merge_dist),
            ("curve_fitting_tol", curve_fitting_tol),
            ("curve_sample_step", curve_sample_step),
        ] {
            if !v.is_finite() {
                return error::non_finite(name);
            }
            if v <= 0.0 {
                return error::out_of_range(name, f32::MIN_POSITIVE, f32::INFINITY, v);
            }
        }
        let tol = Tolerances { point_merge_dist, curve_fitting_tol, curve_sample_step };
        error::ok(Graph::rs_from(patterngraph::Graph::with_tolerances(tol)).into())
    }
    pub fn id(&self) -> u32 {
        self.inner.id()
    }
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    // Key points
    pub fn add_key_point(&mut self, x: f32, y: f32, is_endpoint: bool) -> u32 {
        self.inner.add_key_point(Vec2::new(x, y), is_endpoint)
    }
    pub fn add_key_point_res(&mut self, x: f32, y: f32, is_endpoint: bool) -> JsValue {
        if !x.is_finite() {
            return error::non_finite("x");
        }
        if !y.is_finite() {
            return error::non_finite("y");
        }
        error::ok(JsValue::from_f64(self.add_key_point(x, y, is_endpoint) as f64))
    }
    pub fn move_key_point_res(&mut self, id: u32, x: f32, y: f32) -> JsValue {
        if !x.is_finite() {
            return error::non_finite("x");
        }
        if !y.is_finite() {
            return error::non_finite("y");
        }
        error::result(self.inner.move_key_point(id, Vec2::new(x, y)), |_| JsValue::TRUE)
    }
    pub fn get_key_point(&self, id: u32) -> JsValue {
        match self.inner.key_point_position(id) {
            Ok(p) => to_js(&[p.x, p.y]),
            Err(_) => JsValue::NULL,
        }
    }
    pub fn key_point_count(&self) -> u32 {
        self.inner.key_point_count() as u32
    }

    // Curves
    pub fn add_curve(&mut self, points: &Float32Array) -> Option<u32> {
        let pts = interop::read_points(points)?;
        self.inner.add_curve(&pts).ok()
    }
    pub fn add_curve_res(&mut self, points: &Float32Array) -> JsValue {
        let Some(pts) = interop::read_points(points) else {
            return error::invalid_points(points.length());
        };
        if !(2..=4).contains(&pts.len()) {
            return error::invalid_points(points.length());
        }
        if pts.iter().any(|p| !p.is_finite()) {
            return error::non_finite("points");
        }
        error::result(self.inner.add_curve(&pts), interop::id)
    }
    pub fn add_curve_from_points_res(&mut self, ids: &Uint32Array) -> JsValue {
        error::result(self.inner.add_curve_from_points(&ids.to_vec()), interop::id)
    }
    pub fn curve_count(&self) -> u32 {
        self.inner.curve_count() as u32
    }
    pub fn curve_samples(&self, id: u32) -> JsValue {
        match self.inner.curve_samples(id) {
            Ok(s) => interop::points(&s),
            Err(_) => JsValue::NULL,
        }
    }
    pub fn curve_length_res(&self, id: u32) -> JsValue {
        error::result(self.inner.curve_length(id), |l| JsValue::from_f64(l as f64))
    }

    // Loops
    pub fn add_loop(&mut self, curves: &Uint32Array, bounding: bool) -> Option<u32> {
        self.inner.add_loop(&curves.to_vec(), bounding).ok()
    }
    pub fn add_loop_res(&mut self, curves: &Uint32Array, bounding: bool) -> JsValue {
        error::result(self.inner.add_loop(&curves.to_vec(), bounding), interop::id)
    }
    pub fn loop_count(&self) -> u32 {
        self.inner.loop_count() as u32
    }
    pub fn loop_curves(&self, id: u32) -> JsValue {
        match self.inner.loop_curves(id) {
            Ok(c) => interop::ids(&c),
            Err(_) => JsValue::NULL,
        }
    }
    pub fn loop_samples(&self, id: u32) -> JsValue {
        match self.inner.loop_samples(id) {
            Ok(s) => interop::points(&s),
            Err(_) => JsValue::NULL,
        }
    }
    pub fn is_loop_closed_res(&self, id: u32) -> JsValue {
        error::result(self.inner.is_loop_closed(id), JsValue::from_bool)
    }
    pub fn bounding_loop(&self) -> Option<u32> {
        self.inner.bounding_loop().ok().flatten()
    }

    // Removal
    pub fn remove(&mut self, id: u32) -> bool {
        self.inner.remove(id)
    }
    pub fn remove_res(&mut self, id: u32) -> JsValue {
        if !self.inner.contains(id) {
            return error::invalid_id("object", id);
        }
        error::ok(JsValue::from_bool(self.inner.remove(id)))
    }
    pub fn remove_loop_res(&mut self, id: u32, cascade: bool) -> JsValue {
        if self.inner.get_loop(id).is_none() {
            return error::invalid_id("loop", id);
        }
        error::ok(JsValue::from_bool(self.inner.remove_loop(id, cascade)))
    }

    // Split / merge
    pub fn split_edge_res(&mut self, curve: u32, x: f32, y: f32) -> JsValue {
        if !x.is_finite() {
            return error::non_finite("x");
        }
        if !y.is_finite() {
            return error::non_finite("y");
        }
        error::result(self.inner.split_edge(curve, Vec2::new(x, y)), |r| to_js(&r))
    }
    pub fn merge_curve_res(&mut self, c1: u32, c2: u32) -> JsValue {
        error::result(self.inner.merge_curve(c1, c2), interop::id)
    }
    pub fn merge_key_points_res(&mut self, p1: u32, p2: u32) -> JsValue {
        error::result(self.inner.merge_key_points(p1, p2), |_| JsValue::TRUE)
    }
    pub fn merge_curve_point_res(&mut self, curve: u32, point: u32) -> JsValue {
        error::result(self.inner.merge_curve_point(curve, point), |_| JsValue::TRUE)
    }
    pub fn make_graph_valid_res(&mut self) -> JsValue {
        error::result(self.inner.make_graph_valid(), |r| to_js(&r))
    }
    pub fn merge_graph_res(&mut self, other: &Graph) -> JsValue {
        error::result(self.inner.merge_graph(other.inner.clone()), |r| to_js(&r))
    }
    pub fn duplicate_res(&self) -> JsValue {
        error::result(self.inner.duplicate(), |g| Graph::rs_from(g).into())
    }

    // Selection
    pub fn select(&mut self, ids: &Uint32Array, op: u8) -> bool {
        let Some(op) = SelectOp::from_u8(op) else { return false };
        let set: BTreeSet<u32> = ids.to_vec().into_iter().collect();
        self.inner.select(&set, op)
    }
    pub fn select_res(&mut self, ids: &Uint32Array, op: u8) -> JsValue {
        if SelectOp::from_u8(op).is_none() {
            return error::invalid_mode(op);
        }
        error::ok(JsValue::from_bool(self.select(ids, op)))
    }
    pub fn highlight(&mut self, id: u32, last_id: u32) {
        self.inner.highlight(id, last_id);
    }
    pub fn get_selection(&self) -> JsValue {
        interop::object(&[
            ("key_points", interop::ids(&self.inner.selected_key_points())),
            ("curves", interop::ids(&self.inner.selected_curves())),
            ("loops", interop::ids(&self.inner.selected_loops())),
        ])
    }
    pub fn selected_curves_to_loop_res(&mut self, bounding: bool) -> JsValue {
        error::result(self.inner.selected_curves_to_loop(bounding), interop::id)
    }
    pub fn merge_selected_curves_res(&mut self) -> JsValue {
        error::result(self.inner.merge_selected_curves(), interop::id)
    }
    pub fn split_selected_curve_res(&mut self, x: f32, y: f32) -> JsValue {
        if !x.is_finite() || !y.is_finite() {
            return error::non_finite(if x.is_finite() { "y" } else { "x" });
        }
        error::result(self.inner.split_selected_curve(Vec2::new(x, y)), |r| to_js(&r))
    }
    pub fn merge_selected_key_points_res(&mut self) -> JsValue {
        error::result(self.inner.merge_selected_key_points(), |_| JsValue::TRUE)
    }
    pub fn merge_selected_key_point_to_curve_res(&mut self) -> JsValue {
        error::result(self.inner.merge_selected_key_point_to_curve(), |_| JsValue::TRUE)
    }
    pub fn remove_loops_of_selected_curves(&mut self) -> bool {
        self.inner.remove_loops_of_selected_curves()
    }

    // Picking
    pub fn pick(&self, x: f32, y: f32, tol: f32) -> JsValue {
        let Some(p) = self.inner.pick(Vec2::new(x, y), tol) else { return JsValue::NULL };
        match p {
            Pick::KeyPoint { id, dist } => interop::object(&[
                ("kind", JsValue::from_str("keypoint")),
                ("id", interop::id(id)),
                ("dist", JsValue::from_f64(dist as f64)),
            ]),
            Pick::Curve { id, t, dist } => interop::object(&[
                ("kind", JsValue::from_str("curve")),
                ("id", interop::id(id)),
                ("t", JsValue::from_f64(t as f64)),
                ("dist", JsValue::from_f64(dist as f64)),
            ]),
        }
    }
    pub fn pick_res(&self, x: f32, y: f32, tol: f32) -> JsValue {
        if !x.is_finite() {
            return error::non_finite("x");
        }
        if !y.is_finite() {
            return error::non_finite("y");
        }
        if !tol.is_finite() {
            return error::non_finite("tol");
        }
        if tol < 0.0 {
            return error::out_of_range("tol", 0.0, f32::INFINITY, tol);
        }
        error::ok(self.pick(x, y, tol))
    }
    pub fn object_type(&self, id: u32) -> JsValue {
        match self.inner.object_type(id) {
            Some(ObjectType::Graph) => JsValue::from_str("graph"),
            Some(ObjectType::KeyPoint) => JsValue::from_str("keypoint"),
            Some(ObjectType::Curve) => JsValue::from_str("curve"),
            Some(ObjectType::Loop) => JsValue::from_str("loop"),
            None => JsValue::NULL,
        }
    }

    // Typed arrays getters
    pub fn get_key_point_data(&self) -> JsValue {
        let mut ids = Vec::with_capacity(self.inner.key_point_count());
        let mut pos = Vec::with_capacity(self.inner.key_point_count());
        for p in self.inner.key_points() {
            ids.push(p.id());
            pos.push(p.position());
        }
        interop::object(&[("ids", interop::ids(&ids)), ("positions", interop::points(&pos))])
    }
    pub fn get_curve_data(&self) -> JsValue {
        let mut ids = Vec::new();
        let mut kinds = Vec::new();
        let mut key_points = Vec::new();
        for c in self.inner.curves() {
            ids.push(c.id());
            kinds.push(kind_code(c.kind()));
            key_points.extend_from_slice(c.key_points());
        }
        interop::object(&[
            ("ids", interop::ids(&ids)),
            ("kinds", interop::bytes(&kinds)),
            ("key_points", interop::ids(&key_points)),
        ])
    }
    pub fn bound(&self) -> JsValue {
        match self.inner.bound() {
            Some((x0, y0, x1, y1)) => interop::floats(&[x0, y0, x1, y1]),
            None => JsValue::NULL,
        }
    }

    // Sewings
    pub fn attach_sewing_res(&mut self, curve: u32, sewing: u32) -> JsValue {
        error::result(self.inner.attach_sewing(curve, sewing), JsValue::from_bool)
    }
    pub fn detach_sewing_res(&mut self, curve: u32, sewing: u32) -> JsValue {
        error::result(self.inner.detach_sewing(curve, sewing), JsValue::from_bool)
    }
    pub fn take_sewing_events(&mut self) -> JsValue {
        to_js(&self.inner.take_sewing_events())
    }

    // Persistence
    pub fn to_json(&self) -> JsValue {
        to_js(&self.inner.to_json_value())
    }
    pub fn from_json(&mut self, v: JsValue) -> bool {
        let Ok(val) = serde_wasm_bindgen::from_value::<serde_json::Value>(v) else { return false };
        match patterngraph::Graph::from_json_value(val) {
            Ok(g) => { self.inner = g; true }
            Err(e) => {
                web_sys::console::warn_1(&JsValue::from_str(&format!("from_json: {e}")));
                false
            }
        }
    }
    pub fn from_json_res(&mut self, v: JsValue) -> JsValue {
        match serde_wasm_bindgen::from_value::<serde_json::Value>(v) {
            Ok(val) => match patterngraph::Graph::from_json_value(val) {
                Ok(g) => {
                    self.inner = g;
                    error::ok(JsValue::TRUE)
                }
                Err(e) => error::graph(&e),
            },
            Err(e) => error::err("invalid_json", format!("{}", e), None),
        }
    }
    pub fn validate_res(&self) -> JsValue {
        error::result(self.inner.validate(), |_| JsValue::TRUE)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Graph::new()
    }
}
