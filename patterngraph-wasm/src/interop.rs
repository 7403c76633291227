use js_sys::{Float32Array, Object, Reflect, Uint32Array, Uint8Array};
use patterngraph::Vec2;
use wasm_bindgen::JsValue;

fn new_obj() -> Object { Object::new() }

fn set_kv(obj: &Object, k: &str, v: &JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(k), v);
}

/// Plain JS object from key/value pairs, in order.
pub fn object(kv: &[(&str, JsValue)]) -> JsValue {
    let o = new_obj();
    for (k, v) in kv {
        set_kv(&o, k, v);
    }
    o.into()
}

pub fn id(id: u32) -> JsValue { JsValue::from_f64(id as f64) }

pub fn ids(slice: &[u32]) -> JsValue { Uint32Array::from(slice).into() }

pub fn floats(slice: &[f32]) -> JsValue { Float32Array::from(slice).into() }

pub fn bytes(slice: &[u8]) -> JsValue { Uint8Array::from(slice).into() }

/// Interleaved x,y pairs.
pub fn points(points: &[Vec2]) -> JsValue {
    let flat: Vec<f32> = points.iter().flat_map(|p| [p.x, p.y]).collect();
    floats(&flat)
}

/// Reads interleaved x,y pairs; `None` on an odd length.
pub fn read_points(arr: &Float32Array) -> Option<Vec<Vec2>> {
    let flat = arr.to_vec();
    if flat.len() % 2 != 0 { return None; }
    Some(flat.chunks_exact(2).map(|c| Vec2::new(c[0], c[1])).collect())
}
