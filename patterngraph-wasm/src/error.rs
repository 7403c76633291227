use crate::interop::object as fields;
use patterngraph::GraphError;
use wasm_bindgen::prelude::*;

fn num(x: impl Into<f64>) -> JsValue { JsValue::from_f64(x.into()) }

pub fn ok(v: JsValue) -> JsValue {
    fields(&[("ok", JsValue::TRUE), ("value", v)])
}

pub fn err(code: &'static str, message: impl Into<String>, data: Option<JsValue>) -> JsValue {
    let mut detail = vec![
        ("code", JsValue::from_str(code)),
        ("message", JsValue::from_str(&message.into())),
    ];
    detail.extend(data.map(|d| ("data", d)));
    fields(&[("ok", JsValue::FALSE), ("error", fields(&detail))])
}

pub fn non_finite(param: &str) -> JsValue {
    err(
        "non_finite",
        format!("{} must be a finite number", param),
        Some(fields(&[("param", JsValue::from_str(param))])),
    )
}

pub fn out_of_range(param: &str, min: f32, max: f32, got: f32) -> JsValue {
    let d = fields(&[
        ("param", JsValue::from_str(param)),
        ("min", num(min)),
        ("max", num(max)),
        ("got", num(got)),
    ]);
    err("out_of_range", format!("{} = {} is outside [{}, {}]", param, got, min, max), Some(d))
}

pub fn invalid_id(kind: &str, id: u32) -> JsValue {
    let d = fields(&[("kind", JsValue::from_str(kind)), ("id", num(id))]);
    err("invalid_id", format!("no {} with id {}", kind, id), Some(d))
}

/// Selection ops are numbered in `SelectOp` order.
pub fn invalid_mode(got: u8) -> JsValue {
    err(
        "invalid_mode",
        "select op must be 0 this, 1 union, 2 union-inverse, 3 all, 4 none or 5 inverse",
        Some(fields(&[("got", num(got))])),
    )
}

pub fn invalid_points(len: u32) -> JsValue {
    err(
        "invalid_points",
        "a curve takes 2 to 4 points as interleaved x,y",
        Some(fields(&[("len", num(len))])),
    )
}

/// Maps a graph error onto the `{ ok: false, error }` shape. Refusals keep
/// their message; the code comes from [`GraphError::code`].
pub fn graph(e: &GraphError) -> JsValue {
    match e {
        GraphError::UnknownKeyPoint(id) => invalid_id("key_point", *id),
        GraphError::UnknownCurve(id) => invalid_id("curve", *id),
        GraphError::UnknownLoop(id) => invalid_id("loop", *id),
        _ => err(
            e.code(),
            e.to_string(),
            Some(fields(&[("invariant", JsValue::from_bool(e.is_invariant()))])),
        ),
    }
}

pub fn result<T>(r: patterngraph::Result<T>, f: impl FnOnce(T) -> JsValue) -> JsValue {
    match r {
        Ok(v) => ok(f(v)),
        Err(e) => graph(&e),
    }
}
