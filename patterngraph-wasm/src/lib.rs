use wasm_bindgen::prelude::*;
mod api;
mod error;
mod interop;

#[wasm_bindgen]
pub struct Graph { pub(crate) inner: patterngraph::Graph }

impl Graph {
    pub fn rs_new() -> Graph { Graph { inner: patterngraph::Graph::new() } }
    pub fn rs_from(inner: patterngraph::Graph) -> Graph { Graph { inner } }
    pub fn rs_inner(&self) -> &patterngraph::Graph { &self.inner }
}
