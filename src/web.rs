// web.rs - Browser binding
//
// Runs the in-memory pipeline on uploaded bytes and exposes the heightmap
// to JS as a flat f32 buffer (row-major, width * height).

use wasm_bindgen::prelude::*;

use crate::codec::SourceFormat;
use crate::heightmap::HeightmapGrid;
use crate::pipeline::{Config, Pipeline};

#[wasm_bindgen]
pub struct HeightmapView {
    w: u32,
    h: u32,
    out: Vec<f32>,
}

#[wasm_bindgen]
impl HeightmapView {
    /// `extension` is the file suffix without the dot ("png", "TGA", ...).
    #[wasm_bindgen(constructor)]
    pub fn new(bytes: &[u8], extension: &str, passes: u32) -> Result<HeightmapView, JsValue> {
        Self::build(bytes, extension, passes).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn width(&self) -> u32 { self.w }
    pub fn height(&self) -> u32 { self.h }
    pub fn output_ptr(&self) -> *const f32 { self.out.as_ptr() }
    pub fn output_len(&self) -> usize { self.out.len() }

    /// Height at (x, y), 0 outside the grid.
    pub fn get(&self, x: u32, y: u32) -> f32 {
        if x >= self.w || y >= self.h { return 0.0; }
        self.out[(y * self.w + x) as usize]
    }
}

impl HeightmapView {
    fn build(bytes: &[u8], extension: &str, passes: u32) -> crate::Result<Self> {
        let format = SourceFormat::from_extension(extension)?;
        let config = Config { smoothing_passes: passes, ..Config::default() };
        let grid = Pipeline::new(config).load_bytes(bytes, format)?;
        Ok(Self::from_grid(grid))
    }

    fn from_grid(grid: HeightmapGrid) -> Self {
        let (w, h) = (grid.width() as u32, grid.height() as u32);
        Self { w, h, out: grid.into_vec() }
    }
}
