//! The `TileSink` contract: `FieldEvaluator` calls into a sink when
//! streaming tiles out, but never reads or interprets what the sink does
//! with them. Concrete sinks live in `sem-storage`.

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::vector::Vec3;

/// Describes one streaming evaluation's tiling, written once before any
/// tile is pushed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileManifest {
    pub low_bounds: Vec3,
    pub high_bounds: Vec3,
    pub step_size: f64,
    pub x_tiles: Vec<(usize, usize)>,
    pub y_tiles: Vec<(usize, usize)>,
    pub z_tiles: Vec<(usize, usize)>,
}

/// One x-plane's worth of velocity, spanning the full y/z range of the
/// query box for that x-slab. Row-major in `(x, y, z)` local to the slab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XPlaneTile {
    pub x_start: usize,
    pub x_end: usize,
    pub ny: usize,
    pub nz: usize,
    pub data: Vec<Vec3>,
}

impl XPlaneTile {
    pub fn get(&self, local_x: usize, iy: usize, iz: usize) -> Vec3 {
        self.data[(local_x * self.ny + iy) * self.nz + iz]
    }
}

/// Core-owned interface for streaming tile output. `begin` is called once
/// per evaluation with the manifest; `push` is called once per x-tile, in
/// increasing `x_index` order, from a single producer even when the
/// `threading` feature parallelizes the tile computation itself.
pub trait TileSink {
    fn begin(&mut self, manifest: &TileManifest) -> CoreResult<()>;
    fn push(&mut self, x_index: usize, tile: &XPlaneTile) -> CoreResult<()>;
}
