//! Fused scalar-loop evaluation of a tile's velocity fluctuations (spec
//! §4.5, "broadcasting shape discipline"). A naive broadcast would
//! materialize an `Nx·Ny·Nz·M·3` tensor; this instead reduces over the
//! candidate eddies `m` in a scalar inner loop per grid node.

use crate::error::{CoreError, CoreResult};
use crate::shapes::Shape;
use crate::vector::Vec3;
use crate::wrap::WrapCandidate;

pub struct TileEvaluator;

impl TileEvaluator {
    /// Upper bound on the number of grid nodes accepted in one tile. Guards
    /// against a misconfigured `chunk_size`/`step_size` silently demanding
    /// an unbounded buffer.
    pub const MAX_TILE_NODES: usize = 8_000_000;

    /// Evaluate the velocity fluctuation at every node of the tile formed
    /// by the cartesian product of `x`, `y`, `z`, against `candidates`.
    /// Row-major in `(x, y, z)`, matching [`Self::index`].
    pub fn eval(
        candidates: &[WrapCandidate],
        shape: Shape,
        x: &[f64],
        y: &[f64],
        z: &[f64],
    ) -> CoreResult<Vec<Vec3>> {
        let (nx, ny, nz) = (x.len(), y.len(), z.len());
        let total = nx
            .checked_mul(ny)
            .and_then(|v| v.checked_mul(nz))
            .ok_or_else(|| Self::too_large(nx, ny, nz))?;
        if total > Self::MAX_TILE_NODES {
            return Err(Self::too_large(nx, ny, nz));
        }

        let mut out = vec![Vec3::ZERO; total];
        for (ix, &px) in x.iter().enumerate() {
            for (iy, &py) in y.iter().enumerate() {
                for (iz, &pz) in z.iter().enumerate() {
                    let mut acc = Vec3::ZERO;
                    for c in candidates {
                        let r = Vec3::new(
                            (px - c.center.x) / c.sigma,
                            (py - c.center.y) / c.sigma,
                            (pz - c.center.z) / c.sigma,
                        );
                        let d_hat = r.length();
                        let q = shape.eval(d_hat, c.sigma);
                        if q != 0.0 {
                            acc = acc + r.cross(c.alpha) * q;
                        }
                    }
                    out[Self::index(ix, iy, iz, ny, nz)] = acc;
                }
            }
        }
        Ok(out)
    }

    #[inline]
    pub fn index(ix: usize, iy: usize, iz: usize, ny: usize, nz: usize) -> usize {
        (ix * ny + iy) * nz + iz
    }

    fn too_large(nx: usize, ny: usize, nz: usize) -> CoreError {
        CoreError::OutOfMemory {
            reason: format!(
                "tile of {nx}x{ny}x{nz} nodes exceeds the {}-node limit",
                Self::MAX_TILE_NODES
            ),
            hint: "reduce chunk_size or increase step_size".into(),
        }
    }
}
