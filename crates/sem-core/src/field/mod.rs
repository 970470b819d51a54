//! `FieldEvaluator`: orchestrates tiling over a query box, driving
//! [`WrapResolver`] and [`TileEvaluator`] and assembling or streaming the
//! result.

pub mod sink;

use crate::error::{CoreError, CoreResult};
use crate::population::EddyPopulation;
use crate::shapes::Shape;
use crate::tile::TileEvaluator;
use crate::vector::Vec3;
use crate::wrap::{WrapCandidate, WrapResolver, CUTOFF_MARGIN};

pub use sink::{TileManifest, TileSink, XPlaneTile};

const STEP_EPS: f64 = 1e-9;
const BOUNDS_EPS: f64 = 1e-9;

/// The active shape, its cut-off, and optional thread count — carried
/// explicitly into `sum_vel_mesh` instead of read from process-wide state.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext {
    pub shape: Shape,
    /// `None` leaves parallelism to the ambient `rayon` pool (or runs
    /// sequentially without the `threading` feature); `Some(n)` requests a
    /// scoped pool of `n` threads for one `sum_vel_mesh` call.
    pub threads: Option<usize>,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        EvaluationContext { shape: Shape::default(), threads: None }
    }
}

/// A dense, owned `[Nx, Ny, Nz, 3]` velocity field in row-major `(x, y, z)`
/// order.
#[derive(Debug, Clone)]
pub struct Tensor4 {
    pub dims: (usize, usize, usize),
    pub data: Vec<Vec3>,
}

impl Tensor4 {
    pub fn get(&self, ix: usize, iy: usize, iz: usize) -> Vec3 {
        self.data[TileEvaluator::index(ix, iy, iz, self.dims.1, self.dims.2)]
    }
}

pub struct FieldEvaluator;

impl FieldEvaluator {
    /// Evaluate the velocity field over `[low, high]` at `time`, tiling the
    /// box with the given `step`/`chunk`, optionally assembling the full
    /// tensor and/or streaming per-x-plane tiles to `sink`.
    #[allow(clippy::too_many_arguments)]
    pub fn sum_vel_mesh(
        population: &EddyPopulation,
        ctx: &EvaluationContext,
        low: Vec3,
        high: Vec3,
        step: f64,
        chunk: usize,
        time: f64,
        return_tensor: bool,
        mut sink: Option<&mut dyn TileSink>,
        cancel: Option<&dyn Fn() -> bool>,
    ) -> CoreResult<Option<Tensor4>> {
        Self::validate(population, low, high, step, time)?;

        let x_coords = Self::step_coords(low.x, high.x, step);
        let y_coords = Self::step_coords(low.y, high.y, step);
        let z_coords = Self::step_coords(low.z, high.z, step);
        let (nx, ny, nz) = (x_coords.len(), y_coords.len(), z_coords.len());

        let x_tiles = Self::chunk_ranges(nx, chunk);
        let y_tiles = Self::chunk_ranges(ny, chunk);
        let z_tiles = Self::chunk_ranges(nz, chunk);

        if let Some(sink) = sink.as_deref_mut() {
            sink.begin(&TileManifest {
                low_bounds: low,
                high_bounds: high,
                step_size: step,
                x_tiles: x_tiles.clone(),
                y_tiles: y_tiles.clone(),
                z_tiles: z_tiles.clone(),
            })?;
        }

        let candidates = WrapResolver::resolve(population, ctx.shape, time, low, high);
        let margins: Vec<f64> = candidates
            .iter()
            .map(|c| c.sigma * (1.0 + CUTOFF_MARGIN) * ctx.shape.cutoff())
            .collect();

        let mut tensor = return_tensor.then(|| Tensor4 {
            dims: (nx, ny, nz),
            data: vec![Vec3::new(population.avg_vel(), 0.0, 0.0); nx * ny * nz],
        });

        let planes = Self::compute_planes(
            &candidates,
            &margins,
            ctx,
            &x_coords,
            &y_coords,
            &z_coords,
            &x_tiles,
            &y_tiles,
            &z_tiles,
            population.avg_vel(),
            cancel,
        )?;

        for (xi, (x0, _x1)) in x_tiles.iter().enumerate() {
            let plane = &planes[xi];
            if let Some(tensor) = tensor.as_mut() {
                for local_x in 0..(plane.x_end - plane.x_start + 1) {
                    for iy in 0..ny {
                        for iz in 0..nz {
                            let idx = TileEvaluator::index(x0 + local_x, iy, iz, ny, nz);
                            tensor.data[idx] = plane.get(local_x, iy, iz);
                        }
                    }
                }
            }
            if let Some(sink) = sink.as_deref_mut() {
                sink.push(xi, plane)?;
            }
        }

        Ok(tensor)
    }

    #[cfg(not(feature = "threading"))]
    #[allow(clippy::too_many_arguments)]
    fn compute_planes(
        candidates: &[WrapCandidate],
        margins: &[f64],
        ctx: &EvaluationContext,
        x_coords: &[f64],
        y_coords: &[f64],
        z_coords: &[f64],
        x_tiles: &[(usize, usize)],
        y_tiles: &[(usize, usize)],
        z_tiles: &[(usize, usize)],
        avg_vel: f64,
        cancel: Option<&dyn Fn() -> bool>,
    ) -> CoreResult<Vec<XPlaneTile>> {
        let mut planes = Vec::with_capacity(x_tiles.len());
        for &x_range in x_tiles {
            if let Some(cancel) = cancel {
                if cancel() {
                    return Err(CoreError::Cancelled);
                }
            }
            planes.push(Self::eval_x_plane(
                candidates, margins, ctx.shape, x_coords, y_coords, z_coords, x_range, y_tiles,
                z_tiles, avg_vel,
            )?);
        }
        Ok(planes)
    }

    #[cfg(feature = "threading")]
    #[allow(clippy::too_many_arguments)]
    fn compute_planes(
        candidates: &[WrapCandidate],
        margins: &[f64],
        ctx: &EvaluationContext,
        x_coords: &[f64],
        y_coords: &[f64],
        z_coords: &[f64],
        x_tiles: &[(usize, usize)],
        y_tiles: &[(usize, usize)],
        z_tiles: &[(usize, usize)],
        avg_vel: f64,
        cancel: Option<&dyn Fn() -> bool>,
    ) -> CoreResult<Vec<XPlaneTile>> {
        use rayon::prelude::*;

        if let Some(cancel) = cancel {
            if cancel() {
                return Err(CoreError::Cancelled);
            }
        }

        let build = || -> CoreResult<Vec<XPlaneTile>> {
            x_tiles
                .par_iter()
                .map(|&x_range| {
                    Self::eval_x_plane(
                        candidates, margins, ctx.shape, x_coords, y_coords, z_coords, x_range,
                        y_tiles, z_tiles, avg_vel,
                    )
                })
                .collect()
        };

        match ctx.threads {
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| CoreError::InvalidConfig(format!("could not build thread pool: {e}")))?;
                pool.install(build)
            }
            None => build(),
        }
    }

    /// Evaluate one x-slab: the full `[x0,x1] × [0,Ny) × [0,Nz)` plane,
    /// filtering the eddy candidates progressively through x, y, then z
    /// tiles so each `TileEvaluator::eval` call sees the minimal subset.
    #[allow(clippy::too_many_arguments)]
    fn eval_x_plane(
        candidates: &[WrapCandidate],
        margins: &[f64],
        shape: Shape,
        x_coords: &[f64],
        y_coords: &[f64],
        z_coords: &[f64],
        x_range: (usize, usize),
        y_tiles: &[(usize, usize)],
        z_tiles: &[(usize, usize)],
        avg_vel: f64,
    ) -> CoreResult<XPlaneTile> {
        let (x0, x1) = x_range;
        let ny = y_coords.len();
        let nz = z_coords.len();
        let mut plane = XPlaneTile {
            x_start: x0,
            x_end: x1,
            ny,
            nz,
            data: vec![Vec3::new(avg_vel, 0.0, 0.0); (x1 - x0 + 1) * ny * nz],
        };

        let pairs: Vec<(WrapCandidate, f64)> =
            candidates.iter().copied().zip(margins.iter().copied()).collect();
        let stage_x: Vec<(WrapCandidate, f64)> = pairs
            .into_iter()
            .filter(|(c, m)| Self::within_margin(c.center.x, *m, x_coords[x0], x_coords[x1]))
            .collect();

        for &(y0, y1) in y_tiles {
            let stage_y: Vec<(WrapCandidate, f64)> = stage_x
                .iter()
                .copied()
                .filter(|(c, m)| Self::within_margin(c.center.y, *m, y_coords[y0], y_coords[y1]))
                .collect();

            for &(z0, z1) in z_tiles {
                let cz: Vec<WrapCandidate> = stage_y
                    .iter()
                    .copied()
                    .filter(|(c, m)| Self::within_margin(c.center.z, *m, z_coords[z0], z_coords[z1]))
                    .map(|(c, _)| c)
                    .collect();

                let tile = TileEvaluator::eval(
                    &cz,
                    shape,
                    &x_coords[x0..=x1],
                    &y_coords[y0..=y1],
                    &z_coords[z0..=z1],
                )?;

                for (local_x, _) in x_coords[x0..=x1].iter().enumerate() {
                    for (local_y, iy) in (y0..=y1).enumerate() {
                        for (local_z, iz) in (z0..=z1).enumerate() {
                            let src = TileEvaluator::index(
                                local_x,
                                local_y,
                                local_z,
                                y1 - y0 + 1,
                                z1 - z0 + 1,
                            );
                            let dst = (local_x * ny + iy) * nz + iz;
                            plane.data[dst] = plane.data[dst] + tile[src];
                        }
                    }
                }
            }
        }

        Ok(plane)
    }

    fn within_margin(v: f64, margin: f64, lo: f64, hi: f64) -> bool {
        v > lo - margin && v < hi + margin
    }

    fn validate(population: &EddyPopulation, low: Vec3, high: Vec3, step: f64, time: f64) -> CoreResult<()> {
        for v in [low.x, low.y, low.z, high.x, high.y, high.z, step, time] {
            if !v.is_finite() {
                return Err(CoreError::InvalidQuery(
                    "bounds, step size, and time must all be finite".into(),
                ));
            }
        }
        if low.x > high.x || low.y > high.y || low.z > high.z {
            return Err(CoreError::InvalidQuery("low bounds must not exceed high bounds".into()));
        }
        if step <= 0.0 {
            return Err(CoreError::InvalidQuery("step size must be positive".into()));
        }
        if time < 0.0 {
            return Err(CoreError::InvalidQuery("time must be non-negative".into()));
        }

        let dims = population.dims();
        let domain_low = Vec3::new(-dims.x / 2.0, -dims.y / 2.0, -dims.z / 2.0);
        let domain_high = Vec3::new(dims.x / 2.0, dims.y / 2.0, dims.z / 2.0);
        if low.x < domain_low.x - BOUNDS_EPS
            || low.y < domain_low.y - BOUNDS_EPS
            || low.z < domain_low.z - BOUNDS_EPS
            || high.x > domain_high.x + BOUNDS_EPS
            || high.y > domain_high.y + BOUNDS_EPS
            || high.z > domain_high.z + BOUNDS_EPS
        {
            return Err(CoreError::InvalidQuery("query box must lie within the domain bounds".into()));
        }
        Ok(())
    }

    /// `low + step·k` for increasing `k` while the result is `≤ high + ε`,
    /// dropping the final sample if it overshoots `high`.
    fn step_coords(low: f64, high: f64, step: f64) -> Vec<f64> {
        let mut coords = Vec::new();
        let mut k = 0usize;
        loop {
            let c = low + step * k as f64;
            if c > high + STEP_EPS {
                break;
            }
            coords.push(c);
            k += 1;
        }
        if let Some(&last) = coords.last() {
            if last > high {
                coords.pop();
            }
        }
        coords
    }

    /// Partition `[0, n)` into contiguous index ranges of length `chunk`,
    /// merging a trailing singleton range into its predecessor, and
    /// collapsing to one range covering the whole axis when `chunk == 0`
    /// or `chunk >= n`.
    fn chunk_ranges(n: usize, chunk: usize) -> Vec<(usize, usize)> {
        if n == 0 {
            return Vec::new();
        }
        if chunk == 0 || chunk >= n {
            return vec![(0, n - 1)];
        }
        let mut ranges = Vec::new();
        let mut start = 0;
        while start < n {
            let end = (start + chunk - 1).min(n - 1);
            ranges.push((start, end));
            start = end + 1;
        }
        if ranges.len() > 1 {
            let (last_start, last_end) = *ranges.last().unwrap();
            if last_end == last_start {
                ranges.pop();
                let prev = ranges.last_mut().unwrap();
                prev.1 = last_end;
            }
        }
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{EddyVariant, Profile};

    fn tiny_population(dims: Vec3, avg_vel: f64) -> EddyPopulation {
        let profile = Profile::new(
            vec![EddyVariant { density: 2.0 / (dims.x * dims.y * dims.z), length_scale: 0.1, intensity: 1.0 }],
            serde_json::Value::Null,
        )
        .unwrap();
        EddyPopulation::build(&profile, dims, avg_vel, 4).unwrap()
    }

    #[test]
    fn step_coords_starts_at_low_and_stays_within_high() {
        let coords = FieldEvaluator::step_coords(-1.0, 1.0, 0.5);
        assert_eq!(coords.first().copied(), Some(-1.0));
        assert!(coords.last().copied().unwrap() <= 1.0 + 1e-9);
    }

    #[test]
    fn chunk_ranges_merges_trailing_singleton() {
        let ranges = FieldEvaluator::chunk_ranges(6, 5);
        assert_eq!(ranges, vec![(0, 5)], "a trailing 1-index chunk must merge back");
    }

    #[test]
    fn chunk_ranges_zero_chunk_spans_whole_axis() {
        assert_eq!(FieldEvaluator::chunk_ranges(10, 0), vec![(0, 9)]);
    }

    #[test]
    fn chunk_size_one_matches_chunk_size_n_up_to_tolerance() {
        let dims = Vec3::new(2.0, 2.0, 2.0);
        let pop = tiny_population(dims, 0.0);
        let ctx = EvaluationContext::default();
        let low = Vec3::new(-0.5, -0.5, -0.5);
        let high = Vec3::new(0.5, 0.5, 0.5);

        let a = FieldEvaluator::sum_vel_mesh(&pop, &ctx, low, high, 0.25, 1, 0.0, true, None, None)
            .unwrap()
            .unwrap();
        let n_axis = a.dims.0;
        let b = FieldEvaluator::sum_vel_mesh(&pop, &ctx, low, high, 0.25, n_axis, 0.0, true, None, None)
            .unwrap()
            .unwrap();

        assert_eq!(a.dims, b.dims);
        for (va, vb) in a.data.iter().zip(&b.data) {
            assert!((va.x - vb.x).abs() < 1e-9);
            assert!((va.y - vb.y).abs() < 1e-9);
            assert!((va.z - vb.z).abs() < 1e-9);
        }
    }

    #[test]
    fn query_box_outside_domain_is_rejected() {
        let pop = tiny_population(Vec3::new(2.0, 2.0, 2.0), 0.0);
        let ctx = EvaluationContext::default();
        let err = FieldEvaluator::sum_vel_mesh(
            &pop,
            &ctx,
            Vec3::new(-5.0, -5.0, -5.0),
            Vec3::new(5.0, 5.0, 5.0),
            0.5,
            5,
            0.0,
            true,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuery(_)));
    }

    #[test]
    fn mean_flow_background_is_purely_additive() {
        // At t = 0, get_iter/get_offset are independent of U, so the same
        // eddy images are resolved regardless of avg_vel: any difference
        // between the two fields below must come from the background term.
        let dims = Vec3::new(2.0, 2.0, 2.0);
        let mut pop = tiny_population(dims, 0.0);
        let ctx = EvaluationContext::default();
        let low = Vec3::new(-0.5, -0.5, -0.5);
        let high = Vec3::new(0.5, 0.5, 0.5);

        let still = FieldEvaluator::sum_vel_mesh(&pop, &ctx, low, high, 0.25, 5, 0.0, true, None, None)
            .unwrap()
            .unwrap();
        pop.set_avg_vel(5.0).unwrap();
        let moving = FieldEvaluator::sum_vel_mesh(&pop, &ctx, low, high, 0.25, 5, 0.0, true, None, None)
            .unwrap()
            .unwrap();

        for (a, b) in still.data.iter().zip(&moving.data) {
            assert!((b.x - a.x - 5.0).abs() < 1e-9);
            assert!((b.y - a.y).abs() < 1e-12);
            assert!((b.z - a.z).abs() < 1e-12);
        }
    }

    #[test]
    fn cancellation_aborts_before_any_tile_is_produced() {
        let pop = tiny_population(Vec3::new(2.0, 2.0, 2.0), 0.0);
        let ctx = EvaluationContext::default();
        let cancel = || true;
        let err = FieldEvaluator::sum_vel_mesh(
            &pop,
            &ctx,
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, 0.5),
            0.25,
            5,
            0.0,
            true,
            None,
            Some(&cancel),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Cancelled));
    }
}
