//! `EddyPopulation`: the immutable-after-construction set of eddies sampled
//! from a [`Profile`].

pub mod snapshot;

use std::cell::RefCell;
use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::UnitSphere;

use crate::error::{CoreError, CoreResult};
use crate::profile::Profile;
use crate::vector::Vec3;

/// y/z coordinates for every eddy at one flow iteration.
pub type IterationStream = (Vec<f64>, Vec<f64>);

/// A built, immutable population of eddies. Mutable only via
/// [`EddyPopulation::set_avg_vel`]; the lazily-grown iteration cache is an
/// internal memoization detail, not user-visible mutable state (every entry
/// is a pure function of the master seed, see [`Self::derive_iter_seed`]).
pub struct EddyPopulation {
    seed: u64,
    dims: Vec3,
    avg_vel: f64,
    init_x: Vec<f64>,
    sigma: Vec<f64>,
    alpha: Vec<Vec3>,
    cache: RefCell<HashMap<i64, IterationStream>>,
}

impl EddyPopulation {
    /// Build a population from a validated `Profile` for a domain of size
    /// `dims` with mean axial velocity `avg_vel`, using `seed` for every
    /// random draw (construction is otherwise fully deterministic).
    pub fn build(profile: &Profile, dims: Vec3, avg_vel: f64, seed: u64) -> CoreResult<EddyPopulation> {
        if !dims.is_finite() || dims.x <= 0.0 || dims.y <= 0.0 || dims.z <= 0.0 {
            return Err(CoreError::InvalidConfig(
                "domain dimensions must be finite and positive".into(),
            ));
        }
        if !(avg_vel >= 0.0) {
            return Err(CoreError::InvalidConfig(
                "average velocity must be non-negative".into(),
            ));
        }

        let min_dim = dims.x.min(dims.y).min(dims.z);
        for v in &profile.variants {
            if 2.0 * v.length_scale > min_dim {
                return Err(CoreError::EddyTooLarge {
                    sigma: v.length_scale,
                    half_min: min_dim / 2.0,
                });
            }
        }

        let volume = dims.x * dims.y * dims.z;
        let mut rng = StdRng::seed_from_u64(seed);

        let counts: Vec<usize> = profile
            .variants
            .iter()
            .map(|v| stochastic_round(v.density * volume, &mut rng))
            .collect();
        let n: usize = counts.iter().sum();

        let mut sigma = Vec::with_capacity(n);
        for (v, &count) in profile.variants.iter().zip(&counts) {
            sigma.extend(std::iter::repeat(v.length_scale).take(count));
        }

        let half = Vec3::new(dims.x / 2.0, dims.y / 2.0, dims.z / 2.0);
        let init_x: Vec<f64> = (0..n).map(|_| rng.gen_range(-half.x..=half.x)).collect();

        let mut alpha = Vec::with_capacity(n);
        for (v, &count) in profile.variants.iter().zip(&counts) {
            for _ in 0..count {
                let unit: [f64; 3] = rng.sample(UnitSphere);
                alpha.push(Vec3::from_array(unit) * v.intensity);
            }
        }

        let cache = RefCell::new(HashMap::new());
        let pop = EddyPopulation { seed, dims, avg_vel, init_x, sigma, alpha, cache };

        // Eagerly seed iteration keys 0, 1, 2; later keys are grown lazily
        // by `get_centers`.
        for iter in 0..=2 {
            pop.ensure_iter(iter);
        }

        Ok(pop)
    }

    pub fn n(&self) -> usize {
        self.init_x.len()
    }

    pub fn dims(&self) -> Vec3 {
        self.dims
    }

    pub fn avg_vel(&self) -> f64 {
        self.avg_vel
    }

    pub fn sigma(&self) -> &[f64] {
        &self.sigma
    }

    pub fn alpha(&self) -> &[Vec3] {
        &self.alpha
    }

    pub fn init_x(&self) -> &[f64] {
        &self.init_x
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Set the mean axial velocity. The only permitted mutation.
    pub fn set_avg_vel(&mut self, avg_vel: f64) -> CoreResult<()> {
        if !(avg_vel >= 0.0) {
            return Err(CoreError::InvalidConfig(
                "average velocity must be non-negative".into(),
            ));
        }
        self.avg_vel = avg_vel;
        Ok(())
    }

    /// The centers of every eddy at flow iteration `iter` (may be negative).
    /// Grows the memoization cache lazily and never shrinks it.
    pub fn get_centers(&self, iter: i64) -> Vec<Vec3> {
        self.ensure_iter(iter);
        let cache = self.cache.borrow();
        let (y, z) = cache.get(&iter).expect("just ensured");
        self.init_x
            .iter()
            .zip(y.iter())
            .zip(z.iter())
            .map(|((&x, &y), &z)| Vec3::new(x, y, z))
            .collect()
    }

    /// Make sure the y/z stream for `iter` is present in the cache,
    /// sampling it deterministically from the master seed if not.
    fn ensure_iter(&self, iter: i64) {
        if self.cache.borrow().contains_key(&iter) {
            return;
        }
        let stream = self.sample_iter_stream(iter);
        self.cache.borrow_mut().insert(iter, stream);
    }

    /// Sample the y/z stream for one iteration key. When the field is
    /// stationary (`avg_vel == 0`), keys 0, 1, 2 all derive from the same
    /// seed so the x-wrap at the low/high boundary does not expose a
    /// spuriously different periodic copy.
    fn sample_iter_stream(&self, iter: i64) -> IterationStream {
        let canonical_iter = if self.avg_vel == 0.0 && (0..=2).contains(&iter) { 0 } else { iter };
        let mut rng = StdRng::seed_from_u64(Self::derive_iter_seed(self.seed, canonical_iter));
        let half_y = self.dims.y / 2.0;
        let half_z = self.dims.z / 2.0;
        let n = self.n();
        let y: Vec<f64> = (0..n).map(|_| rng.gen_range(-half_y..=half_y)).collect();
        let z: Vec<f64> = (0..n).map(|_| rng.gen_range(-half_z..=half_z)).collect();
        (y, z)
    }

    fn derive_iter_seed(seed: u64, iter: i64) -> u64 {
        seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(iter as u64)
    }
}

fn stochastic_round(x: f64, rng: &mut impl Rng) -> usize {
    let floor = x.floor();
    let frac = (x - floor).max(0.0);
    let bump = if rng.gen::<f64>() < frac { 1 } else { 0 };
    (floor as i64 + bump) as usize
}
