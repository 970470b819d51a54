//! Periodic wrap-around resolution: for a query time and bounding box,
//! produce every eddy image (including the ±1 period copies in x, y, and
//! z) that can still touch the box given its shape's cut-off.

use crate::population::EddyPopulation;
use crate::shapes::Shape;
use crate::vector::Vec3;

const WRAP_ITER: [i64; 3] = [-1, 0, 1];
/// Extra slack folded into an eddy's shape cut-off before the flow
/// iteration is split into its three x-period copies. Shared with
/// `FieldEvaluator`'s progressive filter so both stages agree on how far
/// an eddy's influence can reach; an implementer may widen this margin but
/// must never shrink it.
pub(crate) const CUTOFF_MARGIN: f64 = 0.2;
/// Further slack applied when testing whether a wrapped image can still
/// touch the query box at all.
const INBOUNDS_SLACK: f64 = 3.0;

/// One eddy image, already shifted into place by the wrap resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WrapCandidate {
    pub center: Vec3,
    pub alpha: Vec3,
    pub sigma: f64,
}

/// Resolves an [`EddyPopulation`] plus a query time into the flat list of
/// eddy images relevant to a bounding box, folding in periodicity.
pub struct WrapResolver;

impl WrapResolver {
    /// The flow iteration a query at `time` falls into: each iteration
    /// advances the eddy field by one domain length in x.
    pub fn get_iter(avg_vel: f64, time: f64, length_x: f64) -> i64 {
        (avg_vel * time / length_x).round() as i64 + 1
    }

    /// The residual x-offset within the current flow iteration, folded
    /// into `(-Lx/2, Lx/2]`.
    pub fn get_offset(avg_vel: f64, time: f64, length_x: f64) -> f64 {
        let raw = (avg_vel * time).rem_euclid(length_x);
        if raw > length_x / 2.0 {
            raw - length_x
        } else {
            raw
        }
    }

    /// All eddy images (including periodic copies) that can touch the box
    /// `[low, high]` at `time`, given the currently active `shape`.
    pub fn resolve(
        population: &EddyPopulation,
        shape: Shape,
        time: f64,
        low: Vec3,
        high: Vec3,
    ) -> Vec<WrapCandidate> {
        let dims = population.dims();
        let flow_iter = Self::get_iter(population.avg_vel(), time, dims.x);
        let offset = Self::get_offset(population.avg_vel(), time, dims.x);

        let cutoff: Vec<f64> = population
            .sigma()
            .iter()
            .map(|&sigma| sigma * (1.0 + CUTOFF_MARGIN) * shape.cutoff() * INBOUNDS_SLACK)
            .collect();

        let mut out = Vec::new();
        for &i in &WRAP_ITER {
            let centers = population.get_centers(flow_iter + i);
            let x_shift = offset - (i as f64) * dims.x;
            for &j in &WRAP_ITER {
                let y_shift = (j as f64) * dims.y;
                for &k in &WRAP_ITER {
                    let z_shift = (k as f64) * dims.z;
                    for (idx, c) in centers.iter().enumerate() {
                        let wrapped = Vec3::new(c.x + x_shift, c.y + y_shift, c.z + z_shift);
                        if Self::expanded_inbounds(wrapped, cutoff[idx], low, high) {
                            out.push(WrapCandidate {
                                center: wrapped,
                                alpha: population.alpha()[idx],
                                sigma: population.sigma()[idx],
                            });
                        }
                    }
                }
            }
        }
        out
    }

    fn expanded_inbounds(p: Vec3, cutoff: f64, low: Vec3, high: Vec3) -> bool {
        p.x < high.x + cutoff
            && p.x > low.x - cutoff
            && p.y < high.y + cutoff
            && p.y > low.y - cutoff
            && p.z < high.z + cutoff
            && p.z > low.z - cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{EddyVariant, Profile};

    fn one_eddy_population(dims: Vec3, avg_vel: f64) -> EddyPopulation {
        let profile = Profile::new(
            vec![EddyVariant { density: 1.0 / (dims.x * dims.y * dims.z), length_scale: 0.1, intensity: 1.0 }],
            serde_json::Value::Null,
        )
        .unwrap();
        EddyPopulation::build(&profile, dims, avg_vel, 3).unwrap()
    }

    #[test]
    fn get_iter_advances_one_per_domain_length() {
        assert_eq!(WrapResolver::get_iter(1.0, 0.0, 2.0), 1);
        assert_eq!(WrapResolver::get_iter(2.0, 1.0, 2.0), 2);
        assert_eq!(WrapResolver::get_iter(2.0, 5.0, 2.0), 6);
    }

    #[test]
    fn get_offset_is_folded_into_half_domain() {
        let offset = WrapResolver::get_offset(2.0, 1.0, 2.0);
        assert!(offset.abs() <= 1.0 + 1e-9);
    }

    #[test]
    fn stationary_candidate_count_is_stable_across_time() {
        let dims = Vec3::new(2.0, 2.0, 2.0);
        let pop = one_eddy_population(dims, 0.0);
        let low = Vec3::new(-1.0, -1.0, -1.0);
        let high = Vec3::new(1.0, 1.0, 1.0);
        let at_t0 = WrapResolver::resolve(&pop, Shape::default(), 0.0, low, high).len();
        let at_t5 = WrapResolver::resolve(&pop, Shape::default(), 5.0, low, high).len();
        assert_eq!(at_t0, at_t5, "stationary field must not vary with time");
    }

    #[test]
    fn box_fully_inside_domain_sees_no_duplicate_periodic_copies() {
        let dims = Vec3::new(10.0, 10.0, 10.0);
        let profile = Profile::new(
            vec![EddyVariant { density: 5.0 / 1000.0, length_scale: 0.1, intensity: 1.0 }],
            serde_json::Value::Null,
        )
        .unwrap();
        let pop = EddyPopulation::build(&profile, dims, 0.0, 9).unwrap();
        let low = Vec3::new(-1.0, -1.0, -1.0);
        let high = Vec3::new(1.0, 1.0, 1.0);
        let candidates = WrapResolver::resolve(&pop, Shape::default(), 0.0, low, high);
        // Every surviving image must actually be able to touch the box once
        // the cut-off margin is accounted for; duplicates would double its size.
        let mut seen = std::collections::HashSet::new();
        for c in &candidates {
            let key = (c.center.x.to_bits(), c.center.y.to_bits(), c.center.z.to_bits());
            assert!(seen.insert(key), "duplicate eddy image at {:?}", c.center);
        }
    }
}
