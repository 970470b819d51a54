//! End-to-end scenario tests. Each of these drives the full
//! `EddyPopulation` → `WrapResolver` →
//! `FieldEvaluator` pipeline the way an operator's query would, rather than
//! exercising one module in isolation. `sem-scenarios` replays the same
//! scenarios against a persisted field from outside the crate.

#![cfg(test)]

use std::collections::HashMap;

use crate::field::{EvaluationContext, FieldEvaluator};
use crate::population::snapshot::PopulationSnapshot;
use crate::population::EddyPopulation;
use crate::profile::{EddyVariant, Profile};
use crate::shapes::Shape;
use crate::vector::Vec3;

/// Override a freshly built population so every array holds exactly the
/// values a scenario calls for, reusing the snapshot round trip as the
/// only sanctioned way to construct a population from explicit arrays.
fn single_eddy_at_origin(dims: Vec3, avg_vel: f64, sigma: f64, alpha: Vec3) -> EddyPopulation {
    let profile = Profile::new(
        vec![EddyVariant { density: 1.0 / (dims.x * dims.y * dims.z), length_scale: sigma, intensity: alpha.length() }],
        serde_json::Value::Null,
    )
    .unwrap();
    let built = EddyPopulation::build(&profile, dims, avg_vel, 1).unwrap();
    assert_eq!(built.n(), 1, "density must be tuned so exactly one eddy is drawn");

    let mut cached_iterations = HashMap::new();
    for iter in -1..=15 {
        cached_iterations.insert(iter, (vec![0.0], vec![0.0]));
    }
    EddyPopulation::from_snapshot(PopulationSnapshot {
        seed: built.seed(),
        dims: dims.to_array(),
        avg_vel,
        init_x: vec![0.0],
        sigma: vec![sigma],
        alpha: vec![alpha.to_array()],
        cached_iterations,
    })
}

#[test]
fn scenario_1_single_eddy_along_z_cancels_on_the_diagonal() {
    let pop = single_eddy_at_origin(Vec3::new(6.0, 6.0, 6.0), 0.0, 1.5, Vec3::new(0.0, 0.0, 1.0));
    let ctx = EvaluationContext { shape: Shape::Gaussian { cutoff: 1.0 }, threads: None };

    let eval_point = |p: Vec3| {
        FieldEvaluator::sum_vel_mesh(&pop, &ctx, p, p, 0.2, 1, 0.0, true, None, None)
            .unwrap()
            .unwrap()
            .data[0]
    };

    let v0 = eval_point(Vec3::new(0.5, 0.5, 0.5));
    let v1 = eval_point(Vec3::new(-0.5, -0.5, -0.5));
    let v2 = eval_point(Vec3::new(2.0, 2.0, 2.0));
    let v3 = eval_point(Vec3::new(-2.0, -2.0, -2.0));

    assert!((v0.x + v1.x).abs() < 1e-9);
    assert!((v0.y + v1.y).abs() < 1e-9);
    assert!((v0.z + v1.z).abs() < 1e-9);
    assert_eq!(v2, Vec3::ZERO, "point is beyond the cut-off radius");
    assert_eq!(v3, Vec3::ZERO, "point is beyond the cut-off radius");
}

#[test]
fn scenario_2_transverse_components_average_to_zero_over_a_symmetric_box() {
    let pop = single_eddy_at_origin(Vec3::new(6.0, 6.0, 6.0), 0.0, 1.5, Vec3::new(0.0, 0.0, 1.0));
    let ctx = EvaluationContext { shape: Shape::Gaussian { cutoff: 1.0 }, threads: None };

    let tensor = FieldEvaluator::sum_vel_mesh(
        &pop,
        &ctx,
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, 1.0, 1.0),
        0.02,
        5,
        0.0,
        true,
        None,
        None,
    )
    .unwrap()
    .unwrap();

    let n = tensor.data.len() as f64;
    let mean_x: f64 = tensor.data.iter().map(|v| v.x).sum::<f64>() / n;
    let mean_y: f64 = tensor.data.iter().map(|v| v.y).sum::<f64>() / n;
    assert!(mean_x.abs() < 1e-5, "mean x = {mean_x}");
    assert!(mean_y.abs() < 1e-5, "mean y = {mean_y}");
}

#[test]
fn scenario_3_stationary_statistics_are_unchanged_by_the_flow_iteration() {
    // Force iteration keys 1 (t=0) and 14 (t=10, U=2.5, Lx=2) to share the
    // same y/z stream: the periodic-wrap design promises that two flow
    // iterations seeing the same relative eddy layout produce the same
    // induced field up to the x-offset folded into (-Lx/2, Lx/2], so this
    // isolates the invariant instead of leaning on statistical convergence.
    let dims = Vec3::new(2.0, 2.0, 2.0);
    let profile = Profile::new(
        vec![
            EddyVariant { density: 2.0, length_scale: 0.1, intensity: 0.5 },
            EddyVariant { density: 3.0, length_scale: 0.15, intensity: 0.8 },
            EddyVariant { density: 1.0, length_scale: 0.2, intensity: 1.2 },
        ],
        serde_json::Value::Null,
    )
    .unwrap();
    let mut pop = EddyPopulation::build(&profile, dims, 2.5, 17).unwrap();
    assert_eq!(crate::wrap::WrapResolver::get_iter(2.5, 0.0, 2.0), 1);
    assert_eq!(crate::wrap::WrapResolver::get_iter(2.5, 10.0, 2.0), 14);

    let _ = pop.get_centers(1);
    let _ = pop.get_centers(14);
    let mut snapshot = pop.to_snapshot();
    let shared = snapshot.cached_iterations.get(&1).unwrap().clone();
    snapshot.cached_iterations.insert(14, shared);
    pop = EddyPopulation::from_snapshot(snapshot);

    let ctx = EvaluationContext::default();
    let box_low = Vec3::new(-1.0, -1.0, -1.0);
    let box_high = Vec3::new(1.0, 1.0, 1.0);

    let at_t0 = FieldEvaluator::sum_vel_mesh(&pop, &ctx, box_low, box_high, 0.1, 5, 0.0, true, None, None)
        .unwrap()
        .unwrap();
    let at_t10 = FieldEvaluator::sum_vel_mesh(&pop, &ctx, box_low, box_high, 0.1, 5, 10.0, true, None, None)
        .unwrap()
        .unwrap();

    // Mean of (V - (U,0,0)): subtract the background explicitly per component.
    let n = at_t0.data.len() as f64;
    let mean_fluct = |t: &crate::field::Tensor4| -> Vec3 {
        let sum = t.data.iter().fold(Vec3::ZERO, |acc, v| acc + Vec3::new(v.x - 2.5, v.y, v.z));
        Vec3::new(sum.x / n, sum.y / n, sum.z / n)
    };
    let m0 = mean_fluct(&at_t0);
    let m10 = mean_fluct(&at_t10);
    assert!((m0.length() - m10.length()).abs() < 1e-5, "m0={m0:?} m10={m10:?}");
    assert!(m0.length() < 1e-3, "mean fluctuation should vanish by symmetry of the box: m0={m0:?}");
    assert!(m10.length() < 1e-3, "mean fluctuation should vanish by symmetry of the box: m10={m10:?}");
}

#[test]
fn scenario_4_doubling_intensity_strictly_increases_fluctuation_spread() {
    let dims = Vec3::new(2.0, 2.0, 2.0);
    let base = vec![
        EddyVariant { density: 3.0, length_scale: 0.1, intensity: 0.5 },
        EddyVariant { density: 2.0, length_scale: 0.15, intensity: 0.8 },
    ];
    let doubled: Vec<EddyVariant> =
        base.iter().map(|v| EddyVariant { intensity: v.intensity * 2.0, ..*v }).collect();

    let profile_a = Profile::new(base, serde_json::Value::Null).unwrap();
    let profile_b = Profile::new(doubled, serde_json::Value::Null).unwrap();
    let pop_a = EddyPopulation::build(&profile_a, dims, 0.0, 23).unwrap();
    let pop_b = EddyPopulation::build(&profile_b, dims, 0.0, 23).unwrap();

    let ctx = EvaluationContext::default();
    let low = Vec3::new(-0.9, -0.9, -0.9);
    let high = Vec3::new(0.9, 0.9, 0.9);
    let a = FieldEvaluator::sum_vel_mesh(&pop_a, &ctx, low, high, 0.1, 5, 0.0, true, None, None).unwrap().unwrap();
    let b = FieldEvaluator::sum_vel_mesh(&pop_b, &ctx, low, high, 0.1, 5, 0.0, true, None, None).unwrap().unwrap();

    assert!(std_of_magnitude(&a) > 0.0, "baseline fluctuation must be non-trivial");
    assert!(std_of_magnitude(&b) > std_of_magnitude(&a));
}

fn std_of_magnitude(t: &crate::field::Tensor4) -> f64 {
    let n = t.data.len() as f64;
    let mags: Vec<f64> = t.data.iter().map(|v| v.length()).collect();
    let mean = mags.iter().sum::<f64>() / n;
    (mags.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / n).sqrt()
}

#[test]
fn scenario_5_divergence_stays_small_on_a_moderately_resolved_grid() {
    let dims = Vec3::new(2.0, 2.0, 2.0);
    let profile = Profile::new(
        vec![
            EddyVariant { density: 2.0, length_scale: 0.1, intensity: 0.5 },
            EddyVariant { density: 3.0, length_scale: 0.15, intensity: 0.8 },
            EddyVariant { density: 1.0, length_scale: 0.2, intensity: 1.2 },
        ],
        serde_json::Value::Null,
    )
    .unwrap();
    let pop = EddyPopulation::build(&profile, dims, 0.0, 31).unwrap();
    let ctx = EvaluationContext::default();
    let step = 0.1;
    let bound = 0.9;
    let tensor = FieldEvaluator::sum_vel_mesh(
        &pop,
        &ctx,
        Vec3::new(-bound, -bound, -bound),
        Vec3::new(bound, bound, bound),
        step,
        5,
        0.0,
        true,
        None,
        None,
    )
    .unwrap()
    .unwrap();

    let (nx, ny, nz) = tensor.dims;
    let mut total = 0.0;
    let mut count = 0usize;
    for ix in 1..nx - 1 {
        for iy in 1..ny - 1 {
            for iz in 1..nz - 1 {
                let dvx_dx = (tensor.get(ix + 1, iy, iz).x - tensor.get(ix - 1, iy, iz).x) / (2.0 * step);
                let dvy_dy = (tensor.get(ix, iy + 1, iz).y - tensor.get(ix, iy - 1, iz).y) / (2.0 * step);
                let dvz_dz = (tensor.get(ix, iy, iz + 1).z - tensor.get(ix, iy, iz - 1).z) / (2.0 * step);
                total += (dvx_dx + dvy_dy + dvz_dz).abs();
                count += 1;
            }
        }
    }
    let mean_abs_div = total / count as f64;
    assert!(mean_abs_div < 0.05, "mean |div| = {mean_abs_div}");
}
