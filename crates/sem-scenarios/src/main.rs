/// Offline diagnostics battery: loads a persisted field and replays the
/// statistical invariants and end-to-end scenarios from the evaluation
/// contract against it, reporting pass/fail the way an operator would when
/// qualifying a new profile.

use anyhow::{Context, Result};
use clap::Parser;
use sem_core::{EddyPopulation, EvaluationContext, FieldEvaluator, Shape, ShapeRegistry, Tensor4, Vec3};

// ── CLI ───────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "sem-scenarios", about = "Run the diagnostics battery against a persisted field")]
struct Args {
    /// Workspace root containing the `fields/` directory.
    #[arg(short, long, default_value = ".")]
    root: String,

    /// Name of the persisted field to load.
    #[arg(short, long)]
    name: String,

    /// Grid step size used by every meshgrid-based check.
    #[arg(long, default_value_t = 0.1)]
    step: f64,

    /// Chunk size used by every meshgrid-based check.
    #[arg(long, default_value_t = 5)]
    chunk: usize,

    /// Fraction of the domain half-width used as the query box for
    /// meshgrid-based checks, leaving room for centered differences.
    #[arg(long, default_value_t = 0.8)]
    box_fraction: f64,
}

// ── Report ────────────────────────────────────────────────────────────────

struct Check {
    name: &'static str,
    passed: bool,
    detail: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let root = std::path::Path::new(&args.root);

    let snapshot = sem_storage::snapshot_store::load_field(root, &args.name)
        .with_context(|| format!("loading field '{}' from {}", args.name, args.root))?;
    let population = EddyPopulation::from_snapshot(snapshot);
    let ctx = EvaluationContext::default();

    let dims = population.dims();
    let half = Vec3::new(
        dims.x / 2.0 * args.box_fraction,
        dims.y / 2.0 * args.box_fraction,
        dims.z / 2.0 * args.box_fraction,
    );
    let low = Vec3::new(-half.x, -half.y, -half.z);
    let high = half;

    let tensor = FieldEvaluator::sum_vel_mesh(&population, &ctx, low, high, args.step, args.chunk, 0.0, true, None, None)
        .context("evaluating the diagnostics meshgrid")?
        .expect("return_tensor was true");

    let mut checks = Vec::new();
    checks.push(check_determinism(&population, &ctx, low, high, &args));
    checks.push(check_mean_fluctuation(&tensor, population.avg_vel()));
    checks.push(check_divergence(&tensor, args.step));
    checks.push(check_round_trip(&population));
    checks.push(check_shape_cutoff_switching());

    let mut any_failed = false;
    for c in &checks {
        let marker = if c.passed { "PASS" } else { "FAIL" };
        println!("[{marker}] {}: {}", c.name, c.detail);
        any_failed |= !c.passed;
    }

    if any_failed {
        anyhow::bail!("one or more diagnostics checks failed");
    }
    println!("all {} checks passed", checks.len());
    Ok(())
}

// ── Checks ────────────────────────────────────────────────────────────────

/// Two evaluations with identical inputs and seed must produce identical output.
fn check_determinism(population: &EddyPopulation, ctx: &EvaluationContext, low: Vec3, high: Vec3, args: &Args) -> Check {
    let a = FieldEvaluator::sum_vel_mesh(population, ctx, low, high, args.step, args.chunk, 0.0, true, None, None);
    let b = FieldEvaluator::sum_vel_mesh(population, ctx, low, high, args.step, args.chunk, 0.0, true, None, None);
    let passed = match (a, b) {
        (Ok(Some(a)), Ok(Some(b))) => a.dims == b.dims && a.data.iter().zip(&b.data).all(|(x, y)| x == y),
        _ => false,
    };
    Check {
        name: "determinism",
        passed,
        detail: "repeated evaluation with identical inputs reproduces the same tensor".into(),
    }
}

/// Mean fluctuation magnitude should be small relative to the typical
/// fluctuation magnitude.
fn check_mean_fluctuation(tensor: &Tensor4, avg_vel: f64) -> Check {
    let n = tensor.data.len() as f64;
    let background = Vec3::new(avg_vel, 0.0, 0.0);
    let sum = tensor.data.iter().fold(Vec3::ZERO, |acc, &v| acc + (v - background));
    let mean = Vec3::new(sum.x / n, sum.y / n, sum.z / n);

    let mean_magnitude: f64 =
        tensor.data.iter().map(|&v| (v - background).length()).sum::<f64>() / n;
    let tolerance = (mean_magnitude / (n.sqrt()).max(1.0)).max(1e-6) * 10.0;
    let passed = mean.length() < tolerance;
    Check {
        name: "mean zero fluctuation",
        passed,
        detail: format!(
            "|mean fluctuation| = {:.6} (tolerance {:.6}, typical magnitude {:.6})",
            mean.length(),
            tolerance,
            mean_magnitude
        ),
    }
}

/// Mean absolute divergence via centered differences, checked against a 5%
/// tolerance relative to mean fluctuation magnitude.
fn check_divergence(tensor: &Tensor4, step: f64) -> Check {
    let (nx, ny, nz) = tensor.dims;
    if nx < 3 || ny < 3 || nz < 3 {
        return Check {
            name: "divergence bound",
            passed: false,
            detail: "grid too coarse to take a centered difference; widen the query box or shrink the step".into(),
        };
    }

    let mean_magnitude: f64 = tensor.data.iter().map(|v| v.length()).sum::<f64>() / tensor.data.len() as f64;
    let tolerance = (0.05 * mean_magnitude).max(1e-6);

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
    Check {
        name: "divergence bound",
        passed: mean_abs_div < tolerance,
        detail: format!("mean |div| = {mean_abs_div:.6} (tolerance {tolerance:.6})"),
    }
}

/// `serialize(pop) |> deserialize` must reproduce `pop` bit-identically.
fn check_round_trip(population: &EddyPopulation) -> Check {
    let snapshot = population.to_snapshot();
    let bytes = match bincode::serialize(&snapshot) {
        Ok(b) => b,
        Err(e) => {
            return Check { name: "round-trip", passed: false, detail: format!("serialize failed: {e}") }
        }
    };
    let restored: sem_core::PopulationSnapshot = match bincode::deserialize(&bytes) {
        Ok(s) => s,
        Err(e) => {
            return Check { name: "round-trip", passed: false, detail: format!("deserialize failed: {e}") }
        }
    };
    let restored_population = EddyPopulation::from_snapshot(restored);
    let passed = population.init_x() == restored_population.init_x()
        && population.sigma() == restored_population.sigma()
        && population.alpha() == restored_population.alpha();
    Check {
        name: "round-trip",
        passed,
        detail: "bincode round trip reproduces every sampled array".into(),
    }
}

/// Sanity check that the shape registry's cut-off behavior still matches
/// spec scenario 6 (gaussian support grows with cut-off, quadratic does not).
fn check_shape_cutoff_switching() -> Check {
    let gaussian = match ShapeRegistry::by_name("gaussian") {
        Ok(s) => s,
        Err(e) => return Check { name: "shape cut-off switching", passed: false, detail: e.to_string() },
    };
    let widened = match gaussian.with_cutoff(5.0) {
        Ok(s) => s,
        Err(e) => return Check { name: "shape cut-off switching", passed: false, detail: e.to_string() },
    };
    let quadratic = Shape::Quadratic;

    let passed = gaussian.eval(1.5, 1.0) > 0.0
        && widened.eval(4.0, 1.0) > 0.0
        && quadratic.eval(0.5, 1.0) > 0.0
        && quadratic.eval(1.5, 1.0) == 0.0;
    Check {
        name: "shape cut-off switching",
        passed,
        detail: "gaussian support widens with cut-off; quadratic keeps its intrinsic unit cut-off".into(),
    }
}
