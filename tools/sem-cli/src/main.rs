/// `sem new` / `sem query`: the CLI surface over the eddy field engine.
/// Parses profile/query JSON documents, drives `EddyPopulation` and
/// `FieldEvaluator`, and persists results through `sem-storage`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sem_core::{
    EddyPopulation, EddyVariant, EvaluationContext, FieldEvaluator, Profile, QueryRequest,
    Shape, ShapeRegistry, Vec3,
};
use serde::Deserialize;

// ── CLI ───────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "sem", about = "Turbulent flow synthetic eddy generator")]
struct Args {
    /// Workspace root containing `fields/` and `tensors/`.
    #[arg(long, default_value = ".")]
    root: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new field from an eddy profile and persist it.
    New {
        /// Path to a profile JSON document.
        #[arg(short = 'p', long)]
        profile: String,

        /// Name under which the field is persisted.
        #[arg(short = 'n', long)]
        name: String,

        /// Domain dimensions, separated by spaces: Lx Ly Lz.
        #[arg(short = 'd', long, num_args = 3, value_names = ["LX", "LY", "LZ"])]
        dims: Vec<f64>,

        /// Mean axial velocity.
        #[arg(short = 'v', long, default_value_t = 0.0)]
        avg_vel: f64,

        /// Random seed; defaults to a hash of the field name so repeated
        /// `new` calls with the same name reproduce the same population.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Query velocities on an existing field.
    Query {
        /// Name of the persisted field to load.
        #[arg(short = 'n', long)]
        name: String,

        /// Path to a query request JSON document.
        #[arg(short = 'q', long)]
        query: String,

        /// Shape function to use (default: gaussian).
        #[arg(short = 's', long)]
        shape: Option<String>,

        /// Cut-off, in multiples of length-scale (default: 2.0).
        #[arg(short = 'c', long)]
        cutoff: Option<f64>,
    },
}

// ── Profile document ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawProfile {
    #[serde(default)]
    settings: serde_json::Value,
    variants: Vec<EddyVariant>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let root = PathBuf::from(&args.root);

    match args.command {
        Command::New { profile, name, dims, avg_vel, seed } => run_new(&root, &profile, &name, &dims, avg_vel, seed),
        Command::Query { name, query, shape, cutoff } => run_query(&root, &name, &query, shape, cutoff),
    }
}

fn run_new(root: &Path, profile_path: &str, name: &str, dims: &[f64], avg_vel: f64, seed: Option<u64>) -> Result<()> {
    let text = std::fs::read_to_string(profile_path)
        .with_context(|| format!("reading profile file '{profile_path}'"))?;
    let raw: RawProfile = serde_json::from_str(&text)
        .with_context(|| format!("parsing profile file '{profile_path}'"))?;
    let profile = Profile::new(raw.variants, raw.settings).context("validating profile")?;

    if dims.len() != 3 {
        anyhow::bail!("dims must have exactly 3 values (Lx Ly Lz), got {}", dims.len());
    }
    let dims = Vec3::new(dims[0], dims[1], dims[2]);
    let seed = seed.unwrap_or_else(|| default_seed_from_name(name));

    let population = EddyPopulation::build(&profile, dims, avg_vel, seed).context("building eddy population")?;
    sem_storage::snapshot_store::save_field(root, name, &population.to_snapshot())
        .with_context(|| format!("saving field '{name}'"))?;

    println!("New field '{name}' created and saved successfully");
    Ok(())
}

fn run_query(root: &Path, name: &str, query_path: &str, shape: Option<String>, cutoff: Option<f64>) -> Result<()> {
    let snapshot = sem_storage::snapshot_store::load_field(root, name)
        .with_context(|| format!("loading field '{name}'"))?;
    let population = EddyPopulation::from_snapshot(snapshot);

    let mut active_shape: Shape = match &shape {
        Some(s) => ShapeRegistry::by_name(s).context("resolving shape function")?,
        None => Shape::default(),
    };
    if let Some(c) = cutoff {
        active_shape = active_shape.with_cutoff(c).context("setting shape cut-off")?;
    }
    let ctx = EvaluationContext { shape: active_shape, threads: None };

    let text = std::fs::read_to_string(query_path)
        .with_context(|| format!("reading query file '{query_path}'"))?;
    let request: QueryRequest = serde_json::from_str(&text)
        .with_context(|| format!("parsing query file '{query_path}'"))?;

    let dims = population.dims();
    let domain_low = Vec3::new(-dims.x / 2.0, -dims.y / 2.0, -dims.z / 2.0);
    let domain_high = Vec3::new(dims.x / 2.0, dims.y / 2.0, dims.z / 2.0);

    match request {
        QueryRequest::Meshgrid { params, plot } => {
            let (low, high) = params.resolve_box(domain_low, domain_high);
            eprintln!(
                "evaluating meshgrid [{:?}, {:?}] step={} chunk={}",
                low, high, params.step_size, params.chunk_size
            );
            let tensor = FieldEvaluator::sum_vel_mesh(
                &population, &ctx, low, high, params.step_size, params.chunk_size, params.time, true, None, None,
            )
            .context("evaluating meshgrid velocity")?
            .expect("return_tensor was true");
            eprintln!("evaluated {} grid nodes", tensor.data.len());

            let tensor_path = root.join("tensors").join(format!("{name}.bin"));
            sem_storage::tensor_store::save_tensor(&tensor_path, &tensor)
                .with_context(|| format!("saving result tensor to {}", tensor_path.display()))?;

            if let Some(plot) = plot {
                if let Some(save) = &plot.save {
                    sem_plot::plot_mesh(&tensor, &plot.axis, plot.index, plot.size, Path::new(save))
                        .context("rendering meshgrid heatmap")?;
                    println!("Plot saved to {save}");
                }
            }
            println!("Meshgrid velocity calculation complete, {} nodes", tensor.data.len());
        }
        QueryRequest::Points { params } => {
            let mut velocities = Vec::with_capacity(params.coords.len());
            for coord in &params.coords {
                let p = Vec3::from_array(*coord);
                let tensor = FieldEvaluator::sum_vel_mesh(&population, &ctx, p, p, 0.2, 1, params.time, true, None, None)
                    .context("evaluating point velocity")?
                    .expect("return_tensor was true");
                velocities.push(tensor.data[0].to_array());
            }
            println!("{}", serde_json::to_string_pretty(&velocities)?);
        }
    }
    Ok(())
}

fn default_seed_from_name(name: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    hasher.finish()
}
