/// Standalone heatmap renderer for a raw result tensor already persisted by
/// `sem-cli query`. Not part of the `new`/`query` pipeline; a diagnostic
/// convenience for looking at a tensor without re-running a query.

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "sem-plot", about = "Render a PNG heatmap slice of a persisted result tensor")]
struct Args {
    /// Path to a tensor previously written by `sem-cli query`.
    #[arg(short, long)]
    tensor: String,

    /// Slice axis.
    #[arg(short, long, default_value = "x")]
    axis: String,

    /// Layer index along `axis`.
    #[arg(short, long, default_value_t = 0)]
    index: usize,

    /// Output PNG path.
    #[arg(short, long)]
    out: String,

    /// Image size in pixels.
    #[arg(long, num_args = 2, default_values_t = [1024, 768])]
    size: Vec<u32>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let tensor = sem_storage::tensor_store::load_tensor(std::path::Path::new(&args.tensor))
        .with_context(|| format!("loading tensor from {}", args.tensor))?;

    let size = [args.size[0], args.size[1]];
    sem_plot::plot_mesh(&tensor, &args.axis, args.index, size, std::path::Path::new(&args.out))
        .context("rendering heatmap")?;

    println!("Wrote {}", args.out);
    Ok(())
}
