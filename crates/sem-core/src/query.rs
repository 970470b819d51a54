//! The `QueryRequest` input record: either a dense meshgrid evaluation or a
//! list of point evaluations, both ultimately funneled through
//! `FieldEvaluator::sum_vel_mesh`.

use serde::{Deserialize, Serialize};

use crate::vector::Vec3;

fn default_step_size() -> f64 {
    0.2
}

fn default_chunk_size() -> usize {
    5
}

fn default_coords() -> Vec<[f64; 3]> {
    vec![[0.0, 0.0, 0.0]]
}

fn default_plot_axis() -> String {
    "x".to_string()
}

fn default_plot_size() -> [u32; 2] {
    [1024, 768]
}

/// Parameters for a dense meshgrid evaluation. `low_bounds`/`high_bounds`
/// default to the field's domain bounds when absent; resolve them with
/// [`MeshParams::resolve_box`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshParams {
    #[serde(default)]
    pub low_bounds: Option<[f64; 3]>,
    #[serde(default)]
    pub high_bounds: Option<[f64; 3]>,
    #[serde(default = "default_step_size")]
    pub step_size: f64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub time: f64,
}

impl MeshParams {
    /// Resolve the query box against the field's domain bounds, filling in
    /// any bound left unspecified.
    pub fn resolve_box(&self, domain_low: Vec3, domain_high: Vec3) -> (Vec3, Vec3) {
        let low = self.low_bounds.map(Vec3::from_array).unwrap_or(domain_low);
        let high = self.high_bounds.map(Vec3::from_array).unwrap_or(domain_high);
        (low, high)
    }
}

/// Parameters for a list of point evaluations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsParams {
    #[serde(default = "default_coords")]
    pub coords: Vec<[f64; 3]>,
    #[serde(default)]
    pub time: f64,
}

/// Optional heatmap slice rendered alongside a meshgrid result, honored by
/// the `sem-plot` collaborator, not by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotParams {
    #[serde(default = "default_plot_axis")]
    pub axis: String,
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub save: Option<String>,
    #[serde(default = "default_plot_size")]
    pub size: [u32; 2],
}

/// A validated query, dispatched by `mode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum QueryRequest {
    Meshgrid {
        params: MeshParams,
        #[serde(default)]
        plot: Option<PlotParams>,
    },
    Points {
        params: PointsParams,
    },
}
