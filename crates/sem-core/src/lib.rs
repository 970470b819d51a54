//! Synthetic eddy method field generation: build a periodic population of
//! stochastic eddies from a density/length-scale/intensity profile, then
//! evaluate the turbulent velocity field they induce over a query box or
//! point list. No I/O: this crate never touches a filesystem, a clock, or
//! a terminal; `sem-storage` and the `sem-cli`/`sem-plot` binaries give it
//! a body.

pub mod error;
pub mod field;
pub mod population;
pub mod profile;
pub mod query;
#[cfg(test)]
mod scenarios;
pub mod shapes;
pub mod tile;
pub mod vector;
pub mod wrap;

pub use error::{CoreError, CoreResult};
pub use field::{EvaluationContext, FieldEvaluator, Tensor4, TileManifest, TileSink, XPlaneTile};
pub use population::snapshot::PopulationSnapshot;
pub use population::EddyPopulation;
pub use profile::{EddyVariant, Profile};
pub use query::{MeshParams, PlotParams, PointsParams, QueryRequest};
pub use shapes::{Shape, ShapeRegistry};
pub use tile::TileEvaluator;
pub use vector::Vec3;
pub use wrap::{WrapCandidate, WrapResolver};
