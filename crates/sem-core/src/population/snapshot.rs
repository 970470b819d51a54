//! A serializable, opaque snapshot of an [`EddyPopulation`], letting a
//! field be persisted for replay without resampling. `sem-storage` is the
//! only collaborator that reads or writes the snapshot's bytes; the core
//! only promises that a round trip reproduces every array bit-identically.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{EddyPopulation, IterationStream};
use crate::vector::Vec3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationSnapshot {
    pub seed: u64,
    pub dims: [f64; 3],
    pub avg_vel: f64,
    pub init_x: Vec<f64>,
    pub sigma: Vec<f64>,
    pub alpha: Vec<[f64; 3]>,
    /// Iteration keys already realized at snapshot time, carried along so a
    /// reload does not have to recompute them.
    pub cached_iterations: HashMap<i64, IterationStream>,
}

impl EddyPopulation {
    pub fn to_snapshot(&self) -> PopulationSnapshot {
        PopulationSnapshot {
            seed: self.seed,
            dims: self.dims.to_array(),
            avg_vel: self.avg_vel,
            init_x: self.init_x.clone(),
            sigma: self.sigma.clone(),
            alpha: self.alpha.iter().map(Vec3::to_array).collect(),
            cached_iterations: self.cache.borrow().clone(),
        }
    }

    pub fn from_snapshot(snapshot: PopulationSnapshot) -> EddyPopulation {
        EddyPopulation {
            seed: snapshot.seed,
            dims: Vec3::from_array(snapshot.dims),
            avg_vel: snapshot.avg_vel,
            init_x: snapshot.init_x,
            sigma: snapshot.sigma,
            alpha: snapshot.alpha.into_iter().map(Vec3::from_array).collect(),
            cache: std::cell::RefCell::new(snapshot.cached_iterations),
        }
    }
}
