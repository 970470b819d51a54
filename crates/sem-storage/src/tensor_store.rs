//! Raw result tensor persistence: dense `[Nx, Ny, Nz, 3]` float arrays,
//! `bincode`-encoded with a small header.

use std::fs;
use std::path::Path;

use sem_core::{Tensor4, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;

/// On-disk shape of a [`Tensor4`]; `Tensor4` itself carries no serde impls
/// since the core never serializes its own output.
#[derive(Debug, Serialize, Deserialize)]
struct TensorRecord {
    dims: (usize, usize, usize),
    data: Vec<[f64; 3]>,
}

impl From<&Tensor4> for TensorRecord {
    fn from(t: &Tensor4) -> Self {
        TensorRecord { dims: t.dims, data: t.data.iter().map(|v| v.to_array()).collect() }
    }
}

impl From<TensorRecord> for Tensor4 {
    fn from(r: TensorRecord) -> Self {
        Tensor4 { dims: r.dims, data: r.data.into_iter().map(Vec3::from_array).collect() }
    }
}

pub fn save_tensor(path: &Path, tensor: &Tensor4) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let record = TensorRecord::from(tensor);
    fs::write(path, bincode::serialize(&record)?)?;
    Ok(())
}

pub fn load_tensor(path: &Path) -> StorageResult<Tensor4> {
    let bytes = fs::read(path)?;
    let record: TensorRecord = bincode::deserialize(&bytes)?;
    Ok(record.into())
}
