//! Field snapshot persistence: opaque `bincode` blobs under a `fields/`
//! directory, one per named field.

use std::fs;
use std::path::Path;

use sem_core::PopulationSnapshot;

use crate::error::StorageResult;

fn fields_dir(root: &Path) -> std::path::PathBuf {
    root.join("fields")
}

/// Persist `snapshot` as `<root>/fields/<name>.bin`, creating the directory
/// if needed.
pub fn save_field(root: &Path, name: &str, snapshot: &PopulationSnapshot) -> StorageResult<()> {
    let dir = fields_dir(root);
    fs::create_dir_all(&dir)?;
    let bytes = bincode::serialize(snapshot)?;
    fs::write(dir.join(format!("{name}.bin")), bytes)?;
    Ok(())
}

/// Load the snapshot previously written under `<root>/fields/<name>.bin`.
pub fn load_field(root: &Path, name: &str) -> StorageResult<PopulationSnapshot> {
    let path = fields_dir(root).join(format!("{name}.bin"));
    let bytes = fs::read(path)?;
    Ok(bincode::deserialize(&bytes)?)
}
