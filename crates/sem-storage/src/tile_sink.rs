//! File-backed `TileSink`: writes per-x-plane tensors plus a JSON manifest
//! under `<root>/.cache/chunks/`, mirroring the source's chunk cache.

use std::fs;
use std::path::{Path, PathBuf};

use sem_core::{CoreError, CoreResult, TileManifest, TileSink, XPlaneTile};

use crate::error::StorageResult;

pub struct FileTileSink {
    dir: PathBuf,
}

impl FileTileSink {
    /// A sink writing into `<root>/.cache/chunks/`. The directory is
    /// cleared of any previously cached tiles on [`TileSink::begin`],
    /// mirroring the source's `file_io.clear_cache("chunks")`.
    pub fn new(root: &Path) -> FileTileSink {
        FileTileSink { dir: root.join(".cache").join("chunks") }
    }

    fn clear(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.dir)?;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

fn into_core_err(e: impl std::fmt::Display) -> CoreError {
    CoreError::InvalidConfig(format!("tile sink io failure: {e}"))
}

impl TileSink for FileTileSink {
    fn begin(&mut self, manifest: &TileManifest) -> CoreResult<()> {
        self.clear().map_err(into_core_err)?;
        let bytes = serde_json::to_vec_pretty(manifest).map_err(into_core_err)?;
        fs::write(self.dir.join("__info__.json"), bytes).map_err(into_core_err)?;
        Ok(())
    }

    fn push(&mut self, x_index: usize, tile: &XPlaneTile) -> CoreResult<()> {
        let bytes = bincode::serialize(tile).map_err(into_core_err)?;
        fs::write(self.dir.join(format!("{x_index}.bin")), bytes).map_err(into_core_err)?;
        Ok(())
    }
}
