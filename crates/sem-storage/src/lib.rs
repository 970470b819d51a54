//! Persistence collaborator for the eddy field engine: field snapshots,
//! raw result tensors, and a file-backed `TileSink`, all kept outside
//! `sem-core` so the core itself never touches a filesystem.

pub mod error;
pub mod snapshot_store;
pub mod tensor_store;
pub mod tile_sink;

pub use error::{StorageError, StorageResult};
pub use tile_sink::FileTileSink;
