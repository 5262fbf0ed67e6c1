//! Vigil Snapshot Storage
//!
//! Persists motion snapshots with timestamped filenames, enforces the
//! retention policy (count and age limits), and answers storage
//! diagnostics (file statistics, free space). Image encoding and file
//! paths live here; the detection core never touches the disk.

pub mod sink;
pub mod snapshot;

pub use sink::SnapshotSink;
pub use snapshot::{FileStats, SnapshotFormat, SnapshotStore};
