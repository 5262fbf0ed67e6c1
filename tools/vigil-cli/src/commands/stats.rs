//! Show snapshot storage statistics.

use vigil_common::config::AppConfig;
use vigil_storage::{SnapshotFormat, SnapshotStore};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    let format = SnapshotFormat::from_config(
        &config.storage.snapshot_format,
        config.storage.snapshot_quality,
    )?;
    let store = SnapshotStore::new(&config.storage.output_dir, format)?;
    let stats = store.file_statistics()?;

    println!("Snapshot storage: {}", store.dir().display());
    println!("  Files: {}", stats.total_files);
    println!("  Size: {:.2} MB", stats.total_mb());
    if let Some(oldest) = &stats.oldest {
        println!("  Oldest: {oldest}");
    }
    if let Some(newest) = &stats.newest {
        println!("  Newest: {newest}");
    }
    match store.available_space_mb() {
        Ok(mb) => println!("  Free space: {mb:.0} MB"),
        Err(e) => println!("  Free space: unknown ({e})"),
    }

    Ok(())
}
