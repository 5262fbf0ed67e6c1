//! Apply the snapshot retention policy.

use vigil_common::config::AppConfig;
use vigil_storage::{SnapshotFormat, SnapshotStore};

pub fn run(config: &AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let format = SnapshotFormat::from_config(
        &config.storage.snapshot_format,
        config.storage.snapshot_quality,
    )?;
    let store = SnapshotStore::new(&config.storage.output_dir, format)?;

    println!(
        "Retention policy: keep {} newest, max age {} days",
        config.storage.max_snapshots, config.storage.max_age_days
    );

    if dry_run {
        let candidates =
            store.cleanup_candidates(config.storage.max_snapshots, config.storage.max_age_days)?;
        if candidates.is_empty() {
            println!("Nothing to delete.");
        } else {
            println!("Would delete {} snapshot(s):", candidates.len());
            for path in candidates {
                println!("  {}", path.display());
            }
        }
        return Ok(());
    }

    let deleted =
        store.cleanup_old_files(config.storage.max_snapshots, config.storage.max_age_days)?;
    println!("Deleted {deleted} snapshot(s).");
    Ok(())
}
