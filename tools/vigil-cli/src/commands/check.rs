//! Check configuration and storage health.

use vigil_common::config::AppConfig;
use vigil_detection::config::validate_learning_rate;
use vigil_detection::DetectionConfig;
use vigil_storage::{SnapshotFormat, SnapshotStore};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Vigil System Check");
    println!("{}", "=".repeat(50));

    // Configuration
    match config.validate() {
        Ok(()) => println!("[OK] Configuration: {}", config.summary()),
        Err(e) => println!("[FAIL] Configuration: {e}"),
    }
    match DetectionConfig::from_settings(&config.detection) {
        Ok(_) => println!("[OK] Detection parameters"),
        Err(e) => println!("[FAIL] Detection parameters: {e}"),
    }
    match validate_learning_rate(config.detection.learning_rate) {
        Ok(rate) => println!("[OK] Learning rate: {rate}"),
        Err(e) => println!("[FAIL] Learning rate: {e}"),
    }

    // Storage
    match SnapshotFormat::from_config(
        &config.storage.snapshot_format,
        config.storage.snapshot_quality,
    ) {
        Ok(format) => match SnapshotStore::new(&config.storage.output_dir, format) {
            Ok(store) => {
                println!("[OK] Snapshot directory: {}", store.dir().display());
                match store.available_space_mb() {
                    Ok(mb) if mb >= 100.0 => println!("[OK] Free space: {mb:.0} MB"),
                    Ok(mb) => println!("[WARN] Free space low: {mb:.0} MB"),
                    Err(e) => println!("[WARN] Free space unknown: {e}"),
                }
            }
            Err(e) => println!("[FAIL] Snapshot directory: {e}"),
        },
        Err(e) => println!("[FAIL] Snapshot format: {e}"),
    }

    // Capture backend
    if cfg!(feature = "gstreamer") {
        println!(
            "[OK] Camera backend: gstreamer (/dev/video{})",
            config.camera.device_index
        );
    } else {
        println!("[WARN] Camera backend: none (synthetic only; rebuild with --features gstreamer)");
    }

    Ok(())
}
