//! Run the capture and motion detection loop.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use vigil_capture::worker::{CaptureWorker, RecoveryPolicy};
use vigil_capture::{FrameSource, LatestFrame};
use vigil_common::clock::MonotonicClock;
use vigil_common::config::{AppConfig, CameraConfig};
use vigil_common::error::VigilError;
use vigil_detection::config::validate_learning_rate;
use vigil_detection::{BackgroundModel, DetectionConfig, EventSink, MotionAnalyzer, MotionGate};
use vigil_storage::{SnapshotFormat, SnapshotSink, SnapshotStore};

pub async fn run(
    mut config: AppConfig,
    synthetic: bool,
    device: Option<u32>,
    output: Option<PathBuf>,
    cooldown: Option<f64>,
) -> anyhow::Result<()> {
    if let Some(device) = device {
        config.camera.device_index = device;
    }
    if let Some(output) = output {
        config.storage.output_dir = output;
    }
    if let Some(cooldown) = cooldown {
        config.detection.cooldown_secs = cooldown;
    }
    config.validate()?;

    let detection_config = DetectionConfig::from_settings(&config.detection)?;
    let learning_rate = validate_learning_rate(config.detection.learning_rate)?;

    let format = SnapshotFormat::from_config(
        &config.storage.snapshot_format,
        config.storage.snapshot_quality,
    )?;
    let store = SnapshotStore::new(&config.storage.output_dir, format)?;
    match store.validate_storage_space(100.0) {
        Ok(true) => {}
        Ok(false) => tracing::warn!("Less than 100 MB free in snapshot directory"),
        Err(e) => tracing::warn!(error = %e, "Could not check free disk space"),
    }
    let mut sink = SnapshotSink::new(store, "motion", true);

    let clock = MonotonicClock::start();
    tracing::info!(
        started_at = clock.epoch_wall(),
        config = %config.summary(),
        "Vigil starting"
    );

    let source = build_source(&config.camera, synthetic)?;
    let latest = LatestFrame::new();
    let worker = CaptureWorker::new(
        source,
        latest.clone(),
        clock.clone(),
        RecoveryPolicy::default(),
    );
    let stop_flag = worker.stop_flag();
    let frames_captured = worker.frames_captured();
    let worker_handle = tokio::spawn(worker.run());

    {
        let stop = stop_flag.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown requested");
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    let mut background = BackgroundModel::new(detection_config.clone());
    let mut analyzer = MotionAnalyzer::new(detection_config);
    let mut gate = MotionGate::new(Duration::from_secs_f64(config.detection.cooldown_secs));

    let warmup_ns = MonotonicClock::secs_to_ns(config.camera.warmup_secs);
    let mut interval =
        tokio::time::interval(Duration::from_secs_f64(1.0 / config.camera.framerate as f64));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut skipped_frames: u64 = 0;
    let mut events: u64 = 0;

    println!("Vigil is watching. Press Ctrl+C to stop.");

    while !stop_flag.load(Ordering::SeqCst) {
        interval.tick().await;

        let Some(raw) = latest.take() else {
            continue;
        };
        // Let the sensor settle before the first frame seeds the background.
        if raw.timestamp_ns < warmup_ns {
            continue;
        }

        let frame = match raw.decode() {
            Ok(frame) => frame,
            Err(e) if e.is_transient() => {
                skipped_frames += 1;
                tracing::warn!(error = %e, skipped_frames, "Skipping malformed frame");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let detection = match analyzer.detect(&frame, &background) {
            Ok(detection) => detection,
            Err(e @ VigilError::DimensionMismatch { .. }) => {
                tracing::error!(error = %e, "Frame geometry changed, resetting background model");
                background.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(event) = gate.admit(&detection, raw.timestamp_ns) {
            events += 1;
            tracing::info!(
                at_secs = format!("{:.1}", MonotonicClock::ns_to_secs(event.timestamp_ns)),
                total_area = event.total_area,
                regions = event.region_count,
                "Motion event"
            );
            if let Err(e) = sink.on_motion_event(&event, &frame, &detection.regions) {
                tracing::error!(error = %e, "Failed to persist motion snapshot");
            }
        }

        background.update(&frame, learning_rate)?;

        let processed = analyzer.frames_processed();
        if processed % 100 == 0 {
            let elapsed = clock.elapsed_secs();
            tracing::info!(
                captured = frames_captured.load(Ordering::Relaxed),
                analyzed = processed,
                motion_frames = analyzer.motion_frames(),
                events,
                fps = format!("{:.1}", processed as f64 / elapsed.max(1e-9)),
                "Detection progress"
            );
        }
        if config.storage.cleanup_enabled && processed % 1000 == 0 {
            match sink
                .store()
                .cleanup_old_files(config.storage.max_snapshots, config.storage.max_age_days)
            {
                Ok(0) => {}
                Ok(deleted) => tracing::info!(deleted, "Retention cleanup removed old snapshots"),
                Err(e) => tracing::warn!(error = %e, "Retention cleanup failed"),
            }
        }
    }

    stop_flag.store(true, Ordering::SeqCst);
    let captured = worker_handle
        .await
        .map_err(|e| anyhow::anyhow!("capture task panicked: {e}"))??;

    println!();
    println!("Session summary");
    println!("  Uptime: {:.1}s", clock.elapsed_secs());
    println!("  Frames captured: {captured}");
    println!(
        "  Frames analyzed: {} ({} with motion)",
        analyzer.frames_processed(),
        analyzer.motion_frames()
    );
    println!("  Frames skipped: {skipped_frames}");
    println!("  Motion events: {events}");
    println!("  Snapshots saved: {}", sink.snapshots_saved());

    Ok(())
}

#[cfg(feature = "gstreamer")]
fn build_source(camera: &CameraConfig, synthetic: bool) -> anyhow::Result<Box<dyn FrameSource>> {
    if synthetic {
        return Ok(Box::new(vigil_capture::synthetic::SyntheticSource::new(
            camera.width,
            camera.height,
            camera.framerate,
        )));
    }
    Ok(Box::new(vigil_capture::gst::GstSource::new(
        camera.device_index,
        camera.width,
        camera.height,
        camera.framerate,
    )))
}

#[cfg(not(feature = "gstreamer"))]
fn build_source(camera: &CameraConfig, synthetic: bool) -> anyhow::Result<Box<dyn FrameSource>> {
    if synthetic {
        return Ok(Box::new(vigil_capture::synthetic::SyntheticSource::new(
            camera.width,
            camera.height,
            camera.framerate,
        )));
    }
    anyhow::bail!(
        "this build has no camera backend; rebuild with `--features gstreamer` or pass --synthetic"
    )
}
