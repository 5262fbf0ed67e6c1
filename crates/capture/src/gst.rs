//! GStreamer V4L2 camera backend.
//!
//! Builds a `v4l2src ! videoconvert ! appsink` pipeline delivering packed
//! RGB frames at the configured size and rate. The appsink keeps at most
//! one buffer and drops older ones, matching the latest-frame semantics
//! of the rest of the capture stack.

use std::sync::OnceLock;

use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use vigil_common::error::{VigilError, VigilResult};
use vigil_detection::RawFrame;

use crate::FrameSource;

/// Camera frame source backed by a GStreamer pipeline.
pub struct GstSource {
    device_index: u32,
    width: u32,
    height: u32,
    framerate: u32,
    pipeline: Option<(gst::Pipeline, gst_app::AppSink)>,
}

impl GstSource {
    pub fn new(device_index: u32, width: u32, height: u32, framerate: u32) -> Self {
        Self {
            device_index,
            width,
            height,
            framerate,
            pipeline: None,
        }
    }

    fn launch_string(&self) -> String {
        format!(
            "v4l2src device=/dev/video{} ! videoconvert ! videoscale ! videorate ! \
             video/x-raw,format=RGB,width={},height={},framerate={}/1 ! \
             appsink name=sink max-buffers=1 drop=true sync=false",
            self.device_index, self.width, self.height, self.framerate
        )
    }

    fn teardown(&mut self) {
        if let Some((pipeline, _)) = self.pipeline.take() {
            if pipeline.set_state(gst::State::Null).is_err() {
                tracing::warn!("Failed to tear down camera pipeline");
            }
        }
    }
}

impl FrameSource for GstSource {
    fn open(&mut self) -> VigilResult<()> {
        init_gstreamer()?;
        self.teardown();

        let element = gst::parse::launch(&self.launch_string()).map_err(|e| {
            VigilError::capture(format!("Failed to build camera pipeline: {e}"))
        })?;
        let pipeline = element
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| VigilError::capture("Launch string did not produce a pipeline"))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| VigilError::capture("Camera pipeline has no appsink"))?
            .dynamic_cast::<gst_app::AppSink>()
            .map_err(|_| VigilError::capture("sink element is not an appsink"))?;

        pipeline.set_state(gst::State::Playing).map_err(|e| {
            VigilError::capture(format!("Failed to start camera pipeline: {e:?}"))
        })?;

        // GStreamer state changes are async; wait so the device is actually
        // open before the worker starts polling.
        match pipeline.state(gst::ClockTime::from_seconds(10)) {
            (Ok(_), gst::State::Playing, _) => {}
            (Ok(_), state, _) => {
                tracing::warn!(?state, "Camera pipeline did not reach Playing within timeout");
            }
            (Err(e), _, _) => {
                return Err(VigilError::capture(format!(
                    "Camera pipeline failed to reach Playing state: {e:?}"
                )));
            }
        }

        tracing::info!(
            device = self.device_index,
            width = self.width,
            height = self.height,
            fps = self.framerate,
            "Camera pipeline playing"
        );
        self.pipeline = Some((pipeline, appsink));
        Ok(())
    }

    fn read_frame(&mut self) -> VigilResult<Option<RawFrame>> {
        let Some((_, appsink)) = self.pipeline.as_ref() else {
            return Err(VigilError::capture("Camera pipeline not open"));
        };

        let timeout = gst::ClockTime::from_mseconds(50);
        let Some(sample) = appsink.try_pull_sample(timeout) else {
            if appsink.is_eos() {
                return Err(VigilError::capture("Camera stream ended"));
            }
            return Ok(None);
        };

        let buffer = sample
            .buffer()
            .ok_or_else(|| VigilError::capture("Sample without buffer"))?;
        let map = buffer
            .map_readable()
            .map_err(|_| VigilError::capture("Failed to map camera buffer"))?;

        Ok(Some(RawFrame {
            width: self.width,
            height: self.height,
            data: map.as_slice().to_vec(),
            // Restamped by the worker into the run timebase.
            timestamp_ns: 0,
        }))
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn name(&self) -> &str {
        "gstreamer-v4l2"
    }
}

impl Drop for GstSource {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn init_gstreamer() -> VigilResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(VigilError::capture(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}
