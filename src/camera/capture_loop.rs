//! Background capture thread implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::buffer::{FrameSlots, Publish};
use super::device::CaptureDevice;
use super::frame_utils::transform_frame;
use super::types::{CameraError, CaptureConfig};

/// Pause after a failed acquire before trying again.
const RETRY_DELAY: Duration = Duration::from_millis(10);

/// State shared between the session and its capture thread.
#[derive(Debug)]
pub struct Shared {
    pub slots: FrameSlots,
    pub stop: AtomicBool,
}

impl Shared {
    pub fn new(frame_len: usize) -> Self {
        Self {
            slots: FrameSlots::new(frame_len),
            stop: AtomicBool::new(false),
        }
    }
}

/// Run the capture loop until `shared.stop` is set.
///
/// The outcome of starting the stream is sent on `info_tx` before the first
/// frame is acquired. The device is handed back when the loop exits so the
/// session can start it again.
pub fn run_capture_loop(
    mut device: Box<dyn CaptureDevice>,
    config: CaptureConfig,
    shared: Arc<Shared>,
    info_tx: Sender<Result<(), CameraError>>,
) -> Box<dyn CaptureDevice> {
    if let Err(e) = device.start_streaming() {
        let _ = info_tx.send(Err(e));
        return device;
    }
    let _ = info_tx.send(Ok(()));
    drop(info_tx);

    log::info!("Capture thread started ({})", device.name());

    let mut dropped: u64 = 0;

    while !shared.stop.load(Ordering::Acquire) {
        let format = device.pixel_format();

        let outcome = match device.acquire_frame() {
            Ok(frame) => shared
                .slots
                .write_with(|dst| transform_frame(&config, frame, format, dst)),
            Err(e) => {
                log::warn!("Failed to capture frame: {}", e);
                thread::sleep(RETRY_DELAY);
                continue;
            }
        };
        device.release_frame();

        match outcome {
            Ok(Publish::Published) => {}
            Ok(Publish::Skipped) => {
                dropped += 1;
                log::trace!("Reader held the back buffer, frame dropped");
            }
            // The previously published frame stays visible
            Err(e) => log::warn!("Frame not published: {}", e),
        }
    }

    if let Err(e) = device.stop_streaming() {
        log::warn!("Failed to stop stream: {}", e);
    }

    log::info!(
        "Capture thread stopped after {} frames ({} dropped)",
        shared.slots.published(),
        dropped
    );
    device
}
