//! Capture session and consumer API.

use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::buffer::FrameRef;
use super::capture_loop::{run_capture_loop, Shared};
use super::device::{CaptureDevice, DeviceOpener};
use super::types::{CameraError, CaptureConfig, CaptureOptions, FourCc, Resolution};

/// A configured capture pipeline.
///
/// Owns the capture device and the published frame buffers. Call `start()`
/// to spawn the background thread, then poll `current_frame()` from the
/// render loop at whatever rate it runs.
///
/// There is no reconfigure operation: a different crop or output format
/// needs a new session.
pub struct CaptureSession {
    config: CaptureConfig,
    device_name: String,
    /// Present while the capture thread is not running
    device: Option<Box<dyn CaptureDevice>>,
    shared: Arc<Shared>,
    capture_thread: Option<JoinHandle<Box<dyn CaptureDevice>>>,
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("device", &self.device_name)
            .field("config", &self.config)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl CaptureSession {
    /// Open a device and resolve the capture configuration.
    ///
    /// # Errors
    /// * `CameraError::DeviceNotFound` - If the device cannot be opened
    /// * `CameraError::UnsupportedFormat` - If the native format is not a
    ///   packed 4:2:2 layout this pipeline understands
    pub fn configure<O: DeviceOpener>(
        opener: &O,
        options: CaptureOptions,
    ) -> Result<Self, CameraError> {
        let device = opener.open(options.device_index).map_err(|e| match e {
            CameraError::DeviceNotFound(_) => e,
            other => {
                log::error!("Capture device {} failed to open: {}", options.device_index, other);
                CameraError::DeviceNotFound(options.device_index)
            }
        })?;
        Self::with_device(Box::new(device), &options)
    }

    /// Build a session around an already opened device.
    pub fn with_device(
        device: Box<dyn CaptureDevice>,
        options: &CaptureOptions,
    ) -> Result<Self, CameraError> {
        let native = device.resolution();
        let native_format = device.pixel_format();
        let device_name = device.name();

        let config = CaptureConfig::resolve(native, native_format, options)?;

        log::info!(
            "Capture device: {} native {} {}, output {} {} ({:?})",
            device_name,
            native,
            native_format,
            config.crop,
            config.output_format,
            config.mode
        );

        Ok(Self {
            config,
            device_name,
            device: Some(device),
            shared: Arc::new(Shared::new(config.output_frame_len())),
            capture_thread: None,
        })
    }

    /// Resolved capture configuration.
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Size of the published frames.
    pub fn dimensions(&self) -> Resolution {
        self.config.crop
    }

    /// Format of the published frames.
    pub fn pixel_format(&self) -> FourCc {
        self.config.output_format
    }

    /// Borrow the latest published frame without copying.
    ///
    /// Returns `None` until the capture thread has published its first
    /// frame. The returned slice is `width * height * bytes_per_pixel` long.
    /// Drop the guard before the next poll.
    pub fn current_frame(&self) -> Option<FrameRef<'_>> {
        self.shared.slots.latest()
    }

    /// Number of frames published since the session was configured.
    pub fn frame_count(&self) -> u64 {
        self.shared.slots.published()
    }

    /// Poll until a frame has been published or `timeout` passes.
    pub fn wait_for_first_frame(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.frame_count() == 0 {
            if Instant::now() >= deadline || !self.is_running() {
                return self.frame_count() > 0;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Start capturing frames in a background thread.
    ///
    /// # Errors
    /// * `CameraError::AlreadyRunning` - If capture is already running
    /// * `CameraError::StreamFailed` - If the device stream fails to start
    pub fn start(&mut self) -> Result<(), CameraError> {
        if self.is_running() {
            return Err(CameraError::AlreadyRunning);
        }
        self.reclaim_device();

        let device = self.device.take().ok_or_else(|| {
            CameraError::StreamFailed("capture device was lost by a previous run".to_string())
        })?;

        self.shared.stop.store(false, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        let config = self.config;
        let (info_tx, info_rx) = mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("campipe-capture".to_string())
            .spawn(move || run_capture_loop(device, config, shared, info_tx))
            .map_err(|e| {
                CameraError::StreamFailed(format!("failed to spawn capture thread: {}", e))
            })?;
        self.capture_thread = Some(handle);

        match info_rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.reclaim_device();
                Err(match e {
                    CameraError::StreamFailed(_) => e,
                    other => CameraError::StreamFailed(other.to_string()),
                })
            }
            Err(_) => {
                self.reclaim_device();
                Err(CameraError::StreamFailed(
                    "capture thread terminated unexpectedly".to_string(),
                ))
            }
        }
    }

    /// Signal the capture thread to stop and wait for it to finish.
    ///
    /// The last published frame stays readable. `start()` may be called
    /// again afterwards.
    pub fn stop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        self.reclaim_device();
    }

    /// Check if the capture thread is currently running.
    pub fn is_running(&self) -> bool {
        self.capture_thread
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Join a finished or stopping capture thread and take the device back.
    fn reclaim_device(&mut self) {
        if let Some(handle) = self.capture_thread.take() {
            match handle.join() {
                Ok(device) => self.device = Some(device),
                Err(_) => log::error!("Capture thread panicked; device is lost"),
            }
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}
