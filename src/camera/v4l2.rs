//! Linux V4L2 capture backend using memory-mapped streaming.
//!
//! Requires the `v4l` feature to be enabled.

use std::time::Duration;

use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::{CaptureStream, Stream as _};
use v4l::video::Capture;
use v4l::{Device, Format};

use super::device::CaptureDevice;
use super::types::{CameraError, FourCc, Resolution};

/// Number of driver buffers queued for streaming.
const BUFFER_COUNT: u32 = 4;

/// Longest wait for a frame before the capture loop gets to check its
/// stop flag again.
const ACQUIRE_TIMEOUT: Duration = Duration::from_millis(500);

/// A `/dev/videoN` capture device.
pub struct V4l2Device {
    device: Device,
    index: u32,
    name: String,
    format: Format,
    stream: Option<Stream<'static>>,
}

impl V4l2Device {
    /// Open `/dev/video{index}` and read its current format.
    ///
    /// The device keeps whatever mode it is configured for; the pipeline
    /// adapts to it rather than negotiating.
    pub fn open(index: u32) -> Result<Self, CameraError> {
        let device = Device::new(index as usize).map_err(|e| {
            log::debug!("Opening /dev/video{} failed: {}", index, e);
            CameraError::DeviceNotFound(index)
        })?;

        let format = device
            .format()
            .map_err(|e| CameraError::OpenFailed(e.to_string()))?;

        let name = device
            .query_caps()
            .map(|caps| caps.card)
            .unwrap_or_else(|_| format!("/dev/video{}", index));

        log::info!("Opened capture device {} ({}): {}", index, name, format);

        Ok(Self {
            device,
            index,
            name,
            format,
            stream: None,
        })
    }
}

impl CaptureDevice for V4l2Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn resolution(&self) -> Resolution {
        Resolution::new(self.format.width, self.format.height)
    }

    fn pixel_format(&self) -> FourCc {
        FourCc(self.format.fourcc.repr)
    }

    fn start_streaming(&mut self) -> Result<(), CameraError> {
        let mut stream = Stream::with_buffers(&self.device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| CameraError::StreamFailed(e.to_string()))?;
        stream.set_timeout(ACQUIRE_TIMEOUT);
        self.stream = Some(stream);
        log::debug!("Streaming started on /dev/video{}", self.index);
        Ok(())
    }

    fn stop_streaming(&mut self) -> Result<(), CameraError> {
        if let Some(mut stream) = self.stream.take() {
            stream
                .stop()
                .map_err(|e| CameraError::StreamFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn acquire_frame(&mut self) -> Result<&[u8], CameraError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| CameraError::CaptureFailed("stream not started".to_string()))?;

        let (data, meta) = stream.next().map_err(|e| match e.kind() {
            std::io::ErrorKind::TimedOut => CameraError::CaptureFailed(format!(
                "no frame within {} ms",
                ACQUIRE_TIMEOUT.as_millis()
            )),
            _ => CameraError::CaptureFailed(e.to_string()),
        })?;

        let used = meta.bytesused as usize;
        if used == 0 || used > data.len() {
            Ok(data)
        } else {
            Ok(&data[..used])
        }
    }

    // The mmap stream requeues the previous buffer on the next dequeue, so
    // releasing is implicit.
    fn release_frame(&mut self) {}
}
