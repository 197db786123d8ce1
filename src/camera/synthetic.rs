//! Test pattern capture device.
//!
//! Produces moving colour bars in a packed 4:2:2 layout, paced like a real
//! camera. Used for demos without hardware and by the test suite.

use std::thread;
use std::time::{Duration, Instant};

use super::device::CaptureDevice;
use super::types::{CameraError, FourCc, PackedLayout, Resolution};

/// (Y, Cb, Cr) of the eight SMPTE-style bars: white, yellow, cyan, green,
/// magenta, red, blue, black.
const BARS: [(u8, u8, u8); 8] = [
    (235, 128, 128),
    (210, 16, 146),
    (170, 166, 16),
    (145, 54, 34),
    (106, 202, 222),
    (81, 90, 240),
    (41, 240, 110),
    (16, 128, 128),
];

/// Capture device that synthesizes frames instead of reading hardware.
#[derive(Debug)]
pub struct SyntheticDevice {
    resolution: Resolution,
    format: FourCc,
    frame_interval: Option<Duration>,
    frame: Vec<u8>,
    tick: u64,
    last_frame: Option<Instant>,
    streaming: bool,
}

impl SyntheticDevice {
    /// Create a device producing `format` frames at `resolution`.
    ///
    /// `format` is reported as-is, so unsupported tags can be simulated;
    /// frames for such tags are filled with zeroes.
    pub fn new(resolution: Resolution, format: FourCc) -> Self {
        Self {
            resolution,
            format,
            frame_interval: None,
            frame: vec![0; resolution.pixel_count() * 2],
            tick: 0,
            last_frame: None,
            streaming: false,
        }
    }

    /// Pace `acquire_frame` to at most `fps` frames per second.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.frame_interval = (fps > 0).then(|| Duration::from_secs(1) / fps);
        self
    }

    /// Number of frames produced so far.
    pub fn frames_produced(&self) -> u64 {
        self.tick
    }

    fn render(&mut self) {
        let Ok(layout) = PackedLayout::from_fourcc(self.format) else {
            return;
        };
        let [y0_idx, cb_idx, y1_idx, cr_idx] = layout.indices();

        let width = self.resolution.width as usize;
        let bar_width = (width / BARS.len()).max(1);
        let shift = (self.tick as usize * 2) % width.max(1);
        let stride = width * 2;

        for line in self.frame.chunks_exact_mut(stride) {
            for (pair, quad) in line.chunks_exact_mut(4).enumerate() {
                let x = (pair * 2 + shift) % width;
                let (y, cb, cr) = BARS[(x / bar_width).min(BARS.len() - 1)];
                quad[y0_idx] = y;
                quad[cb_idx] = cb;
                quad[y1_idx] = y;
                quad[cr_idx] = cr;
            }
        }
    }
}

impl CaptureDevice for SyntheticDevice {
    fn name(&self) -> String {
        format!("Synthetic colour bars ({})", self.format)
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn pixel_format(&self) -> FourCc {
        self.format
    }

    fn start_streaming(&mut self) -> Result<(), CameraError> {
        self.streaming = true;
        log::debug!("Synthetic device streaming at {}", self.resolution);
        Ok(())
    }

    fn stop_streaming(&mut self) -> Result<(), CameraError> {
        self.streaming = false;
        Ok(())
    }

    fn acquire_frame(&mut self) -> Result<&[u8], CameraError> {
        if !self.streaming {
            return Err(CameraError::CaptureFailed("stream not started".to_string()));
        }

        if let (Some(interval), Some(last)) = (self.frame_interval, self.last_frame) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }
        self.last_frame = Some(Instant::now());

        self.render();
        self.tick += 1;
        Ok(&self.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_requires_streaming() {
        let mut device = SyntheticDevice::new(Resolution::new(16, 2), FourCc::YUYV);
        assert!(matches!(
            device.acquire_frame(),
            Err(CameraError::CaptureFailed(_))
        ));
    }

    #[test]
    fn test_frame_size_and_first_bar() {
        let mut device = SyntheticDevice::new(Resolution::new(16, 2), FourCc::YUYV);
        device.start_streaming().unwrap();
        let frame = device.acquire_frame().unwrap();
        assert_eq!(frame.len(), 16 * 2 * 2);
        // First quad is the white bar
        assert_eq!(&frame[..4], &[235, 128, 235, 128]);
        device.release_frame();
        assert_eq!(device.frames_produced(), 1);
    }

    #[test]
    fn test_uyvy_ordering() {
        let mut device = SyntheticDevice::new(Resolution::new(16, 1), FourCc::UYVY);
        device.start_streaming().unwrap();
        let frame = device.acquire_frame().unwrap();
        assert_eq!(&frame[..4], &[128, 235, 128, 235]);
    }

    #[test]
    fn test_pattern_moves() {
        let mut device = SyntheticDevice::new(Resolution::new(16, 1), FourCc::YUYV);
        device.start_streaming().unwrap();
        let first = device.acquire_frame().unwrap().to_vec();
        device.release_frame();
        let second = device.acquire_frame().unwrap().to_vec();
        assert_ne!(first, second);
    }

    #[test]
    fn test_fps_pacing() {
        let mut device = SyntheticDevice::new(Resolution::new(4, 1), FourCc::YUYV).with_fps(50);
        device.start_streaming().unwrap();
        let start = Instant::now();
        for _ in 0..3 {
            device.acquire_frame().unwrap();
            device.release_frame();
        }
        // Two full intervals between three frames
        assert!(start.elapsed() >= Duration::from_millis(38));
    }
}
