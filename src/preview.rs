//! Render-side consumer loop.
//!
//! Polls a frame source once per tick at its own rate, places the image in
//! the window and keeps interval statistics. Drawing and inference are left
//! to the caller through [`FrameSink`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::camera::{CameraError, CaptureSession, FourCc, Resolution};
use crate::layout::{fit_to_window, DrawRect};

/// Where preview frames come from.
pub enum FrameSource {
    /// Live frames from a running capture session
    Camera(CaptureSession),
    /// A decoded still image, RGBA8888
    Still { resolution: Resolution, data: Vec<u8> },
}

impl FrameSource {
    /// Decode an image file into a still RGBA source.
    pub fn from_image(path: &std::path::Path) -> Result<Self, image::ImageError> {
        let rgba = image::open(path)?.into_rgba8();
        let resolution = Resolution::new(rgba.width(), rgba.height());
        log::info!("Loaded still image {} ({})", path.display(), resolution);
        Ok(FrameSource::Still {
            resolution,
            data: rgba.into_raw(),
        })
    }

    pub fn dimensions(&self) -> Resolution {
        match self {
            FrameSource::Camera(session) => session.dimensions(),
            FrameSource::Still { resolution, .. } => *resolution,
        }
    }

    pub fn pixel_format(&self) -> FourCc {
        match self {
            FrameSource::Camera(session) => session.pixel_format(),
            FrameSource::Still { .. } => FourCc::RGBA,
        }
    }

    /// Begin producing frames. A no-op for still images.
    pub fn start(&mut self) -> Result<(), CameraError> {
        match self {
            FrameSource::Camera(session) => session.start(),
            FrameSource::Still { .. } => Ok(()),
        }
    }

    pub fn stop(&mut self) {
        if let FrameSource::Camera(session) = self {
            session.stop();
        }
    }
}

/// A frame handed to the sink for one tick.
#[derive(Debug)]
pub struct PreviewFrame<'a> {
    pub data: &'a [u8],
    pub resolution: Resolution,
    pub format: FourCc,
    /// Publish counter of the frame; 0 for still images
    pub sequence: u64,
    /// Where the image goes in the window
    pub draw: DrawRect,
}

/// Receives one frame per tick.
pub trait FrameSink {
    fn present(&mut self, frame: &PreviewFrame<'_>);
}

/// Sink that logs a summary of each new frame.
#[derive(Debug, Default)]
pub struct LogSink {
    last_sequence: Option<u64>,
}

impl FrameSink for LogSink {
    fn present(&mut self, frame: &PreviewFrame<'_>) {
        if self.last_sequence == Some(frame.sequence) {
            return;
        }
        self.last_sequence = Some(frame.sequence);
        log::debug!(
            "frame #{} {} {} mean luma {} at {:?}",
            frame.sequence,
            frame.resolution,
            frame.format,
            mean_luma(frame.data, frame.format),
            frame.draw
        );
    }
}

/// Average brightness of an RGBA or packed 4:2:2 frame.
pub fn mean_luma(data: &[u8], format: FourCc) -> u8 {
    let (sum, count) = match format {
        FourCc::RGBA => data.chunks_exact(4).fold((0u64, 0u64), |(s, n), px| {
            let y = (299 * px[0] as u64 + 587 * px[1] as u64 + 114 * px[2] as u64) / 1000;
            (s + y, n + 1)
        }),
        FourCc::YUYV => data.iter().step_by(2).fold((0, 0), |(s, n), &y| (s + y as u64, n + 1)),
        FourCc::UYVY => data
            .iter()
            .skip(1)
            .step_by(2)
            .fold((0, 0), |(s, n), &y| (s + y as u64, n + 1)),
        _ => (0, 0),
    };
    if count == 0 {
        0
    } else {
        (sum / count) as u8
    }
}

/// Render loop settings.
#[derive(Debug, Clone)]
pub struct PreviewSettings {
    pub window: Resolution,
    pub fps: u32,
    /// Stop after this many ticks
    pub max_frames: Option<u64>,
}

/// Timing summary of a preview run.
#[derive(Debug, Clone, Default)]
pub struct PreviewStats {
    /// Loop iterations
    pub ticks: u64,
    /// Ticks that had a frame to present
    pub presented: u64,
    /// Distinct frames presented
    pub unique_frames: u64,
    /// Mean time between ticks
    pub mean_interval: Duration,
}

/// Run the render loop until `stop` is set or `max_frames` ticks have run.
pub fn run_preview<S: FrameSink>(
    source: &FrameSource,
    settings: &PreviewSettings,
    sink: &mut S,
    stop: &AtomicBool,
) -> PreviewStats {
    let period = Duration::from_secs(1) / settings.fps.max(1);
    let tex = source.dimensions();
    let draw = fit_to_window(settings.window.width, settings.window.height, tex.width, tex.height);
    let format = source.pixel_format();

    let mut stats = PreviewStats::default();
    let mut last_sequence = None;
    let mut last_tick: Option<Instant> = None;
    let mut total_interval = Duration::ZERO;
    let mut last_report = Instant::now();

    while !stop.load(Ordering::SeqCst) {
        if settings.max_frames.is_some_and(|max| stats.ticks >= max) {
            break;
        }
        let tick = Instant::now();
        if let Some(prev) = last_tick {
            total_interval += tick - prev;
        }
        last_tick = Some(tick);
        stats.ticks += 1;

        let sequence = match source {
            FrameSource::Camera(session) => session.current_frame().map(|frame| {
                let sequence = frame.sequence();
                sink.present(&PreviewFrame {
                    data: &frame[..],
                    resolution: tex,
                    format,
                    sequence,
                    draw,
                });
                sequence
            }),
            FrameSource::Still { resolution, data } => {
                sink.present(&PreviewFrame {
                    data,
                    resolution: *resolution,
                    format,
                    sequence: 0,
                    draw,
                });
                Some(0)
            }
        };

        if let Some(sequence) = sequence {
            stats.presented += 1;
            if last_sequence != Some(sequence) {
                stats.unique_frames += 1;
                last_sequence = Some(sequence);
            }
        }

        if last_report.elapsed() >= Duration::from_secs(1) {
            log::info!(
                "Interval: {:5.1} ms, frames: {} presented / {} unique",
                mean_ms(total_interval, stats.ticks),
                stats.presented,
                stats.unique_frames
            );
            last_report = Instant::now();
        }

        let spent = tick.elapsed();
        if spent < period {
            thread::sleep(period - spent);
        }
    }

    stats.mean_interval = Duration::from_secs_f64(mean_ms(total_interval, stats.ticks) / 1000.0);
    stats
}

fn mean_ms(total: Duration, ticks: u64) -> f64 {
    if ticks < 2 {
        return 0.0;
    }
    total.as_secs_f64() * 1000.0 / (ticks - 1) as f64
}
