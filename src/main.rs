mod cli;

use std::sync::atomic::{AtomicBool, Ordering};

use campipe::camera::{
    CameraError, CaptureOptions, CaptureSession, FourCc, Resolution, SyntheticDevice,
};
use campipe::config::Config;
use campipe::preview::{run_preview, FrameSource, LogSink, PreviewSettings};
use clap::Parser;
use cli::{Args, Command};

/// Set by the Ctrl+C handler; stops the render loop.
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Set up the Ctrl+C handler.
///
/// This should be called once at program startup.
fn setup_ctrlc_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        CTRLC_RECEIVED.store(true, Ordering::SeqCst);
        eprintln!("\nReceived Ctrl+C, shutting down...");
    })
}

/// Frame rate of the built-in test pattern.
const SYNTHETIC_FPS: u32 = 30;

fn open_synthetic(options: CaptureOptions) -> Result<CaptureSession, CameraError> {
    let opener = |_index: u32| -> Result<SyntheticDevice, CameraError> {
        Ok(SyntheticDevice::new(Resolution::VGA, FourCc::YUYV).with_fps(SYNTHETIC_FPS))
    };
    CaptureSession::configure(&opener, options)
}

#[cfg(all(feature = "v4l", target_os = "linux"))]
fn open_device(options: CaptureOptions) -> Result<CaptureSession, CameraError> {
    CaptureSession::configure(&campipe::camera::V4l2Device::open, options)
}

#[cfg(not(all(feature = "v4l", target_os = "linux")))]
fn open_device(options: CaptureOptions) -> Result<CaptureSession, CameraError> {
    log::warn!("No hardware capture backend on this platform; use --synthetic or a still image");
    Err(CameraError::DeviceNotFound(options.device_index))
}

/// Configure and start the camera, or fall back to the still image.
fn open_source(args: &Args, config: &Config) -> Result<FrameSource, String> {
    if !args.no_camera {
        let options = config.camera.capture_options();
        let session = if args.synthetic {
            open_synthetic(options)
        } else {
            open_device(options)
        };

        match session.and_then(|mut session| session.start().map(|()| session)) {
            Ok(session) => return Ok(FrameSource::Camera(session)),
            Err(e) => log::warn!("Camera unavailable ({}), falling back to still image", e),
        }
    }

    match &config.input.image {
        Some(path) => FrameSource::from_image(path)
            .map_err(|e| format!("Failed to load image '{}': {}", path.display(), e)),
        None => Err("No camera available and no still image given".to_string()),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    args.apply_to(&mut config);

    match args.command {
        Some(Command::ListCameras) => {
            cli::list_cameras();
            return;
        }
        Some(Command::Config { ref action }) => {
            cli::handle_config_action(action.clone(), &config, args.config.as_deref());
            return;
        }
        None => {}
    }

    if let Err(e) = setup_ctrlc_handler() {
        log::warn!("Failed to install Ctrl+C handler: {}", e);
    }

    let mut source = match open_source(&args, &config) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let settings = PreviewSettings {
        window: Resolution::new(config.window.width, config.window.height),
        fps: config.preview.fps,
        max_frames: args.frames,
    };

    log::info!(
        "Preview {} {} in {} window at {} fps",
        source.dimensions(),
        source.pixel_format(),
        settings.window,
        settings.fps
    );

    let stats = run_preview(&source, &settings, &mut LogSink::default(), &CTRLC_RECEIVED);
    source.stop();

    log::info!(
        "Rendered {} frames ({} unique), mean interval {:.1} ms",
        stats.presented,
        stats.unique_frames,
        stats.mean_interval.as_secs_f64() * 1000.0
    );
}
