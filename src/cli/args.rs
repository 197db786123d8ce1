//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use campipe::config::Config;

/// Camera preview feeding a separate-rate render loop
#[derive(Parser, Debug)]
#[command(name = "campipe")]
#[command(version, about = "Camera capture pipeline preview", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Still image shown when the camera is disabled or unavailable
    pub image: Option<PathBuf>,

    /// Disable the camera and show the still image
    #[arg(short = 'x', long)]
    pub no_camera: bool,

    /// Camera device index (from list-cameras)
    #[arg(long)]
    pub camera: Option<u32>,

    /// Keep the native aspect ratio instead of cropping to a square
    #[arg(long)]
    pub no_crop: bool,

    /// Publish frames in the native YUYV/UYVY format instead of RGBA
    #[arg(long)]
    pub native: bool,

    /// Use the built-in test pattern instead of a capture device
    #[arg(long)]
    pub synthetic: bool,

    /// Stop after this many render frames
    #[arg(long)]
    pub frames: Option<u64>,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available cameras
    ListCameras,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

impl Args {
    /// Overlay command-line flags on top of file configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(index) = self.camera {
            config.camera.device = index;
        }
        if self.no_crop {
            config.camera.square_crop = false;
        }
        if self.native {
            config.camera.force_rgba = false;
        }
        if let Some(image) = &self.image {
            config.input.image = Some(image.clone());
        }
    }
}
