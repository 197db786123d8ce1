//! Configuration file handling for campipe.
//!
//! Loads configuration from `~/.config/campipe/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::camera::CaptureOptions;

/// Configuration file structure for campipe.
/// Loaded from ~/.config/campipe/config.toml (or custom path via --config).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub device: u32,
    #[serde(default = "default_true")]
    pub square_crop: bool,
    #[serde(default = "default_true")]
    pub force_rgba: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: 0,
            square_crop: true,
            force_rgba: true,
        }
    }
}

impl CameraConfig {
    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            device_index: self.device,
            square_crop: self.square_crop,
            force_rgba: self.force_rgba,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,
    #[serde(default = "default_window_height")]
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Still image used when the camera is disabled or unavailable
    #[serde(default)]
    pub image: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Render loop rate
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { fps: default_fps() }
    }
}

fn default_true() -> bool {
    true
}

fn default_window_width() -> u32 {
    800
}

fn default_window_height() -> u32 {
    600
}

fn default_fps() -> u32 {
    30
}

/// Commented default configuration written by `config init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# campipe configuration

[camera]
# Capture device index (/dev/videoN)
device = 0
# Crop the camera image to a centered square
square_crop = true
# Convert YUYV/UYVY frames to RGBA
force_rgba = true

[window]
width = 800
height = 600

[input]
# Still image used when the camera is disabled or unavailable
# image = "assets/sample.jpg"

[preview]
# Render loop rate (frames per second)
fps = 30
"#;

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                source: e,
            })?;
            log::debug!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] toml::ser::Error),
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("campipe").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/campipe/config.toml")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.camera.device, 0);
        assert!(config.camera.square_crop);
        assert!(config.camera.force_rgba);
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.preview.fps, 30);
        assert!(config.input.image.is_none());
    }

    #[test]
    fn test_default_template_matches_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_capture_options_from_config() {
        let camera = CameraConfig {
            device: 2,
            square_crop: false,
            force_rgba: true,
        };
        let options = camera.capture_options();
        assert_eq!(options.device_index, 2);
        assert!(!options.square_crop);
        assert!(options.force_rgba);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = Config::default();
        config.input.image = Some(PathBuf::from("assets/face.jpg"));
        let text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_default_path_ends_with_config_toml() {
        let path = default_path();
        assert!(path.ends_with("campipe/config.toml"));
    }
}
