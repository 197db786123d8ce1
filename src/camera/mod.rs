//! Camera capture pipeline.
//!
//! A background thread pulls frames from a [`CaptureDevice`], crops and
//! converts them, and publishes the latest one for a render loop running at
//! its own rate:
//! - Session setup and the consumer API via [`CaptureSession`]
//! - Device backends via [`CaptureDevice`] ([`SyntheticDevice`], and
//!   `V4l2Device` on Linux with the default `v4l` feature)
//! - Pixel transforms in [`frame_utils`]

mod buffer;
mod capture;
mod capture_loop;
mod device;
pub mod frame_utils;
mod synthetic;
mod types;
#[cfg(all(feature = "v4l", target_os = "linux"))]
mod v4l2;

pub use buffer::{FrameRef, FrameSlots, Publish};
pub use capture::CaptureSession;
pub use device::{list_devices, list_devices_in, CaptureDevice, DeviceOpener};
pub use synthetic::SyntheticDevice;
pub use types::{
    CameraError, CameraInfo, CaptureConfig, CaptureOptions, FourCc, PackedLayout, Resolution,
    TransformMode,
};
#[cfg(all(feature = "v4l", target_os = "linux"))]
pub use v4l2::V4l2Device;
