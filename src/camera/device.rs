//! Capture device abstraction and enumeration.

use std::path::Path;

use super::types::{CameraError, CameraInfo, FourCc, Resolution};

/// A video capture device delivering frames in its native format.
///
/// Frames are borrowed: the slice returned by [`acquire_frame`] stays valid
/// until [`release_frame`] is called, and the borrow checker keeps callers
/// from holding it any longer.
///
/// [`acquire_frame`]: CaptureDevice::acquire_frame
/// [`release_frame`]: CaptureDevice::release_frame
pub trait CaptureDevice: Send {
    /// Human-readable device name, for logging.
    fn name(&self) -> String;

    /// Native frame size.
    fn resolution(&self) -> Resolution;

    /// Native pixel format tag.
    fn pixel_format(&self) -> FourCc;

    /// Begin streaming. Called once from the capture thread.
    fn start_streaming(&mut self) -> Result<(), CameraError>;

    /// Stop streaming. Called when the capture thread exits.
    fn stop_streaming(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    /// Block until the next frame is available and borrow it.
    fn acquire_frame(&mut self) -> Result<&[u8], CameraError>;

    /// Hand the last acquired frame back to the device.
    fn release_frame(&mut self) {}
}

impl<D: CaptureDevice + ?Sized> CaptureDevice for Box<D> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn resolution(&self) -> Resolution {
        (**self).resolution()
    }

    fn pixel_format(&self) -> FourCc {
        (**self).pixel_format()
    }

    fn start_streaming(&mut self) -> Result<(), CameraError> {
        (**self).start_streaming()
    }

    fn stop_streaming(&mut self) -> Result<(), CameraError> {
        (**self).stop_streaming()
    }

    fn acquire_frame(&mut self) -> Result<&[u8], CameraError> {
        (**self).acquire_frame()
    }

    fn release_frame(&mut self) {
        (**self).release_frame()
    }
}

/// Opens capture devices by index.
pub trait DeviceOpener {
    type Device: CaptureDevice + 'static;

    /// Open the device at `index`, failing with
    /// [`CameraError::DeviceNotFound`] when there is none.
    fn open(&self, index: u32) -> Result<Self::Device, CameraError>;
}

impl<F, D> DeviceOpener for F
where
    F: Fn(u32) -> Result<D, CameraError>,
    D: CaptureDevice + 'static,
{
    type Device = D;

    fn open(&self, index: u32) -> Result<D, CameraError> {
        self(index)
    }
}

/// List V4L2 device nodes (`/dev/videoN`) present on the system.
///
/// Returns an empty list when there are none or `/dev` is not readable.
pub fn list_devices() -> Result<Vec<CameraInfo>, CameraError> {
    list_devices_in(Path::new("/dev"))
}

/// List `videoN` nodes inside `dir`, sorted by index.
pub fn list_devices_in(dir: &Path) -> Result<Vec<CameraInfo>, CameraError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Cannot read {}: {}", dir.display(), e);
            return Ok(Vec::new());
        }
    };

    let mut devices: Vec<CameraInfo> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let file_name = entry.file_name();
            let name = file_name.to_str()?;
            let index = name.strip_prefix("video")?.parse::<u32>().ok()?;
            Some(CameraInfo {
                index,
                name: device_label(dir, name),
                description: entry.path().display().to_string(),
            })
        })
        .collect();

    devices.sort_by_key(|d| d.index);
    Ok(devices)
}

/// Card name from sysfs when available, the node name otherwise.
fn device_label(dir: &Path, node: &str) -> String {
    if dir == Path::new("/dev") {
        let sysfs = Path::new("/sys/class/video4linux").join(node).join("name");
        if let Ok(name) = std::fs::read_to_string(sysfs) {
            let name = name.trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }
    node.to_string()
}
