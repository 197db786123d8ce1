//! Camera types and data structures.

use std::fmt;

/// Information about an available capture device.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    /// Device index for selection
    pub index: u32,
    /// Human-readable device name
    pub name: String,
    /// Device node or backend description
    pub description: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.description)
    }
}

/// Frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// VGA (640x480), the usual native mode of USB webcams
    pub const VGA: Resolution = Resolution {
        width: 640,
        height: 480,
    };

    /// HD (1280x720)
    pub const HD: Resolution = Resolution {
        width: 1280,
        height: 720,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels in one frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Largest centered square that fits inside this resolution.
    pub fn square(&self) -> Resolution {
        let side = self.width.min(self.height);
        Resolution::new(side, side)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::VGA
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Four-character pixel format code.
///
/// Values are opaque identifiers exchanged with the device and the consumer;
/// only equality is meaningful.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    /// Packed 4:2:2, byte order Y0 Cb Y1 Cr
    pub const YUYV: FourCc = FourCc(*b"YUYV");
    /// Packed 4:2:2, byte order Cb Y0 Cr Y1
    pub const UYVY: FourCc = FourCc(*b"UYVY");
    /// 8 bits per channel R G B A
    pub const RGBA: FourCc = FourCc(*b"RGBA");

    pub const fn new(code: &[u8; 4]) -> Self {
        FourCc(*code)
    }

    /// Bytes per pixel for the formats the pipeline produces.
    ///
    /// Returns `None` for tags the pipeline does not know how to size.
    pub fn bytes_per_pixel(&self) -> Option<usize> {
        match *self {
            FourCc::YUYV | FourCc::UYVY => Some(2),
            FourCc::RGBA => Some(4),
            _ => None,
        }
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({})", self)
    }
}

/// Byte ordering of a packed 4:2:2 luma-chroma quad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackedLayout {
    Yuyv,
    Uyvy,
}

impl PackedLayout {
    /// Resolve a device tag into a supported layout.
    pub fn from_fourcc(fourcc: FourCc) -> Result<Self, CameraError> {
        match fourcc {
            FourCc::YUYV => Ok(PackedLayout::Yuyv),
            FourCc::UYVY => Ok(PackedLayout::Uyvy),
            other => Err(CameraError::UnsupportedFormat(other)),
        }
    }

    pub fn fourcc(&self) -> FourCc {
        match self {
            PackedLayout::Yuyv => FourCc::YUYV,
            PackedLayout::Uyvy => FourCc::UYVY,
        }
    }

    /// Offsets of (Y0, Cb, Y1, Cr) within one 4-byte quad.
    pub fn indices(&self) -> [usize; 4] {
        match self {
            PackedLayout::Yuyv => [0, 1, 2, 3],
            PackedLayout::Uyvy => [1, 0, 3, 2],
        }
    }
}

/// Options requested by the consumer when configuring a session.
#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    /// Capture device index
    pub device_index: u32,
    /// Crop the native frame to a centered square
    pub square_crop: bool,
    /// Expand the packed native format into RGBA8888
    pub force_rgba: bool,
}

/// How each captured frame is turned into the published buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformMode {
    /// Whole native frame, byte for byte
    FullCopy,
    /// Crop rectangle, native format
    CroppedCopy,
    /// Crop rectangle, expanded to RGBA8888
    CroppedRgba,
}

/// Resolved, immutable capture configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Resolution delivered by the device
    pub native: Resolution,
    /// Format delivered by the device
    pub layout: PackedLayout,
    /// Resolution of the published buffer
    pub crop: Resolution,
    /// Top-left corner of the crop rectangle in native pixels
    pub offset: (u32, u32),
    /// Format of the published buffer
    pub output_format: FourCc,
    pub mode: TransformMode,
}

impl CaptureConfig {
    /// Resolve options against what the device reported.
    ///
    /// # Errors
    /// * `CameraError::UnsupportedFormat` - If the native tag is not YUYV or UYVY
    /// * `CameraError::InvalidGeometry` - If the native width or height is zero
    pub fn resolve(
        native: Resolution,
        native_format: FourCc,
        options: &CaptureOptions,
    ) -> Result<Self, CameraError> {
        let layout = PackedLayout::from_fourcc(native_format)?;
        if native.pixel_count() == 0 {
            return Err(CameraError::InvalidGeometry(native));
        }

        let crop = if options.square_crop {
            native.square()
        } else {
            native
        };
        let offset = super::frame_utils::crop_offset(native, crop);

        let (output_format, mode) = if options.force_rgba {
            (FourCc::RGBA, TransformMode::CroppedRgba)
        } else if crop == native {
            (layout.fourcc(), TransformMode::FullCopy)
        } else {
            (layout.fourcc(), TransformMode::CroppedCopy)
        };

        Ok(Self {
            native,
            layout,
            crop,
            offset,
            output_format,
            mode,
        })
    }

    /// Size in bytes of one native frame.
    pub fn native_frame_len(&self) -> usize {
        self.native.pixel_count() * 2
    }

    /// Size in bytes of one published frame.
    pub fn output_frame_len(&self) -> usize {
        let bpp = match self.mode {
            TransformMode::CroppedRgba => 4,
            TransformMode::FullCopy | TransformMode::CroppedCopy => 2,
        };
        self.crop.pixel_count() * bpp
    }
}

/// Errors that can occur during camera operations.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("Capture device {0} not found. Run 'list-cameras' to see available devices")]
    DeviceNotFound(u32),

    #[error("Pixel format {0} is not supported")]
    UnsupportedFormat(FourCc),

    #[error("Failed to open camera: {0}")]
    OpenFailed(String),

    #[error("Failed to start camera stream: {0}")]
    StreamFailed(String),

    #[error("Failed to capture frame: {0}")]
    CaptureFailed(String),

    #[error("Device reported an empty frame size {0}")]
    InvalidGeometry(Resolution),

    #[error("Capture thread is already running")]
    AlreadyRunning,

    #[error("Frame buffer too small: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_info_display() {
        let info = CameraInfo {
            index: 0,
            name: "Test Camera".to_string(),
            description: "/dev/video0".to_string(),
        };
        assert_eq!(format!("{}", info), "[0] Test Camera (/dev/video0)");
    }

    #[test]
    fn test_fourcc_display() {
        assert_eq!(FourCc::YUYV.to_string(), "YUYV");
        assert_eq!(FourCc::new(b"RGB3").to_string(), "RGB3");
        assert_eq!(FourCc([0, b'A', b'B', b'C']).to_string(), "?ABC");
    }

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(FourCc::YUYV.bytes_per_pixel(), Some(2));
        assert_eq!(FourCc::UYVY.bytes_per_pixel(), Some(2));
        assert_eq!(FourCc::RGBA.bytes_per_pixel(), Some(4));
        assert_eq!(FourCc::new(b"MJPG").bytes_per_pixel(), None);
    }

    #[test]
    fn test_layout_from_fourcc() {
        assert_eq!(PackedLayout::from_fourcc(FourCc::YUYV).unwrap(), PackedLayout::Yuyv);
        assert_eq!(PackedLayout::from_fourcc(FourCc::UYVY).unwrap(), PackedLayout::Uyvy);
        match PackedLayout::from_fourcc(FourCc::new(b"RGB3")) {
            Err(CameraError::UnsupportedFormat(tag)) => assert_eq!(tag, FourCc::new(b"RGB3")),
            other => panic!("Expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_square_crop_vga() {
        let options = CaptureOptions {
            square_crop: true,
            ..Default::default()
        };
        let config = CaptureConfig::resolve(Resolution::VGA, FourCc::YUYV, &options).unwrap();
        assert_eq!(config.crop, Resolution::new(480, 480));
        assert_eq!(config.offset, (80, 0));
        assert_eq!(config.mode, TransformMode::CroppedCopy);
        assert_eq!(config.output_format, FourCc::YUYV);
        assert_eq!(config.output_frame_len(), 480 * 480 * 2);
    }

    #[test]
    fn test_resolve_passthrough() {
        let config =
            CaptureConfig::resolve(Resolution::HD, FourCc::UYVY, &CaptureOptions::default())
                .unwrap();
        assert_eq!(config.crop, Resolution::HD);
        assert_eq!(config.offset, (0, 0));
        assert_eq!(config.mode, TransformMode::FullCopy);
        assert_eq!(config.output_format, FourCc::UYVY);
    }

    #[test]
    fn test_resolve_forced_rgba() {
        let options = CaptureOptions {
            force_rgba: true,
            ..Default::default()
        };
        let config = CaptureConfig::resolve(Resolution::VGA, FourCc::YUYV, &options).unwrap();
        assert_eq!(config.output_format, FourCc::RGBA);
        assert_eq!(config.mode, TransformMode::CroppedRgba);
        assert_eq!(config.output_frame_len(), 640 * 480 * 4);
    }

    #[test]
    fn test_resolve_rejects_unknown_native_format() {
        let options = CaptureOptions {
            force_rgba: true,
            ..Default::default()
        };
        let result = CaptureConfig::resolve(Resolution::VGA, FourCc::new(b"MJPG"), &options);
        assert!(matches!(result, Err(CameraError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_resolve_rejects_empty_frame() {
        let options = CaptureOptions {
            square_crop: true,
            force_rgba: true,
            ..Default::default()
        };
        for native in [Resolution::new(0, 4), Resolution::new(4, 0), Resolution::new(0, 0)] {
            match CaptureConfig::resolve(native, FourCc::YUYV, &options) {
                Err(CameraError::InvalidGeometry(res)) => assert_eq!(res, native),
                other => panic!("Expected InvalidGeometry, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_camera_error_display() {
        assert!(CameraError::DeviceNotFound(5).to_string().contains('5'));
        assert_eq!(
            CameraError::UnsupportedFormat(FourCc::new(b"RGB3")).to_string(),
            "Pixel format RGB3 is not supported"
        );
        assert_eq!(
            CameraError::AlreadyRunning.to_string(),
            "Capture thread is already running"
        );
    }
}
