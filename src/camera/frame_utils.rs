//! Frame cropping and pixel format conversion.
//!
//! All functions write into a caller-owned output slice that is allocated
//! once per session; nothing here allocates per frame.

use super::types::{CameraError, CaptureConfig, FourCc, PackedLayout, Resolution, TransformMode};

/// Top-left corner of a crop rectangle centered inside `native`.
///
/// The horizontal offset is rounded down to an even pixel so the crop
/// starts on a chroma pair of a packed 4:2:2 row. This intentionally differs
/// from the exact center by one pixel when `(native - crop) / 2` is odd.
pub fn crop_offset(native: Resolution, crop: Resolution) -> (u32, u32) {
    let x = native.width.saturating_sub(crop.width) / 2;
    let y = native.height.saturating_sub(crop.height) / 2;
    (x & !1, y)
}

fn check_crop(crop: Resolution) -> Result<(), CameraError> {
    if crop.pixel_count() == 0 {
        return Err(CameraError::InvalidGeometry(crop));
    }
    Ok(())
}

fn check_len(expected: usize, actual: usize) -> Result<(), CameraError> {
    if actual < expected {
        return Err(CameraError::BufferSize { expected, actual });
    }
    Ok(())
}

/// Copy a whole native frame into `dst` byte for byte.
pub fn copy_full(src: &[u8], dst: &mut [u8], format: FourCc) -> Result<(), CameraError> {
    PackedLayout::from_fourcc(format)?;
    check_len(dst.len(), src.len())?;
    let len = dst.len();
    dst.copy_from_slice(&src[..len]);
    Ok(())
}

/// Copy the crop rectangle of a packed 4:2:2 frame into `dst`.
///
/// Input rows use the native stride, output rows the cropped stride.
pub fn copy_cropped(
    src: &[u8],
    native_width: u32,
    offset: (u32, u32),
    crop: Resolution,
    dst: &mut [u8],
    format: FourCc,
) -> Result<(), CameraError> {
    PackedLayout::from_fourcc(format)?;
    check_crop(crop)?;

    let src_stride = native_width as usize * 2;
    let dst_stride = crop.width as usize * 2;
    let (ox, oy) = (offset.0 as usize, offset.1 as usize);
    let rows = crop.height as usize;

    check_len((oy + rows) * src_stride, src.len())?;
    check_len(rows * dst_stride, dst.len())?;
    if ox * 2 + dst_stride > src_stride {
        return Err(CameraError::BufferSize {
            expected: ox * 2 + dst_stride,
            actual: src_stride,
        });
    }

    for (row, out) in dst.chunks_exact_mut(dst_stride).take(rows).enumerate() {
        let start = (oy + row) * src_stride + ox * 2;
        out.copy_from_slice(&src[start..start + dst_stride]);
    }
    Ok(())
}

/// Convert one luma sample with a shared chroma pair into RGB.
///
/// Integer BT.601 with coefficients scaled by 1000.
#[inline]
pub fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let c = y as i32 - 16;
    let d = cb as i32 - 128;
    let e = cr as i32 - 128;

    let r = (1164 * c + 1596 * e) / 1000;
    let g = (1164 * c - 392 * d - 813 * e) / 1000;
    let b = (1164 * c + 2017 * d) / 1000;

    [
        r.clamp(0, 255) as u8,
        g.clamp(0, 255) as u8,
        b.clamp(0, 255) as u8,
    ]
}

/// Crop a packed 4:2:2 frame and expand it into RGBA8888.
///
/// Each 4-byte quad produces two RGBA pixels sharing one chroma pair.
/// Alpha is always 255.
pub fn convert_to_rgba(
    src: &[u8],
    native_width: u32,
    offset: (u32, u32),
    crop: Resolution,
    dst: &mut [u8],
    format: FourCc,
) -> Result<(), CameraError> {
    let [y0_idx, cb_idx, y1_idx, cr_idx] = PackedLayout::from_fourcc(format)?.indices();
    check_crop(crop)?;

    let src_stride = native_width as usize * 2;
    let width = crop.width as usize;
    let rows = crop.height as usize;
    let dst_stride = width * 4;
    let (ox, oy) = (offset.0 as usize, offset.1 as usize);
    // Quads touched per row, including a trailing half-quad for odd widths
    let row_bytes = width.div_ceil(2) * 4;

    check_len((oy + rows) * src_stride, src.len())?;
    check_len(rows * dst_stride, dst.len())?;
    if ox * 2 + row_bytes > src_stride {
        return Err(CameraError::BufferSize {
            expected: ox * 2 + row_bytes,
            actual: src_stride,
        });
    }

    for (row, out) in dst.chunks_exact_mut(dst_stride).take(rows).enumerate() {
        let start = (oy + row) * src_stride + ox * 2;
        let line = &src[start..start + row_bytes];

        for (quad, pixels) in line.chunks_exact(4).zip(out.chunks_mut(8)) {
            let cb = quad[cb_idx];
            let cr = quad[cr_idx];

            let [r, g, b] = ycbcr_to_rgb(quad[y0_idx], cb, cr);
            pixels[..4].copy_from_slice(&[r, g, b, 255]);

            if pixels.len() == 8 {
                let [r, g, b] = ycbcr_to_rgb(quad[y1_idx], cb, cr);
                pixels[4..].copy_from_slice(&[r, g, b, 255]);
            }
        }
    }
    Ok(())
}

/// Produce one output frame from one native frame according to `config`.
///
/// `format` is the tag the device attached to this frame. On error `dst`
/// is left untouched.
pub fn transform_frame(
    config: &CaptureConfig,
    src: &[u8],
    format: FourCc,
    dst: &mut [u8],
) -> Result<(), CameraError> {
    let offset = config.offset;
    match config.mode {
        TransformMode::FullCopy => copy_full(src, dst, format),
        TransformMode::CroppedCopy => copy_cropped(
            src,
            config.native.width,
            offset,
            config.crop,
            dst,
            format,
        ),
        TransformMode::CroppedRgba => convert_to_rgba(
            src,
            config.native.width,
            offset,
            config.crop,
            dst,
            format,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_offset_square_vga() {
        let native = Resolution::VGA;
        assert_eq!(crop_offset(native, native.square()), (80, 0));
    }

    #[test]
    fn test_crop_offset_portrait() {
        let native = Resolution::new(480, 640);
        assert_eq!(crop_offset(native, native.square()), (0, 80));
    }

    #[test]
    fn test_crop_offset_rounds_to_chroma_pair() {
        // (644 - 480) / 2 = 82 is already even; (646 - 480) / 2 = 83 is not
        assert_eq!(crop_offset(Resolution::new(644, 480), Resolution::new(480, 480)), (82, 0));
        assert_eq!(crop_offset(Resolution::new(646, 480), Resolution::new(480, 480)), (82, 0));
    }

    #[test]
    fn test_ycbcr_black_and_white() {
        assert_eq!(ycbcr_to_rgb(16, 128, 128), [0, 0, 0]);
        assert_eq!(ycbcr_to_rgb(235, 128, 128), [254, 254, 254]);
        assert_eq!(ycbcr_to_rgb(255, 128, 128), [255, 255, 255]);
        assert_eq!(ycbcr_to_rgb(0, 128, 128), [0, 0, 0]);
    }

    #[test]
    fn test_ycbcr_saturated_red() {
        // BT.601 red: Y=81, Cb=90, Cr=240
        let [r, g, b] = ycbcr_to_rgb(81, 90, 240);
        assert!(r >= 250, "r = {}", r);
        assert!(g <= 5, "g = {}", g);
        assert!(b <= 5, "b = {}", b);
    }

    #[test]
    fn test_uyvy_byte_order() {
        // One quad, 2x1 pixels: Y0 = 16 (black), Y1 = 255 (white)
        let yuyv = [16, 128, 255, 128];
        let uyvy = [128, 16, 128, 255];
        let mut a = [0u8; 8];
        let mut b = [0u8; 8];
        let res = Resolution::new(2, 1);
        convert_to_rgba(&yuyv, 2, (0, 0), res, &mut a, FourCc::YUYV).unwrap();
        convert_to_rgba(&uyvy, 2, (0, 0), res, &mut b, FourCc::UYVY).unwrap();
        assert_eq!(a, [0, 0, 0, 255, 255, 255, 255, 255]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_rgba_odd_width_writes_half_quad() {
        let src = [16, 128, 255, 128, 16, 128, 255, 128];
        let mut dst = [7u8; 4];
        let crop = Resolution::new(1, 1);
        convert_to_rgba(&src, 4, (0, 0), crop, &mut dst, FourCc::YUYV).unwrap();
        assert_eq!(dst, [0, 0, 0, 255]);
    }

    #[test]
    fn test_empty_crop_is_error() {
        let src = [0u8; 16];
        let mut dst = [9u8; 8];
        for crop in [Resolution::new(0, 2), Resolution::new(2, 0)] {
            let copied = copy_cropped(&src, 4, (0, 0), crop, &mut dst, FourCc::YUYV);
            assert!(matches!(copied, Err(CameraError::InvalidGeometry(_))));
            let converted = convert_to_rgba(&src, 4, (0, 0), crop, &mut dst, FourCc::UYVY);
            assert!(matches!(converted, Err(CameraError::InvalidGeometry(_))));
        }
        assert_eq!(dst, [9u8; 8]);
    }

    #[test]
    fn test_copy_full_rejects_unknown_format() {
        let src = [1u8; 8];
        let mut dst = [0u8; 8];
        let result = copy_full(&src, &mut dst, FourCc::new(b"RGB3"));
        assert!(matches!(result, Err(CameraError::UnsupportedFormat(_))));
        assert_eq!(dst, [0u8; 8]);
    }

    #[test]
    fn test_copy_cropped_short_source_is_error() {
        let src = [0u8; 16];
        let mut dst = [0u8; 8];
        let result = copy_cropped(&src, 4, (0, 2), Resolution::new(2, 2), &mut dst, FourCc::YUYV);
        assert!(matches!(result, Err(CameraError::BufferSize { .. })));
    }

    #[test]
    fn test_copy_cropped_center() {
        // 6x2 native YUYV frame, each byte tagged with its position
        let src: Vec<u8> = (0..24).collect();
        let mut dst = [0u8; 8];
        let native = Resolution::new(6, 2);
        let crop = Resolution::new(2, 2);
        copy_cropped(&src, 6, crop_offset(native, crop), crop, &mut dst, FourCc::YUYV).unwrap();
        assert_eq!(dst, [4, 5, 6, 7, 16, 17, 18, 19]);
    }
}
