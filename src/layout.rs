//! Placement of a captured image inside the output window.

/// Destination rectangle in window pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Scale a texture to fit the window while preserving its aspect ratio.
///
/// A texture wider than the window (relative to its height) spans the full
/// window width and is centered vertically; otherwise it spans the full
/// height and is centered horizontally.
///
/// ```text
///     Landscape window    Portrait window
///     +-+------+-+        +------+
///     | |      | |        +------+
///     | |      | |        |      |
///     +-+------+-+        +------+
///                         +------+
/// ```
pub fn fit_to_window(win_width: u32, win_height: u32, tex_width: u32, tex_height: u32) -> DrawRect {
    if win_width == 0 || win_height == 0 || tex_width == 0 || tex_height == 0 {
        return DrawRect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
    }

    let win_aspect = win_width as f32 / win_height as f32;
    let tex_aspect = tex_width as f32 / tex_height as f32;

    let scale = if win_aspect > tex_aspect {
        win_height as f32 / tex_height as f32
    } else {
        win_width as f32 / tex_width as f32
    };

    let scaled_w = scale * tex_width as f32;
    let scaled_h = scale * tex_height as f32;

    DrawRect {
        x: ((win_width as f32 - scaled_w) * 0.5) as i32,
        y: ((win_height as f32 - scaled_h) * 0.5) as i32,
        width: scaled_w as i32,
        height: scaled_h as i32,
    }
}
