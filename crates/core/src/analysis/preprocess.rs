use image::imageops::{self, FilterType};
use ndarray::{Array4, Axis};

use crate::shared::frame::Frame;

/// Letterbox a frame to exactly `size` (`(width, height)`).
///
/// Scales by `min(W / w, H / h)` with bilinear filtering, truncating the
/// scaled dimensions, then centers the result on a black canvas.
pub fn fit_frame(frame: &Frame, size: (u32, u32)) -> Frame {
    let (fit_width, fit_height) = size;
    let width = frame.width();
    let height = frame.height();

    let scale = (fit_width as f64 / width as f64).min(fit_height as f64 / height as f64);
    let new_width = ((width as f64 * scale) as u32).clamp(1, fit_width);
    let new_height = ((height as f64 * scale) as u32).clamp(1, fit_height);

    let source = frame.to_rgb_image();
    let resized = if (new_width, new_height) == (width, height) {
        source
    } else {
        imageops::resize(&source, new_width, new_height, FilterType::Triangle)
    };

    let pad_x = (fit_width - new_width) / 2;
    let pad_y = (fit_height - new_height) / 2;
    let mut canvas = image::RgbImage::new(fit_width, fit_height);
    imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);

    Frame::from_rgb_image(canvas, frame.index())
}

/// Normalize a fitted frame into the detector's `[1, 3, H, W]` float input.
///
/// Planes keep the frame's RGB order, so plane 0 is red. The detector was
/// trained on RGB input; BGR pixels must be swapped before they get here.
pub fn prepare_detect_frame(frame: &Frame) -> Array4<f32> {
    frame
        .as_ndarray()
        .mapv(|v| v as f32 / 255.0)
        .permuted_axes([2, 0, 1])
        .insert_axis(Axis(0))
        .as_standard_layout()
        .into_owned()
}
