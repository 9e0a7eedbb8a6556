//! Whitespace border removal.
//!
//! Listing photos frequently arrive letterboxed inside a white or
//! transparent canvas. The trimmer samples the image on a coarse grid,
//! finds the bounding box of non-whitespace content and crops to it, with
//! guards that keep pathological inputs (all-white scans, sliver crops,
//! near-identity crops) untouched.

use super::Photo;
use image::{imageops, Rgba, RgbaImage};
use tracing::trace;

/// Pixels with every colour channel at or above this count as white.
const WHITE_MIN: u8 = 237;

/// Pixels with alpha below this count as transparent.
const ALPHA_MIN: u8 = 10;

/// Sampling grid granularity: one sample per `min(w, h) / STRIDE_DIVISOR`
/// pixels, floor of one.
const STRIDE_DIVISOR: u32 = 120;

/// The content box is expanded by this margin before cropping.
const EXPAND_PX: u32 = 1;

/// Crops differing from the original by at most this much on both axes
/// are not worth re-allocating for.
const NEAR_IDENTITY_PX: u32 = 4;

fn is_whitespace(pixel: &Rgba<u8>) -> bool {
    pixel[3] < ALPHA_MIN
        || (pixel[0] >= WHITE_MIN && pixel[1] >= WHITE_MIN && pixel[2] >= WHITE_MIN)
}

fn row_has_content(image: &RgbaImage, y: u32, stride: u32) -> bool {
    (0..image.width())
        .step_by(stride as usize)
        .any(|x| !is_whitespace(image.get_pixel(x, y)))
}

fn column_has_content(image: &RgbaImage, x: u32, top: u32, bottom: u32, stride: u32) -> bool {
    (top..=bottom)
        .step_by(stride as usize)
        .any(|y| !is_whitespace(image.get_pixel(x, y)))
}

/// Removes a uniform whitespace border from a photo.
///
/// Returns a photo with the same scale and orientation. The original is
/// returned unchanged when no content is found, when the crop would drop
/// below a third of either original dimension, or when the crop is within
/// a few pixels of the original on both axes.
pub fn trim_whitespace_border(photo: &Photo) -> Photo {
    let image = &photo.image;
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return photo.clone();
    }

    let stride = (width.min(height) / STRIDE_DIVISOR).max(1);

    // Top edge: first sampled row with content. None means the whole
    // sampled grid is whitespace.
    let Some(top) = (0..height)
        .step_by(stride as usize)
        .find(|&y| row_has_content(image, y, stride))
    else {
        trace!(width, height, "no content found, keeping original");
        return photo.clone();
    };

    let mut bottom = top;
    let mut y = height - 1;
    while y > top {
        if row_has_content(image, y, stride) {
            bottom = y;
            break;
        }
        y = y.saturating_sub(stride);
    }

    // Left and right edges only need the rows inside the vertical box.
    let Some(left) = (0..width)
        .step_by(stride as usize)
        .find(|&x| column_has_content(image, x, top, bottom, stride))
    else {
        return photo.clone();
    };

    let mut right = left;
    let mut x = width - 1;
    while x > left {
        if column_has_content(image, x, top, bottom, stride) {
            right = x;
            break;
        }
        x = x.saturating_sub(stride);
    }

    // Grow by a pixel so anti-aliased edges survive the coarse sampling.
    let x0 = left.saturating_sub(EXPAND_PX);
    let y0 = top.saturating_sub(EXPAND_PX);
    let x1 = (right + EXPAND_PX).min(width - 1);
    let y1 = (bottom + EXPAND_PX).min(height - 1);
    let crop_width = x1 - x0 + 1;
    let crop_height = y1 - y0 + 1;

    if crop_width * 3 < width || crop_height * 3 < height {
        trace!(
            crop_width,
            crop_height,
            width,
            height,
            "crop below one third of original, keeping original"
        );
        return photo.clone();
    }

    if width - crop_width <= NEAR_IDENTITY_PX && height - crop_height <= NEAR_IDENTITY_PX {
        return photo.clone();
    }

    trace!(
        x0,
        y0,
        crop_width,
        crop_height,
        "trimmed whitespace border"
    );
    Photo {
        image: imageops::crop_imm(image, x0, y0, crop_width, crop_height).to_image(),
        scale: photo.scale,
        orientation: photo.orientation,
    }
}
