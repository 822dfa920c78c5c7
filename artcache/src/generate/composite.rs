//! Composite square layout and rendering.
//!
//! A square canvas is split into cells by image count:
//!
//! ```text
//!   2 images        3 images        4 images
//! +-----+-----+   +-----------+   +-----+-----+
//! |     |     |   |     0     |   |  0  |  1  |
//! |  0  |  1  |   +-----+-----+   +-----+-----+
//! |     |     |   |  1  |  2  |   |  2  |  3  |
//! +-----+-----+   +-----+-----+   +-----+-----+
//! ```
//!
//! Each image is scaled to cover its cell and the overflow is cropped
//! evenly from both sides.

use crate::error::ArtworkError;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};

/// Side length of the composite canvas in pixels.
pub const SQUARE_SIZE: u32 = 500;

/// JPEG quality for composites produced on the request path.
pub const SYNC_JPEG_QUALITY: u8 = 95;

/// JPEG quality for composites produced by queue workers.
pub const QUEUE_JPEG_QUALITY: u8 = 90;

/// A rectangular region of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Cell {
    const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Returns the cells for `count` images on a `size`×`size` canvas.
pub fn layout(count: usize, size: u32) -> Result<Vec<Cell>, ArtworkError> {
    let half = size / 2;
    let rest = size - half;
    let cells = match count {
        2 => vec![Cell::new(0, 0, half, size), Cell::new(half, 0, rest, size)],
        3 => vec![
            Cell::new(0, 0, size, half),
            Cell::new(0, half, half, rest),
            Cell::new(half, half, rest, rest),
        ],
        4 => vec![
            Cell::new(0, 0, half, half),
            Cell::new(half, 0, rest, half),
            Cell::new(0, half, half, rest),
            Cell::new(half, half, rest, rest),
        ],
        n => return Err(ArtworkError::UnsupportedLayout(n)),
    };
    Ok(cells)
}

/// Scales `image` to cover `cell` and crops it to the cell's size.
fn cover(image: &DynamicImage, cell: Cell) -> RgbImage {
    let src = image.to_rgb8();
    let (sw, sh) = (src.width().max(1) as f64, src.height().max(1) as f64);
    let src_aspect = sw / sh;
    let dst_aspect = cell.width as f64 / cell.height as f64;

    let (w, h) = if src_aspect > dst_aspect {
        let h = cell.height;
        let w = ((h as f64) * src_aspect).round() as u32;
        (w.max(cell.width), h)
    } else {
        let w = cell.width;
        let h = ((w as f64) / src_aspect).round() as u32;
        (w, h.max(cell.height))
    };

    let resized = imageops::resize(&src, w, h, FilterType::Lanczos3);
    let dx = (w - cell.width) / 2;
    let dy = (h - cell.height) / 2;
    imageops::crop_imm(&resized, dx, dy, cell.width, cell.height).to_image()
}

/// Draws `images` into a new square canvas following [`layout`].
pub fn compose(images: &[DynamicImage], size: u32) -> Result<RgbImage, ArtworkError> {
    let cells = layout(images.len(), size)?;
    let mut canvas = RgbImage::new(size, size);

    for (image, cell) in images.iter().zip(cells) {
        let tile = cover(image, cell);
        imageops::replace(&mut canvas, &tile, cell.x as i64, cell.y as i64);
    }

    Ok(canvas)
}

/// Encodes a canvas as JPEG.
pub fn encode_jpeg(canvas: &RgbImage, quality: u8) -> Result<Vec<u8>, ArtworkError> {
    let mut out = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
    canvas
        .write_with_encoder(encoder)
        .map_err(|e| ArtworkError::GenerationFailed(format!("JPEG encode failed: {}", e)))?;
    Ok(out)
}
