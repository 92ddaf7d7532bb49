// Getting pixels in and out: decode an image file into a FrameBuffer,
// and write the masked composite back out as PNG.

use std::path::Path;

use image::{ImageFormat, RgbImage};
use tracing::info;

use crate::error::Error;
use crate::types::{FrameBuffer, pack_rgb, unpack_rgb};

/// Default export file name.
pub const DEFAULT_EXPORT_NAME: &str = "masked.png";

/// Decode any format the `image` crate understands. Alpha is dropped.
pub fn load_image(path: &Path) -> Result<FrameBuffer, Error> {
    let img = image::open(path)
        .map_err(|e| Error::ImageLoad(format!("{}: {e}", path.display())))?
        .to_rgb8();
    let frame = from_rgb_image(&img);
    info!(path = %path.display(), width = frame.width, height = frame.height, "decoded image");
    Ok(frame)
}

pub fn from_rgb_image(img: &RgbImage) -> FrameBuffer {
    let pixels = img.pixels().map(|p| pack_rgb(p[0], p[1], p[2])).collect();
    FrameBuffer {
        width: img.width() as usize,
        height: img.height() as usize,
        pixels,
    }
}

pub fn to_rgb_image(frame: &FrameBuffer) -> Result<RgbImage, Error> {
    let mut raw = Vec::with_capacity(frame.pixels.len() * 3);
    for &px in &frame.pixels {
        let (r, g, b) = unpack_rgb(px);
        raw.extend_from_slice(&[r, g, b]);
    }
    RgbImage::from_raw(frame.width as u32, frame.height as u32, raw).ok_or_else(|| {
        Error::Export(format!(
            "{}x{} canvas holds {} pixels",
            frame.width,
            frame.height,
            frame.pixels.len()
        ))
    })
}

/// Write `frame` to `path` as PNG, whatever the extension says.
pub fn save_png(frame: &FrameBuffer, path: &Path) -> Result<(), Error> {
    let img = to_rgb_image(frame)?;
    img.save_with_format(path, ImageFormat::Png)
        .map_err(|e| Error::Export(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), "masked image written");
    Ok(())
}
