//! Thumbnail generation via the `image` crate.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};

/// Longest edge of a generated thumbnail, matching what the gallery grid
/// actually renders.
const THUMB_EDGE: u32 = 400;

/// Decodes `data` (format sniffed from the bytes) and re-encodes a JPEG
/// thumbnail bounded to 400px on the longest edge.
pub fn make_thumbnail(data: &[u8]) -> anyhow::Result<Vec<u8>> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .decode()?;

    // `thumbnail` scales to fit the bounds in either direction; images
    // already inside them are kept at native size.
    let thumb = if img.width() <= THUMB_EDGE && img.height() <= THUMB_EDGE {
        img
    } else {
        img.thumbnail(THUMB_EDGE, THUMB_EDGE)
    };
    let mut out = Vec::new();
    // JPEG has no alpha channel.
    thumb
        .into_rgb8()
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)?;
    Ok(out)
}
