//! PNG encoding and preview thumbnails.

use base64::Engine;
use image::{DynamicImage, ImageFormat};
use std::path::Path;

const THUMB_WIDTH: u32 = 320;
const THUMB_HEIGHT: u32 = 180;

/// Encode an image to PNG bytes in memory: no disk I/O.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut png_bytes = Vec::new();
    image.write_to(&mut std::io::Cursor::new(&mut png_bytes), ImageFormat::Png)?;
    Ok(png_bytes)
}

/// Downscaled preview of an encoded image as a `data:image/png;base64,` URL.
pub fn thumbnail_data_url(bytes: &[u8]) -> Result<String, image::ImageError> {
    let image = image::load_from_memory(bytes)?;
    let thumb = image.thumbnail(THUMB_WIDTH, THUMB_HEIGHT);
    let png = encode_png(&thumb)?;
    Ok(format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    ))
}

/// Media type declared to the model for a stored screenshot.
pub fn media_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbnail_fits_bounds_and_is_png() {
        let image = DynamicImage::new_rgb8(1920, 1080);
        let png = encode_png(&image).unwrap();
        let url = thumbnail_data_url(&png).unwrap();
        let data = url.strip_prefix("data:image/png;base64,").unwrap();
        let decoded = base64::engine::general_purpose::STANDARD.decode(data).unwrap();
        let thumb = image::load_from_memory(&decoded).unwrap();
        assert!(thumb.width() <= THUMB_WIDTH);
        assert!(thumb.height() <= THUMB_HEIGHT);
    }

    #[test]
    fn garbage_bytes_fail_to_preview() {
        assert!(thumbnail_data_url(b"not an image").is_err());
    }

    #[test]
    fn media_types() {
        assert_eq!(media_type_for(Path::new("a/b.PNG")), "image/png");
        assert_eq!(media_type_for(Path::new("shot.jpeg")), "image/jpeg");
        assert_eq!(media_type_for(Path::new("noext")), "image/png");
    }
}
