//! PNG export of annotation layers.

use crate::error::AppResult;
use pageink_render::{PixmapSurface, StrokeSurface};
use std::path::Path;

/// Encode RGBA pixel data to PNG bytes.
pub fn encode_png(rgba_data: &[u8], width: u32, height: u32) -> AppResult<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(rgba_data)?;
    }
    Ok(png_data)
}

/// Write one page layer as a PNG file. Returns false for unallocated surfaces.
pub fn write_surface_png(surface: &PixmapSurface, path: &Path) -> AppResult<bool> {
    let (width, height) = surface.size();
    if width == 0 || height == 0 {
        log::warn!("Skipping {}: surface has no size", path.display());
        return Ok(false);
    }
    let png_data = encode_png(&surface.to_rgba8(), width, height)?;
    std::fs::write(path, &png_data)?;
    log::info!("Wrote {} ({} bytes)", path.display(), png_data.len());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(&[0u8; 2 * 2 * 4], 2, 2).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_encode_rejects_short_buffer() {
        assert!(matches!(encode_png(&[0u8; 3], 2, 2), Err(AppError::Png(_))));
    }

    #[test]
    fn test_unallocated_surface_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page-0.png");
        assert!(!write_surface_png(&PixmapSurface::new(), &path).unwrap());
        assert!(!path.exists());
    }
}
