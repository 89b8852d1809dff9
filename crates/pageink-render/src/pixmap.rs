//! CPU raster surface backed by a tiny-skia pixmap.

use crate::surface::{RenderResult, RendererError, StrokeSurface, SurfaceProvider};
use kurbo::Point;
use pageink_core::{PageIndex, StrokeStyle};
use peniko::Color;
use tiny_skia::{BlendMode, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

/// Annotation layer rendered in memory. Empty until first resized.
#[derive(Debug, Clone, Default)]
pub struct PixmapSurface {
    pixmap: Option<Pixmap>,
}

impl PixmapSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a surface of the given size.
    pub fn with_size(width: u32, height: u32) -> RenderResult<Self> {
        let mut surface = Self::new();
        surface.resize(width, height)?;
        Ok(surface)
    }

    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    /// Straight (non-premultiplied) RGBA bytes, row-major.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let Some(pixmap) = &self.pixmap else {
            return Vec::new();
        };
        pixmap
            .pixels()
            .iter()
            .flat_map(|pixel| {
                let c = pixel.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect()
    }

    /// Alpha of one pixel, 0 outside the surface.
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.pixmap
            .as_ref()
            .and_then(|pixmap| pixmap.pixel(x, y))
            .map_or(0, |pixel| pixel.alpha())
    }
}

fn paint_color(color: Color, opacity: f64) -> tiny_skia::Color {
    let rgba = color.to_rgba8();
    let alpha = (f64::from(rgba.a) * opacity.clamp(0.0, 1.0)).round() as u8;
    tiny_skia::Color::from_rgba8(rgba.r, rgba.g, rgba.b, alpha)
}

impl StrokeSurface for PixmapSurface {
    fn size(&self) -> (u32, u32) {
        self.pixmap
            .as_ref()
            .map_or((0, 0), |pixmap| (pixmap.width(), pixmap.height()))
    }

    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        let pixmap = Pixmap::new(width, height).ok_or(RendererError::InvalidSize { width, height })?;
        self.pixmap = Some(pixmap);
        Ok(())
    }

    fn clear(&mut self) {
        if let Some(pixmap) = &mut self.pixmap {
            pixmap.fill(tiny_skia::Color::TRANSPARENT);
        }
    }

    fn stroke_polyline(&mut self, points: &[Point], style: &StrokeStyle) -> RenderResult<()> {
        let pixmap = self
            .pixmap
            .as_mut()
            .ok_or_else(|| RendererError::SurfaceUnavailable("pixmap not allocated".to_string()))?;

        let [first, rest @ ..] = points else {
            return Ok(());
        };
        let mut builder = PathBuilder::new();
        builder.move_to(first.x as f32, first.y as f32);
        for point in rest {
            builder.line_to(point.x as f32, point.y as f32);
        }
        // Degenerate paths (single or repeated points) produce nothing.
        let Some(path) = builder.finish() else {
            return Ok(());
        };

        let mut paint = Paint::default();
        paint.anti_alias = true;
        if style.is_eraser {
            paint.set_color(tiny_skia::Color::BLACK);
            paint.blend_mode = BlendMode::DestinationOut;
        } else {
            paint.set_color(paint_color(style.color.to_color(), style.effective_opacity()));
            paint.blend_mode = BlendMode::SourceOver;
        }

        let stroke = Stroke {
            width: style.line_width as f32,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        Ok(())
    }
}

/// Creates in-memory surfaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixmapProvider;

impl SurfaceProvider for PixmapProvider {
    type Surface = PixmapSurface;

    fn create(&mut self, page: PageIndex) -> RenderResult<PixmapSurface> {
        log::debug!("Creating pixmap surface for page {}", page);
        Ok(PixmapSurface::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pageink_core::BrushColor;

    fn line() -> Vec<Point> {
        vec![Point::new(10.0, 50.0), Point::new(90.0, 50.0)]
    }

    fn style(color: &str, opacity: f64, is_eraser: bool) -> StrokeStyle {
        StrokeStyle {
            color: BrushColor::parse(color).unwrap(),
            line_width: 10.0,
            opacity,
            is_eraser,
        }
    }

    #[test]
    fn test_unallocated_surface() {
        let mut surface = PixmapSurface::new();
        assert_eq!(surface.size(), (0, 0));
        assert!(surface.to_rgba8().is_empty());
        assert!(matches!(
            surface.stroke_polyline(&line(), &StrokeStyle::default()),
            Err(RendererError::SurfaceUnavailable(_))
        ));
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let mut surface = PixmapSurface::new();
        assert!(matches!(
            surface.resize(0, 10),
            Err(RendererError::InvalidSize { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_stroke_paints_color() {
        let mut surface = PixmapSurface::with_size(100, 100).unwrap();
        surface.stroke_polyline(&line(), &style("#ff0000", 1.0, false)).unwrap();

        let pixel = surface.pixmap().unwrap().pixel(50, 50).unwrap().demultiply();
        assert_eq!((pixel.red(), pixel.green(), pixel.blue(), pixel.alpha()), (255, 0, 0, 255));
        assert_eq!(surface.alpha_at(50, 80), 0);
    }

    #[test]
    fn test_opacity_scales_alpha() {
        let mut surface = PixmapSurface::with_size(100, 100).unwrap();
        surface.stroke_polyline(&line(), &style("#0000ff", 0.5, false)).unwrap();
        let alpha = surface.alpha_at(50, 50);
        assert!((126..=129).contains(&alpha), "alpha {alpha}");
    }

    #[test]
    fn test_eraser_punches_hole() {
        let mut surface = PixmapSurface::with_size(100, 100).unwrap();
        surface.stroke_polyline(&line(), &style("#000000", 1.0, false)).unwrap();
        // Eraser opacity and colour are ignored.
        surface.stroke_polyline(&line(), &style("#ff0000", 0.2, true)).unwrap();
        assert_eq!(surface.alpha_at(50, 50), 0);
    }

    #[test]
    fn test_clear_and_degenerate_paths() {
        let mut surface = PixmapSurface::with_size(100, 100).unwrap();
        surface.stroke_polyline(&line(), &StrokeStyle::default()).unwrap();
        surface.clear();
        assert_eq!(surface.alpha_at(50, 50), 0);

        assert!(surface.stroke_polyline(&[], &StrokeStyle::default()).is_ok());
        assert!(surface.stroke_polyline(&[Point::new(5.0, 5.0)], &StrokeStyle::default()).is_ok());
        assert!(surface.to_rgba8().iter().all(|b| *b == 0));
    }
}
