//! Drawing modes and brush settings.

use crate::session::{SessionError, SessionResult};
use crate::stroke::{BrushColor, StrokeStyle};
use serde::{Deserialize, Serialize};

/// What pointer input on a page does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolMode {
    #[default]
    Pencil,
    Eraser,
    /// Pointer passes through to the document; no capture.
    Cursor,
}

impl ToolMode {
    pub fn name(&self) -> &'static str {
        match self {
            ToolMode::Pencil => "pencil",
            ToolMode::Eraser => "eraser",
            ToolMode::Cursor => "cursor",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pencil" => Some(ToolMode::Pencil),
            "eraser" => Some(ToolMode::Eraser),
            "cursor" => Some(ToolMode::Cursor),
            _ => None,
        }
    }

    /// Whether pointer input in this mode produces strokes.
    pub fn draws(&self) -> bool {
        !matches!(self, ToolMode::Cursor)
    }

    /// CSS cursor shown over page layers.
    pub fn cursor(&self) -> &'static str {
        if self.draws() { "crosshair" } else { "default" }
    }
}

/// Brush picked in the toolbar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushSettings {
    pub color: BrushColor,
    pub line_width: f64,
    pub opacity: f64,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            color: BrushColor::black(),
            line_width: 5.0,
            opacity: 1.0,
        }
    }
}

/// Current mode and brush, with the ranges the controls accept.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    mode: ToolMode,
    brush: BrushSettings,
    line_width_range: (f64, f64),
    opacity_range: (f64, f64),
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self::new(BrushSettings::default(), (1.0, 30.0), (0.1, 1.0))
    }
}

impl ToolSettings {
    pub fn new(brush: BrushSettings, line_width_range: (f64, f64), opacity_range: (f64, f64)) -> Self {
        Self {
            mode: ToolMode::default(),
            brush,
            line_width_range,
            opacity_range,
        }
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn brush(&self) -> &BrushSettings {
        &self.brush
    }

    pub fn set_mode(&mut self, mode: ToolMode) {
        self.mode = mode;
    }

    pub fn set_color(&mut self, token: &str) -> SessionResult<()> {
        self.brush.color = BrushColor::parse(token)?;
        Ok(())
    }

    pub fn set_line_width(&mut self, width: f64) -> SessionResult<()> {
        let (min, max) = self.line_width_range;
        if !(min..=max).contains(&width) {
            return Err(SessionError::LineWidthOutOfRange { value: width, min, max });
        }
        self.brush.line_width = width;
        Ok(())
    }

    pub fn set_opacity(&mut self, opacity: f64) -> SessionResult<()> {
        let (min, max) = self.opacity_range;
        if !(min..=max).contains(&opacity) {
            return Err(SessionError::OpacityOutOfRange { value: opacity, min, max });
        }
        self.brush.opacity = opacity;
        Ok(())
    }

    /// Style for a stroke started now, or `None` when the mode does not draw.
    pub fn stroke_style(&self) -> Option<StrokeStyle> {
        match self.mode {
            ToolMode::Cursor => None,
            ToolMode::Pencil => Some(StrokeStyle {
                color: self.brush.color.clone(),
                line_width: self.brush.line_width,
                opacity: self.brush.opacity,
                is_eraser: false,
            }),
            ToolMode::Eraser => Some(StrokeStyle {
                color: self.brush.color.clone(),
                line_width: self.brush.line_width,
                opacity: 1.0,
                is_eraser: true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_cursor() {
        assert_eq!(ToolMode::Pencil.cursor(), "crosshair");
        assert_eq!(ToolMode::Eraser.cursor(), "crosshair");
        assert_eq!(ToolMode::Cursor.cursor(), "default");
    }

    #[test]
    fn test_mode_names() {
        for mode in [ToolMode::Pencil, ToolMode::Eraser, ToolMode::Cursor] {
            assert_eq!(ToolMode::from_name(mode.name()), Some(mode));
        }
        assert_eq!(ToolMode::from_name(" Eraser "), Some(ToolMode::Eraser));
        assert_eq!(ToolMode::from_name("highlighter"), None);
        assert_eq!(serde_json::to_string(&ToolMode::Cursor).unwrap(), "\"cursor\"");
    }

    #[test]
    fn test_cursor_mode_has_no_style() {
        let mut tools = ToolSettings::default();
        tools.set_mode(ToolMode::Cursor);
        assert!(!tools.mode().draws());
        assert!(tools.stroke_style().is_none());
    }

    #[test]
    fn test_eraser_forces_full_opacity() {
        let mut tools = ToolSettings::default();
        tools.set_opacity(0.4).unwrap();
        tools.set_mode(ToolMode::Eraser);
        let style = tools.stroke_style().unwrap();
        assert!(style.is_eraser);
        assert!((style.opacity - 1.0).abs() < f64::EPSILON);

        tools.set_mode(ToolMode::Pencil);
        let style = tools.stroke_style().unwrap();
        assert!(!style.is_eraser);
        assert!((style.opacity - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejected_input_leaves_settings_unchanged() {
        let mut tools = ToolSettings::default();
        assert!(matches!(
            tools.set_line_width(0.0),
            Err(SessionError::LineWidthOutOfRange { .. })
        ));
        assert!(matches!(
            tools.set_opacity(1.5),
            Err(SessionError::OpacityOutOfRange { .. })
        ));
        assert!(matches!(tools.set_color("chartreuse"), Err(SessionError::Color(_))));

        let brush = tools.brush();
        assert!((brush.line_width - 5.0).abs() < f64::EPSILON);
        assert!((brush.opacity - 1.0).abs() < f64::EPSILON);
        assert_eq!(brush.color.as_str(), "#000000");
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let mut tools = ToolSettings::default();
        assert!(tools.set_line_width(1.0).is_ok());
        assert!(tools.set_line_width(30.0).is_ok());
        assert!(tools.set_opacity(0.1).is_ok());
        assert!(tools.set_color("#FFA500").is_ok());
        assert_eq!(tools.brush().color.as_str(), "#FFA500");
    }
}
