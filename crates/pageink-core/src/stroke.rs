//! Freehand annotation strokes.

use kurbo::{Point, Rect};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Index of a page container within the rendered document.
pub type PageIndex = usize;

/// Swatches offered by the default colour picker.
pub const DEFAULT_PALETTE: [&str; 15] = [
    "#000000", "#FFFFFF", "#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#FF00FF", "#00FFFF",
    "#FFA500", "#800080", "#A52A2A", "#808080", "#FFB6C1", "#98FB98", "#87CEEB",
];

/// Identifier assigned to a stroke when it is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StrokeId(pub u64);

impl fmt::Display for StrokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A colour token that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognised colour token: {0:?}")]
pub struct InvalidColor(pub String);

/// Brush colour, kept as the token the picker produced (`#rgb`, `#rrggbb` or `#rrggbbaa`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BrushColor(String);

impl BrushColor {
    /// Validate a colour token.
    pub fn parse(token: &str) -> Result<Self, InvalidColor> {
        let token = token.trim();
        match parse_hex_color(token) {
            Some(_) => Ok(Self(token.to_string())),
            None => Err(InvalidColor(token.to_string())),
        }
    }

    pub fn black() -> Self {
        Self("#000000".to_string())
    }

    /// The token as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve the token to an RGBA colour.
    pub fn to_color(&self) -> Color {
        parse_hex_color(&self.0).unwrap_or(Color::BLACK)
    }
}

impl Default for BrushColor {
    fn default() -> Self {
        Self::black()
    }
}

impl TryFrom<String> for BrushColor {
    type Error = InvalidColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BrushColor> for String {
    fn from(color: BrushColor) -> Self {
        color.0
    }
}

impl fmt::Display for BrushColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a CSS hex colour like "#f00", "#ff0000" or "#ff000080".
fn parse_hex_color(s: &str) -> Option<Color> {
    let hex = s.strip_prefix('#')?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let short = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    match hex.len() {
        3 => Some(Color::from_rgba8(short(0)?, short(1)?, short(2)?, 255)),
        6 => Some(Color::from_rgba8(channel(0)?, channel(2)?, channel(4)?, 255)),
        8 => Some(Color::from_rgba8(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
        _ => None,
    }
}

/// Visual properties of a stroke, fixed when the stroke starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: BrushColor,
    /// Line width in page pixels (positive).
    pub line_width: f64,
    /// Opacity in `(0, 1]`.
    pub opacity: f64,
    /// Erasers punch holes into the page layer instead of painting.
    pub is_eraser: bool,
}

impl StrokeStyle {
    /// Opacity used when compositing. Erasers always erase fully.
    pub fn effective_opacity(&self) -> f64 {
        if self.is_eraser { 1.0 } else { self.opacity }
    }
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: BrushColor::black(),
            line_width: 5.0,
            opacity: 1.0,
            is_eraser: false,
        }
    }
}

/// A committed stroke. Immutable once it enters the history.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub(crate) id: StrokeId,
    pub(crate) page: PageIndex,
    pub(crate) points: Vec<Point>,
    pub(crate) style: StrokeStyle,
}

impl Stroke {
    pub fn id(&self) -> StrokeId {
        self.id
    }

    /// Page that owns the stroke.
    pub fn page(&self) -> PageIndex {
        self.page
    }

    /// Points in page-local pixel coordinates.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    pub fn is_eraser(&self) -> bool {
        self.style.is_eraser
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Strokes with fewer than two points have nothing to draw.
    pub fn is_drawable(&self) -> bool {
        self.points.len() >= 2
    }

    /// Bounding box of the centre line, grown by half the line width.
    pub fn bounds(&self) -> Rect {
        polyline_bounds(&self.points).inflate(self.style.line_width / 2.0, self.style.line_width / 2.0)
    }
}

pub(crate) fn polyline_bounds(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::ZERO;
    };
    points
        .iter()
        .skip(1)
        .fold(Rect::from_points(*first, *first), |rect, p| rect.union_pt(*p))
}
