//! Session configuration.

use crate::timing::Duration;
use crate::tool::BrushSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tunables for an annotation session. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Class marking page container elements in the markup.
    pub page_class: String,
    /// Delay after markup injection before page geometry is trusted.
    pub settle_delay_ms: u64,
    /// Minimum spacing between signal-driven geometry recomputations.
    pub recompute_interval_ms: u64,
    /// Visible fraction at which a page counts as intersecting the viewport.
    pub intersection_threshold: f64,
    /// Brush used until the toolbar changes it.
    pub brush: BrushSettings,
    /// Accepted line widths, inclusive.
    pub line_width_range: (f64, f64),
    /// Accepted opacities, inclusive.
    pub opacity_range: (f64, f64),
    /// Query parameter naming the markup source.
    pub markup_param: String,
    /// Markup source used when the query parameter is absent.
    pub default_source: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_class: "page".to_string(),
            settle_delay_ms: 500,
            recompute_interval_ms: 50,
            intersection_threshold: 0.1,
            brush: BrushSettings::default(),
            line_width_range: (1.0, 30.0),
            opacity_range: (0.1, 1.0),
            markup_param: "src".to_string(),
            default_source: "./Document.html".to_string(),
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and the default brush against them.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.page_class.trim().is_empty() || self.page_class.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "page_class must be a single class name, got {:?}",
                self.page_class
            )));
        }
        let (min_width, max_width) = self.line_width_range;
        if !(min_width > 0.0 && min_width <= max_width) {
            return Err(ConfigError::Invalid(format!(
                "line_width_range must be positive and ordered, got {:?}",
                self.line_width_range
            )));
        }
        let (min_opacity, max_opacity) = self.opacity_range;
        if !(min_opacity > 0.0 && min_opacity <= max_opacity && max_opacity <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "opacity_range must lie in (0, 1] and be ordered, got {:?}",
                self.opacity_range
            )));
        }
        if !(0.0..=1.0).contains(&self.intersection_threshold) {
            return Err(ConfigError::Invalid(format!(
                "intersection_threshold must lie in [0, 1], got {}",
                self.intersection_threshold
            )));
        }
        if !(min_width..=max_width).contains(&self.brush.line_width) {
            return Err(ConfigError::Invalid(format!(
                "brush line_width {} outside line_width_range",
                self.brush.line_width
            )));
        }
        if !(min_opacity..=max_opacity).contains(&self.brush.opacity) {
            return Err(ConfigError::Invalid(format!(
                "brush opacity {} outside opacity_range",
                self.brush.opacity
            )));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn recompute_interval(&self) -> Duration {
        Duration::from_millis(self.recompute_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SessionConfig::from_json(r#"{ "settle_delay_ms": 250, "page_class": "pf" }"#).unwrap();
        assert_eq!(config.settle_delay(), Duration::from_millis(250));
        assert_eq!(config.page_class, "pf");
        assert_eq!(config.recompute_interval_ms, 50);
        assert_eq!(config.brush.color.as_str(), "#000000");
    }

    #[test]
    fn test_brush_in_json() {
        let config = SessionConfig::from_json(
            r##"{ "brush": { "color": "#ff0000", "line_width": 3.0, "opacity": 0.5 } }"##,
        )
        .unwrap();
        assert_eq!(config.brush.color.as_str(), "#ff0000");
        assert!((config.brush.opacity - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_bad_ranges() {
        assert!(matches!(
            SessionConfig::from_json(r#"{ "opacity_range": [0.0, 1.0] }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SessionConfig::from_json(r#"{ "line_width_range": [10.0, 2.0] }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SessionConfig::from_json(r#"{ "page_class": "a b" }"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(matches!(SessionConfig::from_json("{"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            SessionConfig::from_json(r#"{ "brush": { "color": "teal" } }"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
