//! Application errors.

use pageink_core::{ConfigError, MarkupError, SessionError};
use pageink_render::RendererError;
use thiserror::Error;

/// Errors surfaced by the host shells.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid replay script: {0}")]
    Script(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Markup(#[from] MarkupError),
    #[error(transparent)]
    Render(#[from] RendererError),
    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),
    #[error("DOM error: {0}")]
    Dom(String),
}

/// Result type for application operations.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(target_arch = "wasm32")]
impl From<wasm_bindgen::JsValue> for AppError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        AppError::Dom(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
    }
}
