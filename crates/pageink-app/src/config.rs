//! Application configuration.

use crate::error::AppResult;
use pageink_core::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Shell settings plus the session they host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub title: String,
    /// Shown in the document container until the markup arrives.
    pub loading_text: String,
    /// Where the replay binary writes page layers.
    pub output_dir: PathBuf,
    pub session: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "PageInk".to_string(),
            loading_text: "Loading...".to_string(),
            output_dir: PathBuf::from("pageink-out"),
            session: SessionConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> AppResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.session.validate()?;
        Ok(config)
    }
}
