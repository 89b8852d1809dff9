//! Markup source resolution and loading state.

use scraper::{Html, Selector};
use thiserror::Error;
use url::form_urlencoded;

/// Markup loading errors.
#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("Fetch failed: {0}")]
    Fetch(String),
    #[error("Markup source responded with status {0}")]
    Status(u16),
    #[error("Markup body is not text")]
    NotText,
    #[error("Invalid page selector: {0}")]
    Selector(String),
}

/// Result type for markup operations.
pub type MarkupResult<T> = Result<T, MarkupError>;

/// Loading state of the document markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupState {
    /// Waiting for the markup. Also the terminal state after a failed fetch.
    Loading,
    /// Markup is available for injection.
    Ready(String),
}

/// Tracks the one fetch of document markup per session.
#[derive(Debug, Clone)]
pub struct MarkupLoader {
    source: String,
    state: MarkupState,
}

impl MarkupLoader {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            state: MarkupState::Loading,
        }
    }

    /// Where the markup is fetched from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn state(&self) -> &MarkupState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == MarkupState::Loading
    }

    pub fn markup(&self) -> Option<&str> {
        match &self.state {
            MarkupState::Ready(html) => Some(html),
            MarkupState::Loading => None,
        }
    }

    /// Record the fetch outcome. Returns true if markup became ready.
    ///
    /// A failure is logged and leaves the loader loading; there is no retry.
    pub fn resolve(&mut self, result: MarkupResult<String>) -> bool {
        if !self.is_loading() {
            log::warn!("Ignoring second markup result for {}", self.source);
            return false;
        }
        match result {
            Ok(html) => {
                log::info!("Loaded {} bytes of markup from {}", html.len(), self.source);
                self.state = MarkupState::Ready(html);
                true
            }
            Err(err) => {
                log::error!("Error loading markup from {}: {}", self.source, err);
                false
            }
        }
    }
}

/// Read `param` from a query string or hash fragment (`?src=a.html` / `#src=a.html`).
pub fn resolve_source(query: &str, param: &str) -> Option<String> {
    let query = query.trim_start_matches(['?', '#']);
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, value)| key.as_ref() == param && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

/// Count the page containers declared by a markup fragment.
///
/// Elements whose class list contains `class_name` are pages. Markup with no
/// such element falls back to its top-level elements, the same rule the
/// browser host applies to the children of the document container.
pub fn count_page_containers(html: &str, class_name: &str) -> MarkupResult<usize> {
    let selector = Selector::parse(&format!(".{}", class_name))
        .map_err(|err| MarkupError::Selector(format!("{:?}", err)))?;
    let fragment = Html::parse_fragment(html);
    let marked = fragment.select(&selector).count();
    if marked > 0 {
        return Ok(marked);
    }
    let children = fragment
        .root_element()
        .children()
        .filter(|node| node.value().is_element())
        .count();
    if children > 0 {
        log::debug!("No .{} containers, using {} top-level element(s)", class_name, children);
    }
    Ok(children)
}
