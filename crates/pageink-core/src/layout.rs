//! Deterministic page column used by headless hosts.
//!
//! Lays pages out the way the viewer's markup container does: a single
//! vertical column, each page horizontally centred, with a 1rem padding
//! around the column and a gap between pages.

use crate::geometry::LayoutProbe;
use crate::markup::{MarkupResult, count_page_containers};
use crate::stroke::PageIndex;
use kurbo::{Rect, Size, Vec2};

/// Padding around the page column (1rem).
pub const COLUMN_PADDING: f64 = 16.0;

/// Vertical gap between consecutive pages.
pub const PAGE_GAP: f64 = 16.0;

/// A scrollable column of pages with a fixed viewport.
#[derive(Debug, Clone)]
pub struct StackedPages {
    pages: Vec<Size>,
    viewport: Size,
    scroll: Vec2,
}

impl StackedPages {
    pub fn new(viewport: Size) -> Self {
        Self {
            pages: Vec::new(),
            viewport,
            scroll: Vec2::ZERO,
        }
    }

    /// One page of `page_size` per page container found in `markup`.
    pub fn from_markup(markup: &str, page_class: &str, page_size: Size, viewport: Size) -> MarkupResult<Self> {
        let count = count_page_containers(markup, page_class)?;
        Ok(Self {
            pages: vec![page_size; count],
            viewport,
            scroll: Vec2::ZERO,
        })
    }

    pub fn with_page(mut self, size: Size) -> Self {
        self.pages.push(size);
        self
    }

    /// Append a page that materialised late.
    pub fn push_page(&mut self, size: Size) {
        self.pages.push(size);
    }

    /// Change a page's size, e.g. after images finished loading.
    pub fn set_page_size(&mut self, page: PageIndex, size: Size) {
        if let Some(slot) = self.pages.get_mut(page) {
            *slot = size;
        }
        self.scroll_to(self.scroll);
    }

    pub fn resize(&mut self, viewport: Size) {
        self.viewport = viewport;
        self.scroll_to(self.scroll);
    }

    /// Scroll to an absolute offset, clamped to the scrollable range.
    pub fn scroll_to(&mut self, offset: Vec2) {
        let content = self.content_size();
        let max_x = (content.width - self.viewport.width).max(0.0);
        let max_y = (content.height - self.viewport.height).max(0.0);
        self.scroll = Vec2::new(offset.x.clamp(0.0, max_x), offset.y.clamp(0.0, max_y));
    }

    pub fn scroll_by(&mut self, delta: Vec2) {
        self.scroll_to(self.scroll + delta);
    }

    /// Size of the whole scrollable content.
    pub fn content_size(&self) -> Size {
        let widest = self.pages.iter().map(|p| p.width).fold(0.0, f64::max);
        let tall: f64 = self.pages.iter().map(|p| p.height).sum();
        let gaps = PAGE_GAP * self.pages.len().saturating_sub(1) as f64;
        Size::new(
            (widest + COLUMN_PADDING * 2.0).max(self.viewport.width),
            tall + gaps + COLUMN_PADDING * 2.0,
        )
    }

    /// Document-space rectangle of a page.
    pub fn document_rect(&self, page: PageIndex) -> Option<Rect> {
        let size = *self.pages.get(page)?;
        let top = COLUMN_PADDING
            + self.pages[..page].iter().map(|p| p.height + PAGE_GAP).sum::<f64>();
        let left = ((self.viewport.width - size.width) / 2.0).max(COLUMN_PADDING);
        Some(Rect::new(left, top, left + size.width, top + size.height))
    }
}

impl LayoutProbe for StackedPages {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn measure_page(&self, page: PageIndex) -> Option<Rect> {
        self.document_rect(page).map(|rect| rect - self.scroll)
    }

    fn scroll_offset(&self) -> Vec2 {
        self.scroll
    }

    fn viewport_size(&self) -> Size {
        self.viewport
    }
}
