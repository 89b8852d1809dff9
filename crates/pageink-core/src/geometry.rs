//! Page geometry tracking.
//!
//! Page containers appear and resize asynchronously after markup is
//! injected, so the tracker waits for a settle delay before trusting any
//! measurement and afterwards re-measures whenever a layout signal arrives,
//! rate limited by a [`Debouncer`]. Rectangles are stored in document space
//! (viewport rectangle plus the scroll offset at measurement time), which
//! keeps them valid across later scrolling.

use crate::config::SessionConfig;
use crate::stroke::PageIndex;
use crate::timing::{Debouncer, Duration, Instant};
use kurbo::{Rect, Size, Vec2};

/// Source of layout measurements, implemented by each host (DOM, headless layout).
pub trait LayoutProbe {
    /// Number of page containers currently present.
    fn page_count(&self) -> usize;

    /// Viewport-space bounding rectangle of a page container.
    fn measure_page(&self, page: PageIndex) -> Option<Rect>;

    /// Viewport-space rectangles of every page container, in page order.
    ///
    /// Hosts where locating the pages is costly override this to look them up once.
    fn measure_pages(&self) -> Vec<Option<Rect>> {
        (0..self.page_count()).map(|page| self.measure_page(page)).collect()
    }

    /// Current scroll offset of the document.
    fn scroll_offset(&self) -> Vec2;

    /// Size of the visible viewport.
    fn viewport_size(&self) -> Size;
}

/// Events after which page geometry may be stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutSignal {
    /// New markup was injected into the document.
    MarkupInjected,
    /// The set of page containers changed.
    PagesMutated,
    Scroll,
    Resize,
    /// Pointer or touch movement; layout can shift during interaction.
    PointerMove,
    /// A page entered or left the viewport.
    Intersection,
}

/// Lifecycle of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    /// No markup yet.
    AwaitingMarkup,
    /// Markup injected; measurements are not trusted before `deadline`.
    Settling { deadline: Instant },
    /// Geometry is live and follows layout signals.
    Observing,
}

/// Result of one recomputation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryUpdate {
    /// Pages whose rectangle changed, appeared or disappeared.
    pub changed: Vec<PageIndex>,
    /// Whether the number of page containers changed.
    pub page_count_changed: bool,
    /// Page count after the update.
    pub page_count: usize,
}

impl GeometryUpdate {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && !self.page_count_changed
    }
}

/// Tracks a document-space rectangle for each page container.
#[derive(Debug, Clone)]
pub struct GeometryTracker {
    pages: Vec<Option<Rect>>,
    phase: TrackerPhase,
    settle_delay: Duration,
    debouncer: Debouncer,
}

impl GeometryTracker {
    pub fn new(settle_delay: Duration, recompute_interval: Duration) -> Self {
        Self {
            pages: Vec::new(),
            phase: TrackerPhase::AwaitingMarkup,
            settle_delay,
            debouncer: Debouncer::new(recompute_interval),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.settle_delay(), config.recompute_interval())
    }

    pub fn phase(&self) -> TrackerPhase {
        self.phase
    }

    /// Whether geometry is live.
    pub fn is_observing(&self) -> bool {
        self.phase == TrackerPhase::Observing
    }

    /// Feed a layout signal.
    pub fn notify(&mut self, signal: LayoutSignal, now: Instant) {
        match (self.phase, signal) {
            (_, LayoutSignal::MarkupInjected) => {
                log::debug!("Markup injected, settling for {:?}", self.settle_delay);
                self.pages.clear();
                self.debouncer.cancel();
                self.phase = TrackerPhase::Settling {
                    deadline: now + self.settle_delay,
                };
            }
            (TrackerPhase::Observing, _) => self.debouncer.request(),
            // Nothing to measure yet; the settle timer covers it.
            _ => {}
        }
    }

    /// Advance timers and recompute if due.
    pub fn poll<P: LayoutProbe + ?Sized>(&mut self, probe: &P, now: Instant) -> Option<GeometryUpdate> {
        match self.phase {
            TrackerPhase::AwaitingMarkup => None,
            TrackerPhase::Settling { deadline } if now >= deadline => {
                self.phase = TrackerPhase::Observing;
                self.debouncer.mark_run(now);
                let update = self.measure(probe);
                log::info!("Page geometry settled with {} page(s)", update.page_count);
                Some(update)
            }
            TrackerPhase::Settling { .. } => None,
            TrackerPhase::Observing if self.debouncer.ready(now) => {
                self.debouncer.mark_run(now);
                Some(self.measure(probe))
            }
            TrackerPhase::Observing => None,
        }
    }

    /// Measure immediately, bypassing the rate limit.
    ///
    /// Only live geometry is re-measured; while settling, pages stay unavailable.
    pub fn force_measure<P: LayoutProbe + ?Sized>(&mut self, probe: &P, now: Instant) -> GeometryUpdate {
        if !self.is_observing() {
            return GeometryUpdate {
                page_count: self.pages.len(),
                ..GeometryUpdate::default()
            };
        }
        self.debouncer.mark_run(now);
        self.measure(probe)
    }

    fn measure<P: LayoutProbe + ?Sized>(&mut self, probe: &P) -> GeometryUpdate {
        let scroll = probe.scroll_offset();
        let previous_count = self.pages.len();

        let measured: Vec<Option<Rect>> = probe
            .measure_pages()
            .into_iter()
            .map(|rect| {
                // Zero-area containers are still settling.
                rect.filter(|rect| rect.width() > 0.0 && rect.height() > 0.0)
                    .map(|rect| rect + scroll)
            })
            .collect();
        let count = measured.len();

        let changed: Vec<PageIndex> = (0..count.max(previous_count))
            .filter(|&page| measured.get(page).copied().flatten() != self.pages.get(page).copied().flatten())
            .collect();

        self.pages = measured;

        if !changed.is_empty() {
            log::debug!("Page geometry changed for pages {:?}", changed);
        }

        GeometryUpdate {
            changed,
            page_count_changed: count != previous_count,
            page_count: count,
        }
    }

    /// Document-space rectangle of a page, if measured.
    pub fn page_rect(&self, page: PageIndex) -> Option<Rect> {
        self.pages.get(page).copied().flatten()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All page rectangles, indexed by page.
    pub fn pages(&self) -> &[Option<Rect>] {
        &self.pages
    }
}
