//! Headless replay of annotation scripts.
//!
//! A script describes a page column (from markup or a page count), a
//! viewport, and a list of actions. The runner drives a session against a
//! [`StackedPages`] layout on a virtual clock and renders every page into a
//! pixmap, which can then be written out as PNG files.

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::export::write_surface_png;
use kurbo::{Point, Size, Vec2};
use pageink_core::{
    AnnotationSession, Duration, Instant, LayoutProbe, LayoutSignal, PageIndex, StackedPages, StrokeId, ToolMode,
};
use pageink_render::{AnnotationOverlay, PixmapProvider, PixmapSurface};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Interval between replayed pointer samples, one display frame.
const FRAME: Duration = Duration::from_millis(16);

/// One scripted step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayAction {
    Mode(ToolMode),
    Color(String),
    LineWidth(f64),
    Opacity(f64),
    /// Scroll to an absolute offset.
    Scroll((f64, f64)),
    /// Resize the viewport.
    Resize((f64, f64)),
    /// Append a page of the given size, as if it rendered late.
    AddPage((f64, f64)),
    /// Advance the clock by this many milliseconds.
    Wait(u64),
    /// Draw through page-local points. `leave` ends with pointer-leave instead of pointer-up.
    Stroke {
        page: PageIndex,
        points: Vec<(f64, f64)>,
        #[serde(default)]
        leave: bool,
    },
    Undo,
    Redo,
    Clear,
}

/// Input to the replay binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayScript {
    #[serde(default)]
    pub config: AppConfig,
    #[serde(default = "default_viewport")]
    pub viewport: (f64, f64),
    #[serde(default = "default_page_size")]
    pub page_size: (f64, f64),
    /// Document markup; pages are its page containers.
    #[serde(default)]
    pub markup: Option<String>,
    /// Page count used when there is no markup.
    #[serde(default = "default_pages")]
    pub pages: usize,
    #[serde(default)]
    pub actions: Vec<ReplayAction>,
}

fn default_viewport() -> (f64, f64) {
    (1024.0, 768.0)
}

fn default_page_size() -> (f64, f64) {
    (816.0, 1056.0)
}

fn default_pages() -> usize {
    1
}

impl ReplayScript {
    pub fn from_json(json: &str) -> AppResult<Self> {
        let script: Self = serde_json::from_str(json)?;
        script.config.session.validate()?;
        Ok(script)
    }

    fn layout(&self) -> AppResult<StackedPages> {
        let viewport = Size::new(self.viewport.0, self.viewport.1);
        let page_size = Size::new(self.page_size.0, self.page_size.1);
        match &self.markup {
            Some(markup) => Ok(StackedPages::from_markup(
                markup,
                &self.config.session.page_class,
                page_size,
                viewport,
            )?),
            None => {
                let mut layout = StackedPages::new(viewport);
                for _ in 0..self.pages {
                    layout.push_page(page_size);
                }
                Ok(layout)
            }
        }
    }
}

/// Summary of a finished replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Strokes committed during the run, in commit order.
    pub committed: Vec<StrokeId>,
    /// Active strokes at the end.
    pub active: usize,
    /// Controls rejected as invalid.
    pub rejected: usize,
    pub page_count: usize,
}

/// Drives an overlay from a script on a virtual clock.
pub struct ReplayRunner {
    overlay: AnnotationOverlay<StackedPages, PixmapProvider>,
    clock: Instant,
    report: ReplayReport,
}

impl ReplayRunner {
    /// Inject the markup and let page geometry settle.
    pub fn new(script: &ReplayScript) -> AppResult<Self> {
        let session = AnnotationSession::new(script.layout()?, script.config.session.clone());
        let mut runner = Self {
            overlay: AnnotationOverlay::new(session, PixmapProvider),
            clock: Instant::now(),
            report: ReplayReport::default(),
        };
        runner.overlay.session_mut().markup_injected(runner.clock);
        let settle = runner.overlay.session().config().settle_delay();
        runner.advance(settle)?;
        log::info!(
            "Replay layout settled with {} page(s)",
            runner.overlay.session().tracker().page_count()
        );
        Ok(runner)
    }

    pub fn overlay(&self) -> &AnnotationOverlay<StackedPages, PixmapProvider> {
        &self.overlay
    }

    /// Run every action of a script.
    pub fn run(&mut self, actions: &[ReplayAction]) -> AppResult<()> {
        for action in actions {
            self.apply(action)?;
        }
        Ok(())
    }

    pub fn apply(&mut self, action: &ReplayAction) -> AppResult<()> {
        log::debug!("Replaying {:?}", action);
        match action {
            ReplayAction::Mode(mode) => self.overlay.session_mut().set_mode(*mode),
            ReplayAction::Color(token) => {
                let result = self.overlay.session_mut().set_color(token);
                self.count_rejected(result);
            }
            ReplayAction::LineWidth(width) => {
                let result = self.overlay.session_mut().set_line_width(*width);
                self.count_rejected(result);
            }
            ReplayAction::Opacity(opacity) => {
                let result = self.overlay.session_mut().set_opacity(*opacity);
                self.count_rejected(result);
            }
            ReplayAction::Scroll((x, y)) => {
                self.overlay.session_mut().probe_mut().scroll_to(Vec2::new(*x, *y));
                self.signal(LayoutSignal::Scroll)?;
            }
            ReplayAction::Resize((width, height)) => {
                self.overlay.session_mut().probe_mut().resize(Size::new(*width, *height));
                self.signal(LayoutSignal::Resize)?;
            }
            ReplayAction::AddPage((width, height)) => {
                self.overlay.session_mut().probe_mut().push_page(Size::new(*width, *height));
                self.signal(LayoutSignal::PagesMutated)?;
            }
            ReplayAction::Wait(ms) => self.advance(Duration::from_millis(*ms))?,
            ReplayAction::Stroke { page, points, leave } => self.stroke(*page, points, *leave)?,
            ReplayAction::Undo => {
                self.overlay.session_mut().undo();
            }
            ReplayAction::Redo => {
                self.overlay.session_mut().redo();
            }
            ReplayAction::Clear => self.overlay.session_mut().clear(),
        }
        self.overlay.flush()?;
        Ok(())
    }

    /// Report for the run so far.
    pub fn report(&self) -> ReplayReport {
        let session = self.overlay.session();
        ReplayReport {
            active: session.history().active_strokes().len(),
            page_count: session.probe().page_count(),
            ..self.report.clone()
        }
    }

    /// Layer of one page.
    pub fn surface(&self, page: PageIndex) -> Option<&PixmapSurface> {
        self.overlay.compositor(page).map(|compositor| compositor.surface())
    }

    /// Write `page-<n>.png` for every page with a surface. Returns the written paths.
    pub fn write_pages(&self, dir: &Path) -> AppResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        for compositor in self.overlay.compositors() {
            let path = dir.join(format!("page-{}.png", compositor.page()));
            if write_surface_png(compositor.surface(), &path)? {
                written.push(path);
            }
        }
        Ok(written)
    }

    fn advance(&mut self, by: Duration) -> AppResult<()> {
        self.clock += by;
        self.overlay.pump(self.clock)?;
        Ok(())
    }

    /// Raise a layout signal and give the debouncer time to act on it.
    fn signal(&mut self, signal: LayoutSignal) -> AppResult<()> {
        self.overlay.session_mut().notify(signal, self.clock);
        let interval = self.overlay.session().config().recompute_interval();
        self.advance(interval)
    }

    fn stroke(&mut self, page: PageIndex, points: &[(f64, f64)], leave: bool) -> AppResult<()> {
        let Some(rect) = self.overlay.session().tracker().page_rect(page) else {
            log::warn!("Skipping stroke on page {} without geometry", page);
            return Ok(());
        };
        let Some(((x, y), rest)) = points.split_first() else {
            return Ok(());
        };

        let client = |session: &AnnotationSession<StackedPages>, x: f64, y: f64| {
            session.projector().page_to_viewport(Point::new(x, y), rect)
        };

        let session = self.overlay.session_mut();
        let start = client(session, *x, *y);
        if !session.pointer_down(page, start, self.clock) {
            log::warn!("Pointer down on page {} at ({}, {}) was not accepted", page, x, y);
            return Ok(());
        }
        for (x, y) in rest {
            self.clock += FRAME;
            let session = self.overlay.session_mut();
            let to = client(session, *x, *y);
            session.pointer_move(page, to, self.clock);
            self.overlay.pump(self.clock)?;
        }

        let session = self.overlay.session_mut();
        let committed = if leave { session.pointer_leave(page) } else { session.pointer_up(page) };
        if let Some(id) = committed {
            self.report.committed.push(id);
        }
        Ok(())
    }

    fn count_rejected<T, E: std::fmt::Display>(&mut self, result: Result<T, E>) {
        if let Err(err) = result {
            log::warn!("Rejected control: {}", err);
            self.report.rejected += 1;
        }
    }
}

/// Run a script end to end and write its page layers into `out_dir`.
pub fn run_script(script: &ReplayScript, out_dir: &Path) -> AppResult<(ReplayReport, Vec<PathBuf>)> {
    let mut runner = ReplayRunner::new(script)?;
    runner.run(&script.actions)?;
    let written = runner.write_pages(out_dir)?;
    Ok((runner.report(), written))
}
