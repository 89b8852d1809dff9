//! Per-page pointer capture.

use crate::history::{StrokeHandle, StrokeHistory};
use crate::stroke::{PageIndex, Stroke, StrokeStyle};
use kurbo::{Point, Size};

/// State of a page's capture.
#[derive(Debug, Clone, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    /// A stroke is being drawn.
    Capturing(StrokeHandle),
}

/// Turns pointer input on one page into a stroke.
#[derive(Debug, Clone)]
pub struct PageCapture {
    page: PageIndex,
    state: CaptureState,
}

impl PageCapture {
    pub fn new(page: PageIndex) -> Self {
        Self {
            page,
            state: CaptureState::Idle,
        }
    }

    pub fn page(&self) -> PageIndex {
        self.page
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.state, CaptureState::Capturing(_))
    }

    /// The stroke in progress, if any.
    pub fn in_progress(&self) -> Option<&StrokeHandle> {
        match &self.state {
            CaptureState::Capturing(handle) => Some(handle),
            CaptureState::Idle => None,
        }
    }

    /// Begin a stroke at a page-local point.
    ///
    /// Points outside the page surface are ignored, as is a second start
    /// while already capturing. Returns whether capture began.
    pub fn start(&mut self, history: &mut StrokeHistory, point: Point, surface: Size, style: StrokeStyle) -> bool {
        if self.is_capturing() {
            return false;
        }
        let inside = (0.0..=surface.width).contains(&point.x) && (0.0..=surface.height).contains(&point.y);
        if !inside || surface.is_zero_area() {
            log::debug!("Pointer down outside page {} surface at {:?}", self.page, point);
            return false;
        }
        self.state = CaptureState::Capturing(history.begin_stroke(point, self.page, style));
        true
    }

    /// Add a point. Returns the newest segment for incremental drawing.
    pub fn extend(&mut self, history: &StrokeHistory, point: Point) -> Option<(Point, Point)> {
        match &mut self.state {
            CaptureState::Capturing(handle) => {
                history.append_point(handle, point);
                handle.last_segment()
            }
            CaptureState::Idle => None,
        }
    }

    /// End the stroke (pointer up or pointer leave) and commit it.
    ///
    /// Returns the committed stroke, or `None` for taps and when idle.
    pub fn finish(&mut self, history: &mut StrokeHistory) -> Option<Stroke> {
        match std::mem::take(&mut self.state) {
            CaptureState::Capturing(handle) => history.commit_stroke(handle).cloned(),
            CaptureState::Idle => None,
        }
    }
}
