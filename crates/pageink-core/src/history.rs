//! Branching undo/redo log of committed strokes across all pages.
//!
//! The log is a single vector in commit order with a cursor splitting it into
//! an active prefix and a redoable tail. The cross-page chronological view and
//! the per-page views are derived from the active prefix on every read, so
//! there is no second structure that could drift out of step with the log.

use crate::stroke::{PageIndex, Stroke, StrokeId, StrokeStyle};
use kurbo::Point;

/// A stroke being drawn. Obtained from [`StrokeHistory::begin_stroke`] and
/// consumed by [`StrokeHistory::commit_stroke`].
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeHandle {
    page: PageIndex,
    points: Vec<Point>,
    style: StrokeStyle,
}

impl StrokeHandle {
    pub fn page(&self) -> PageIndex {
        self.page
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The two most recent points, if there are at least two.
    pub fn last_segment(&self) -> Option<(Point, Point)> {
        match self.points.as_slice() {
            [.., a, b] => Some((*a, *b)),
            _ => None,
        }
    }
}

/// One entry of the chronological (cross-page) view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChronoEntry {
    pub id: StrokeId,
    pub page: PageIndex,
}

/// Branching stroke history shared by every page of a session.
#[derive(Debug, Clone, Default)]
pub struct StrokeHistory {
    /// Committed strokes, oldest first.
    strokes: Vec<Stroke>,
    /// Length of the active prefix (cursor + 1).
    active: usize,
    /// Next id to hand out. Only advanced by a successful commit.
    next_id: u64,
    /// Bumped on every mutation.
    revision: u64,
}

impl StrokeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a stroke on `page`.
    ///
    /// Starting a stroke while redo is available discards the redoable tail.
    pub fn begin_stroke(&mut self, point: Point, page: PageIndex, style: StrokeStyle) -> StrokeHandle {
        self.truncate_redo_tail();
        StrokeHandle {
            page,
            points: vec![point],
            style,
        }
    }

    /// Append a point to a stroke in progress.
    pub fn append_point(&self, handle: &mut StrokeHandle, point: Point) {
        handle.points.push(point);
    }

    /// Commit a finished stroke.
    ///
    /// Returns `None` (and consumes no id) when the stroke has fewer than two points.
    pub fn commit_stroke(&mut self, handle: StrokeHandle) -> Option<&Stroke> {
        if handle.points.len() < 2 {
            log::debug!("Discarding tap on page {} ({} point)", handle.page, handle.points.len());
            return None;
        }

        // An undo while the stroke was in flight leaves a tail behind the cursor.
        self.truncate_redo_tail();

        let id = StrokeId(self.next_id);
        self.next_id += 1;
        self.strokes.push(Stroke {
            id,
            page: handle.page,
            points: handle.points,
            style: handle.style,
        });
        self.active = self.strokes.len();
        self.revision += 1;

        log::debug!("Committed stroke {} on page {}", id, handle.page);
        self.strokes.last()
    }

    /// Step the cursor back. Returns the stroke that became inactive.
    pub fn undo(&mut self) -> Option<&Stroke> {
        if self.active == 0 {
            return None;
        }
        self.active -= 1;
        self.revision += 1;
        self.strokes.get(self.active)
    }

    /// Step the cursor forward. Returns the stroke that became active again.
    pub fn redo(&mut self) -> Option<&Stroke> {
        if self.active >= self.strokes.len() {
            return None;
        }
        self.active += 1;
        self.revision += 1;
        self.strokes.get(self.active - 1)
    }

    /// Drop every stroke. Ids are not reused afterwards.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.active = 0;
        self.revision += 1;
    }

    pub fn can_undo(&self) -> bool {
        self.active > 0
    }

    pub fn can_redo(&self) -> bool {
        self.active < self.strokes.len()
    }

    /// Index of the last active stroke, `None` when nothing is active.
    pub fn cursor(&self) -> Option<usize> {
        self.active.checked_sub(1)
    }

    /// Total number of committed strokes, including the redoable tail.
    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Counter bumped by every mutation; cached views keyed on it stay coherent.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Every committed stroke in commit order, including the redoable tail.
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Strokes that are currently visible, in commit order.
    pub fn active_strokes(&self) -> &[Stroke] {
        &self.strokes[..self.active]
    }

    /// Chronological `(id, page)` view of the active strokes.
    pub fn chronological(&self) -> impl Iterator<Item = ChronoEntry> + '_ {
        self.active_strokes().iter().map(|stroke| ChronoEntry {
            id: stroke.id,
            page: stroke.page,
        })
    }

    /// Active strokes of one page, in commit order.
    pub fn page_strokes(&self, page: PageIndex) -> impl Iterator<Item = &Stroke> + '_ {
        self.active_strokes().iter().filter(move |stroke| stroke.page == page)
    }

    /// Look up a committed stroke by id.
    pub fn get(&self, id: StrokeId) -> Option<&Stroke> {
        // Ids increase along the log, so it stays sorted by id.
        self.strokes
            .binary_search_by_key(&id, |stroke| stroke.id)
            .ok()
            .map(|index| &self.strokes[index])
    }

    /// Whether a stroke is part of the active prefix.
    pub fn is_active(&self, id: StrokeId) -> bool {
        self.active_strokes()
            .binary_search_by_key(&id, |stroke| stroke.id)
            .is_ok()
    }

    fn truncate_redo_tail(&mut self) {
        if self.active < self.strokes.len() {
            let dropped = self.strokes.len() - self.active;
            self.strokes.truncate(self.active);
            self.revision += 1;
            log::debug!("Discarded {} redoable stroke(s)", dropped);
        }
    }
}
