//! PageInk Core Library
//!
//! Platform-agnostic annotation engine for multi-page HTML documents:
//! stroke history with branching undo/redo, page geometry tracking,
//! viewport projection and per-page pointer capture.

pub mod capture;
pub mod config;
pub mod geometry;
pub mod history;
pub mod layout;
pub mod markup;
pub mod projection;
pub mod session;
pub mod stroke;
pub mod timing;
pub mod tool;

pub use capture::{CaptureState, PageCapture};
pub use config::{ConfigError, ConfigResult, SessionConfig};
pub use geometry::{GeometryTracker, GeometryUpdate, LayoutProbe, LayoutSignal, TrackerPhase};
pub use history::{ChronoEntry, StrokeHandle, StrokeHistory};
pub use layout::StackedPages;
pub use markup::{MarkupError, MarkupLoader, MarkupResult, MarkupState, count_page_containers, resolve_source};
pub use projection::{OverlayPlacement, ViewportProjector};
pub use session::{AnnotationSession, SessionError, SessionEvent, SessionResult};
pub use stroke::{BrushColor, DEFAULT_PALETTE, InvalidColor, PageIndex, Stroke, StrokeId, StrokeStyle};
pub use timing::{Debouncer, Duration, Instant};
pub use tool::{BrushSettings, ToolMode, ToolSettings};
