//! PageInk Application
//!
//! Host shells for the annotation engine: a headless replay runner that
//! renders page layers to PNG, and the browser overlay for WASM.

mod config;
mod error;
mod export;
mod replay;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use export::{encode_png, write_surface_png};
pub use replay::{ReplayAction, ReplayReport, ReplayRunner, ReplayScript, run_script};

#[cfg(target_arch = "wasm32")]
mod canvas2d;
#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::{Annotator, mount};
