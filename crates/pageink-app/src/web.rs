//! WebAssembly entry point and the browser control surface.

use crate::canvas2d::{DomSurfaceProvider, PointerKind};
use crate::config::AppConfig;
use crate::dom::{DomLayoutProbe, DomObservers};
use crate::error::AppResult;
use pageink_core::{
    AnnotationSession, DEFAULT_PALETTE, Instant, MarkupError, MarkupLoader, MarkupResult, ToolMode, resolve_source,
};
use pageink_render::AnnotationOverlay;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Response, Window};

type DomOverlay = AnnotationOverlay<DomLayoutProbe, DomSurfaceProvider>;

/// Everything the frame loop touches.
struct WebState {
    overlay: DomOverlay,
    observers: DomObservers,
}

impl WebState {
    /// One animation frame: feed queued signals and input, then render.
    fn frame(&mut self) {
        let now = Instant::now();
        for signal in self.observers.poll_signals() {
            self.overlay.session_mut().notify(signal, now);
        }

        let inputs = self.overlay.provider().poll_inputs();
        let session = self.overlay.session_mut();
        for input in inputs {
            match input.kind {
                PointerKind::Down => {
                    session.pointer_down(input.page, input.client, now);
                }
                PointerKind::Move => session.pointer_move(input.page, input.client, now),
                PointerKind::Up => {
                    session.pointer_up(input.page);
                }
                PointerKind::Leave => {
                    session.pointer_leave(input.page);
                }
            }
        }

        if let Err(err) = self.overlay.pump(now) {
            log::error!("Failed to render annotations: {}", err);
        }
        self.observers.observe_pages(self.overlay.session().probe());
    }

    fn flush(&mut self) {
        if let Err(err) = self.overlay.flush() {
            log::error!("Failed to render annotations: {}", err);
        }
    }
}

/// Initialize panic reporting and logging.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger already initialized".into());
    }
    log::info!("Starting PageInk (WASM)");
}

/// Fetch the document markup into `container_id` and overlay it with annotation layers.
///
/// `config_json` is an optional [`AppConfig`] in JSON. A failed fetch is
/// logged and leaves the loading placeholder in place; the returned
/// annotator then ignores every control.
#[wasm_bindgen]
pub async fn mount(container_id: String, config_json: Option<String>) -> Result<Annotator, JsValue> {
    let config = match config_json {
        Some(json) => AppConfig::from_json(&json).map_err(|err| JsValue::from_str(&err.to_string()))?,
        None => AppConfig::default(),
    };
    mount_with(&container_id, config)
        .await
        .map_err(|err| JsValue::from_str(&err.to_string()))
}

async fn mount_with(container_id: &str, config: AppConfig) -> AppResult<Annotator> {
    let window = web_sys::window().ok_or_else(|| crate::error::AppError::Dom("no window".to_string()))?;
    let document = window
        .document()
        .ok_or_else(|| crate::error::AppError::Dom("no document".to_string()))?;
    let container = document
        .get_element_by_id(container_id)
        .ok_or_else(|| crate::error::AppError::Dom(format!("no element #{}", container_id)))?;

    document.set_title(&config.title);
    container.set_text_content(Some(&config.loading_text));

    let session_config = config.session;
    let source = markup_source(&window, &session_config.markup_param)
        .unwrap_or_else(|| session_config.default_source.clone());
    let mut loader = MarkupLoader::new(source);
    let result = fetch_markup(&window, loader.source()).await;
    if !loader.resolve(result) {
        return Ok(Annotator { state: None });
    }
    let Some(markup) = loader.markup() else {
        return Ok(Annotator { state: None });
    };
    container.set_inner_html(markup);

    let probe = DomLayoutProbe::new(window.clone(), container.clone(), &session_config.page_class);
    let observers = DomObservers::install(&window, &container, session_config.intersection_threshold)?;
    let mut session = AnnotationSession::new(probe, session_config);
    session.markup_injected(Instant::now());
    let overlay = AnnotationOverlay::new(session, DomSurfaceProvider::new(document)?);

    let state = Rc::new(RefCell::new(WebState { overlay, observers }));
    start_frame_loop(&window, state.clone())?;
    Ok(Annotator { state: Some(state) })
}

/// Markup source from the page URL, query string first, then hash.
fn markup_source(window: &Window, param: &str) -> Option<String> {
    let location = window.location();
    location
        .search()
        .ok()
        .and_then(|search| resolve_source(&search, param))
        .or_else(|| location.hash().ok().and_then(|hash| resolve_source(&hash, param)))
}

async fn fetch_markup(window: &Window, source: &str) -> MarkupResult<String> {
    let fetch_err = |err: JsValue| MarkupError::Fetch(format!("{:?}", err));
    let response = JsFuture::from(window.fetch_with_str(source)).await.map_err(fetch_err)?;
    let response: Response = response.dyn_into().map_err(fetch_err)?;
    if !response.ok() {
        return Err(MarkupError::Status(response.status()));
    }
    let text = JsFuture::from(response.text().map_err(fetch_err)?)
        .await
        .map_err(fetch_err)?;
    text.as_string().ok_or(MarkupError::NotText)
}

fn start_frame_loop(window: &Window, state: Rc<RefCell<WebState>>) -> AppResult<()> {
    let callback: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let next = callback.clone();
    let loop_window = window.clone();
    *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        match state.try_borrow_mut() {
            Ok(mut state) => state.frame(),
            Err(_) => log::warn!("Skipping frame while annotator is busy"),
        }
        if let Some(closure) = next.borrow().as_ref() {
            if let Err(err) = loop_window.request_animation_frame(closure.as_ref().unchecked_ref()) {
                log::error!("Failed to schedule frame: {:?}", err);
            }
        }
    }) as Box<dyn FnMut()>));

    if let Some(closure) = callback.borrow().as_ref() {
        window.request_animation_frame(closure.as_ref().unchecked_ref())?;
    }
    Ok(())
}

/// Control surface exposed to the toolbar.
#[wasm_bindgen]
pub struct Annotator {
    state: Option<Rc<RefCell<WebState>>>,
}

impl Annotator {
    fn with_state<T>(&self, default: T, f: impl FnOnce(&mut WebState) -> T) -> T {
        let Some(state) = &self.state else {
            return default;
        };
        match state.try_borrow_mut() {
            Ok(mut state) => {
                let result = f(&mut state);
                state.flush();
                result
            }
            Err(_) => {
                log::warn!("Annotator busy, control ignored");
                default
            }
        }
    }
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
impl Annotator {
    /// Whether the document loaded and annotation is available.
    #[wasm_bindgen(getter)]
    pub fn ready(&self) -> bool {
        self.state.is_some()
    }

    /// `pencil`, `eraser` or `cursor`.
    #[wasm_bindgen(js_name = setMode)]
    pub fn set_mode(&self, mode: &str) -> Result<(), JsValue> {
        let mode = ToolMode::from_name(mode).ok_or_else(|| to_js(format!("Unknown mode {:?}", mode)))?;
        self.with_state((), |state| state.overlay.session_mut().set_mode(mode));
        Ok(())
    }

    #[wasm_bindgen(js_name = setColor)]
    pub fn set_color(&self, color: &str) -> Result<(), JsValue> {
        self.with_state(Ok(()), |state| state.overlay.session_mut().set_color(color))
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = setLineWidth)]
    pub fn set_line_width(&self, width: f64) -> Result<(), JsValue> {
        self.with_state(Ok(()), |state| state.overlay.session_mut().set_line_width(width))
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = setOpacity)]
    pub fn set_opacity(&self, opacity: f64) -> Result<(), JsValue> {
        self.with_state(Ok(()), |state| state.overlay.session_mut().set_opacity(opacity))
            .map_err(to_js)
    }

    pub fn undo(&self) -> bool {
        self.with_state(false, |state| state.overlay.session_mut().undo().is_some())
    }

    pub fn redo(&self) -> bool {
        self.with_state(false, |state| state.overlay.session_mut().redo().is_some())
    }

    pub fn clear(&self) {
        self.with_state((), |state| state.overlay.session_mut().clear());
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.state
            .as_ref()
            .and_then(|state| state.try_borrow().ok().map(|s| s.overlay.session().can_undo()))
            .unwrap_or(false)
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.state
            .as_ref()
            .and_then(|state| state.try_borrow().ok().map(|s| s.overlay.session().can_redo()))
            .unwrap_or(false)
    }

    /// Default colour swatches.
    pub fn palette() -> js_sys::Array {
        DEFAULT_PALETTE.iter().map(|token| JsValue::from_str(token)).collect()
    }
}
