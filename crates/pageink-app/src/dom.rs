//! DOM layout probe and layout-signal observers.

use crate::error::AppResult;
use kurbo::{Rect, Size, Vec2};
use pageink_core::{LayoutProbe, LayoutSignal, PageIndex};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Element, Event, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit, MutationObserver,
    MutationObserverInit, MutationRecord, Window,
};

/// Measures page containers inside the document container.
pub struct DomLayoutProbe {
    window: Window,
    container: Element,
    selector: String,
}

impl DomLayoutProbe {
    pub fn new(window: Window, container: Element, page_class: &str) -> Self {
        Self {
            window,
            container,
            selector: format!(".{}", page_class),
        }
    }

    /// Page container elements in document order.
    ///
    /// Without any marked page container, the container's direct children are the pages.
    pub fn page_elements(&self) -> Vec<Element> {
        let marked: Vec<Element> = match self.container.query_selector_all(&self.selector) {
            Ok(nodes) => (0..nodes.length())
                .filter_map(|i| nodes.item(i))
                .filter_map(|node| node.dyn_into::<Element>().ok())
                .collect(),
            Err(err) => {
                log::warn!("Invalid page selector {}: {:?}", self.selector, err);
                Vec::new()
            }
        };
        if !marked.is_empty() {
            return marked;
        }
        let children = self.container.children();
        (0..children.length()).filter_map(|i| children.item(i)).collect()
    }

    fn window_f64(value: Result<JsValue, JsValue>) -> f64 {
        value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
    }

    fn bounds(element: &Element) -> Rect {
        let rect = element.get_bounding_client_rect();
        Rect::new(rect.x(), rect.y(), rect.x() + rect.width(), rect.y() + rect.height())
    }
}

impl LayoutProbe for DomLayoutProbe {
    fn page_count(&self) -> usize {
        self.page_elements().len()
    }

    fn measure_page(&self, page: PageIndex) -> Option<Rect> {
        self.page_elements().get(page).map(Self::bounds)
    }

    fn measure_pages(&self) -> Vec<Option<Rect>> {
        self.page_elements().iter().map(|element| Some(Self::bounds(element))).collect()
    }

    fn scroll_offset(&self) -> Vec2 {
        Vec2::new(
            self.window.scroll_x().unwrap_or(0.0),
            self.window.scroll_y().unwrap_or(0.0),
        )
    }

    fn viewport_size(&self) -> Size {
        Size::new(
            Self::window_f64(self.window.inner_width()),
            Self::window_f64(self.window.inner_height()),
        )
    }
}

/// Turns DOM callbacks into queued [`LayoutSignal`]s.
///
/// Signals are collected and must be polled via [`DomObservers::poll_signals`].
pub struct DomObservers {
    window: Window,
    signals: Rc<RefCell<Vec<LayoutSignal>>>,
    mutation: MutationObserver,
    intersection: IntersectionObserver,
    observed_pages: usize,
    // Store closures to prevent them from being dropped
    _on_mutation: Closure<dyn Fn(js_sys::Array, MutationObserver)>,
    _on_intersection: Closure<dyn Fn(js_sys::Array, IntersectionObserver)>,
    listeners: Vec<(&'static str, Closure<dyn Fn(Event)>)>,
}

impl DomObservers {
    /// Watch `container` for page mutations and the window for scroll, resize and pointer movement.
    pub fn install(window: &Window, container: &Element, threshold: f64) -> AppResult<Self> {
        let signals = Rc::new(RefCell::new(Vec::new()));

        let signals_mutation = signals.clone();
        let on_mutation = Closure::wrap(Box::new(move |records: js_sys::Array, _observer: MutationObserver| {
            let structural = records.iter().any(|record| {
                record
                    .dyn_into::<MutationRecord>()
                    .map(|record| record.type_() == "childList")
                    .unwrap_or(false)
            });
            if structural {
                signals_mutation.borrow_mut().push(LayoutSignal::PagesMutated);
            }
        }) as Box<dyn Fn(js_sys::Array, MutationObserver)>);
        let mutation = MutationObserver::new(on_mutation.as_ref().unchecked_ref())?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        mutation.observe_with_options(container, &init)?;

        let signals_intersection = signals.clone();
        let on_intersection = Closure::wrap(Box::new(move |entries: js_sys::Array, _observer: IntersectionObserver| {
            let any = entries
                .iter()
                .any(|entry| entry.dyn_into::<IntersectionObserverEntry>().is_ok());
            if any {
                signals_intersection.borrow_mut().push(LayoutSignal::Intersection);
            }
        }) as Box<dyn Fn(js_sys::Array, IntersectionObserver)>);
        let options = IntersectionObserverInit::new();
        options.set_threshold(&JsValue::from_f64(threshold));
        let intersection = IntersectionObserver::new_with_options(on_intersection.as_ref().unchecked_ref(), &options)?;

        let mut observers = Self {
            window: window.clone(),
            signals,
            mutation,
            intersection,
            observed_pages: 0,
            _on_mutation: on_mutation,
            _on_intersection: on_intersection,
            listeners: Vec::new(),
        };

        observers.listen("scroll", LayoutSignal::Scroll)?;
        observers.listen("resize", LayoutSignal::Resize)?;
        observers.listen("pointermove", LayoutSignal::PointerMove)?;
        observers.listen("touchmove", LayoutSignal::PointerMove)?;
        Ok(observers)
    }

    fn listen(&mut self, event: &'static str, signal: LayoutSignal) -> AppResult<()> {
        let signals = self.signals.clone();
        let callback = Closure::wrap(Box::new(move |_e: Event| {
            signals.borrow_mut().push(signal);
        }) as Box<dyn Fn(Event)>);
        self.window
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        self.listeners.push((event, callback));
        Ok(())
    }

    /// Re-register intersection tracking when the set of pages changed.
    pub fn observe_pages(&mut self, probe: &DomLayoutProbe) {
        let pages = probe.page_elements();
        if pages.len() == self.observed_pages {
            return;
        }
        self.intersection.disconnect();
        for page in &pages {
            self.intersection.observe(page);
        }
        self.observed_pages = pages.len();
        log::debug!("Observing visibility of {} page(s)", pages.len());
    }

    /// Take queued signals, collapsing repeats.
    pub fn poll_signals(&self) -> Vec<LayoutSignal> {
        let mut signals = std::mem::take(&mut *self.signals.borrow_mut());
        signals.sort_by_key(|signal| *signal as u8);
        signals.dedup();
        signals
    }
}

impl Drop for DomObservers {
    fn drop(&mut self) {
        self.mutation.disconnect();
        self.intersection.disconnect();
        for (event, callback) in &self.listeners {
            let _ = self
                .window
                .remove_event_listener_with_callback(event, callback.as_ref().unchecked_ref());
        }
    }
}
