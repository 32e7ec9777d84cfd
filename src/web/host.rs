//! `Host` and `Page` backed by the real DOM.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::{Array, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    AddEventListenerOptions, Document, Element, Event, HtmlElement, IntersectionObserver,
    IntersectionObserverEntry, IntersectionObserverInit, Window,
};

use crate::config::RevealConfig;
use crate::controller::{Controller, RevealEvent};
use crate::error::{Result, RevealError};
use crate::host::{GateOptions, Host, Page, ViewportStream, VisibilityGate};
use crate::progress::{ClipInset, SectionRect, ViewportSize};

/// Back-pointer from DOM callbacks to their controller.
pub(crate) type WebDispatch = Weak<RefCell<Controller<WebHost>>>;

/// Deliver `event` to the controller behind `target`, if it is still alive.
pub(crate) fn dispatch(target: &WebDispatch, event: RevealEvent) {
    let Some(shared) = target.upgrade() else {
        return;
    };
    let Ok(mut controller) = shared.try_borrow_mut() else {
        tracing::warn!(?event, "controller busy, dropping event");
        return;
    };
    if let Err(err) = controller.handle(event) {
        tracing::warn!(
            section_id = %controller.section_id(),
            ?event,
            error = %err,
            "reveal event failed"
        );
    }
}

/// Best-effort message from a thrown JS value.
pub(crate) fn js_error_message(value: &JsValue) -> String {
    if let Some(message) = value.as_string() {
        return message;
    }
    Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{value:?}"))
}

fn dimension(value: std::result::Result<JsValue, JsValue>) -> f64 {
    value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
}

fn event_listener(target: &WebDispatch, event: RevealEvent) -> Closure<dyn FnMut(Event)> {
    let target = Weak::clone(target);
    Closure::wrap(Box::new(move |_event: Event| dispatch(&target, event)) as Box<dyn FnMut(Event)>)
}

/// Window/document bindings for one controller.
///
/// Listener closures are created on first use and kept for the controller's
/// lifetime, so the function passed to `removeEventListener` is always the
/// one that was registered.
pub struct WebHost {
    window: Window,
    document: Document,
    config: Rc<RevealConfig>,
    dispatch: WebDispatch,
    scroll_listener: Option<Closure<dyn FnMut(Event)>>,
    resize_listener: Option<Closure<dyn FnMut(Event)>>,
    frame_callback: Option<Closure<dyn FnMut(f64)>>,
}

impl WebHost {
    pub(crate) fn new(
        window: Window,
        document: Document,
        config: Rc<RevealConfig>,
        dispatch: WebDispatch,
    ) -> Self {
        Self {
            window,
            document,
            config,
            dispatch,
            scroll_listener: None,
            resize_listener: None,
            frame_callback: None,
        }
    }
}

impl Host for WebHost {
    type Element = Element;
    type FrameHandle = i32;

    fn find_section(&self, section_id: &str) -> Result<Option<Element>> {
        let selector = self.config.section_selector(section_id);
        self.document
            .query_selector(&selector)
            .map_err(|e| RevealError::Query {
                message: js_error_message(&e),
                selector,
            })
    }

    fn find_layer(&self, section: &Element) -> Result<Option<Element>> {
        let selector = self.config.layer_selector();
        section
            .query_selector(&selector)
            .map_err(|e| RevealError::Query {
                message: js_error_message(&e),
                selector,
            })
    }

    fn is_attached(&self, element: &Element) -> bool {
        element.is_connected()
    }

    fn viewport(&self) -> ViewportSize {
        ViewportSize::new(
            dimension(self.window.inner_width()),
            dimension(self.window.inner_height()),
        )
    }

    fn bounding_rect(&self, element: &Element) -> SectionRect {
        let rect = element.get_bounding_client_rect();
        SectionRect {
            top: rect.top(),
            bottom: rect.bottom(),
            height: rect.height(),
        }
    }

    fn apply_clip(&mut self, layer: &Element, clip: Option<&ClipInset>) -> Result<()> {
        let Some(layer) = layer.dyn_ref::<HtmlElement>() else {
            return Err(RevealError::Style("layer is not an HTML element".into()));
        };
        let style = layer.style();
        let written = match clip {
            Some(clip) => style.set_property("clip-path", &clip.css_value()),
            None => style.remove_property("clip-path").map(drop),
        };
        written.map_err(|e| RevealError::Style(js_error_message(&e)))
    }

    fn listen(&mut self, stream: ViewportStream) -> Result<()> {
        let (slot, event) = match stream {
            ViewportStream::Scroll => (&mut self.scroll_listener, RevealEvent::ScrollTick),
            ViewportStream::Resize => (&mut self.resize_listener, RevealEvent::ResizeTick),
        };
        let listener = slot.get_or_insert_with(|| event_listener(&self.dispatch, event));

        let options = AddEventListenerOptions::new();
        options.set_passive(true);
        self.window
            .add_event_listener_with_callback_and_add_event_listener_options(
                stream.event_name(),
                listener.as_ref().unchecked_ref(),
                &options,
            )
            .map_err(|e| RevealError::Subscribe(js_error_message(&e)))
    }

    fn unlisten(&mut self, stream: ViewportStream) {
        let slot = match stream {
            ViewportStream::Scroll => &self.scroll_listener,
            ViewportStream::Resize => &self.resize_listener,
        };
        if let Some(listener) = slot {
            let _ = self.window.remove_event_listener_with_callback(
                stream.event_name(),
                listener.as_ref().unchecked_ref(),
            );
        }
    }

    fn request_frame(&mut self) -> Result<i32> {
        let target = &self.dispatch;
        let callback = self.frame_callback.get_or_insert_with(|| {
            let target = Weak::clone(target);
            Closure::wrap(Box::new(move |_timestamp: f64| {
                dispatch(&target, RevealEvent::FrameDue);
            }) as Box<dyn FnMut(f64)>)
        });
        self.window
            .request_animation_frame(callback.as_ref().unchecked_ref())
            .map_err(|e| RevealError::Frame(js_error_message(&e)))
    }

    fn cancel_frame(&mut self, handle: i32) {
        let _ = self.window.cancel_animation_frame(handle);
    }

    fn visibility_gate(&mut self) -> Option<Box<dyn VisibilityGate<Element>>> {
        let supported = Reflect::has(&self.window, &JsValue::from_str("IntersectionObserver"))
            .unwrap_or(false);
        if !supported {
            return None;
        }
        Some(Box::new(WebGate::new(Weak::clone(&self.dispatch))))
    }
}

/// `IntersectionObserver` for one section, created on first `observe`.
struct WebGate {
    dispatch: WebDispatch,
    observer: Option<IntersectionObserver>,
    callback: Option<Closure<dyn FnMut(Array, IntersectionObserver)>>,
}

impl WebGate {
    fn new(dispatch: WebDispatch) -> Self {
        Self {
            dispatch,
            observer: None,
            callback: None,
        }
    }

    fn create_observer(&mut self, options: &GateOptions) -> Result<IntersectionObserver> {
        let target = &self.dispatch;
        let callback = self.callback.get_or_insert_with(|| {
            let target = Weak::clone(target);
            Closure::wrap(Box::new(move |entries: Array, _observer: IntersectionObserver| {
                for entry in entries.iter() {
                    let Ok(entry) = entry.dyn_into::<IntersectionObserverEntry>() else {
                        continue;
                    };
                    dispatch(
                        &target,
                        RevealEvent::VisibilityChanged {
                            is_intersecting: entry.is_intersecting(),
                        },
                    );
                }
            }) as Box<dyn FnMut(Array, IntersectionObserver)>)
        });

        let init = IntersectionObserverInit::new();
        init.set_root_margin(&options.root_margin());
        let thresholds: Array = options
            .thresholds
            .iter()
            .map(|t| JsValue::from_f64(*t))
            .collect();
        init.set_threshold(&thresholds);

        IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)
            .map_err(|e| RevealError::Observer(js_error_message(&e)))
    }
}

impl VisibilityGate<Element> for WebGate {
    fn observe(&mut self, target: &Element, options: &GateOptions) -> Result<()> {
        if self.observer.is_none() {
            self.observer = Some(self.create_observer(options)?);
        }
        if let Some(observer) = &self.observer {
            observer.observe(target);
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(observer) = &self.observer {
            observer.disconnect();
        }
    }
}

/// The live document.
pub struct WebPage {
    window: Window,
    document: Document,
    config: Rc<RevealConfig>,
}

impl WebPage {
    pub(crate) fn new(window: Window, document: Document, config: Rc<RevealConfig>) -> Self {
        Self {
            window,
            document,
            config,
        }
    }
}

impl Page for WebPage {
    type Host = WebHost;

    fn discover_sections(&self) -> Result<Vec<String>> {
        let selector = self.config.discovery_selector();
        let nodes = self
            .document
            .query_selector_all(&selector)
            .map_err(|e| RevealError::Query {
                message: js_error_message(&e),
                selector,
            })?;

        let mut section_ids = Vec::new();
        for index in 0..nodes.length() {
            let Some(element) = nodes.get(index).and_then(|n| n.dyn_into::<Element>().ok()) else {
                continue;
            };
            match element.get_attribute(&self.config.section_id_attribute) {
                Some(id) if !id.is_empty() => section_ids.push(id),
                _ => {}
            }
        }
        Ok(section_ids)
    }

    fn host_for(&self, _section_id: &str, dispatch: WebDispatch) -> WebHost {
        WebHost::new(
            self.window.clone(),
            self.document.clone(),
            Rc::clone(&self.config),
            dispatch,
        )
    }
}
