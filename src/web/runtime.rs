//! Page-lifetime runtime: executes the boot plan and owns the registry.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use js_sys::{Array, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CustomEvent, Document, Event, Window};

use super::console;
use super::host::{js_error_message, WebPage};
use crate::bootstrap::{boot_plan, BootStep, ReadyState};
use crate::config::RevealConfig;
use crate::error::{Result, RevealError};
use crate::registry::{InitOutcome, Registry};

const SECTION_LOAD_EVENT: &str = "shopify:section:load";
const SECTION_UNLOAD_EVENT: &str = "shopify:section:unload";

struct Runtime {
    registry: Registry<WebPage>,
    /// Document listeners kept alive for the page's lifetime
    listeners: Vec<Closure<dyn FnMut(Event)>>,
}

thread_local! {
    static RUNTIME: RefCell<Option<Runtime>> = const { RefCell::new(None) };
}

fn with_registry<R>(f: impl FnOnce(&mut Registry<WebPage>) -> R) -> Option<R> {
    RUNTIME.with(|cell| {
        let Ok(mut runtime) = cell.try_borrow_mut() else {
            tracing::warn!("runtime busy, skipping registry access");
            return None;
        };
        runtime.as_mut().map(|rt| f(&mut rt.registry))
    })
}

fn keep_listener(listener: Closure<dyn FnMut(Event)>) {
    RUNTIME.with(|cell| {
        if let Ok(mut runtime) = cell.try_borrow_mut() {
            if let Some(rt) = runtime.as_mut() {
                rt.listeners.push(listener);
            }
        }
    });
}

fn rescan() {
    if with_registry(|registry| registry.discover_and_initialize()).is_none() {
        tracing::warn!("rescan requested before init");
    }
}

fn set_timeout(delay: Duration, f: impl FnOnce() + 'static) -> Result<()> {
    let window = web_sys::window().ok_or_else(|| RevealError::Other("no window".into()))?;
    let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
    let callback = Closure::once_into_js(f);
    window
        .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), millis)
        .map(drop)
        .map_err(|e| RevealError::Other(js_error_message(&e)))
}

fn is_design_mode(window: &Window) -> bool {
    Reflect::get(window, &JsValue::from_str("Shopify"))
        .ok()
        .filter(JsValue::is_object)
        .and_then(|shopify| Reflect::get(&shopify, &JsValue::from_str("designMode")).ok())
        .and_then(|flag| flag.as_bool())
        .unwrap_or(false)
}

/// `event.detail.sectionId` of an editor notification.
fn editor_section_id(event: &Event) -> Option<String> {
    let detail = event.dyn_ref::<CustomEvent>()?.detail();
    Reflect::get(&detail, &JsValue::from_str("sectionId"))
        .ok()?
        .as_string()
}

fn initialize_in_editor(section_id: &str) {
    match with_registry(|registry| registry.initialize_section(section_id)) {
        Some(Ok(outcome)) => {
            tracing::debug!(section_id = %section_id, ?outcome, "editor section initialized");
        }
        Some(Err(err)) => {
            tracing::error!(
                section_id = %section_id,
                error = %err,
                "failed to initialize section reveal in editor"
            );
        }
        None => {}
    }
}

fn add_document_listener(
    document: &Document,
    event_name: &str,
    listener: Closure<dyn FnMut(Event)>,
) -> Result<()> {
    document
        .add_event_listener_with_callback(event_name, listener.as_ref().unchecked_ref())
        .map_err(|e| RevealError::Subscribe(js_error_message(&e)))?;
    keep_listener(listener);
    Ok(())
}

fn watch_editor(document: &Document, settle: Duration) -> Result<()> {
    let on_load = Closure::wrap(Box::new(move |event: Event| {
        let Some(section_id) = editor_section_id(&event) else {
            tracing::warn!("section load notification without a section id");
            return;
        };
        if let Err(err) = set_timeout(settle, move || initialize_in_editor(&section_id)) {
            tracing::warn!(error = %err, "could not schedule editor initialization");
        }
    }) as Box<dyn FnMut(Event)>);
    add_document_listener(document, SECTION_LOAD_EVENT, on_load)?;

    let on_unload = Closure::wrap(Box::new(|event: Event| {
        if let Some(section_id) = editor_section_id(&event) {
            with_registry(|registry| registry.remove_section(&section_id));
        }
    }) as Box<dyn FnMut(Event)>);
    add_document_listener(document, SECTION_UNLOAD_EVENT, on_unload)
}

fn start(config: RevealConfig) -> Result<()> {
    if RUNTIME.with(|cell| cell.borrow().is_some()) {
        if with_registry(|registry| registry.config() != &config) == Some(true) {
            tracing::warn!("already initialized, new options ignored");
        }
        tracing::debug!("already initialized, rescanning");
        rescan();
        return Ok(());
    }

    console_error_panic_hook::set_once();
    console::install(tracing::Level::INFO);

    let window = web_sys::window().ok_or_else(|| RevealError::Other("no window".into()))?;
    let document = window
        .document()
        .ok_or_else(|| RevealError::Other("no document".into()))?;

    let ready = ReadyState::parse(&document.ready_state());
    let plan = boot_plan(ready, is_design_mode(&window), &config);

    let shared_config = Rc::new(config.clone());
    let page = WebPage::new(window, document.clone(), shared_config);
    RUNTIME.with(|cell| {
        *cell.borrow_mut() = Some(Runtime {
            registry: Registry::new(page, config),
            listeners: Vec::new(),
        });
    });

    for step in plan {
        match step {
            BootStep::ScanNow => rescan(),
            BootStep::ScanWhenReady => {
                let on_ready = Closure::wrap(Box::new(|_event: Event| rescan()) as Box<dyn FnMut(Event)>);
                add_document_listener(&document, "DOMContentLoaded", on_ready)?;
            }
            BootStep::ScanAfter(delay) => set_timeout(delay, rescan)?,
            BootStep::WatchEditor { settle } => watch_editor(&document, settle)?,
        }
    }
    Ok(())
}

/// Start revealing every section on the page with the default settings.
///
/// Calling it again only rescans.
///
/// # Errors
/// Returns an error when there is no window/document or a listener cannot be
/// registered.
#[wasm_bindgen]
pub fn init() -> std::result::Result<(), JsValue> {
    start(RevealConfig::default()).map_err(JsValue::from)
}

/// Like [`init`], with a partial `RevealConfig` object from JavaScript.
///
/// Options only take effect on the first call; later calls rescan with the
/// settings already in use and log a warning if the options differ.
///
/// # Errors
/// Returns an error for an invalid options object, or any [`init`] failure.
#[wasm_bindgen]
pub fn init_with_options(options: JsValue) -> std::result::Result<(), JsValue> {
    let config: RevealConfig = if options.is_undefined() || options.is_null() {
        RevealConfig::default()
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| RevealError::Config(e.to_string()))?
    };
    config.validate()?;
    start(config).map_err(JsValue::from)
}

/// Initialize (or re-bind) a single section by id. Returns `true` when a new
/// controller was built.
///
/// # Errors
/// Returns an error before [`init`] or when the section fails to initialize.
#[wasm_bindgen]
pub fn init_section(section_id: &str) -> std::result::Result<bool, JsValue> {
    let outcome = with_registry(|registry| registry.initialize_section(section_id))
        .ok_or_else(|| RevealError::Other("wipe_reveal is not initialized".into()))??;
    Ok(outcome == InitOutcome::Created)
}

/// Tear down the controller for `section_id`, if any.
#[wasm_bindgen]
pub fn remove_section(section_id: &str) -> bool {
    with_registry(|registry| registry.remove_section(section_id)).unwrap_or(false)
}

/// Ids of the sections that currently have a controller.
#[wasm_bindgen]
pub fn active_sections() -> Array {
    with_registry(|registry| {
        registry
            .section_ids()
            .map(JsValue::from_str)
            .collect::<Array>()
    })
    .unwrap_or_else(Array::new)
}
