//! Common test utilities: an in-memory page and a tracing capture layer.
//!
//! `FakeDom` stands in for the document, the viewport, the frame scheduler
//! and the intersection observer. Hosts handed to controllers share one
//! `FakeDom` through `Rc<RefCell<_>>`, so a test can move the page around
//! and then inspect what the controllers wrote.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use wipe_reveal::{
    ClipInset, Controller, GateOptions, Host, Page, RevealConfig, RevealError, SectionRect,
    ViewportSize, ViewportStream, VisibilityGate,
};

// ============================================================================
// Fake document
// ============================================================================

/// Element handle: just a number, compared by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FakeElement(pub u32);

#[derive(Debug, Clone)]
pub struct FakeSection {
    pub id: String,
    pub element: FakeElement,
    pub layer: Option<FakeElement>,
    pub top: f64,
    pub height: f64,
    pub attached: bool,
}

#[derive(Debug, Default)]
pub struct FakeDom {
    next_element: u32,
    pub sections: Vec<FakeSection>,
    pub viewport: ViewportSize,
    /// Visibility observation available to new controllers
    pub supports_visibility: bool,
    /// Section ids whose listener registration throws
    pub fail_listen: HashSet<String>,
    /// Section ids whose lookup throws
    pub fail_query: HashSet<String>,
    /// Active listener registrations per (section, stream)
    pub listeners: BTreeMap<(String, ViewportStream), usize>,
    /// Frames requested and not yet cancelled or run, with their owner
    pub live_frames: BTreeMap<u32, String>,
    next_frame: u32,
    pub cancelled_frames: usize,
    /// Current `clip-path` per layer; `None` means cleared
    pub clips: BTreeMap<FakeElement, Option<String>>,
    /// Clip writes (including resets) per layer
    pub clip_writes: BTreeMap<FakeElement, usize>,
    /// Sections currently observed, with the options used
    pub observed: BTreeMap<String, GateOptions>,
    pub disconnects: usize,
}

impl FakeDom {
    pub fn shared(width: f64, height: f64) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            viewport: ViewportSize::new(width, height),
            supports_visibility: true,
            ..Self::default()
        }))
    }

    fn element(&mut self) -> FakeElement {
        self.next_element += 1;
        FakeElement(self.next_element)
    }

    /// Add a section with a reveal layer.
    pub fn add_section(&mut self, id: &str, top: f64, height: f64) -> FakeElement {
        let element = self.element();
        let layer = self.element();
        self.sections.push(FakeSection {
            id: id.to_string(),
            element,
            layer: Some(layer),
            top,
            height,
            attached: true,
        });
        layer
    }

    /// Add a section without a reveal layer.
    pub fn add_bare_section(&mut self, id: &str) {
        let element = self.element();
        self.sections.push(FakeSection {
            id: id.to_string(),
            element,
            layer: None,
            top: 0.0,
            height: 100.0,
            attached: true,
        });
    }

    /// Detach the section's current markup.
    pub fn detach(&mut self, id: &str) {
        for section in self.sections.iter_mut().filter(|s| s.id == id) {
            section.attached = false;
        }
    }

    /// Swap the section's markup for fresh elements, as the editor does.
    pub fn replace_markup(&mut self, id: &str) -> FakeElement {
        self.detach(id);
        let (top, height) = self
            .sections
            .iter()
            .find(|s| s.id == id)
            .map_or((0.0, 100.0), |s| (s.top, s.height));
        self.add_section(id, top, height)
    }

    pub fn set_top(&mut self, id: &str, top: f64) {
        for section in self.sections.iter_mut().filter(|s| s.id == id) {
            section.top = top;
        }
    }

    pub fn set_width(&mut self, width: f64) {
        self.viewport.width = width;
    }

    pub fn layer_of(&self, id: &str) -> FakeElement {
        self.attached(id).and_then(|s| s.layer).expect("section has a layer")
    }

    pub fn clip_of(&self, id: &str) -> Option<String> {
        self.clips.get(&self.layer_of(id)).cloned().flatten()
    }

    pub fn writes_to(&self, id: &str) -> usize {
        self.clip_writes
            .get(&self.layer_of(id))
            .copied()
            .unwrap_or(0)
    }

    pub fn listener_count(&self, id: &str, stream: ViewportStream) -> usize {
        self.listeners
            .get(&(id.to_string(), stream))
            .copied()
            .unwrap_or(0)
    }

    pub fn frames_for(&self, id: &str) -> usize {
        self.live_frames.values().filter(|owner| *owner == id).count()
    }

    fn attached(&self, id: &str) -> Option<&FakeSection> {
        self.sections.iter().find(|s| s.id == id && s.attached)
    }

    fn by_element(&self, element: FakeElement) -> Option<&FakeSection> {
        self.sections.iter().find(|s| s.element == element)
    }
}

/// Run every live frame owned by `id` by handing `FrameDue` to `controller`.
pub fn run_frames(dom: &Rc<RefCell<FakeDom>>, controller: &mut Controller<FakeHost>) -> usize {
    let due: Vec<u32> = dom
        .borrow()
        .live_frames
        .iter()
        .filter(|(_, owner)| owner.as_str() == controller.section_id())
        .map(|(handle, _)| *handle)
        .collect();
    for handle in &due {
        dom.borrow_mut().live_frames.remove(handle);
        controller
            .handle(wipe_reveal::RevealEvent::FrameDue)
            .unwrap();
    }
    due.len()
}

// ============================================================================
// Host
// ============================================================================

pub struct FakeHost {
    pub dom: Rc<RefCell<FakeDom>>,
    pub section_id: String,
}

impl FakeHost {
    pub fn new(dom: &Rc<RefCell<FakeDom>>, section_id: &str) -> Self {
        Self {
            dom: Rc::clone(dom),
            section_id: section_id.to_string(),
        }
    }
}

impl Host for FakeHost {
    type Element = FakeElement;
    type FrameHandle = u32;

    fn find_section(&self, section_id: &str) -> wipe_reveal::Result<Option<FakeElement>> {
        let dom = self.dom.borrow();
        if dom.fail_query.contains(section_id) {
            return Err(RevealError::Query {
                selector: format!(".product-view-{section_id}"),
                message: "SyntaxError: not a valid selector".into(),
            });
        }
        Ok(dom.attached(section_id).map(|s| s.element))
    }

    fn find_layer(&self, section: &FakeElement) -> wipe_reveal::Result<Option<FakeElement>> {
        Ok(self.dom.borrow().by_element(*section).and_then(|s| s.layer))
    }

    fn is_attached(&self, element: &FakeElement) -> bool {
        self.dom
            .borrow()
            .by_element(*element)
            .is_some_and(|s| s.attached)
    }

    fn viewport(&self) -> ViewportSize {
        self.dom.borrow().viewport
    }

    fn bounding_rect(&self, element: &FakeElement) -> SectionRect {
        self.dom
            .borrow()
            .by_element(*element)
            .map(|s| SectionRect::new(s.top, s.height))
            .unwrap_or_default()
    }

    fn apply_clip(
        &mut self,
        layer: &FakeElement,
        clip: Option<&ClipInset>,
    ) -> wipe_reveal::Result<()> {
        let mut dom = self.dom.borrow_mut();
        dom.clips.insert(*layer, clip.map(ClipInset::css_value));
        *dom.clip_writes.entry(*layer).or_default() += 1;
        Ok(())
    }

    fn listen(&mut self, stream: ViewportStream) -> wipe_reveal::Result<()> {
        let mut dom = self.dom.borrow_mut();
        if dom.fail_listen.contains(&self.section_id) {
            return Err(RevealError::Subscribe(format!(
                "{} listener rejected",
                stream.event_name()
            )));
        }
        *dom.listeners
            .entry((self.section_id.clone(), stream))
            .or_default() += 1;
        Ok(())
    }

    fn unlisten(&mut self, stream: ViewportStream) {
        let mut dom = self.dom.borrow_mut();
        let key = (self.section_id.clone(), stream);
        match dom.listeners.get(&key).copied() {
            Some(count) if count > 1 => {
                dom.listeners.insert(key, count - 1);
            }
            Some(_) => {
                dom.listeners.remove(&key);
            }
            None => panic!("removing a listener that was never added: {key:?}"),
        }
    }

    fn request_frame(&mut self) -> wipe_reveal::Result<u32> {
        let mut dom = self.dom.borrow_mut();
        dom.next_frame += 1;
        let handle = dom.next_frame;
        dom.live_frames.insert(handle, self.section_id.clone());
        Ok(handle)
    }

    fn cancel_frame(&mut self, handle: u32) {
        let mut dom = self.dom.borrow_mut();
        if dom.live_frames.remove(&handle).is_some() {
            dom.cancelled_frames += 1;
        }
    }

    fn visibility_gate(&mut self) -> Option<Box<dyn VisibilityGate<FakeElement>>> {
        if !self.dom.borrow().supports_visibility {
            return None;
        }
        Some(Box::new(FakeGate {
            dom: Rc::clone(&self.dom),
            section_id: self.section_id.clone(),
        }))
    }
}

struct FakeGate {
    dom: Rc<RefCell<FakeDom>>,
    section_id: String,
}

impl VisibilityGate<FakeElement> for FakeGate {
    fn observe(&mut self, _target: &FakeElement, options: &GateOptions) -> wipe_reveal::Result<()> {
        self.dom
            .borrow_mut()
            .observed
            .insert(self.section_id.clone(), options.clone());
        Ok(())
    }

    fn disconnect(&mut self) {
        let mut dom = self.dom.borrow_mut();
        if dom.observed.remove(&self.section_id).is_some() {
            dom.disconnects += 1;
        }
    }
}

// ============================================================================
// Page
// ============================================================================

pub struct FakePage {
    pub dom: Rc<RefCell<FakeDom>>,
}

impl Page for FakePage {
    type Host = FakeHost;

    fn discover_sections(&self) -> wipe_reveal::Result<Vec<String>> {
        Ok(self
            .dom
            .borrow()
            .sections
            .iter()
            .filter(|s| s.attached)
            .map(|s| s.id.clone())
            .collect())
    }

    fn host_for(
        &self,
        section_id: &str,
        _dispatch: Weak<RefCell<Controller<FakeHost>>>,
    ) -> FakeHost {
        FakeHost::new(&self.dom, section_id)
    }
}

/// Desktop controller for `id` on `dom` with default settings.
pub fn controller(dom: &Rc<RefCell<FakeDom>>, id: &str) -> Controller<FakeHost> {
    Controller::new(id, FakeHost::new(dom, id), &RevealConfig::default()).unwrap()
}

// ============================================================================
// Tracing capture
// ============================================================================

/// One captured event.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.fields.push((field.name().to_string(), rendered));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }
}

#[derive(Clone, Default)]
struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: Subscriber> Layer<S> for EventCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Run `f` with a subscriber that records every event, and return them.
pub fn capture_events<R>(f: impl FnOnce() -> R) -> (R, Vec<CapturedEvent>) {
    let capture = EventCapture::default();
    let events = Arc::clone(&capture.events);
    let subscriber = tracing_subscriber::registry().with(capture);
    let result = tracing::subscriber::with_default(subscriber, f);
    let events = events.lock().unwrap().clone();
    (result, events)
}

/// Only the `ERROR` events.
pub fn errors(events: &[CapturedEvent]) -> Vec<&CapturedEvent> {
    events.iter().filter(|e| e.level == Level::ERROR).collect()
}
