//! Capabilities a controller needs from the page it runs in.
//!
//! The browser implementation lives in `web`; tests drive controllers through
//! in-memory fakes. Nothing in the core touches globals.

use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

use crate::controller::Controller;
use crate::error::Result;
use crate::progress::{ClipInset, SectionRect, ViewportSize};

/// Viewport-level event streams a controller listens to (always passive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewportStream {
    Scroll,
    Resize,
}

impl ViewportStream {
    /// DOM event name.
    #[must_use]
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::Scroll => "scroll",
            Self::Resize => "resize",
        }
    }
}

/// Observation settings for the visibility gate.
#[derive(Debug, Clone, PartialEq)]
pub struct GateOptions {
    /// Lookahead beyond every viewport edge, in pixels
    pub root_margin_px: f64,
    /// Intersection ratios that produce a notification
    pub thresholds: Vec<f64>,
}

impl GateOptions {
    /// CSS margin string for the observer root, e.g. `50px`.
    #[must_use]
    pub fn root_margin(&self) -> String {
        format!("{}px", self.root_margin_px)
    }
}

/// Per-controller bindings to the document, viewport and scheduler.
///
/// One `Host` value belongs to exactly one controller, so listener and frame
/// bookkeeping never has to distinguish between sections.
pub trait Host {
    /// Handle to a document element.
    type Element: Clone + PartialEq + fmt::Debug + 'static;
    /// Handle returned by [`Host::request_frame`].
    type FrameHandle: Copy + PartialEq + fmt::Debug;

    /// Resolve the section element for `section_id`.
    ///
    /// `Ok(None)` when nothing matches; `Err` when the lookup itself throws.
    fn find_section(&self, section_id: &str) -> Result<Option<Self::Element>>;

    /// The designated first reveal layer inside `section`.
    fn find_layer(&self, section: &Self::Element) -> Result<Option<Self::Element>>;

    /// Whether `element` is still part of the document.
    fn is_attached(&self, element: &Self::Element) -> bool;

    fn viewport(&self) -> ViewportSize;

    /// Bounding box of `element` relative to the viewport.
    fn bounding_rect(&self, element: &Self::Element) -> SectionRect;

    /// Write `clip` to the layer's `clip-path`, or clear it when `None`.
    fn apply_clip(&mut self, layer: &Self::Element, clip: Option<&ClipInset>) -> Result<()>;

    /// Start delivering `stream` to this host's controller.
    fn listen(&mut self, stream: ViewportStream) -> Result<()>;

    /// Stop delivering `stream`. Unknown streams are ignored.
    fn unlisten(&mut self, stream: ViewportStream);

    /// Ask for one `FrameDue` before the next repaint.
    fn request_frame(&mut self) -> Result<Self::FrameHandle>;

    fn cancel_frame(&mut self, handle: Self::FrameHandle);

    /// Visibility observation, if the environment has it.
    ///
    /// Called once per controller, at construction.
    fn visibility_gate(&mut self) -> Option<Box<dyn VisibilityGate<Self::Element>>>;
}

/// Intersection observation of a single section.
pub trait VisibilityGate<E> {
    /// Begin observing `target`; notifications arrive as `VisibilityChanged`.
    fn observe(&mut self, target: &E, options: &GateOptions) -> Result<()>;

    /// Stop all observation. Safe to call when not observing.
    fn disconnect(&mut self);
}

/// The document as seen by the registry: section discovery plus a factory
/// for per-section hosts.
pub trait Page {
    type Host: Host;

    /// Identifiers of every eligible section, in document order.
    fn discover_sections(&self) -> Result<Vec<String>>;

    /// Bindings for one controller. `dispatch` points back at the controller
    /// being built so host callbacks can deliver events to it.
    fn host_for(
        &self,
        section_id: &str,
        dispatch: Weak<RefCell<Controller<Self::Host>>>,
    ) -> Self::Host;
}
