//! Per-section reveal controller.
//!
//! A controller owns one section's subscriptions and drives its layer's clip.
//! Host callbacks are turned into [`RevealEvent`]s and fed to
//! [`Controller::handle`], so the whole lifecycle can be exercised without an
//! event loop.
//!
//! Lifecycle:
//! - **inert**: section or layer missing. Nothing is wired, ever.
//! - **dormant**: targets found, viewport is mobile. Only the resize watch is
//!   held, to notice the switch back to desktop.
//! - **active**: desktop. Scroll + resize listeners, visibility observation
//!   when available, clip written on every update.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::RevealConfig;
use crate::error::{Result, RevealError};
use crate::host::{GateOptions, Host, ViewportStream, VisibilityGate};
use crate::progress::{scroll_progress, ClipInset};

/// Controller shared between the registry and its host callbacks.
pub type SharedController<H> = Rc<RefCell<Controller<H>>>;

/// Input to the controller's transition function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealEvent {
    /// The viewport scrolled.
    ScrollTick,
    /// The viewport was resized.
    ResizeTick,
    /// The visibility observer reported the section entering or leaving.
    VisibilityChanged { is_intersecting: bool },
    /// A previously requested animation frame is due.
    FrameDue,
}

/// Responsive class of the current viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Mobile,
    Desktop,
}

impl DisplayMode {
    /// Mobile iff `width <= breakpoint`.
    #[must_use]
    pub fn for_width(width: f64, breakpoint: f64) -> Self {
        if width <= breakpoint {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    #[must_use]
    pub const fn is_mobile(self) -> bool {
        matches!(self, Self::Mobile)
    }
}

struct Targets<E> {
    section: E,
    layer: E,
}

#[derive(Debug, Default, Clone, Copy)]
struct Listening {
    scroll: bool,
    resize: bool,
}

pub struct Controller<H: Host> {
    section_id: String,
    host: H,
    breakpoint: f64,
    gate_options: GateOptions,
    targets: Option<Targets<H::Element>>,
    gate: Option<Box<dyn VisibilityGate<H::Element>>>,
    mode: DisplayMode,
    /// Last visibility report; true until the observer says otherwise
    in_view: bool,
    pending_frame: Option<H::FrameHandle>,
    listening: Listening,
    observing: bool,
    /// A clip written by this controller is on the layer
    clip_applied: bool,
}

impl<H: Host> Controller<H> {
    /// Resolve the section for `section_id` and start driving it.
    ///
    /// A missing section or layer yields an inert controller, not an error.
    ///
    /// # Errors
    /// Fails when the id is blank, a document lookup throws, or wiring the
    /// listeners fails. Anything wired before the failure is torn down.
    pub fn new(section_id: impl Into<String>, host: H, config: &RevealConfig) -> Result<Self> {
        let mut controller = Self::detached(section_id.into(), host, config);
        controller.attach()?;
        Ok(controller)
    }

    /// Like [`Controller::new`], but shared, with the host built from a weak
    /// pointer to the controller itself so its callbacks can reach it.
    ///
    /// # Errors
    /// Same as [`Controller::new`].
    pub fn new_shared<F>(
        section_id: &str,
        config: &RevealConfig,
        make_host: F,
    ) -> Result<SharedController<H>>
    where
        F: FnOnce(Weak<RefCell<Self>>) -> H,
    {
        let shared = Rc::new_cyclic(|weak| {
            RefCell::new(Self::detached(
                section_id.to_string(),
                make_host(Weak::clone(weak)),
                config,
            ))
        });
        shared.borrow_mut().attach()?;
        Ok(shared)
    }

    fn detached(section_id: String, host: H, config: &RevealConfig) -> Self {
        Self {
            section_id,
            host,
            breakpoint: config.mobile_breakpoint,
            gate_options: config.gate_options(),
            targets: None,
            gate: None,
            mode: DisplayMode::Desktop,
            in_view: true,
            pending_frame: None,
            listening: Listening::default(),
            observing: false,
            clip_applied: false,
        }
    }

    fn attach(&mut self) -> Result<()> {
        if self.section_id.trim().is_empty() {
            return Err(RevealError::InvalidSectionId(self.section_id.clone()));
        }

        self.mode = DisplayMode::for_width(self.host.viewport().width, self.breakpoint);

        let Some(section) = self.host.find_section(&self.section_id)? else {
            tracing::debug!(section_id = %self.section_id, "section not found, staying inert");
            return Ok(());
        };
        let Some(layer) = self.host.find_layer(&section)? else {
            tracing::debug!(section_id = %self.section_id, "reveal layer not found, staying inert");
            return Ok(());
        };
        self.targets = Some(Targets { section, layer });
        self.gate = self.host.visibility_gate();
        if self.gate.is_none() {
            tracing::debug!(
                section_id = %self.section_id,
                "no visibility observer, updating on every frame"
            );
        }

        let started = self.watch_resize().and_then(|()| self.activate());
        if started.is_err() {
            self.dispose();
        }
        started
    }

    /// Feed one event through the state machine.
    ///
    /// # Errors
    /// Propagates host failures from the handler (frame request, style write,
    /// re-activation).
    pub fn handle(&mut self, event: RevealEvent) -> Result<()> {
        match event {
            RevealEvent::ScrollTick => self.on_scroll(),
            RevealEvent::ResizeTick => self.on_resize(),
            RevealEvent::VisibilityChanged { is_intersecting } => {
                self.on_visibility_change(is_intersecting)
            }
            RevealEvent::FrameDue => self.on_frame(),
        }
    }

    /// Subscribe to scroll and resize, update once, and start observing
    /// visibility. No-op when inert, mobile, or already active.
    ///
    /// # Errors
    /// Returns the first wiring failure, after deactivating.
    pub fn activate(&mut self) -> Result<()> {
        if self.targets.is_none() || self.mode.is_mobile() {
            return Ok(());
        }
        let wired = self.wire();
        if wired.is_err() {
            self.deactivate();
        }
        wired
    }

    fn wire(&mut self) -> Result<()> {
        let newly_active = !self.listening.scroll;
        if newly_active {
            self.host.listen(ViewportStream::Scroll)?;
            self.listening.scroll = true;
            self.in_view = true;
        }
        self.watch_resize()?;
        self.update()?;
        self.observe()?;
        if newly_active {
            tracing::debug!(section_id = %self.section_id, "reveal activated");
        }
        Ok(())
    }

    fn watch_resize(&mut self) -> Result<()> {
        if !self.listening.resize {
            self.host.listen(ViewportStream::Resize)?;
            self.listening.resize = true;
        }
        Ok(())
    }

    fn observe(&mut self) -> Result<()> {
        if self.observing {
            return Ok(());
        }
        let (Some(gate), Some(targets)) = (self.gate.as_mut(), self.targets.as_ref()) else {
            return Ok(());
        };
        gate.observe(&targets.section, &self.gate_options)?;
        self.observing = true;
        Ok(())
    }

    /// Coalesce scroll bursts into one update on the next frame.
    ///
    /// # Errors
    /// Fails when the frame request fails.
    pub fn on_scroll(&mut self) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        if self.observing && !self.in_view {
            return Ok(());
        }
        if let Some(handle) = self.pending_frame.take() {
            self.host.cancel_frame(handle);
        }
        self.pending_frame = Some(self.host.request_frame()?);
        Ok(())
    }

    /// Re-evaluate the display mode and react to a crossing of the breakpoint.
    ///
    /// # Errors
    /// Fails when re-activation or the update fails.
    pub fn on_resize(&mut self) -> Result<()> {
        if self.targets.is_none() {
            return Ok(());
        }
        let mode = DisplayMode::for_width(self.host.viewport().width, self.breakpoint);
        if mode == self.mode {
            self.update()?;
            return Ok(());
        }

        self.mode = mode;
        tracing::debug!(section_id = %self.section_id, ?mode, "display mode changed");
        match mode {
            DisplayMode::Mobile => {
                self.deactivate();
                Ok(())
            }
            DisplayMode::Desktop => self.activate(),
        }
    }

    /// Record a visibility report and recompute on entry, on every threshold
    /// step while visible, and once more on exit.
    ///
    /// # Errors
    /// Fails when the update fails.
    pub fn on_visibility_change(&mut self, is_intersecting: bool) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        let was_in_view = self.in_view;
        self.in_view = is_intersecting;
        if is_intersecting || was_in_view {
            self.update()?;
        }
        Ok(())
    }

    /// Run the update scheduled by [`Controller::on_scroll`].
    ///
    /// # Errors
    /// Fails when the update fails.
    pub fn on_frame(&mut self) -> Result<()> {
        if self.pending_frame.take().is_none() {
            return Ok(());
        }
        self.update()?;
        Ok(())
    }

    /// Sample geometry and write the clip. Returns the applied progress, or
    /// `None` when inert or mobile.
    ///
    /// # Errors
    /// Fails when the style write fails.
    pub fn update(&mut self) -> Result<Option<f64>> {
        if self.mode.is_mobile() {
            return Ok(None);
        }
        let Some(targets) = self.targets.as_ref() else {
            return Ok(None);
        };
        let rect = self.host.bounding_rect(&targets.section);
        let viewport = self.host.viewport();
        let progress = scroll_progress(rect, viewport.height);
        let clip = ClipInset::reveal(progress);
        self.host.apply_clip(&targets.layer, Some(&clip))?;
        self.clip_applied = true;
        tracing::trace!(section_id = %self.section_id, progress, "clip updated");
        Ok(Some(progress))
    }

    /// Cancel the pending frame, stop observing, drop the scroll listener and
    /// clear the clip if one was written. The resize watch stays. Idempotent.
    pub fn deactivate(&mut self) {
        if let Some(handle) = self.pending_frame.take() {
            self.host.cancel_frame(handle);
        }
        if self.observing {
            if let Some(gate) = self.gate.as_mut() {
                gate.disconnect();
            }
            self.observing = false;
        }
        let was_active = self.listening.scroll;
        if was_active {
            self.host.unlisten(ViewportStream::Scroll);
            self.listening.scroll = false;
        }
        if self.clip_applied {
            self.clip_applied = false;
            if let Some(targets) = self.targets.as_ref() {
                if let Err(err) = self.host.apply_clip(&targets.layer, None) {
                    tracing::warn!(section_id = %self.section_id, error = %err, "failed to reset clip");
                }
            }
        }
        if was_active {
            tracing::debug!(section_id = %self.section_id, "reveal deactivated");
        }
    }

    /// Full teardown: [`Controller::deactivate`] plus the resize watch.
    /// Idempotent; also runs on drop.
    pub fn dispose(&mut self) {
        self.deactivate();
        if self.listening.resize {
            self.host.unlisten(ViewportStream::Resize);
            self.listening.resize = false;
            tracing::debug!(section_id = %self.section_id, "reveal disposed");
        }
    }

    #[must_use]
    pub fn section_id(&self) -> &str {
        &self.section_id
    }

    /// No section or no layer was found.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.targets.is_none()
    }

    #[must_use]
    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Listening to scroll and driving the layer.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.listening.scroll
    }

    /// Holding the resize subscription used to detect mode changes.
    #[must_use]
    pub fn is_watching_resize(&self) -> bool {
        self.listening.resize
    }

    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.observing
    }

    #[must_use]
    pub fn has_visibility_gate(&self) -> bool {
        self.gate.is_some()
    }

    #[must_use]
    pub fn in_view(&self) -> bool {
        self.in_view
    }

    #[must_use]
    pub fn has_pending_frame(&self) -> bool {
        self.pending_frame.is_some()
    }

    #[must_use]
    pub fn section(&self) -> Option<&H::Element> {
        self.targets.as_ref().map(|t| &t.section)
    }

    #[must_use]
    pub fn layer(&self) -> Option<&H::Element> {
        self.targets.as_ref().map(|t| &t.layer)
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Section is still in the document.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.targets
            .as_ref()
            .is_some_and(|t| self.host.is_attached(&t.section))
    }

    /// Still bound to the element its id resolves to today.
    #[must_use]
    pub fn is_current(&self) -> bool {
        let Some(targets) = self.targets.as_ref() else {
            return false;
        };
        if !self.host.is_attached(&targets.section) {
            return false;
        }
        matches!(
            self.host.find_section(&self.section_id),
            Ok(Some(found)) if found == targets.section
        )
    }
}

impl<H: Host> Drop for Controller<H> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<H: Host> fmt::Debug for Controller<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("section_id", &self.section_id)
            .field("inert", &self.is_inert())
            .field("mode", &self.mode)
            .field("active", &self.listening.scroll)
            .field("watching_resize", &self.listening.resize)
            .field("observing", &self.observing)
            .field("in_view", &self.in_view)
            .field("pending_frame", &self.pending_frame)
            .finish_non_exhaustive()
    }
}
