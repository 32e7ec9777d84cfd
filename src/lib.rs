//! wipe-reveal - scroll-driven wipe reveal for storefront sections
//!
//! Ties the `clip-path` of a section's first image layer to how far the
//! section has travelled through the viewport:
//! - Progress 0 when the section's top touches the viewport bottom, 1 once its
//!   bottom leaves through the top
//! - Scroll bursts coalesced to one update per animation frame
//! - Updates suspended while an intersection observer reports the section
//!   out of view
//! - Inactive at or below the mobile breakpoint, re-armed when the viewport
//!   widens again
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init_wasm, { init } from 'wipe-reveal';
//! await init_wasm();
//! init();
//! ```
//!
//! The core (`progress`, `controller`, `registry`, `bootstrap`) is
//! host-independent; the DOM binding lives in `web` and is only compiled for
//! `wasm32`.

pub mod bootstrap;
pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod progress;
pub mod registry;

// Browser binding
#[cfg(target_arch = "wasm32")]
pub mod web;

use wasm_bindgen::prelude::*;

pub use config::RevealConfig;
pub use controller::{Controller, DisplayMode, RevealEvent, SharedController};
pub use error::{Result, RevealError};
pub use host::{GateOptions, Host, Page, ViewportStream, VisibilityGate};
pub use progress::{scroll_progress, ClipInset, SectionRect, ViewportSize};
pub use registry::{InitOutcome, Registry, ScanReport};

/// `clip-path` value for a section at `top` with `height` in a viewport of
/// `viewport_height`, for themes that want the same curve elsewhere.
#[must_use]
#[wasm_bindgen]
pub fn reveal_clip(top: f64, height: f64, viewport_height: f64) -> String {
    ClipInset::reveal(scroll_progress(SectionRect::new(top, height), viewport_height)).css_value()
}

/// Get the library version
#[must_use]
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
