//! Browser binding (wasm32 only).
//!
//! `init()` discovers every reveal section on the page, builds a controller
//! per section and keeps them alive until the page goes away. Scroll, resize,
//! animation-frame and intersection callbacks are turned into
//! `RevealEvent`s and dispatched to the controller they belong to.

mod console;
mod host;
mod runtime;

pub use host::{WebHost, WebPage};
pub use runtime::{active_sections, init, init_section, init_with_options, remove_section};
