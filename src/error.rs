//! Structured error types for wipe-reveal.
//!
//! A missing section or layer is not an error: the controller goes inert.
//! Everything here is a construction or runtime failure that the registry
//! logs and contains to the one section it came from.

/// All errors that can occur while wiring or driving a section reveal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RevealError {
    /// Section identifier is empty or cannot be used in a lookup.
    #[error("Invalid section id: {0:?}")]
    InvalidSectionId(String),

    /// A document query threw (usually a selector built from a malformed id).
    #[error("Query `{selector}` failed: {message}")]
    Query { selector: String, message: String },

    /// Registering a viewport listener failed.
    #[error("Event subscription failed: {0}")]
    Subscribe(String),

    /// Requesting an animation frame failed.
    #[error("Animation frame request failed: {0}")]
    Frame(String),

    /// The visibility observer could not be created or attached.
    #[error("Visibility observer: {0}")]
    Observer(String),

    /// Writing the clip style to the layer failed.
    #[error("Style write failed: {0}")]
    Style(String),

    /// Rejected configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Catch-all for host errors without a better home.
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RevealError>;

#[cfg(target_arch = "wasm32")]
impl From<RevealError> for wasm_bindgen::JsValue {
    fn from(e: RevealError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}
