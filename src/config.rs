//! Runtime configuration.
//!
//! Every constant of the reveal lives here so a theme can override it from
//! JavaScript (`init_with_options`). Field names are camelCase on the wire and
//! any omitted field keeps its default.

use serde::Deserialize;

use crate::error::{Result, RevealError};
use crate::host::GateOptions;

/// Viewport widths at or below this are treated as mobile.
pub const DEFAULT_MOBILE_BREAKPOINT: f64 = 749.0;

/// How far beyond the viewport edges a section counts as visible.
pub const DEFAULT_ROOT_MARGIN_PX: f64 = 50.0;

/// Intersection ratios that trigger a visibility notification.
pub const DEFAULT_THRESHOLDS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Delay before the second discovery pass after load.
pub const DEFAULT_RESCAN_DELAY_MS: u32 = 500;

/// Delay after an editor section-load notification before initializing.
pub const DEFAULT_EDITOR_SETTLE_MS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RevealConfig {
    pub mobile_breakpoint: f64,
    pub root_margin_px: f64,
    pub thresholds: Vec<f64>,
    pub rescan_delay_ms: u32,
    pub editor_settle_ms: u32,
    /// Sections carry the class `<prefix><section id>`
    pub section_class_prefix: String,
    pub section_id_attribute: String,
    /// Class of the single layer that receives the clip
    pub layer_class: String,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            mobile_breakpoint: DEFAULT_MOBILE_BREAKPOINT,
            root_margin_px: DEFAULT_ROOT_MARGIN_PX,
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
            rescan_delay_ms: DEFAULT_RESCAN_DELAY_MS,
            editor_settle_ms: DEFAULT_EDITOR_SETTLE_MS,
            section_class_prefix: "product-view-".to_string(),
            section_id_attribute: "data-section-id".to_string(),
            layer_class: "product-view__image-1".to_string(),
        }
    }
}

impl RevealConfig {
    /// Parse a (possibly partial) JSON override on top of the defaults.
    ///
    /// # Errors
    /// Returns [`RevealError::Config`] for malformed JSON or invalid values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| RevealError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns [`RevealError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !self.mobile_breakpoint.is_finite() || self.mobile_breakpoint < 0.0 {
            return Err(RevealError::Config(format!(
                "mobileBreakpoint must be a non-negative number, got {}",
                self.mobile_breakpoint
            )));
        }
        if !self.root_margin_px.is_finite() || self.root_margin_px < 0.0 {
            return Err(RevealError::Config(format!(
                "rootMarginPx must be a non-negative number, got {}",
                self.root_margin_px
            )));
        }
        if self.thresholds.is_empty() {
            return Err(RevealError::Config("thresholds must not be empty".into()));
        }
        if let Some(bad) = self
            .thresholds
            .iter()
            .find(|t| !(0.0..=1.0).contains(*t))
        {
            return Err(RevealError::Config(format!(
                "threshold {bad} is outside [0, 1]"
            )));
        }
        for (name, value) in [
            ("sectionClassPrefix", &self.section_class_prefix),
            ("sectionIdAttribute", &self.section_id_attribute),
            ("layerClass", &self.layer_class),
        ] {
            if value.trim().is_empty() {
                return Err(RevealError::Config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    /// Options handed to the visibility observer.
    #[must_use]
    pub fn gate_options(&self) -> GateOptions {
        GateOptions {
            root_margin_px: self.root_margin_px,
            thresholds: self.thresholds.clone(),
        }
    }

    /// Class selector matching one section by id, e.g. `.product-view-abc`.
    #[must_use]
    pub fn section_selector(&self, section_id: &str) -> String {
        format!(".{}{}", self.section_class_prefix, section_id)
    }

    /// Selector matching every section candidate in the document.
    #[must_use]
    pub fn discovery_selector(&self) -> String {
        format!(
            "[class*=\"{}\"][{}]",
            self.section_class_prefix, self.section_id_attribute
        )
    }

    /// Selector for the reveal layer inside a section.
    #[must_use]
    pub fn layer_selector(&self) -> String {
        format!(".{}", self.layer_class)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RevealConfig::default();
        assert_eq!(config.mobile_breakpoint, 749.0);
        assert_eq!(config.thresholds, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(config.rescan_delay_ms, 500);
        assert_eq!(config.editor_settle_ms, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_selectors() {
        let config = RevealConfig::default();
        assert_eq!(config.section_selector("template--42"), ".product-view-template--42");
        assert_eq!(
            config.discovery_selector(),
            "[class*=\"product-view-\"][data-section-id]"
        );
        assert_eq!(config.layer_selector(), ".product-view__image-1");
    }

    #[test]
    fn test_partial_json_override() {
        let config = RevealConfig::from_json(r#"{"mobileBreakpoint": 989, "rootMarginPx": 0}"#)
            .unwrap();
        assert_eq!(config.mobile_breakpoint, 989.0);
        assert_eq!(config.root_margin_px, 0.0);
        assert_eq!(config.layer_class, "product-view__image-1");
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let err = RevealConfig::from_json(r#"{"thresholds": [0, 1.5]}"#).unwrap_err();
        assert!(matches!(err, RevealError::Config(msg) if msg.contains("1.5")));
    }

    #[test]
    fn test_rejects_empty_prefix() {
        let config = RevealConfig {
            section_class_prefix: " ".into(),
            ..RevealConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            RevealConfig::from_json("{"),
            Err(RevealError::Config(_))
        ));
    }
}
