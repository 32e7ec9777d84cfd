//! When discovery runs.
//!
//! The page runtime asks [`boot_plan`] for its steps and executes them with
//! real timers and listeners; keeping the schedule as data lets it be tested
//! without a document.

use std::time::Duration;

use crate::config::RevealConfig;

/// `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    /// Parse the DOM string. Unknown values count as loaded.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "loading" => Self::Loading,
            "interactive" => Self::Interactive,
            _ => Self::Complete,
        }
    }
}

/// One scheduled discovery trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootStep {
    /// Scan immediately.
    ScanNow,
    /// Scan once the document finishes loading.
    ScanWhenReady,
    /// Scan again after a fixed, non-cancelable delay.
    ScanAfter(Duration),
    /// Initialize each section the theme editor loads, after `settle`.
    WatchEditor { settle: Duration },
}

/// Discovery schedule for a page in `ready` state.
#[must_use]
pub fn boot_plan(ready: ReadyState, design_mode: bool, config: &RevealConfig) -> Vec<BootStep> {
    let mut steps = Vec::with_capacity(3);
    steps.push(match ready {
        ReadyState::Loading => BootStep::ScanWhenReady,
        ReadyState::Interactive | ReadyState::Complete => BootStep::ScanNow,
    });
    steps.push(BootStep::ScanAfter(Duration::from_millis(u64::from(
        config.rescan_delay_ms,
    ))));
    if design_mode {
        steps.push(BootStep::WatchEditor {
            settle: Duration::from_millis(u64::from(config.editor_settle_ms)),
        });
    }
    steps
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
    fn test_loading_document_defers_first_scan() {
        let plan = boot_plan(ReadyState::Loading, false, &RevealConfig::default());
        assert_eq!(
            plan,
            vec![
                BootStep::ScanWhenReady,
                BootStep::ScanAfter(Duration::from_millis(500)),
            ]
        );
    }

    #[test]
    fn test_loaded_document_scans_now() {
        for ready in [ReadyState::Interactive, ReadyState::Complete] {
            let plan = boot_plan(ready, false, &RevealConfig::default());
            assert_eq!(plan.first(), Some(&BootStep::ScanNow));
        }
    }

    #[test]
    fn test_design_mode_watches_editor() {
        let plan = boot_plan(ReadyState::Complete, true, &RevealConfig::default());
        assert_eq!(
            plan.last(),
            Some(&BootStep::WatchEditor {
                settle: Duration::from_millis(100)
            })
        );
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_ready_state_parse() {
        assert_eq!(ReadyState::parse("loading"), ReadyState::Loading);
        assert_eq!(ReadyState::parse("interactive"), ReadyState::Interactive);
        assert_eq!(ReadyState::parse("complete"), ReadyState::Complete);
        assert_eq!(ReadyState::parse(""), ReadyState::Complete);
    }
}
