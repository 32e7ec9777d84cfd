//! Discovery of eligible sections and one controller per section id.

use std::collections::BTreeMap;

use crate::config::RevealConfig;
use crate::controller::{Controller, SharedController};
use crate::error::Result;
use crate::host::Page;

/// What happened to a section during initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// A new controller was built (possibly replacing a stale one).
    Created,
    /// The existing controller still matches the document and was kept.
    Reused,
}

/// Result of one discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub created: usize,
    pub reused: usize,
    /// Controllers dropped because their section left the document
    pub pruned: usize,
    /// Section ids whose controller could not be built
    pub failed: Vec<String>,
}

pub struct Registry<P: Page> {
    page: P,
    config: RevealConfig,
    controllers: BTreeMap<String, SharedController<P::Host>>,
}

impl<P: Page> Registry<P> {
    #[must_use]
    pub fn new(page: P, config: RevealConfig) -> Self {
        Self {
            page,
            config,
            controllers: BTreeMap::new(),
        }
    }

    /// Find every section in the document and make sure each has a live
    /// controller. A section that fails is logged and skipped; the rest of
    /// the batch still initializes.
    pub fn discover_and_initialize(&mut self) -> ScanReport {
        let mut report = ScanReport {
            pruned: self.prune_detached(),
            ..ScanReport::default()
        };

        let section_ids = match self.page.discover_sections() {
            Ok(ids) => ids,
            Err(err) => {
                tracing::error!(error = %err, "section discovery failed");
                return report;
            }
        };

        for section_id in section_ids {
            match self.initialize_section(&section_id) {
                Ok(InitOutcome::Created) => report.created += 1,
                Ok(InitOutcome::Reused) => report.reused += 1,
                Err(err) => {
                    tracing::error!(
                        section_id = %section_id,
                        error = %err,
                        "failed to initialize section reveal"
                    );
                    report.failed.push(section_id);
                }
            }
        }

        tracing::debug!(
            created = report.created,
            reused = report.reused,
            pruned = report.pruned,
            failed = report.failed.len(),
            "section scan finished"
        );
        report
    }

    /// Ensure `section_id` has a controller bound to its current markup.
    ///
    /// # Errors
    /// Returns the construction failure; no controller is registered then.
    pub fn initialize_section(&mut self, section_id: &str) -> Result<InitOutcome> {
        if let Some(existing) = self.controllers.get(section_id) {
            if existing.borrow().is_current() {
                return Ok(InitOutcome::Reused);
            }
        }
        if let Some(stale) = self.controllers.remove(section_id) {
            stale.borrow_mut().dispose();
        }

        let page = &self.page;
        let controller = Controller::new_shared(section_id, &self.config, |dispatch| {
            page.host_for(section_id, dispatch)
        })?;
        self.controllers.insert(section_id.to_string(), controller);
        Ok(InitOutcome::Created)
    }

    /// Dispose and forget the controller for `section_id`.
    pub fn remove_section(&mut self, section_id: &str) -> bool {
        let Some(controller) = self.controllers.remove(section_id) else {
            return false;
        };
        controller.borrow_mut().dispose();
        true
    }

    /// Drop controllers whose section is missing or no longer attached.
    pub fn prune_detached(&mut self) -> usize {
        let before = self.controllers.len();
        self.controllers.retain(|section_id, controller| {
            let keep = controller.borrow().is_attached();
            if !keep {
                tracing::debug!(section_id = %section_id, "pruning detached section");
                controller.borrow_mut().dispose();
            }
            keep
        });
        before - self.controllers.len()
    }

    #[must_use]
    pub fn controller(&self, section_id: &str) -> Option<&SharedController<P::Host>> {
        self.controllers.get(section_id)
    }

    /// Registered section ids, sorted.
    pub fn section_ids(&self) -> impl Iterator<Item = &str> {
        self.controllers.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Settings every controller is built with.
    #[must_use]
    pub fn config(&self) -> &RevealConfig {
        &self.config
    }

    /// Dispose every controller.
    pub fn clear(&mut self) {
        for controller in self.controllers.values() {
            controller.borrow_mut().dispose();
        }
        self.controllers.clear();
    }
}
