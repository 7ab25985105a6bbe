//! Reference cleanup resolver: deletes reference rows that duplicate a
//! keeper row exactly (same identifier, type and account).
//!
//! Deletes go through the `ReferenceManager` so the host's own hooks run.
//! A failed delete is logged and counted; the batch carries on.

use crate::{
    collaborator::ReferenceManager,
    error::{DedupeError, DedupeResult},
    store::DedupeStore,
    types::ReferenceId,
};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupOutcome {
    pub deleted_count: usize,
    pub error_count: usize,
}

impl CleanupOutcome {
    pub fn attempted(&self) -> usize {
        self.deleted_count + self.error_count
    }
}

pub struct ReferenceCleanupResolver<'a> {
    store: &'a DedupeStore,
    manager: &'a mut dyn ReferenceManager,
}

impl<'a> ReferenceCleanupResolver<'a> {
    pub fn new(store: &'a DedupeStore, manager: &'a mut dyn ReferenceManager) -> Self {
        Self { store, manager }
    }

    /// Keepers that were themselves deleted earlier in the batch simply
    /// find nothing to delete, so repeated or overlapping ids are harmless.
    pub fn delete_redundant_references(&mut self, keeper_ids: &[ReferenceId]) -> DedupeResult<CleanupOutcome> {
        let mut outcome = CleanupOutcome::default();
        for &keeper_id in keeper_ids {
            for reference_id in self.store.redundant_reference_ids(keeper_id)? {
                match self.manager.delete_reference(reference_id) {
                    Ok(()) => outcome.deleted_count += 1,
                    Err(message) => {
                        let e = DedupeError::DeleteFailed { reference_id, message };
                        log::error!("cleanup: error while deleting duplicate reference: {e}");
                        outcome.error_count += 1;
                    }
                }
            }
        }
        log::info!(
            "cleanup: {} duplicate references deleted, {} errors",
            outcome.deleted_count,
            outcome.error_count
        );
        Ok(outcome)
    }
}
