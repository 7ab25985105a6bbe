//! The dedupe engine: one invocation scans, applies the operator's
//! requested actions, and scans again if anything changed.
//!
//! EXECUTION ORDER (fixed):
//!   1. Scan          (scanner + enrichment)
//!   2. Merge         (only if requested)
//!   3. Cleanup       (if requested, or if step 2 merged anything)
//!   4. Re-scan       (only if step 2 or 3 changed the store)
//!
//! RULES:
//!   - Only account-duplicate findings are merged by `Targets::All`;
//!     conflicts are never merged automatically.
//!   - Every id a merge succeeded on is handed to cleanup as well.
//!   - The caller never sees a report older than the last mutation.

use crate::{
    cleanup::{CleanupOutcome, ReferenceCleanupResolver},
    collaborator::{
        ContactDirectory, OptionValueLookup, ReferenceManager, StoreContactDirectory,
        StoreOptionValues, StoreReferenceManager,
    },
    command::{DedupeRequest, Targets},
    config::DedupeConfig,
    enrichment::Enricher,
    error::DedupeResult,
    merge::{AccountMergeResolver, MergeOutcome},
    scanner::{DuplicateScanner, ScanReport},
    status::StatusMessage,
    store::DedupeStore,
    types::{ReferenceId, RunId},
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Scanning,
}

/// Result of one `run()`.
#[derive(Debug, Clone, Serialize)]
pub struct DedupeRun {
    pub run_id: RunId,
    /// The latest scan, taken after any mutation.
    pub report: ScanReport,
    pub messages: Vec<StatusMessage>,
    pub merge: Option<MergeOutcome>,
    pub cleanup: Option<CleanupOutcome>,
    pub changed: bool,
}

pub struct DedupeEngine {
    pub run_id: RunId,
    pub state: EngineState,
    pub config: DedupeConfig,
    pub store: DedupeStore,
    contacts: Box<dyn ContactDirectory>,
    option_values: Box<dyn OptionValueLookup>,
    references: Box<dyn ReferenceManager>,
}

impl DedupeEngine {
    pub fn new(
        config: DedupeConfig,
        store: DedupeStore,
        contacts: Box<dyn ContactDirectory>,
        option_values: Box<dyn OptionValueLookup>,
        references: Box<dyn ReferenceManager>,
    ) -> Self {
        Self {
            run_id: new_run_id(),
            state: EngineState::Idle,
            config,
            store,
            contacts,
            option_values,
            references,
        }
    }

    /// Build an engine whose collaborators read and write the same
    /// database as `store`, each over its own connection.
    pub fn build(config: DedupeConfig, store: DedupeStore) -> DedupeResult<Self> {
        let contacts = Box::new(StoreContactDirectory::new(store.reopen()?));
        let option_values = Box::new(StoreOptionValues::new(store.reopen()?));
        let references = Box::new(StoreReferenceManager::new(store.reopen()?));
        Ok(Self::new(config, store, contacts, option_values, references))
    }

    /// Migrated in-memory store, default config, store-backed collaborators.
    pub fn build_test() -> DedupeResult<Self> {
        let store = DedupeStore::in_memory()?;
        store.migrate()?;
        Self::build(DedupeConfig::default_test(), store)
    }

    /// Read-only classification of the current duplicates.
    pub fn scan(&mut self) -> DedupeResult<ScanReport> {
        self.state = EngineState::Scanning;
        let result = self.scan_inner();
        self.state = EngineState::Idle;
        result
    }

    fn scan_inner(&self) -> DedupeResult<ScanReport> {
        let scanner = DuplicateScanner::new(&self.store, &self.config.reference_type_group);
        let mut report = scanner.scan(self.option_values.as_ref())?;
        if self.config.enrich_contacts {
            Enricher::new(&self.store, self.contacts.as_ref()).enrich_report(&mut report)?;
        }
        Ok(report)
    }

    /// Merge the account-duplicate groups selected by `targets`.
    pub fn merge_accounts(&mut self, targets: &Targets, report: &ScanReport) -> DedupeResult<MergeOutcome> {
        let ids = targets.resolve(&report.account_duplicates);
        log::info!("run={} merge: {} groups requested", self.run_id, ids.len());
        AccountMergeResolver::new(&self.store, self.config.merge_policy).merge_by_reference_ids(&ids)
    }

    /// Delete redundant references. `implicit` ids (from a prior merge)
    /// come first, then whatever `targets` selects among the
    /// reference-duplicate findings.
    pub fn delete_references(
        &mut self,
        targets: Option<&Targets>,
        implicit: &[ReferenceId],
        report: &ScanReport,
    ) -> DedupeResult<CleanupOutcome> {
        let mut ids = implicit.to_vec();
        if let Some(targets) = targets {
            ids.extend(targets.resolve(&report.reference_duplicates));
        }
        log::info!("run={} cleanup: {} keepers", self.run_id, ids.len());
        ReferenceCleanupResolver::new(&self.store, self.references.as_mut()).delete_redundant_references(&ids)
    }

    /// One full invocation. Only a fatal store error returns `Err`;
    /// per-group and per-item failures end up in the status messages.
    pub fn run(&mut self, request: &DedupeRequest) -> DedupeResult<DedupeRun> {
        self.run_id = new_run_id();
        log::info!("run={} started", self.run_id);

        let mut report = self.scan()?;
        let mut messages = Vec::new();
        let mut merge = None;
        let mut cleanup = None;
        let mut implicit = Vec::new();

        if let Some(targets) = &request.merge_accounts {
            let outcome = self.merge_accounts(targets, &report)?;
            messages.push(StatusMessage::for_merge(&outcome));
            implicit = outcome.merged_reference_ids.clone();
            merge = Some(outcome);
        }

        if request.delete_references.is_some() || !implicit.is_empty() {
            let outcome = self.delete_references(request.delete_references.as_ref(), &implicit, &report)?;
            messages.push(StatusMessage::for_cleanup(&outcome));
            cleanup = Some(outcome);
        }

        let fixed = merge.as_ref().map_or(0, |m| m.merged_count)
            + cleanup.as_ref().map_or(0, |c| c.deleted_count);
        let changed = fixed > 0;
        if changed && self.config.rescan_after_mutation {
            report = self.scan()?;
        }

        log::info!(
            "run={} finished: {} findings, changed={changed}",
            self.run_id,
            report.total()
        );
        Ok(DedupeRun {
            run_id: self.run_id.clone(),
            report,
            messages,
            merge,
            cleanup,
            changed,
        })
    }
}

fn new_run_id() -> RunId {
    uuid::Uuid::new_v4().to_string()
}
