//! Duplicate scanner: groups references by `(identifier, type)` and sorts
//! every group with more than one row into one of three buckets.
//!
//! Pure read. A store error aborts the scan; there are no partial reports.

use crate::{
    collaborator::OptionValueLookup,
    error::DedupeResult,
    model::{DuplicateGroupRow, Finding, Severity},
    store::DedupeStore,
    types::ReferenceId,
};
use serde::Serialize;
use std::collections::HashMap;

/// Findings of one severity, in scan order (most recently modified first).
/// Looked up by reference value.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct FindingBucket {
    findings: Vec<Finding>,
}

impl FindingBucket {
    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    /// First finding for a reference value. The same value can appear
    /// once per reference type.
    pub fn get(&self, reference: &str) -> Option<&Finding> {
        self.findings.iter().find(|f| f.reference == reference)
    }

    /// Representative reference id of every finding, in bucket order.
    pub fn reference_ids(&self) -> Vec<ReferenceId> {
        self.findings.iter().map(|f| f.reference_id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Finding> {
        self.findings.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub reference_duplicates: FindingBucket,
    pub account_duplicates: FindingBucket,
    pub account_conflicts: FindingBucket,
}

impl ScanReport {
    pub fn bucket(&self, severity: Severity) -> &FindingBucket {
        match severity {
            Severity::ReferenceDuplicate => &self.reference_duplicates,
            Severity::AccountDuplicate => &self.account_duplicates,
            Severity::AccountConflict => &self.account_conflicts,
        }
    }

    fn bucket_mut(&mut self, severity: Severity) -> &mut FindingBucket {
        match severity {
            Severity::ReferenceDuplicate => &mut self.reference_duplicates,
            Severity::AccountDuplicate => &mut self.account_duplicates,
            Severity::AccountConflict => &mut self.account_conflicts,
        }
    }

    pub fn findings_mut(&mut self) -> impl Iterator<Item = &mut Finding> {
        self.reference_duplicates
            .iter_mut()
            .chain(self.account_duplicates.iter_mut())
            .chain(self.account_conflicts.iter_mut())
    }

    pub fn total(&self) -> usize {
        self.reference_duplicates.len() + self.account_duplicates.len() + self.account_conflicts.len()
    }
}

pub struct DuplicateScanner<'a> {
    store: &'a DedupeStore,
    reference_type_group: &'a str,
}

impl<'a> DuplicateScanner<'a> {
    pub fn new(store: &'a DedupeStore, reference_type_group: &'a str) -> Self {
        Self {
            store,
            reference_type_group,
        }
    }

    pub fn scan(&self, types: &dyn OptionValueLookup) -> DedupeResult<ScanReport> {
        let labels = match types.list_option_values(self.reference_type_group) {
            Ok(labels) => labels,
            Err(e) => {
                log::warn!(
                    "scanner: reference type lookup for '{}' failed, showing raw codes: {e}",
                    self.reference_type_group
                );
                HashMap::new()
            }
        };

        let groups = self.store.duplicate_groups()?;
        let report = classify_groups(groups, &labels);

        log::info!(
            "scanner: {} reference duplicates, {} account duplicates, {} conflicts",
            report.reference_duplicates.len(),
            report.account_duplicates.len(),
            report.account_conflicts.len()
        );
        Ok(report)
    }
}

/// Sort aggregate rows into buckets. Row order is kept within each bucket.
pub fn classify_groups(groups: Vec<DuplicateGroupRow>, labels: &HashMap<i64, String>) -> ScanReport {
    let mut report = ScanReport::default();
    for g in groups.into_iter().filter(|g| g.duplicate_count > 1) {
        let reference_type = labels
            .get(&g.reference_type_id)
            .cloned()
            .unwrap_or_else(|| g.reference_type_id.to_string());
        let finding = Finding {
            reference: g.reference,
            reference_id: g.reference_id,
            reference_type_id: g.reference_type_id,
            reference_type,
            duplicate_count: g.duplicate_count,
            account_count: g.account_count,
            contact_count: g.contact_count,
            last_change: g.last_change,
            contacts: Vec::new(),
            contact: None,
        };
        report.bucket_mut(finding.severity()).push(finding);
    }
    report
}
