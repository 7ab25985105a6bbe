//! Enrichment: attaches the contacts owning a finding's accounts.
//!
//! Informational only. A contact that cannot be resolved is left out of
//! the finding and logged; it never fails the scan.

use crate::{
    collaborator::ContactDirectory,
    error::DedupeResult,
    model::Finding,
    scanner::ScanReport,
    store::{DedupeStore, GroupKey},
};

pub struct Enricher<'a> {
    store: &'a DedupeStore,
    contacts: &'a dyn ContactDirectory,
}

impl<'a> Enricher<'a> {
    pub fn new(store: &'a DedupeStore, contacts: &'a dyn ContactDirectory) -> Self {
        Self { store, contacts }
    }

    pub fn enrich(&self, finding: &mut Finding) -> DedupeResult<()> {
        let key = GroupKey {
            reference: finding.reference.clone(),
            reference_type_id: finding.reference_type_id,
        };
        let contact_ids = self.store.contact_ids_for_group(&key)?;

        let mut contacts = Vec::with_capacity(contact_ids.len());
        for contact_id in contact_ids {
            match self.contacts.get_contact(contact_id) {
                Ok(contact) => contacts.push(contact),
                Err(e) => log::warn!(
                    "enrichment: skipping contact {contact_id} of '{}': {e}",
                    finding.reference
                ),
            }
        }

        finding.contact = match contacts.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        };
        finding.contacts = contacts;
        Ok(())
    }

    pub fn enrich_report(&self, report: &mut ScanReport) -> DedupeResult<()> {
        for finding in report.findings_mut() {
            self.enrich(finding)?;
        }
        Ok(())
    }
}
