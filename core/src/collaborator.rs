//! External collaborators the engine consumes, and their store-backed
//! implementations.
//!
//! RULE: The engine only sees these traits. Contact names, type labels
//! and reference deletion belong to whoever hosts the ledger.

use crate::{
    error::{DedupeError, DedupeResult},
    model::Contact,
    store::DedupeStore,
    types::{ContactId, ReferenceId},
};
use std::collections::HashMap;

/// Identity lookup used to enrich findings.
pub trait ContactDirectory: Send {
    fn get_contact(&self, contact_id: ContactId) -> DedupeResult<Contact>;
}

/// Maps numeric type codes of an option group to labels.
pub trait OptionValueLookup: Send {
    fn list_option_values(&self, group_name: &str) -> DedupeResult<HashMap<i64, String>>;
}

/// Identity-owning delete of a reference row. Hosts hang their own side
/// effects off this call; a failure is reported as a message.
pub trait ReferenceManager: Send {
    fn delete_reference(&mut self, reference_id: ReferenceId) -> Result<(), String>;
}

// ── Store-backed implementations ──────────────────────────────────

pub struct StoreContactDirectory {
    store: DedupeStore,
}

impl StoreContactDirectory {
    pub fn new(store: DedupeStore) -> Self {
        Self { store }
    }
}

impl ContactDirectory for StoreContactDirectory {
    fn get_contact(&self, contact_id: ContactId) -> DedupeResult<Contact> {
        self.store
            .get_contact(contact_id)?
            .ok_or_else(|| DedupeError::LookupFailed {
                contact_id,
                message: "no such contact".into(),
            })
    }
}

pub struct StoreOptionValues {
    store: DedupeStore,
}

impl StoreOptionValues {
    pub fn new(store: DedupeStore) -> Self {
        Self { store }
    }
}

impl OptionValueLookup for StoreOptionValues {
    fn list_option_values(&self, group_name: &str) -> DedupeResult<HashMap<i64, String>> {
        self.store.option_values(group_name)
    }
}

pub struct StoreReferenceManager {
    store: DedupeStore,
}

impl StoreReferenceManager {
    pub fn new(store: DedupeStore) -> Self {
        Self { store }
    }
}

impl ReferenceManager for StoreReferenceManager {
    fn delete_reference(&mut self, reference_id: ReferenceId) -> Result<(), String> {
        match self.store.delete_reference(reference_id) {
            Ok(0) => Err(format!("reference {reference_id} does not exist")),
            Ok(_) => {
                log::debug!("reference {reference_id} deleted");
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }
}
