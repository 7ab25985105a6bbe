//! Integration tests for the SQLite store.
//!
//! Verifies:
//!   1. Migrations can be applied repeatedly
//!   2. Accounts keep their parsed data across a save
//!   3. A failed transaction leaves no writes behind
//!   4. A reopened connection sees the same in-memory database

use dedupe_core::{
    error::DedupeError,
    model::{Account, Reference},
    store::DedupeStore,
};
use serde_json::json;

fn store() -> DedupeStore {
    let store = DedupeStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

#[test]
fn migrate_is_idempotent() {
    let store = store();
    store.insert_account(&Account::new(1)).unwrap();
    store.migrate().unwrap();
    assert_eq!(store.account_count().unwrap(), 1);
}

#[test]
fn account_round_trips_through_save() {
    let store = store();
    let id = store.insert_account(&Account::new(0)).unwrap();

    let mut account = store.get_account(id).unwrap().unwrap();
    assert!(account.data_parsed.is_empty());
    account.description = Some("Girokonto".into());
    account.data_parsed.insert("iban".into(), json!("DE1"));
    account.data_parsed.insert("bic".into(), json!(null));
    store.save_account(&account).unwrap();

    let reloaded = store.get_account(id).unwrap().unwrap();
    assert_eq!(reloaded, account);
    assert!(store.get_account(id + 1).unwrap().is_none());
}

#[test]
fn failed_transaction_rolls_back() {
    let store = store();
    store.insert_account(&Account::new(1)).unwrap();
    store.insert_account(&Account::new(2)).unwrap();
    store
        .insert_reference(&Reference {
            id: 0,
            reference: "DE1".into(),
            reference_type_id: 1,
            account_id: 2,
        })
        .unwrap();

    let result: Result<(), DedupeError> = store.in_transaction(|s| {
        s.repoint_references(2, 1)?;
        s.delete_account(2)?;
        Err(DedupeError::InsufficientDuplicates {
            reference_id: 1,
            found: 1,
        })
    });

    assert!(result.is_err());
    assert!(store.account_exists(2).unwrap());
    assert_eq!(store.references_for_account(2).unwrap().len(), 1);
    assert!(store.references_for_account(1).unwrap().is_empty());
}

#[test]
fn reopened_connection_shares_in_memory_data() {
    let store = store();
    let other = store.reopen().unwrap();
    let alice = other.insert_contact("Alice", "Individual").unwrap();

    let contact = store.get_contact(alice).unwrap().unwrap();
    assert_eq!(contact.display_name, "Alice");
}
