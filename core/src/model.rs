//! Ledger rows and scan findings.
//!
//! Accounts and references are long-lived store rows. Findings are
//! recomputed on every scan and never persisted.

use crate::types::{AccountId, ContactId, ReferenceId, ReferenceTypeId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Structured fields extracted from an account's import payload
/// (holder name, bank name, BIC, ...). Keys are unique per account.
pub type DataParsed = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub description: Option<String>,
    pub data_raw: Option<String>,
    pub data_parsed: DataParsed,
    pub contact_id: Option<ContactId>,
    pub created_date: Option<NaiveDateTime>,
    pub modified_date: Option<NaiveDateTime>,
}

impl Account {
    /// A bare account with no content, for seeding.
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            description: None,
            data_raw: None,
            data_parsed: DataParsed::new(),
            contact_id: None,
            created_date: None,
            modified_date: None,
        }
    }
}

/// Maps an external identifier of a given type to exactly one account.
/// The owning contact is the contact of that account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: ReferenceId,
    pub reference: String,
    pub reference_type_id: ReferenceTypeId,
    pub account_id: AccountId,
}

/// A bank transaction. Only its two account foreign keys matter here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTx {
    pub id: i64,
    pub bank_reference: String,
    pub amount: f64,
    pub account_id: Option<AccountId>,
    pub party_account_id: Option<AccountId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub display_name: String,
    pub contact_type: String,
}

/// Severity bucket of one duplicate reference group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// All rows point at one account. Redundant rows can be deleted.
    ReferenceDuplicate,
    /// Several accounts, one owner. The accounts can be merged.
    AccountDuplicate,
    /// Several accounts, several owners. Needs a human.
    AccountConflict,
}

impl Severity {
    /// Exhaustive over groups with more than one row: decided solely by
    /// the distinct account and contact counts.
    pub fn classify(account_count: i64, contact_count: i64) -> Self {
        if account_count == 1 {
            Severity::ReferenceDuplicate
        } else if contact_count == 1 {
            Severity::AccountDuplicate
        } else {
            Severity::AccountConflict
        }
    }
}

/// One duplicate group as seen by the scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub reference: String,
    /// One representative row of the group.
    pub reference_id: ReferenceId,
    pub reference_type_id: ReferenceTypeId,
    /// Label of the type code; the code itself if no label is known.
    pub reference_type: String,
    pub duplicate_count: i64,
    pub account_count: i64,
    pub contact_count: i64,
    pub last_change: Option<NaiveDateTime>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    /// Set when exactly one contact owns the group.
    #[serde(default)]
    pub contact: Option<Contact>,
}

impl Finding {
    pub fn severity(&self) -> Severity {
        Severity::classify(self.account_count, self.contact_count)
    }
}

/// Raw aggregate row of the duplicate query, before classification.
#[derive(Debug, Clone)]
pub struct DuplicateGroupRow {
    pub reference: String,
    pub reference_id: ReferenceId,
    pub reference_type_id: ReferenceTypeId,
    pub duplicate_count: i64,
    pub account_count: i64,
    pub contact_count: i64,
    pub last_change: Option<NaiveDateTime>,
}

pub(crate) fn is_blank_str(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

pub(crate) fn is_blank_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classification_follows_counts() {
        assert_eq!(Severity::classify(1, 1), Severity::ReferenceDuplicate);
        assert_eq!(Severity::classify(1, 3), Severity::ReferenceDuplicate);
        assert_eq!(Severity::classify(2, 1), Severity::AccountDuplicate);
        assert_eq!(Severity::classify(2, 2), Severity::AccountConflict);
        // accounts without any contact count as zero owners
        assert_eq!(Severity::classify(3, 0), Severity::AccountConflict);
    }

    #[test]
    fn blank_values() {
        assert!(is_blank_value(&Value::Null));
        assert!(is_blank_value(&json!("")));
        assert!(!is_blank_value(&json!("DE1")));
        assert!(!is_blank_value(&json!(0)));
        assert!(is_blank_str(&None));
        assert!(is_blank_str(&Some(String::new())));
        assert!(!is_blank_str(&Some("x".into())));
    }
}
