//! Account merge resolver.
//!
//! Each requested reference id names one duplicate-account group. The
//! group's accounts are re-resolved inside the write transaction, folded
//! into the lowest id, and the other accounts are deleted after every
//! reference and transaction pointing at them has been moved over.
//!
//! Folding is a pure reduction (`fold_accounts`). Under the strict policy
//! any disagreement between two non-empty values aborts the group with
//! no store writes.

use crate::{
    config::MergePolicy,
    error::{DedupeError, DedupeResult},
    model::{is_blank_str, is_blank_value, Account},
    store::DedupeStore,
    types::{AccountId, ReferenceId},
};
use chrono::{NaiveDateTime, SubsecRound};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub merged_count: usize,
    pub error_count: usize,
    /// Requested ids whose group was merged, ready for reference cleanup.
    pub merged_reference_ids: Vec<ReferenceId>,
}

impl MergeOutcome {
    pub fn attempted(&self) -> usize {
        self.merged_count + self.error_count
    }
}

/// Fold `sources` into `target`, in order.
pub fn fold_accounts(target: Account, sources: &[Account], policy: MergePolicy) -> DedupeResult<Account> {
    sources
        .iter()
        .try_fold(target, |acc, source| fold_one(acc, source, policy))
}

fn fold_one(mut target: Account, source: &Account, policy: MergePolicy) -> DedupeResult<Account> {
    // oldest provenance wins
    if let Some(created) = source.created_date {
        if target.created_date.map_or(true, |t| created < t) {
            target.created_date = Some(created);
        }
    }

    merge_scalar(&mut target.description, &source.description, "description", target.id, source.id, policy)?;
    merge_scalar(&mut target.data_raw, &source.data_raw, "data_raw", target.id, source.id, policy)?;

    // every source key ends up in the target, blank values included
    for (key, value) in &source.data_parsed {
        let adopt = match target.data_parsed.get(key) {
            None => true,
            Some(_) if is_blank_value(value) => false,
            Some(existing) if is_blank_value(existing) => true,
            Some(existing) => {
                if existing != value && policy == MergePolicy::Strict {
                    return Err(conflict(target.id, source.id, format!("data_parsed.{key}")));
                }
                false
            }
        };
        if adopt {
            target.data_parsed.insert(key.clone(), value.clone());
        }
    }

    if target.contact_id.is_none() {
        target.contact_id = source.contact_id;
    }
    Ok(target)
}

fn merge_scalar(
    target: &mut Option<String>,
    source: &Option<String>,
    field: &str,
    target_id: AccountId,
    source_id: AccountId,
    policy: MergePolicy,
) -> DedupeResult<()> {
    if is_blank_str(source) {
        return Ok(());
    }
    if is_blank_str(target) {
        *target = source.clone();
    } else if target != source && policy == MergePolicy::Strict {
        return Err(conflict(target_id, source_id, field.to_string()));
    }
    Ok(())
}

fn conflict(target_id: AccountId, source_id: AccountId, field: String) -> DedupeError {
    DedupeError::MergeConflict {
        target_id,
        source_id,
        field,
    }
}

pub struct AccountMergeResolver<'a> {
    store: &'a DedupeStore,
    policy: MergePolicy,
}

impl<'a> AccountMergeResolver<'a> {
    pub fn new(store: &'a DedupeStore, policy: MergePolicy) -> Self {
        Self { store, policy }
    }

    /// Merge the group behind each reference id. Per-group failures are
    /// counted; a fatal store error stops the batch. Groups committed
    /// before the failure stay committed.
    pub fn merge_by_reference_ids(&self, reference_ids: &[ReferenceId]) -> DedupeResult<MergeOutcome> {
        let mut outcome = MergeOutcome::default();
        for &reference_id in reference_ids {
            match self.merge_group(reference_id) {
                Ok(target_id) => {
                    outcome.merged_count += 1;
                    outcome.merged_reference_ids.push(reference_id);
                    log::info!("merge: group of reference {reference_id} merged into account {target_id}");
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    outcome.error_count += 1;
                    log::warn!("merge: group of reference {reference_id} skipped: {e}");
                }
            }
        }
        Ok(outcome)
    }

    /// Merge one group atomically. Returns the surviving account id.
    pub fn merge_group(&self, reference_id: ReferenceId) -> DedupeResult<AccountId> {
        let policy = self.policy;
        self.store.in_transaction(|store| {
            let key = store
                .group_key_for_reference(reference_id)?
                .ok_or(DedupeError::ReferenceNotFound { reference_id })?;

            // Re-resolved here rather than taken from the scan: writers
            // outside the engine may have changed the group since.
            let account_ids = store.account_ids_for_group(&key)?;
            let mut accounts = store.get_accounts(&account_ids)?;
            if accounts.len() < 2 {
                return Err(DedupeError::InsufficientDuplicates {
                    reference_id,
                    found: accounts.len(),
                });
            }

            // exactly one owner, same rule the scanner classifies by
            let contacts = store.contact_ids_for_group(&key)?;
            if contacts.len() != 1 {
                return Err(DedupeError::OwnershipConflict {
                    reference_id,
                    contacts: contacts.len(),
                });
            }

            let sources = accounts.split_off(1);
            let target = accounts.remove(0);
            let target_id = target.id;

            let mut merged = fold_accounts(target, &sources, policy)?;
            merged.modified_date = Some(now());
            store.save_account(&merged)?;

            for source in &sources {
                let refs = store.repoint_references(source.id, target_id)?;
                let (primary, party) = store.repoint_bank_txs(source.id, target_id)?;
                store.delete_account(source.id)?;
                log::debug!(
                    "merge: account {} -> {target_id} ({refs} references, {primary} transactions, {party} counter-party links)",
                    source.id
                );
            }
            Ok(target_id)
        })
    }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local().trunc_subsecs(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(y, m, d).and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    fn account(id: AccountId, parsed: serde_json::Value, created: Option<NaiveDateTime>) -> Account {
        let mut a = Account::new(id);
        a.data_parsed = serde_json::from_value(parsed).unwrap();
        a.created_date = created;
        a
    }

    #[test]
    fn disjoint_accounts_fold_into_union() {
        let target = account(1, json!({"iban": "DE1"}), date(2020, 1, 1));
        let source = account(2, json!({"city": "Berlin"}), date(2019, 6, 1));

        let merged = fold_accounts(target, &[source], MergePolicy::Strict).unwrap();

        assert_eq!(merged.id, 1);
        assert_eq!(merged.data_parsed.len(), 2);
        assert_eq!(merged.data_parsed["iban"], json!("DE1"));
        assert_eq!(merged.data_parsed["city"], json!("Berlin"));
        assert_eq!(merged.created_date, date(2019, 6, 1));
    }

    #[test]
    fn differing_parsed_value_is_a_conflict() {
        let target = account(1, json!({"name": "A. Smith"}), None);
        let source = account(2, json!({"name": "B. Smith"}), None);

        let err = fold_accounts(target, &[source], MergePolicy::Strict).unwrap_err();
        match err {
            DedupeError::MergeConflict { target_id, source_id, field } => {
                assert_eq!((target_id, source_id), (1, 2));
                assert_eq!(field, "data_parsed.name");
            }
            other => panic!("expected MergeConflict, got {other:?}"),
        }
    }

    #[test]
    fn differing_description_is_a_conflict() {
        let mut target = account(1, json!({}), None);
        target.description = Some("Giro".into());
        let mut source = account(2, json!({}), None);
        source.description = Some("Savings".into());

        assert!(matches!(
            fold_accounts(target, &[source], MergePolicy::Strict),
            Err(DedupeError::MergeConflict { .. })
        ));
    }

    #[test]
    fn empty_target_scalars_adopt_source() {
        let mut target = account(1, json!({"bank": ""}), None);
        target.description = Some(String::new());
        let mut source = account(2, json!({"bank": "GLS"}), None);
        source.description = Some("Giro".into());
        source.data_raw = Some("raw".into());

        let merged = fold_accounts(target, &[source], MergePolicy::Strict).unwrap();
        assert_eq!(merged.description.as_deref(), Some("Giro"));
        assert_eq!(merged.data_raw.as_deref(), Some("raw"));
        assert_eq!(merged.data_parsed["bank"], json!("GLS"));
    }

    #[test]
    fn blank_source_keys_are_kept_but_never_overwrite() {
        let target = account(1, json!({"iban": "DE1", "bic": "GENODEM1GLS"}), None);
        let source = account(2, json!({"note": "", "memo": null, "bic": ""}), None);

        let merged = fold_accounts(target, &[source], MergePolicy::Strict).unwrap();
        assert_eq!(merged.data_parsed.len(), 4);
        assert_eq!(merged.data_parsed["note"], json!(""));
        assert_eq!(merged.data_parsed["memo"], json!(null));
        assert_eq!(merged.data_parsed["bic"], json!("GENODEM1GLS"));
    }

    #[test]
    fn equal_values_are_not_conflicts() {
        let mut target = account(1, json!({"iban": "DE1"}), None);
        target.data_raw = Some("same".into());
        let mut source = account(2, json!({"iban": "DE1"}), None);
        source.data_raw = Some("same".into());

        assert!(fold_accounts(target, &[source], MergePolicy::Strict).is_ok());
    }

    #[test]
    fn prefer_target_keeps_target_values() {
        let target = account(1, json!({"name": "A. Smith"}), None);
        let source = account(2, json!({"name": "B. Smith", "bic": "X"}), None);

        let merged = fold_accounts(target, &[source], MergePolicy::PreferTarget).unwrap();
        assert_eq!(merged.data_parsed["name"], json!("A. Smith"));
        assert_eq!(merged.data_parsed["bic"], json!("X"));
    }

    #[test]
    fn sources_fold_in_order() {
        let target = account(1, json!({}), date(2021, 1, 1));
        let second = account(2, json!({"holder": "X"}), date(2020, 1, 1));
        let third = account(3, json!({"holder": "Y"}), date(2018, 1, 1));

        // the third source disagrees with what the second contributed
        assert!(fold_accounts(target.clone(), &[second.clone(), third], MergePolicy::Strict).is_err());

        let merged = fold_accounts(target, &[second], MergePolicy::Strict).unwrap();
        assert_eq!(merged.created_date, date(2020, 1, 1));
    }
}
