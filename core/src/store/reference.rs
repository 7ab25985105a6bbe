use super::DedupeStore;
use crate::{
    error::DedupeResult,
    model::{DuplicateGroupRow, Reference},
    types::{AccountId, ContactId, ReferenceId, ReferenceTypeId},
};
use rusqlite::{params, OptionalExtension};

/// The `(identifier, type)` pair that defines a duplicate group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub reference: String,
    pub reference_type_id: ReferenceTypeId,
}

impl DedupeStore {
    // ── Reference ─────────────────────────────────────────────────

    /// Insert a reference. An id of 0 lets SQLite assign one.
    pub fn insert_reference(&self, r: &Reference) -> DedupeResult<ReferenceId> {
        self.conn.execute(
            "INSERT INTO bank_account_reference (id, reference, reference_type_id, ba_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                (r.id > 0).then_some(r.id),
                r.reference,
                r.reference_type_id,
                r.account_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_reference(&self, reference_id: ReferenceId) -> DedupeResult<Option<Reference>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, reference, reference_type_id, ba_id
                 FROM bank_account_reference WHERE id = ?1",
                params![reference_id],
                |row| {
                    Ok(Reference {
                        id: row.get(0)?,
                        reference: row.get(1)?,
                        reference_type_id: row.get(2)?,
                        account_id: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// The group key a reference row belongs to, if the row still exists.
    pub fn group_key_for_reference(&self, reference_id: ReferenceId) -> DedupeResult<Option<GroupKey>> {
        Ok(self.get_reference(reference_id)?.map(|r| GroupKey {
            reference: r.reference,
            reference_type_id: r.reference_type_id,
        }))
    }

    pub fn references_for_account(&self, account_id: AccountId) -> DedupeResult<Vec<Reference>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, reference, reference_type_id, ba_id
             FROM bank_account_reference WHERE ba_id = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![account_id], |row| {
                Ok(Reference {
                    id: row.get(0)?,
                    reference: row.get(1)?,
                    reference_type_id: row.get(2)?,
                    account_id: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn reference_count(&self) -> DedupeResult<i64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM bank_account_reference", [], |r| r.get(0))?;
        Ok(n)
    }

    pub fn delete_reference(&self, reference_id: ReferenceId) -> DedupeResult<usize> {
        let n = self.conn.execute(
            "DELETE FROM bank_account_reference WHERE id = ?1",
            params![reference_id],
        )?;
        Ok(n)
    }

    /// Move every reference of `from` over to `to`.
    pub fn repoint_references(&self, from: AccountId, to: AccountId) -> DedupeResult<usize> {
        let n = self.conn.execute(
            "UPDATE bank_account_reference SET ba_id = ?1 WHERE ba_id = ?2",
            params![to, from],
        )?;
        Ok(n)
    }

    // ── Duplicate aggregates ──────────────────────────────────────

    /// All `(identifier, type)` groups with more than one row, most
    /// recently modified first. The representative id is the group's
    /// lowest reference id.
    pub fn duplicate_groups(&self) -> DedupeResult<Vec<DuplicateGroupRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.reference,
                    MIN(r.id)                    AS reference_id,
                    r.reference_type_id,
                    COUNT(r.id)                  AS dupe_count,
                    COUNT(DISTINCT r.ba_id)      AS ba_count,
                    COUNT(DISTINCT a.contact_id) AS contact_count,
                    MAX(a.modified_date)         AS last_change
             FROM bank_account_reference r
             LEFT JOIN bank_account a ON r.ba_id = a.id
             GROUP BY r.reference, r.reference_type_id
             HAVING COUNT(r.id) > 1
             ORDER BY last_change DESC, reference_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DuplicateGroupRow {
                    reference: row.get(0)?,
                    reference_id: row.get(1)?,
                    reference_type_id: row.get(2)?,
                    duplicate_count: row.get(3)?,
                    account_count: row.get(4)?,
                    contact_count: row.get(5)?,
                    last_change: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Distinct account ids referenced by a group, lowest first.
    pub fn account_ids_for_group(&self, key: &GroupKey) -> DedupeResult<Vec<AccountId>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT ba_id
             FROM bank_account_reference
             WHERE reference = ?1 AND reference_type_id = ?2
             ORDER BY ba_id ASC",
        )?;
        let ids = stmt
            .query_map(params![key.reference, key.reference_type_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Distinct contacts owning any account of a group.
    pub fn contact_ids_for_group(&self, key: &GroupKey) -> DedupeResult<Vec<ContactId>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT a.contact_id
             FROM bank_account_reference r
             JOIN bank_account a ON r.ba_id = a.id
             WHERE r.reference = ?1 AND r.reference_type_id = ?2
               AND a.contact_id IS NOT NULL
             ORDER BY a.contact_id ASC",
        )?;
        let ids = stmt
            .query_map(params![key.reference, key.reference_type_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Every other reference row with the same identifier, type and
    /// account as `keeper_id`. Empty when the keeper no longer exists.
    pub fn redundant_reference_ids(&self, keeper_id: ReferenceId) -> DedupeResult<Vec<ReferenceId>> {
        let mut stmt = self.conn.prepare(
            "SELECT ref_delete.id
             FROM bank_account_reference ref_delete
             JOIN bank_account_reference ref_keep ON ref_keep.id = ?1
             WHERE ref_keep.reference = ref_delete.reference
               AND ref_keep.reference_type_id = ref_delete.reference_type_id
               AND ref_keep.ba_id = ref_delete.ba_id
               AND ref_keep.id != ref_delete.id
             ORDER BY ref_delete.id ASC",
        )?;
        let ids = stmt
            .query_map(params![keeper_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
