use super::DedupeStore;
use crate::{error::DedupeResult, model::BankTx, types::AccountId};
use rusqlite::{params, OptionalExtension};

impl DedupeStore {
    // ── Bank transactions ─────────────────────────────────────────

    pub fn insert_bank_tx(&self, tx: &BankTx) -> DedupeResult<i64> {
        self.conn.execute(
            "INSERT INTO bank_tx (id, bank_reference, amount, ba_id, party_ba_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                (tx.id > 0).then_some(tx.id),
                tx.bank_reference,
                tx.amount,
                tx.account_id,
                tx.party_account_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_bank_tx(&self, id: i64) -> DedupeResult<Option<BankTx>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, bank_reference, amount, ba_id, party_ba_id
                 FROM bank_tx WHERE id = ?1",
                params![id],
                |row| {
                    Ok(BankTx {
                        id: row.get(0)?,
                        bank_reference: row.get(1)?,
                        amount: row.get(2)?,
                        account_id: row.get(3)?,
                        party_account_id: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Point both account foreign keys of every transaction at `to`
    /// wherever they pointed at `from`. Returns (primary, party) row counts.
    pub fn repoint_bank_txs(&self, from: AccountId, to: AccountId) -> DedupeResult<(usize, usize)> {
        let primary = self.conn.execute(
            "UPDATE bank_tx SET ba_id = ?1 WHERE ba_id = ?2",
            params![to, from],
        )?;
        let party = self.conn.execute(
            "UPDATE bank_tx SET party_ba_id = ?1 WHERE party_ba_id = ?2",
            params![to, from],
        )?;
        Ok((primary, party))
    }

    /// Transactions whose primary or party account no longer exists.
    pub fn dangling_bank_tx_count(&self) -> DedupeResult<i64> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM bank_tx t
             WHERE (t.ba_id IS NOT NULL
                    AND NOT EXISTS (SELECT 1 FROM bank_account a WHERE a.id = t.ba_id))
                OR (t.party_ba_id IS NOT NULL
                    AND NOT EXISTS (SELECT 1 FROM bank_account a WHERE a.id = t.party_ba_id))",
            [],
            |r| r.get(0),
        )?;
        Ok(n)
    }
}
