use super::DedupeStore;
use crate::{
    error::DedupeResult,
    model::{Account, DataParsed},
    types::AccountId,
};
use rusqlite::{params, OptionalExtension, Row};

impl DedupeStore {
    // ── Account ───────────────────────────────────────────────────

    /// Insert an account. An id of 0 lets SQLite assign one.
    pub fn insert_account(&self, account: &Account) -> DedupeResult<AccountId> {
        let data_parsed = serde_json::to_string(&account.data_parsed)?;
        self.conn.execute(
            "INSERT INTO bank_account
             (id, description, data_raw, data_parsed, contact_id, created_date, modified_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                (account.id > 0).then_some(account.id),
                account.description,
                account.data_raw,
                data_parsed,
                account.contact_id,
                account.created_date,
                account.modified_date,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_account(&self, account_id: AccountId) -> DedupeResult<Option<Account>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, description, data_raw, data_parsed, contact_id,
                        created_date, modified_date
                 FROM bank_account WHERE id = ?1",
                params![account_id],
                map_account_row,
            )
            .optional()?;
        match row {
            Some((account, raw_parsed)) => Ok(Some(with_data_parsed(account, &raw_parsed)?)),
            None => Ok(None),
        }
    }

    /// Load several accounts, keeping the order of `ids`. Missing ids are skipped.
    pub fn get_accounts(&self, ids: &[AccountId]) -> DedupeResult<Vec<Account>> {
        let mut accounts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(account) = self.get_account(*id)? {
                accounts.push(account);
            }
        }
        Ok(accounts)
    }

    /// Overwrite every mutable column of an existing account.
    pub fn save_account(&self, account: &Account) -> DedupeResult<()> {
        let data_parsed = serde_json::to_string(&account.data_parsed)?;
        self.conn.execute(
            "UPDATE bank_account
             SET description = ?1, data_raw = ?2, data_parsed = ?3,
                 contact_id = ?4, created_date = ?5, modified_date = ?6
             WHERE id = ?7",
            params![
                account.description,
                account.data_raw,
                data_parsed,
                account.contact_id,
                account.created_date,
                account.modified_date,
                account.id,
            ],
        )?;
        Ok(())
    }

    pub fn delete_account(&self, account_id: AccountId) -> DedupeResult<usize> {
        let n = self
            .conn
            .execute("DELETE FROM bank_account WHERE id = ?1", params![account_id])?;
        Ok(n)
    }

    pub fn account_exists(&self, account_id: AccountId) -> DedupeResult<bool> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM bank_account WHERE id = ?1",
            params![account_id],
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }

    pub fn account_count(&self) -> DedupeResult<i64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM bank_account", [], |r| r.get(0))?;
        Ok(n)
    }
}

fn map_account_row(row: &Row<'_>) -> rusqlite::Result<(Account, String)> {
    let raw_parsed: Option<String> = row.get(3)?;
    Ok((
        Account {
            id: row.get(0)?,
            description: row.get(1)?,
            data_raw: row.get(2)?,
            data_parsed: DataParsed::new(),
            contact_id: row.get(4)?,
            created_date: row.get(5)?,
            modified_date: row.get(6)?,
        },
        raw_parsed.unwrap_or_default(),
    ))
}

/// `data_parsed` is a JSON object column. Empty text means no fields.
fn with_data_parsed(mut account: Account, raw: &str) -> DedupeResult<Account> {
    if !raw.trim().is_empty() {
        account.data_parsed = serde_json::from_str(raw)?;
    }
    Ok(account)
}
