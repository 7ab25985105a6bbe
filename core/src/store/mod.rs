//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Scanner, resolvers and collaborators call store methods; they never
//! execute SQL directly. Every statement is parameterized.

use crate::error::DedupeResult;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::HashMap;
use std::time::Duration;

mod account;
mod bank_tx;
mod reference;

pub use reference::GroupKey;

/// How long a statement waits on a lock held by another writer.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DedupeStore {
    conn: Connection,
    path: String,
}

impl DedupeStore {
    pub fn open(path: &str) -> DedupeResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    /// Open a fresh in-memory database (used in tests).
    /// Uses a named shared-cache URI so `reopen()` reaches the same data.
    pub fn in_memory() -> DedupeResult<Self> {
        let uri = format!("file:dedupe-{}?mode=memory&cache=shared", uuid::Uuid::new_v4());
        Self::open(&uri)
    }

    /// Open a second connection to the same database.
    pub fn reopen(&self) -> DedupeResult<Self> {
        Self::open(&self.path)
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DedupeResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_ledger.sql"))?;
        Ok(())
    }

    /// Run `f` inside one immediate transaction.
    ///
    /// Commits when `f` returns `Ok`. An `Err` (or a panic) drops the
    /// transaction, which rolls back every write `f` made.
    pub fn in_transaction<T>(
        &self,
        f: impl FnOnce(&Self) -> DedupeResult<T>,
    ) -> DedupeResult<T> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }

    // ── Contact ───────────────────────────────────────────────────

    pub fn insert_contact(&self, display_name: &str, contact_type: &str) -> DedupeResult<i64> {
        self.conn.execute(
            "INSERT INTO contact (display_name, contact_type) VALUES (?1, ?2)",
            params![display_name, contact_type],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_contact(&self, contact_id: i64) -> DedupeResult<Option<crate::model::Contact>> {
        let contact = self
            .conn
            .query_row(
                "SELECT id, display_name, contact_type FROM contact WHERE id = ?1",
                params![contact_id],
                |row| {
                    Ok(crate::model::Contact {
                        id: row.get(0)?,
                        display_name: row.get(1)?,
                        contact_type: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(contact)
    }

    // ── Option values ─────────────────────────────────────────────

    pub fn insert_option_value(&self, group_name: &str, value: i64, label: &str) -> DedupeResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO option_value (group_name, value, label) VALUES (?1, ?2, ?3)",
            params![group_name, value, label],
        )?;
        Ok(())
    }

    pub fn option_values(&self, group_name: &str) -> DedupeResult<HashMap<i64, String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value, label FROM option_value WHERE group_name = ?1")?;
        let values = stmt
            .query_map(params![group_name], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(values)
    }
}
