//! Shared primitive types used across the engine.

/// Primary key of a `bank_account` row.
pub type AccountId = i64;

/// Primary key of a `bank_account_reference` row.
pub type ReferenceId = i64;

/// Primary key of a `contact` row.
pub type ContactId = i64;

/// Numeric reference type code (resolved to a label via the option lookup).
pub type ReferenceTypeId = i64;

/// Correlation id of one engine invocation, used as a log prefix.
pub type RunId = String;
