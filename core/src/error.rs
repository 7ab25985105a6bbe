use crate::types::{AccountId, ContactId, ReferenceId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DedupeError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Reference {reference_id} not found")]
    ReferenceNotFound { reference_id: ReferenceId },

    #[error("Reference {reference_id} resolves to {found} account(s), need at least 2 to merge")]
    InsufficientDuplicates { reference_id: ReferenceId, found: usize },

    #[error("Reference {reference_id} is owned by {contacts} contacts, refusing to merge")]
    OwnershipConflict { reference_id: ReferenceId, contacts: usize },

    #[error("Merge conflict on '{field}': account {source_id} disagrees with target {target_id}")]
    MergeConflict {
        target_id: AccountId,
        source_id: AccountId,
        field: String,
    },

    #[error("Failed to delete reference {reference_id}: {message}")]
    DeleteFailed { reference_id: ReferenceId, message: String },

    #[error("Contact {contact_id} lookup failed: {message}")]
    LookupFailed { contact_id: ContactId, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DedupeError {
    /// Fatal errors abort the whole invocation. Everything else is counted
    /// against the group or item that produced it and the batch continues.
    /// A corrupt `data_parsed` column only spoils its own group.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DedupeError::Database(_) | DedupeError::Other(_))
    }
}

pub type DedupeResult<T> = Result<T, DedupeError>;
