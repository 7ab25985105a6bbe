//! Duplicate detection and merge engine for a ledger of bank accounts and
//! the external references (IBANs, account numbers, card tokens) that
//! point to them.

pub mod cleanup;
pub mod collaborator;
pub mod command;
pub mod config;
pub mod engine;
pub mod enrichment;
pub mod error;
pub mod merge;
pub mod model;
pub mod scanner;
pub mod status;
pub mod store;
pub mod types;
