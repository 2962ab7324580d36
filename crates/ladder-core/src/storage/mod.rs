//! # Persistent Storage
//!
//! Disk-backed ledger using the redb embedded database.

mod redb_ledger;

pub use redb_ledger::{RedbLedger, RedbReader, RedbWriter};
