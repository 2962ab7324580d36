//! # redb-backed Ledger
//!
//! A disk-backed ledger using the redb embedded database:
//! - ACID write transactions (a command commits or leaves no trace)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Rows are `postcard`-encoded. Per-startup index tables keyed by
//! `(startup_id, row_id)` make `claims_of` / `evidence_of` range scans.

use crate::memory::LedgerSnapshot;
use crate::progression::LevelSeal;
use crate::store::{LedgerTxn, LedgerView};
use crate::{
    ClaimId, EvidenceId, EvidenceItem, LadderError, ProgressionState, ReadinessClaim, StartupId,
};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::path::Path;

/// Table for claims: ClaimId(u64) -> serialized ReadinessClaim
const CLAIMS: TableDefinition<u64, &[u8]> = TableDefinition::new("claims");

/// Table for evidence: EvidenceId(u64) -> serialized EvidenceItem
const EVIDENCE: TableDefinition<u64, &[u8]> = TableDefinition::new("evidence");

/// Index: (startup_id, claim_id) -> ()
const CLAIMS_BY_STARTUP: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("claims_by_startup");

/// Index: (startup_id, evidence_id) -> ()
const EVIDENCE_BY_STARTUP: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("evidence_by_startup");

/// Cached levels: StartupId(u64) -> serialized ProgressionState
const LEVELS: TableDefinition<u64, &[u8]> = TableDefinition::new("levels");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const NEXT_ID_KEY: &str = "next_id";

// =============================================================================
// HELPERS
// =============================================================================

fn storage_err(e: impl Display) -> LadderError {
    LadderError::Storage(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LadderError> {
    postcard::to_allocvec(value).map_err(|e| LadderError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LadderError> {
    postcard::from_bytes(bytes).map_err(|e| LadderError::Serialization(e.to_string()))
}

fn get_row<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
    id: u64,
) -> Result<Option<T>, LadderError> {
    table
        .get(id)
        .map_err(storage_err)?
        .map(|guard| decode(guard.value()))
        .transpose()
}

fn all_rows<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
) -> Result<Vec<T>, LadderError> {
    let mut rows = Vec::new();
    for entry in table.iter().map_err(storage_err)? {
        let (_, value) = entry.map_err(storage_err)?;
        rows.push(decode(value.value())?);
    }
    Ok(rows)
}

fn ids_of(
    index: &impl ReadableTable<(u64, u64), ()>,
    owner: u64,
) -> Result<Vec<u64>, LadderError> {
    let mut ids = Vec::new();
    for entry in index
        .range((owner, 0u64)..=(owner, u64::MAX))
        .map_err(storage_err)?
    {
        let (key, _) = entry.map_err(storage_err)?;
        ids.push(key.value().1);
    }
    Ok(ids)
}

fn rows_of<T: DeserializeOwned>(
    index: &impl ReadableTable<(u64, u64), ()>,
    table: &impl ReadableTable<u64, &'static [u8]>,
    owner: u64,
) -> Result<Vec<T>, LadderError> {
    ids_of(index, owner)?
        .into_iter()
        .map(|id| {
            get_row(table, id)?.ok_or_else(|| {
                LadderError::Consistency(format!(
                    "index of startup {} points at missing row {}",
                    owner, id
                ))
            })
        })
        .collect()
}

fn owners(
    index: &impl ReadableTable<(u64, u64), ()>,
    into: &mut BTreeSet<StartupId>,
) -> Result<(), LadderError> {
    for entry in index.iter().map_err(storage_err)? {
        let (key, _) = entry.map_err(storage_err)?;
        into.insert(StartupId(key.value().0));
    }
    Ok(())
}

// =============================================================================
// DATABASE HANDLE
// =============================================================================

/// A disk-backed ledger.
pub struct RedbLedger {
    db: Database,
}

impl std::fmt::Debug for RedbLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbLedger").finish_non_exhaustive()
    }
}

impl RedbLedger {
    /// Open or create a ledger database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LadderError> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(storage_err)?;
            let _ = write_txn.open_table(CLAIMS).map_err(storage_err)?;
            let _ = write_txn.open_table(EVIDENCE).map_err(storage_err)?;
            let _ = write_txn.open_table(CLAIMS_BY_STARTUP).map_err(storage_err)?;
            let _ = write_txn.open_table(EVIDENCE_BY_STARTUP).map_err(storage_err)?;
            let _ = write_txn.open_table(LEVELS).map_err(storage_err)?;
            let _ = write_txn.open_table(METADATA).map_err(storage_err)?;
            write_txn.commit().map_err(storage_err)?;
        }

        Ok(Self { db })
    }

    /// Run `f` against a consistent read snapshot.
    pub fn read<R>(
        &self,
        f: impl FnOnce(&RedbReader) -> Result<R, LadderError>,
    ) -> Result<R, LadderError> {
        let reader = RedbReader {
            txn: self.db.begin_read().map_err(storage_err)?,
        };
        f(&reader)
    }

    /// Run `f` inside one write transaction.
    ///
    /// Commits when `f` returns `Ok`; aborts and leaves the database
    /// untouched otherwise.
    pub fn write<R>(
        &self,
        f: impl FnOnce(&mut RedbWriter) -> Result<R, LadderError>,
    ) -> Result<R, LadderError> {
        let mut writer = RedbWriter {
            txn: self.db.begin_write().map_err(storage_err)?,
        };
        match f(&mut writer) {
            Ok(out) => {
                writer.txn.commit().map_err(storage_err)?;
                Ok(out)
            }
            Err(e) => {
                writer.txn.abort().map_err(storage_err)?;
                Err(e)
            }
        }
    }

    /// Export the ledger contents. Cached levels are not included.
    pub fn snapshot(&self) -> Result<LedgerSnapshot, LadderError> {
        self.read(|reader| {
            let claims = reader.txn.open_table(CLAIMS).map_err(storage_err)?;
            let evidence = reader.txn.open_table(EVIDENCE).map_err(storage_err)?;
            let meta = reader.txn.open_table(METADATA).map_err(storage_err)?;
            Ok(LedgerSnapshot {
                next_id: meta
                    .get(NEXT_ID_KEY)
                    .map_err(storage_err)?
                    .map(|v| v.value())
                    .unwrap_or(0),
                claims: all_rows(&claims)?,
                evidence: all_rows(&evidence)?,
            })
        })
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Read-only view over one redb read transaction.
pub struct RedbReader {
    txn: ReadTransaction,
}

/// Mutating view over one redb write transaction.
pub struct RedbWriter {
    txn: WriteTransaction,
}

macro_rules! impl_ledger_view {
    ($ty:ty) => {
        impl LedgerView for $ty {
            fn claim(&self, id: ClaimId) -> Result<Option<ReadinessClaim>, LadderError> {
                let table = self.txn.open_table(CLAIMS).map_err(storage_err)?;
                get_row(&table, id.0)
            }

            fn claims_of(&self, startup: StartupId) -> Result<Vec<ReadinessClaim>, LadderError> {
                let index = self.txn.open_table(CLAIMS_BY_STARTUP).map_err(storage_err)?;
                let table = self.txn.open_table(CLAIMS).map_err(storage_err)?;
                rows_of(&index, &table, startup.0)
            }

            fn evidence(&self, id: EvidenceId) -> Result<Option<EvidenceItem>, LadderError> {
                let table = self.txn.open_table(EVIDENCE).map_err(storage_err)?;
                get_row(&table, id.0)
            }

            fn evidence_of(&self, startup: StartupId) -> Result<Vec<EvidenceItem>, LadderError> {
                let index = self
                    .txn
                    .open_table(EVIDENCE_BY_STARTUP)
                    .map_err(storage_err)?;
                let table = self.txn.open_table(EVIDENCE).map_err(storage_err)?;
                rows_of(&index, &table, startup.0)
            }

            fn cached_levels(
                &self,
                startup: StartupId,
            ) -> Result<Option<ProgressionState>, LadderError> {
                let table = self.txn.open_table(LEVELS).map_err(storage_err)?;
                get_row(&table, startup.0)
            }

            fn known_startups(&self) -> Result<Vec<StartupId>, LadderError> {
                let mut startups = BTreeSet::new();
                owners(
                    &self.txn.open_table(CLAIMS_BY_STARTUP).map_err(storage_err)?,
                    &mut startups,
                )?;
                owners(
                    &self
                        .txn
                        .open_table(EVIDENCE_BY_STARTUP)
                        .map_err(storage_err)?,
                    &mut startups,
                )?;
                let levels = self.txn.open_table(LEVELS).map_err(storage_err)?;
                for entry in levels.iter().map_err(storage_err)? {
                    let (key, _) = entry.map_err(storage_err)?;
                    startups.insert(StartupId(key.value()));
                }
                Ok(startups.into_iter().collect())
            }
        }
    };
}

impl_ledger_view!(RedbReader);
impl_ledger_view!(RedbWriter);

impl LedgerTxn for RedbWriter {
    fn allocate_id(&mut self) -> Result<u64, LadderError> {
        let mut meta = self.txn.open_table(METADATA).map_err(storage_err)?;
        let current = meta
            .get(NEXT_ID_KEY)
            .map_err(storage_err)?
            .map(|v| v.value())
            .unwrap_or(0);
        let next = current.saturating_add(1);
        meta.insert(NEXT_ID_KEY, next).map_err(storage_err)?;
        Ok(next)
    }

    fn put_claim(&mut self, claim: &ReadinessClaim) -> Result<(), LadderError> {
        let bytes = encode(claim)?;
        let mut table = self.txn.open_table(CLAIMS).map_err(storage_err)?;
        let mut index = self
            .txn
            .open_table(CLAIMS_BY_STARTUP)
            .map_err(storage_err)?;

        let previous: Option<ReadinessClaim> = get_row(&table, claim.id.0)?;
        if let Some(old) = previous.filter(|old| old.startup != claim.startup) {
            index
                .remove((old.startup.0, old.id.0))
                .map_err(storage_err)?;
        }
        table
            .insert(claim.id.0, bytes.as_slice())
            .map_err(storage_err)?;
        index
            .insert((claim.startup.0, claim.id.0), ())
            .map_err(storage_err)?;
        Ok(())
    }

    fn remove_claim(&mut self, id: ClaimId) -> Result<Option<ReadinessClaim>, LadderError> {
        let mut table = self.txn.open_table(CLAIMS).map_err(storage_err)?;
        let removed: Option<ReadinessClaim> = table
            .remove(id.0)
            .map_err(storage_err)?
            .map(|guard| decode(guard.value()))
            .transpose()?;
        if let Some(claim) = &removed {
            let mut index = self
                .txn
                .open_table(CLAIMS_BY_STARTUP)
                .map_err(storage_err)?;
            index
                .remove((claim.startup.0, claim.id.0))
                .map_err(storage_err)?;
        }
        Ok(removed)
    }

    fn put_evidence(&mut self, item: &EvidenceItem) -> Result<(), LadderError> {
        let bytes = encode(item)?;
        let mut table = self.txn.open_table(EVIDENCE).map_err(storage_err)?;
        let mut index = self
            .txn
            .open_table(EVIDENCE_BY_STARTUP)
            .map_err(storage_err)?;

        let previous: Option<EvidenceItem> = get_row(&table, item.id.0)?;
        if let Some(old) = previous.filter(|old| old.startup != item.startup) {
            index
                .remove((old.startup.0, old.id.0))
                .map_err(storage_err)?;
        }
        table
            .insert(item.id.0, bytes.as_slice())
            .map_err(storage_err)?;
        index
            .insert((item.startup.0, item.id.0), ())
            .map_err(storage_err)?;
        Ok(())
    }

    fn remove_evidence(&mut self, id: EvidenceId) -> Result<Option<EvidenceItem>, LadderError> {
        let mut table = self.txn.open_table(EVIDENCE).map_err(storage_err)?;
        let removed: Option<EvidenceItem> = table
            .remove(id.0)
            .map_err(storage_err)?
            .map(|guard| decode(guard.value()))
            .transpose()?;
        if let Some(item) = &removed {
            let mut index = self
                .txn
                .open_table(EVIDENCE_BY_STARTUP)
                .map_err(storage_err)?;
            index
                .remove((item.startup.0, item.id.0))
                .map_err(storage_err)?;
        }
        Ok(removed)
    }

    fn store_levels(
        &mut self,
        startup: StartupId,
        state: ProgressionState,
        _seal: &LevelSeal,
    ) -> Result<(), LadderError> {
        let bytes = encode(&state)?;
        let mut table = self.txn.open_table(LEVELS).map_err(storage_err)?;
        table
            .insert(startup.0, bytes.as_slice())
            .map_err(storage_err)?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::progression;
    use crate::{Level, ReviewStatus, Track};
    use tempfile::tempdir;

    fn item(id: u64, startup: u64, level: u8, status: ReviewStatus) -> EvidenceItem {
        EvidenceItem {
            id: EvidenceId(id),
            startup: StartupId(startup),
            track: Track::Trl,
            level: Level::new(level).expect("level"),
            description: Some("lab report".to_string()),
            file_url: None,
            status,
            reviewer_notes: String::new(),
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn rows_survive_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("ledger.redb");

        {
            let ledger = RedbLedger::open(&db_path).expect("open db");
            ledger
                .write(|txn| {
                    let id = txn.allocate_id()?;
                    txn.put_evidence(&item(id, 3, 1, ReviewStatus::Approved))?;
                    progression::recompute_all(txn, StartupId(3))?;
                    Ok(())
                })
                .expect("write");
        }

        let ledger = RedbLedger::open(&db_path).expect("reopen db");
        let (items, levels, known) = ledger
            .read(|view| {
                Ok((
                    view.evidence_of(StartupId(3))?,
                    view.cached_levels(StartupId(3))?,
                    view.known_startups()?,
                ))
            })
            .expect("read");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description.as_deref(), Some("lab report"));
        assert_eq!(levels.expect("levels").trl, Level::BASELINE);
        assert_eq!(known, vec![StartupId(3)]);
        assert_eq!(ledger.snapshot().expect("snapshot").next_id, 1);
    }

    #[test]
    fn failed_write_leaves_no_trace() {
        let temp = tempdir().expect("temp dir");
        let ledger = RedbLedger::open(temp.path().join("ledger.redb")).expect("open db");

        let result: Result<(), LadderError> = ledger.write(|txn| {
            let id = txn.allocate_id()?;
            txn.put_evidence(&item(id, 1, 1, ReviewStatus::Pending))?;
            Err(LadderError::Validation("boom".to_string()))
        });
        assert!(result.is_err());

        let snapshot = ledger.snapshot().expect("snapshot");
        assert_eq!(snapshot.next_id, 0);
        assert!(snapshot.evidence.is_empty());
    }

    #[test]
    fn removal_updates_index() {
        let temp = tempdir().expect("temp dir");
        let ledger = RedbLedger::open(temp.path().join("ledger.redb")).expect("open db");

        ledger
            .write(|txn| {
                txn.put_evidence(&item(1, 5, 1, ReviewStatus::Pending))?;
                txn.put_evidence(&item(2, 5, 2, ReviewStatus::Pending))?;
                txn.put_evidence(&item(3, 6, 1, ReviewStatus::Pending))?;
                let removed = txn.remove_evidence(EvidenceId(1))?;
                assert_eq!(removed.map(|e| e.id), Some(EvidenceId(1)));
                assert!(txn.remove_evidence(EvidenceId(1))?.is_none());
                Ok(())
            })
            .expect("write");

        let ids: Vec<EvidenceId> = ledger
            .read(|view| view.evidence_of(StartupId(5)))
            .expect("read")
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![EvidenceId(2)]);
    }

    #[test]
    fn claims_are_indexed_by_startup() {
        let temp = tempdir().expect("temp dir");
        let ledger = RedbLedger::open(temp.path().join("ledger.redb")).expect("open db");

        let claim = ReadinessClaim {
            id: ClaimId(9),
            startup: StartupId(2),
            track: Track::Crl,
            level: Level::new(3).expect("level"),
            title: "Pilot customers".to_string(),
            subtitle: None,
            created_at: 0,
            updated_at: 0,
        };
        ledger
            .write(|txn| txn.put_claim(&claim))
            .expect("write");

        let (own, other, single) = ledger
            .read(|view| {
                Ok((
                    view.claims_of(StartupId(2))?,
                    view.claims_of(StartupId(1))?,
                    view.claim(ClaimId(9))?,
                ))
            })
            .expect("read");
        assert_eq!(own, vec![claim.clone()]);
        assert!(other.is_empty());
        assert_eq!(single, Some(claim));
    }
}
