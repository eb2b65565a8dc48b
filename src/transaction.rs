//! Snapshot-based transactions.
//!
//! The manager only keeps copies of rows; the catalog decides when to take
//! them and applies the restores it hands back. Row copies are keyed by
//! `schema.table`.

use std::collections::HashMap;

use tracing::trace;

use crate::error::{Error, Result};
use crate::row::Row;

pub type TableSnapshot = HashMap<String, Vec<Row>>;

#[derive(Debug, Clone)]
struct Savepoint {
    name: String,
    tables: TableSnapshot,
}

#[derive(Debug, Default)]
pub struct TransactionManager {
    active: bool,
    /// Rows of each table as they were before its first write since BEGIN.
    backups: TableSnapshot,
    savepoints: Vec<Savepoint>,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn begin(&mut self) -> Result<()> {
        if self.active {
            return Err(Error::TransactionActive);
        }
        self.active = true;
        trace!("transaction started");
        Ok(())
    }

    /// Drops every snapshot. A no-op outside a transaction.
    pub fn commit(&mut self) {
        if self.active {
            trace!(tables = self.backups.len(), "transaction committed");
        }
        self.reset();
    }

    /// Ends the transaction and returns the rows to put back, one entry per
    /// table written since BEGIN. Empty outside a transaction.
    pub fn rollback(&mut self) -> TableSnapshot {
        let backups = std::mem::take(&mut self.backups);
        if self.active {
            trace!(tables = backups.len(), "transaction rolled back");
        }
        self.reset();
        backups
    }

    fn reset(&mut self) {
        self.active = false;
        self.backups.clear();
        self.savepoints.clear();
    }

    /// Whether `key` still needs its BEGIN-time copy.
    pub fn needs_backup(&self, key: &str) -> bool {
        self.active && !self.backups.contains_key(key)
    }

    pub fn record_backup(&mut self, key: String, rows: Vec<Row>) {
        self.backups.entry(key).or_insert(rows);
    }

    /// Moves the copies held for table `from` over to `to` after a rename.
    pub fn rename(&mut self, from: &str, to: &str) {
        let snapshots = std::iter::once(&mut self.backups)
            .chain(self.savepoints.iter_mut().map(|s| &mut s.tables));
        for tables in snapshots {
            if let Some(rows) = tables.remove(from) {
                tables.insert(to.to_string(), rows);
            }
        }
    }

    /// Records a savepoint holding a copy of every table.
    pub fn savepoint(&mut self, name: String, tables: TableSnapshot) -> Result<()> {
        if !self.active {
            return Err(Error::NoActiveTransaction);
        }
        trace!(savepoint = %name, tables = tables.len(), "savepoint recorded");
        self.savepoints.push(Savepoint { name, tables });
        Ok(())
    }

    /// Returns the copy recorded by the latest savepoint called `name`.
    /// Savepoints declared after it are discarded; it stays usable.
    pub fn rollback_to(&mut self, name: &str) -> Result<TableSnapshot> {
        let pos = self.find(name)?;
        self.savepoints.truncate(pos + 1);
        Ok(self.savepoints[pos].tables.clone())
    }

    /// Forgets the savepoint `name` and every savepoint declared after it.
    pub fn release(&mut self, name: &str) -> Result<()> {
        let pos = self.find(name)?;
        self.savepoints.truncate(pos);
        Ok(())
    }

    fn find(&self, name: &str) -> Result<usize> {
        if !self.active {
            return Err(Error::NoActiveTransaction);
        }
        self.savepoints
            .iter()
            .rposition(|s| s.name == name)
            .ok_or_else(|| Error::SavepointNotFound(name.to_string()))
    }

    pub fn savepoint_names(&self) -> impl Iterator<Item = &str> {
        self.savepoints.iter().map(|s| s.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn rows(ids: &[i64]) -> Vec<Row> {
        ids.iter()
            .map(|id| Row::from_pairs([("id", Value::Int(*id))]))
            .collect()
    }

    #[test]
    fn test_begin_twice_fails() {
        let mut tx = TransactionManager::new();
        tx.begin().unwrap();
        assert_eq!(tx.begin(), Err(Error::TransactionActive));
        assert!(tx.is_active());
    }

    #[test]
    fn test_commit_and_rollback_outside_transaction_are_noops() {
        let mut tx = TransactionManager::new();
        tx.commit();
        assert!(tx.rollback().is_empty());
        assert!(!tx.is_active());
    }

    #[test]
    fn test_backup_taken_once() {
        let mut tx = TransactionManager::new();
        assert!(!tx.needs_backup("public.t"));

        tx.begin().unwrap();
        assert!(tx.needs_backup("public.t"));
        tx.record_backup("public.t".into(), rows(&[1]));
        assert!(!tx.needs_backup("public.t"));
        tx.record_backup("public.t".into(), rows(&[1, 2]));

        let restored = tx.rollback();
        assert_eq!(restored["public.t"], rows(&[1]));
        assert!(!tx.is_active());
    }

    #[test]
    fn test_savepoint_requires_transaction() {
        let mut tx = TransactionManager::new();
        assert_eq!(
            tx.savepoint("sp".into(), TableSnapshot::new()),
            Err(Error::NoActiveTransaction)
        );
        assert_eq!(tx.rollback_to("sp"), Err(Error::NoActiveTransaction));
        assert_eq!(tx.release("sp"), Err(Error::NoActiveTransaction));
    }

    #[test]
    fn test_rollback_to_discards_later_savepoints() {
        let mut tx = TransactionManager::new();
        tx.begin().unwrap();
        let first = TableSnapshot::from([("public.t".to_string(), rows(&[1]))]);
        let second = TableSnapshot::from([("public.t".to_string(), rows(&[1, 2]))]);
        tx.savepoint("a".into(), first.clone()).unwrap();
        tx.savepoint("b".into(), second).unwrap();

        assert_eq!(tx.rollback_to("a").unwrap(), first);
        assert_eq!(tx.savepoint_names().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(tx.rollback_to("a").unwrap(), first);
        assert_eq!(tx.rollback_to("b"), Err(Error::SavepointNotFound("b".into())));
    }

    #[test]
    fn test_rename_moves_backups_and_savepoints() {
        let mut tx = TransactionManager::new();
        tx.begin().unwrap();
        tx.record_backup("public.t".into(), rows(&[1]));
        tx.savepoint("a".into(), TableSnapshot::from([("public.t".to_string(), rows(&[1, 2]))]))
            .unwrap();

        tx.rename("public.t", "public.u");
        assert!(tx.needs_backup("public.t"));
        assert!(!tx.needs_backup("public.u"));
        assert_eq!(tx.rollback_to("a").unwrap()["public.u"], rows(&[1, 2]));
        assert_eq!(tx.rollback()["public.u"], rows(&[1]));
    }

    #[test]
    fn test_release() {
        let mut tx = TransactionManager::new();
        tx.begin().unwrap();
        tx.savepoint("a".into(), TableSnapshot::new()).unwrap();
        tx.savepoint("b".into(), TableSnapshot::new()).unwrap();
        tx.release("a").unwrap();
        assert_eq!(tx.savepoint_names().count(), 0);
        assert_eq!(tx.release("a"), Err(Error::SavepointNotFound("a".into())));
    }
}
