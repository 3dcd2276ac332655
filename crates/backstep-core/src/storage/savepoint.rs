//! Savepoint journal for nested, partially reversible write scopes.
//!
//! While at least one savepoint is open every write records the prior image
//! of the key it touches. Rolling back to a savepoint replays those images in
//! reverse; releasing a savepoint folds its images into the enclosing one, or
//! discards them when it was the outermost.

use crate::error::Error;

/// Handle to an open savepoint.
///
/// Savepoints nest; only the innermost open savepoint may be released or
/// rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Savepoint {
    depth: usize,
}

impl Savepoint {
    /// Nesting depth, 0 for the outermost savepoint.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Prior image of one key.
#[derive(Debug, Clone)]
pub(crate) struct JournalEntry {
    pub key: Vec<u8>,
    pub before: Option<sled::IVec>,
}

/// Write journal shared by all open savepoints.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    entries: Vec<JournalEntry>,
    /// Journal length at the moment each open savepoint was taken.
    marks: Vec<usize>,
}

impl Journal {
    /// Whether writes currently need to be journaled.
    pub fn is_active(&self) -> bool {
        !self.marks.is_empty()
    }

    /// Number of open savepoints.
    pub fn depth(&self) -> usize {
        self.marks.len()
    }

    /// Open a new innermost savepoint.
    pub fn open(&mut self) -> Savepoint {
        self.marks.push(self.entries.len());
        Savepoint {
            depth: self.marks.len() - 1,
        }
    }

    /// Record the prior image of a key about to be written.
    pub fn record(&mut self, key: Vec<u8>, before: Option<sled::IVec>) {
        if self.is_active() {
            self.entries.push(JournalEntry { key, before });
        }
    }

    /// Close a savepoint, keeping its writes.
    pub fn release(&mut self, savepoint: Savepoint) -> Result<(), Error> {
        self.check_innermost(savepoint)?;
        self.marks.pop();
        if self.marks.is_empty() {
            self.entries.clear();
        }
        Ok(())
    }

    /// Close a savepoint and hand back the images to restore, newest first.
    pub fn unwind(&mut self, savepoint: Savepoint) -> Result<Vec<JournalEntry>, Error> {
        self.check_innermost(savepoint)?;
        let mark = self.marks.pop().unwrap_or(0);
        let mut undone = self.entries.split_off(mark);
        undone.reverse();
        Ok(undone)
    }

    fn check_innermost(&self, savepoint: Savepoint) -> Result<(), Error> {
        match self.marks.len().checked_sub(1) {
            Some(top) if top == savepoint.depth => Ok(()),
            Some(top) => Err(Error::Savepoint(format!(
                "savepoint at depth {} is not the innermost (depth {})",
                savepoint.depth, top
            ))),
            None => Err(Error::Savepoint(format!(
                "savepoint at depth {} is not open",
                savepoint.depth
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(byte: u8) -> Option<sled::IVec> {
        Some(sled::IVec::from(vec![byte]))
    }

    #[test]
    fn test_inactive_journal_ignores_writes() {
        let mut journal = Journal::default();
        journal.record(b"k".to_vec(), None);
        assert!(!journal.is_active());
        assert!(journal.entries.is_empty());
    }

    #[test]
    fn test_unwind_returns_newest_first() {
        let mut journal = Journal::default();
        let sp = journal.open();
        journal.record(b"a".to_vec(), image(1));
        journal.record(b"b".to_vec(), None);

        let undone = journal.unwind(sp).unwrap();
        assert_eq!(undone.len(), 2);
        assert_eq!(undone[0].key, b"b".to_vec());
        assert_eq!(undone[1].key, b"a".to_vec());
        assert!(!journal.is_active());
    }

    #[test]
    fn test_nested_release_keeps_outer_images() {
        let mut journal = Journal::default();
        let outer = journal.open();
        journal.record(b"outer".to_vec(), None);

        let inner = journal.open();
        assert_eq!(inner.depth(), 1);
        journal.record(b"inner".to_vec(), image(2));
        journal.release(inner).unwrap();
        assert_eq!(journal.depth(), 1);

        let undone = journal.unwind(outer).unwrap();
        assert_eq!(undone.len(), 2);
    }

    #[test]
    fn test_only_innermost_may_close() {
        let mut journal = Journal::default();
        let outer = journal.open();
        let _inner = journal.open();

        assert!(matches!(journal.release(outer), Err(Error::Savepoint(_))));
        assert!(matches!(journal.unwind(outer), Err(Error::Savepoint(_))));
    }

    #[test]
    fn test_closed_savepoint_rejected() {
        let mut journal = Journal::default();
        let sp = journal.open();
        journal.release(sp).unwrap();
        assert!(journal.release(sp).is_err());
    }
}
