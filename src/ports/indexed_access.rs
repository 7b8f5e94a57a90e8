//! Positional record access port trait.

use crate::domain::error::StoreError;
use csv::StringRecord;

/// Array-like access to records by zero-based position.
pub trait IndexedAccess {
    /// Whether a record exists at `position`.
    fn contains(&self, position: usize) -> bool;

    /// Reads the record at `position`.
    ///
    /// A missing position is a normal outcome and yields `Ok(None)`.
    fn get(&self, position: usize) -> Result<Option<StringRecord>, StoreError>;

    /// Writes `record` at `position`, replacing what is there.
    ///
    /// `None`, or a position at or past the end, appends. Returns the
    /// position the record now occupies.
    fn set(&mut self, position: Option<usize>, record: &StringRecord)
    -> Result<usize, StoreError>;

    /// Removes the record at `position`, closing the gap.
    ///
    /// # Errors
    ///
    /// [`StoreError::Range`] if no record exists there.
    fn unset(&mut self, position: usize) -> Result<(), StoreError>;
}
