//! Sequential cursor port trait.

use crate::domain::error::StoreError;
use csv::StringRecord;

/// A restartable forward cursor over records.
///
/// Typical traversal: `rewind`, then loop while `valid`, reading `current`
/// and calling `next`.
pub trait RecordCursor {
    /// Moves the cursor to `position`. Fails with [`StoreError::Range`] if absent.
    fn seek(&mut self, position: usize) -> Result<(), StoreError>;

    /// Record under the cursor, or `None` when the cursor is past the end.
    fn current(&self) -> Result<Option<StringRecord>, StoreError>;

    /// Advances by one. Bounds are checked by `valid`, not here.
    fn next(&mut self);

    fn rewind(&mut self);

    fn valid(&self) -> bool;

    /// Current cursor position.
    fn key(&self) -> usize;
}
