//! Cumulative byte-offset index over a record file.
//!
//! Entry `i` is the absolute end offset of record `i`, which is also the
//! start offset of record `i + 1`. Record 0 starts at offset 0.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetIndex {
    offsets: Vec<u64>,
}

impl OffsetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_offsets(offsets: Vec<u64>) -> Self {
        Self { offsets }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn contains(&self, position: usize) -> bool {
        position < self.offsets.len()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.offsets
    }

    /// Offset one past the last indexed record (0 when empty).
    pub fn end(&self) -> u64 {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// Start offset of the record at `position`. Callers check `contains` first.
    pub fn start_of(&self, position: usize) -> u64 {
        if position == 0 {
            0
        } else {
            self.offsets[position - 1]
        }
    }

    pub fn end_of(&self, position: usize) -> u64 {
        self.offsets[position]
    }

    /// Byte length of the record at `position`, terminator included.
    pub fn span(&self, position: usize) -> u64 {
        self.end_of(position) - self.start_of(position)
    }

    /// Appends a record of `len` bytes after the current end.
    pub fn push_len(&mut self, len: u64) -> u64 {
        let end = self.end() + len;
        self.offsets.push(end);
        end
    }

    /// Replaces the record at `position` with one of `new_len` bytes.
    ///
    /// The entry at `position` becomes `start + new_len`; every later entry
    /// moves by the same delta. Earlier entries are untouched. Returns the
    /// signed delta.
    pub fn splice(&mut self, position: usize, new_len: u64) -> i64 {
        let start = self.start_of(position);
        let old_len = self.span(position);
        self.offsets[position] = start + new_len;

        let rest = &mut self.offsets[position + 1..];
        if new_len >= old_len {
            let grow = new_len - old_len;
            rest.iter_mut().for_each(|e| *e += grow);
        } else {
            let shrink = old_len - new_len;
            rest.iter_mut().for_each(|e| *e -= shrink);
        }
        new_len as i64 - old_len as i64
    }

    /// Drops the record at `position`, pulling every later entry back by its
    /// length. Returns the removed length.
    pub fn remove(&mut self, position: usize) -> u64 {
        let removed = self.span(position);
        self.offsets.remove(position);
        self.offsets[position..]
            .iter_mut()
            .for_each(|e| *e -= removed);
        removed
    }
}
