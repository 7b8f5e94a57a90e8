//! Record count port trait.

pub trait SizeQuery {
    /// Number of records currently indexed.
    fn count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}
