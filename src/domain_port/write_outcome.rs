/// Result of an insert-if-absent write.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same key already exists; nothing was written.
    Duplicate,
    /// A referenced row (usually a user) does not exist; nothing was written.
    MissingReference,
}
