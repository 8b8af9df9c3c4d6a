use thiserror::Error;

/// Errors that may occur while interacting with block storage.
///
/// This enum is used across all implementations of the [`BlockStore`](crate::BlockStore) trait.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying database returned an error.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored record could not be encoded or decoded.
    #[error("Failed to encode or decode block record {block_number}: {reason}")]
    Codec {
        /// The block number of the offending record.
        block_number: u64,
        /// Description of the codec failure.
        reason: String,
    },

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("Storage lock poisoned")]
    LockPoisoned,

    /// The requested range has its start above its end.
    #[error("Invalid block range: {start}..={end}")]
    InvalidRange {
        /// The start of the range.
        start: u64,
        /// The end of the range.
        end: u64,
    },
}

#[cfg(feature = "rocksdb")]
impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Database(err.into_string())
    }
}
