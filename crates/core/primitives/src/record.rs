//! The persisted form of a [`Block`].

use crate::Block;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Internal identifier of a stored block record.
///
/// Assigned once, when a block number is first written, and preserved across every later
/// overwrite of that number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Display, From, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub u64);

/// A stored block, keyed uniquely by block number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// The record identifier.
    pub id: RecordId,
    /// The block payload.
    pub block: Block,
}

impl BlockRecord {
    /// Creates a new [`BlockRecord`].
    pub const fn new(id: RecordId, block: Block) -> Self {
        Self { id, block }
    }
}
