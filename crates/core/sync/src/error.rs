use crate::SourceError;
use thiserror::Error;
use vigil_primitives::BlockNumber;
use vigil_storage::StorageError;

/// Errors raised by the sync engine.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The chain source reports a head of zero, meaning the node has not synced yet.
    #[error("Chain source reports head 0, the node has not finished syncing")]
    NodeNotSynced,

    /// The configured polling interval is zero.
    #[error("Polling interval must be greater than zero")]
    ZeroPollingInterval,

    /// The configured starting block is above the current chain head.
    #[error("Starting block number {start} is greater than the current block number {head}")]
    StartAheadOfHead {
        /// The configured starting block.
        start: BlockNumber,
        /// The chain head at startup.
        head: BlockNumber,
    },

    /// The source returned a block other than the one requested.
    #[error("Requested block {requested} but the source returned block {returned}")]
    UnexpectedBlock {
        /// The requested block number.
        requested: BlockNumber,
        /// The number of the returned block.
        returned: BlockNumber,
    },

    /// The chain source failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The block store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SyncError {
    /// Returns `true` for startup precondition violations, which are not recoverable.
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NodeNotSynced | Self::ZeroPollingInterval | Self::StartAheadOfHead { .. }
        )
    }
}
