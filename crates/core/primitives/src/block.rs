//! The canonical block payload ingested from the chain source.

use alloy_primitives::{Address, B256, BlockNumber, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A block as fetched from the chain source, together with its transactions and receipts.
///
/// A block is identified by the `(number, hash)` pair. A later fetch at the same number may
/// legitimately return a different hash after a reorg, in which case the stored copy is
/// replaced.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Block {
    /// The block number.
    pub number: BlockNumber,
    /// The hash of the block.
    pub hash: B256,
    /// The hash of the parent block.
    pub parent_hash: B256,
    /// The block timestamp, in seconds since the Unix epoch.
    pub timestamp: u64,
    /// The beneficiary of the block.
    pub miner: Address,
    /// The gas limit of the block.
    pub gas_limit: u64,
    /// The gas used by all transactions in the block.
    pub gas_used: u64,
    /// The transactions included in the block, in block order.
    pub transactions: Vec<Transaction>,
    /// The receipts of the block's transactions, in block order.
    pub receipts: Vec<Receipt>,
}

impl Block {
    /// Creates a new [`Block`] with no transactions or receipts.
    pub const fn new(number: BlockNumber, hash: B256, parent_hash: B256, timestamp: u64) -> Self {
        Self {
            number,
            hash,
            parent_hash,
            timestamp,
            miner: Address::ZERO,
            gas_limit: 0,
            gas_used: 0,
            transactions: Vec::new(),
            receipts: Vec::new(),
        }
    }

    /// Returns the `(number, hash)` identity of the block.
    pub const fn id(&self) -> (BlockNumber, B256) {
        (self.number, self.hash)
    }

    /// Returns `true` if `self` and `other` occupy the same height with the same hash.
    pub fn is_same_block(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

/// A transaction included in a [`Block`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transaction {
    /// The transaction hash.
    pub hash: B256,
    /// Position of the transaction within the block.
    pub index: u64,
    /// The sender.
    pub from: Address,
    /// The recipient, `None` for contract creations.
    pub to: Option<Address>,
    /// Value transferred, in wei.
    pub value: U256,
    /// The sender nonce.
    pub nonce: u64,
    /// The gas limit of the transaction.
    pub gas_limit: u64,
    /// The calldata.
    pub input: Bytes,
}

/// The receipt of a [`Transaction`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Receipt {
    /// Hash of the transaction this receipt belongs to.
    pub transaction_hash: B256,
    /// Whether the transaction succeeded.
    pub status: bool,
    /// Gas used by the transaction.
    pub gas_used: u64,
    /// Address of the created contract, if any.
    pub contract_address: Option<Address>,
    /// Logs emitted by the transaction.
    pub logs: Vec<Log>,
}

/// An event log emitted during transaction execution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Log {
    /// The emitting contract.
    pub address: Address,
    /// The indexed topics.
    pub topics: Vec<B256>,
    /// The non-indexed data.
    pub data: Bytes,
    /// Index of the log within the block.
    pub log_index: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_block_compares_number_and_hash() {
        let a = Block::new(5, B256::repeat_byte(1), B256::ZERO, 0);
        let mut b = a.clone();
        b.timestamp = 99;
        assert!(a.is_same_block(&b));

        b.hash = B256::repeat_byte(2);
        assert!(!a.is_same_block(&b));
    }

    #[test]
    fn test_block_serde() {
        let mut block = Block::new(42, B256::repeat_byte(0x42), B256::repeat_byte(0x41), 1_700_000_000);
        block.transactions.push(Transaction {
            hash: B256::repeat_byte(0xaa),
            to: None,
            value: U256::from(7),
            ..Default::default()
        });

        let json = serde_json::to_string(&block).unwrap();
        let decoded: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, block);
    }
}
