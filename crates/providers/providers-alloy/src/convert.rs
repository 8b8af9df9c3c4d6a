//! Conversions from alloy RPC types into [`vigil_primitives`] types.

use alloy_consensus::Transaction as ConsensusTransaction;
use alloy_network_primitives::{ReceiptResponse, TransactionResponse};
use alloy_rpc_types_eth::{
    Block as RpcBlock, BlockTransactions, Log as RpcLog, Transaction as RpcTransaction,
    TransactionReceipt,
};
use vigil_primitives::{Block, BlockNumber, Log, Receipt, Transaction};
use vigil_sync::SourceError;

/// Builds a [`Block`] from an RPC block carrying full transactions and the receipts of the same
/// block.
///
/// Receipts must line up one-to-one with the block's transactions, otherwise the pair is
/// rejected as [`SourceError::Malformed`].
pub(crate) fn into_block(
    block: RpcBlock,
    receipts: Vec<TransactionReceipt>,
) -> Result<Block, SourceError> {
    let header = &block.header;
    let number = header.inner.number;

    let transactions = match &block.transactions {
        BlockTransactions::Full(txs) => {
            txs.iter().map(|tx| into_transaction(number, tx)).collect::<Result<Vec<_>, _>>()?
        }
        BlockTransactions::Hashes(hashes) if hashes.is_empty() => Vec::new(),
        _ => return Err(malformed(number, "block returned without full transactions")),
    };

    if receipts.len() != transactions.len() {
        return Err(malformed(
            number,
            format!("{} transactions but {} receipts", transactions.len(), receipts.len()),
        ));
    }

    let receipts = receipts
        .iter()
        .zip(&transactions)
        .map(|(receipt, tx)| {
            if receipt.transaction_hash() != tx.hash {
                return Err(malformed(
                    number,
                    format!(
                        "receipt {} does not match transaction {}",
                        receipt.transaction_hash(),
                        tx.hash
                    ),
                ));
            }
            into_receipt(number, receipt)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Block {
        number,
        hash: header.hash,
        parent_hash: header.inner.parent_hash,
        timestamp: header.inner.timestamp,
        miner: header.inner.beneficiary,
        gas_limit: header.inner.gas_limit,
        gas_used: header.inner.gas_used,
        transactions,
        receipts,
    })
}

fn into_transaction(number: BlockNumber, tx: &RpcTransaction) -> Result<Transaction, SourceError> {
    let hash = TransactionResponse::tx_hash(tx);
    let index = tx
        .transaction_index
        .ok_or_else(|| malformed(number, format!("transaction {hash} has no index")))?;

    Ok(Transaction {
        hash,
        index,
        from: TransactionResponse::from(tx),
        to: ConsensusTransaction::to(tx),
        value: ConsensusTransaction::value(tx),
        nonce: ConsensusTransaction::nonce(tx),
        gas_limit: ConsensusTransaction::gas_limit(tx),
        input: ConsensusTransaction::input(tx).clone(),
    })
}

fn into_receipt(number: BlockNumber, receipt: &TransactionReceipt) -> Result<Receipt, SourceError> {
    let logs = receipt
        .inner
        .logs()
        .iter()
        .map(|log| into_log(number, log))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Receipt {
        transaction_hash: receipt.transaction_hash(),
        status: receipt.status(),
        gas_used: receipt.gas_used(),
        contract_address: receipt.contract_address(),
        logs,
    })
}

fn into_log(number: BlockNumber, log: &RpcLog) -> Result<Log, SourceError> {
    let log_index = log.log_index.ok_or_else(|| malformed(number, "log has no index"))?;
    Ok(Log {
        address: log.inner.address,
        topics: log.inner.data.topics().to_vec(),
        data: log.inner.data.data.clone(),
        log_index,
    })
}

fn malformed(number: BlockNumber, reason: impl Into<String>) -> SourceError {
    SourceError::Malformed { number, reason: reason.into() }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy_primitives::{Address, B256};
    use alloy_rpc_types_eth::Header;

    pub(crate) fn rpc_block(
        number: BlockNumber,
        transactions: BlockTransactions<RpcTransaction>,
    ) -> RpcBlock {
        RpcBlock {
            header: Header {
                hash: B256::repeat_byte(number as u8),
                inner: alloy_consensus::Header {
                    number,
                    parent_hash: B256::repeat_byte(number.wrapping_sub(1) as u8),
                    timestamp: 1_700_000_000 + number,
                    beneficiary: Address::repeat_byte(0x11),
                    gas_limit: 30_000_000,
                    gas_used: 21_000,
                    ..Default::default()
                },
                total_difficulty: None,
                size: None,
            },
            uncles: Vec::new(),
            transactions,
            withdrawals: None,
        }
    }

    #[test]
    fn test_empty_block_converts_header_fields() {
        let block =
            into_block(rpc_block(5, BlockTransactions::Full(Vec::new())), Vec::new()).unwrap();

        assert_eq!(block.number, 5);
        assert_eq!(block.hash, B256::repeat_byte(5));
        assert_eq!(block.parent_hash, B256::repeat_byte(4));
        assert_eq!(block.timestamp, 1_700_000_005);
        assert_eq!(block.miner, Address::repeat_byte(0x11));
        assert_eq!(block.gas_limit, 30_000_000);
        assert_eq!(block.gas_used, 21_000);
        assert!(block.transactions.is_empty());
        assert!(block.receipts.is_empty());
    }

    #[test]
    fn test_empty_hash_list_is_an_empty_block() {
        let block =
            into_block(rpc_block(9, BlockTransactions::Hashes(Vec::new())), Vec::new()).unwrap();
        assert!(block.transactions.is_empty());
    }

    #[test]
    fn test_hash_only_block_is_malformed() {
        let err = into_block(rpc_block(9, BlockTransactions::Hashes(vec![B256::ZERO])), Vec::new())
            .unwrap_err();
        assert!(matches!(err, SourceError::Malformed { number: 9, .. }));
    }
}
