//! An on-disk [`BlockStore`] backed by RocksDB.

use crate::{BlockStore, StorageError};
use rocksdb::{DB, Options, WriteBatch};
use std::{
    collections::BTreeSet,
    fmt,
    ops::RangeInclusive,
    path::Path,
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};
use tracing::{debug, trace};
use vigil_primitives::{Block, BlockNumber, BlockRecord, RecordId};

/// Prefix of block record keys. The full key is the prefix followed by the big-endian block
/// number, so lexicographic key order equals numeric order.
const BLOCK_KEY_PREFIX: u8 = b'b';

/// Key holding the last assigned [`RecordId`].
const LAST_RECORD_ID_KEY: &[u8] = b"m:last_record_id";

/// A [`BlockStore`] persisted in a RocksDB database.
///
/// Records are JSON-encoded [`BlockRecord`]s. Writers are serialized by an internal mutex so
/// that the read of an existing record id and the write of the new payload happen atomically.
pub struct RocksBlockStore {
    db: DB,
    write_lock: Mutex<()>,
    last_id: AtomicU64,
}

impl fmt::Debug for RocksBlockStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RocksBlockStore")
            .field("path", &self.db.path())
            .field("last_id", &self.last_id.load(Ordering::Relaxed))
            .finish()
    }
}

impl RocksBlockStore {
    /// Creates or opens a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;

        let last_id = match db.get(LAST_RECORD_ID_KEY)? {
            Some(bytes) => decode_u64(&bytes).ok_or_else(|| {
                StorageError::Database("corrupt last record id entry".to_string())
            })?,
            None => 0,
        };
        debug!(target: "storage", path = %path.display(), last_id, "Opened block database");

        Ok(Self { db, write_lock: Mutex::new(()), last_id: AtomicU64::new(last_id) })
    }
}

impl BlockStore for RocksBlockStore {
    fn block_numbers_in_range(
        &self,
        range: RangeInclusive<BlockNumber>,
    ) -> Result<BTreeSet<BlockNumber>, StorageError> {
        let (start, end) = (*range.start(), *range.end());
        if start > end {
            return Err(StorageError::InvalidRange { start, end });
        }

        // Keys only, record payloads are never copied out.
        let mut numbers = BTreeSet::new();
        let mut iter = self.db.raw_iterator();
        iter.seek(block_key(start));
        while iter.valid() {
            let Some(number) = iter.key().and_then(block_number_from_key) else { break };
            if number > end {
                break;
            }
            numbers.insert(number);
            iter.next();
        }
        iter.status()?;
        Ok(numbers)
    }

    fn create_or_update_block(&self, block: &Block) -> Result<RecordId, StorageError> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::LockPoisoned)?;

        let mut batch = WriteBatch::default();
        let id = match self.get_record(block.number)? {
            Some(existing) => existing.id,
            None => {
                let next = self.last_id.load(Ordering::Acquire) + 1;
                batch.put(LAST_RECORD_ID_KEY, next.to_be_bytes());
                RecordId(next)
            }
        };

        let record = BlockRecord::new(id, block.clone());
        let encoded = serde_json::to_vec(&record).map_err(|err| StorageError::Codec {
            block_number: block.number,
            reason: err.to_string(),
        })?;
        batch.put(block_key(block.number), encoded);
        self.db.write(batch)?;

        self.last_id.fetch_max(id.0, Ordering::Release);
        trace!(target: "storage", block_number = block.number, record_id = %id, "Stored block");
        Ok(id)
    }

    fn get_record(&self, number: BlockNumber) -> Result<Option<BlockRecord>, StorageError> {
        let Some(bytes) = self.db.get(block_key(number))? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| StorageError::Codec { block_number: number, reason: err.to_string() })
    }
}

fn block_key(number: BlockNumber) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[0] = BLOCK_KEY_PREFIX;
    key[1..].copy_from_slice(&number.to_be_bytes());
    key
}

fn block_number_from_key(key: &[u8]) -> Option<BlockNumber> {
    match key.split_first() {
        Some((&BLOCK_KEY_PREFIX, rest)) => decode_u64(rest),
        _ => None,
    }
}

fn decode_u64(bytes: &[u8]) -> Option<u64> {
    bytes.try_into().ok().map(u64::from_be_bytes)
}
