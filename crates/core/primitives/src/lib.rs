#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod block;
pub use block::{Block, Log, Receipt, Transaction};

mod record;
pub use record::{BlockRecord, RecordId};

mod window;
pub use window::{ValidationOutcome, ValidationWindow};

pub use alloy_primitives::BlockNumber;
