//! Contains subcommands for the vigil indexer.

mod sync;
pub use sync::{ResolvedSync, SyncCommand};
