#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod actor;
pub use actor::IndexerActor;

mod config;
pub use config::{DEFAULT_POLLING_INTERVAL, DEFAULT_VALIDATION_WINDOW, SyncConfig};

mod error;
pub use error::SyncError;

mod traits;
pub use traits::{ChainSource, SourceError};

mod gap_filler;
pub use gap_filler::GapFiller;

mod validator;
pub use validator::WindowValidator;

mod reporter;
pub use reporter::{StdoutReporter, TracingReporter, ValidationReporter};

mod sync_loop;
pub use sync_loop::SyncLoop;

mod transformer;
pub use transformer::{EventTransformer, TransformerError, TransformerReport, TransformerRunner};

mod metrics;

#[cfg(test)]
mod test_utils;
