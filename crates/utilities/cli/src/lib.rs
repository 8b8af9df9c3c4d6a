#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod error;
pub use error::{CliError, CliResult, PrometheusError};

pub mod log;
pub use log::LogArgs;

pub mod metrics_args;
pub use metrics_args::MetricsArgs;

mod prometheus;
pub use prometheus::init_prometheus_server;

mod styles;
pub use styles::cli_styles;

mod subscriber;
pub use subscriber::init_tracing_subscriber;
