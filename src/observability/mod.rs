//! # Observability
//!
//! Structured logging for reconciliation passes. There is no metrics or
//! trace export; spans exist to give log lines their pass context.

pub mod logging;

pub use logging::{init_logging, log_config_info};
