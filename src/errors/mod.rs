//! # Error Handling
//!
//! Error types shared by the generator, the store gateway, the bundle
//! builders and the reconciliation driver.

pub mod types;

pub use types::{Result, SeederError};

/// Short alias used throughout the crate
pub type Error = SeederError;
