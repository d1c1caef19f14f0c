//! Secret store access for reconciliation passes.
//!
//! The driver never talks to a store directly. It holds a [`SecretGateway`],
//! which wraps an injected [`SecretStore`] backend and implements the
//! create-if-absent contract on top of the store's plain create call.
//!
//! # Supported Backends
//!
//! - **AWS Secrets Manager**: behind the `aws` feature (enabled by default)
//! - **In-memory**: always available; used by tests and `--memory` runs
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use secret_seeder::secrets::{InMemorySecretStore, SecretGateway, CreateOptions};
//!
//! let gateway = SecretGateway::new(Arc::new(InMemorySecretStore::new()));
//! let created = gateway
//!     .create_if_absent("omix3-test-fence", &payload, CreateOptions::default())
//!     .await?;
//! ```
//!
//! # Security Considerations
//!
//! - Secret values are never logged; names are
//! - Existing secrets are never updated or deleted

#[cfg(feature = "aws")]
pub mod aws;
pub mod gateway;
pub mod memory;
pub mod store;
pub mod types;

#[cfg(feature = "aws")]
pub use aws::AwsSecretStore;
pub use gateway::{CreateOptions, GatewayOptions, SecretGateway, TagFailurePolicy};
pub use memory::InMemorySecretStore;
pub use store::{CreateOutcome, NewSecret, SecretState, SecretStore, SecretStoreType};
pub use types::SecretString;
