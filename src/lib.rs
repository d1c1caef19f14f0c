//! # secret-seeder
//!
//! Deployment-time seeding of application secrets for a data-commons stack.
//! A custom-resource event names a project, an environment and the bundles
//! to produce; one reconciliation pass makes sure every named secret exists
//! in the secret store.
//!
//! Secrets are only ever created. An existing secret is left exactly as it
//! is, so running the same event again is always safe and rotation means
//! deleting the secret and re-running.
//!
//! ## Architecture
//!
//! ```text
//! ResourceEvent → InvocationContext → Reconciler → bundle builders
//!                                          ↓
//!                                    SecretGateway → SecretStore (AWS | in-memory)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use secret_seeder::{InMemorySecretStore, InvocationContext, Reconciler, SecretGateway};
//!
//! # async fn run() -> secret_seeder::Result<()> {
//! let gateway = SecretGateway::new(Arc::new(InMemorySecretStore::new()));
//! let reconciler = Reconciler::new(gateway);
//!
//! let mut context = InvocationContext::new("omix3", "test");
//! context.services = vec!["fence".to_string()];
//! context.db_host_override = Some("db.local".to_string());
//! context.db_port_override = Some("5432".to_string());
//!
//! let outcome = reconciler.reconcile(&context).await?;
//! println!("created {:?}", outcome.created);
//! # Ok(())
//! # }
//! ```

pub mod bundles;
pub mod cli;
pub mod config;
pub mod errors;
pub mod event;
pub mod invocation;
pub mod observability;
pub mod random;
pub mod reconcile;
pub mod secrets;

// Re-export commonly used types and traits
pub use bundles::{BundleKind, SecretNamer};
pub use config::SeederConfig;
pub use errors::{Error, Result, SeederError};
pub use event::{RequestType, ResourceEvent, ResourceResponse};
pub use invocation::InvocationContext;
pub use reconcile::{PlanEntry, ReconcileOutcome, ReconcileState, Reconciler};
pub use secrets::{InMemorySecretStore, SecretGateway, SecretStore, SecretString};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "secret-seeder");
    }
}
