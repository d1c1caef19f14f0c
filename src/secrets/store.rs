//! Secret store trait and types
//!
//! Defines the narrow interface the gateway needs from an external secret
//! store. Backends translate their own "not found" and "already exists"
//! signals into `None` and [`CreateOutcome::AlreadyExists`]; every other
//! failure is a [`SeederError::StoreUnavailable`](crate::errors::SeederError).

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Type of secret store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretStoreType {
    /// AWS Secrets Manager
    AwsSecretsManager,
    /// Process-local map (tests and offline runs)
    Memory,
}

impl SecretStoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwsSecretsManager => "aws_secrets_manager",
            Self::Memory => "memory",
        }
    }
}

impl FromStr for SecretStoreType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "aws_secrets_manager" | "aws" => Ok(Self::AwsSecretsManager),
            "memory" => Ok(Self::Memory),
            _ => Err(format!("Unknown secret store type: {}", s)),
        }
    }
}

impl fmt::Display for SecretStoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of a secret the store knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretState {
    Active,
    /// Scheduled for deletion; the name is still reserved
    PendingDeletion,
}

/// Result of a create call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// The store rejected the create because the name is taken
    AlreadyExists,
}

/// A secret to be created
#[derive(Debug, Clone, Copy)]
pub struct NewSecret<'a> {
    pub name: &'a str,
    /// Stored verbatim as the secret string
    pub payload: &'a str,
    pub kms_key_id: Option<&'a str>,
}

/// Trait for secret store backends
///
/// Implementations must be Send + Sync; one instance is constructed per
/// process and shared by every pass.
#[async_trait]
pub trait SecretStore: Send + Sync + fmt::Debug {
    /// Look up a secret's state without reading its value.
    ///
    /// Returns `Ok(None)` only when the store reports the name as unknown.
    async fn describe_secret(&self, name: &str) -> Result<Option<SecretState>>;

    /// Read the current secret string. `Ok(None)` when the name is unknown.
    async fn get_secret_string(&self, name: &str) -> Result<Option<String>>;

    /// Create a secret. A name collision is reported as
    /// [`CreateOutcome::AlreadyExists`], not as an error.
    async fn create_secret(&self, secret: NewSecret<'_>) -> Result<CreateOutcome>;

    /// Attach tags to an existing secret in a single call.
    async fn tag_secret(&self, name: &str, tags: &BTreeMap<String, String>) -> Result<()>;

    /// Get the backend type identifier
    fn store_type(&self) -> SecretStoreType;
}
