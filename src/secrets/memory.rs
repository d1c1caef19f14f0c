//! In-memory secret store.
//!
//! Backs the test suite and the CLI's `--memory` mode. Creation goes through
//! `DashMap`'s entry API, so concurrent passes sharing one instance race the
//! same way they would against the real store: exactly one create wins and
//! the rest see [`CreateOutcome::AlreadyExists`].
//!
//! Failure injection (`set_unavailable`, `set_fail_tagging`, `set_latency`)
//! lets tests exercise the gateway's error and timeout paths.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use super::store::{CreateOutcome, NewSecret, SecretState, SecretStore, SecretStoreType};
use crate::errors::{Result, SeederError};

#[derive(Debug, Clone)]
struct StoredSecret {
    payload: String,
    kms_key_id: Option<String>,
    tags: BTreeMap<String, String>,
    state: SecretState,
}

/// Process-local secret store.
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: DashMap<String, StoredSecret>,
    unavailable: AtomicBool,
    fail_tagging: AtomicBool,
    latency_ms: AtomicU64,
    create_calls: AtomicUsize,
    tag_calls: AtomicUsize,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a secret directly, bypassing create semantics.
    pub fn seed(&self, name: impl Into<String>, payload: impl Into<String>) {
        self.secrets.insert(
            name.into(),
            StoredSecret {
                payload: payload.into(),
                kms_key_id: None,
                tags: BTreeMap::new(),
                state: SecretState::Active,
            },
        );
    }

    /// Mark a seeded secret as scheduled for deletion.
    pub fn schedule_deletion(&self, name: &str) {
        if let Some(mut secret) = self.secrets.get_mut(name) {
            secret.state = SecretState::PendingDeletion;
        }
    }

    pub fn payload(&self, name: &str) -> Option<String> {
        self.secrets.get(name).map(|s| s.payload.clone())
    }

    pub fn tags(&self, name: &str) -> Option<BTreeMap<String, String>> {
        self.secrets.get(name).map(|s| s.tags.clone())
    }

    pub fn kms_key_id(&self, name: &str) -> Option<String> {
        self.secrets.get(name).and_then(|s| s.kms_key_id.clone())
    }

    /// Sorted names of every stored secret.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.secrets.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Number of `create_secret` calls, including ones that lost a race.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn tag_calls(&self) -> usize {
        self.tag_calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_fail_tagging(&self, fail: bool) {
        self.fail_tagging.store(fail, Ordering::SeqCst);
    }

    /// Delay applied before every call.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms.store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    async fn enter(&self, operation: &str) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SeederError::store_unavailable(
                operation,
                "in-memory store marked unavailable",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn describe_secret(&self, name: &str) -> Result<Option<SecretState>> {
        self.enter("describe_secret").await?;
        Ok(self.secrets.get(name).map(|s| s.state))
    }

    async fn get_secret_string(&self, name: &str) -> Result<Option<String>> {
        self.enter("get_secret_value").await?;
        match self.secrets.get(name) {
            Some(secret) if secret.state == SecretState::PendingDeletion => {
                Err(SeederError::store_unavailable(
                    "get_secret_value",
                    format!("secret {} is scheduled for deletion", name),
                ))
            }
            Some(secret) => Ok(Some(secret.payload.clone())),
            None => Ok(None),
        }
    }

    async fn create_secret(&self, secret: NewSecret<'_>) -> Result<CreateOutcome> {
        self.enter("create_secret").await?;
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        match self.secrets.entry(secret.name.to_string()) {
            Entry::Occupied(_) => Ok(CreateOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(StoredSecret {
                    payload: secret.payload.to_string(),
                    kms_key_id: secret.kms_key_id.map(str::to_string),
                    tags: BTreeMap::new(),
                    state: SecretState::Active,
                });
                Ok(CreateOutcome::Created)
            }
        }
    }

    async fn tag_secret(&self, name: &str, tags: &BTreeMap<String, String>) -> Result<()> {
        self.enter("tag_resource").await?;
        self.tag_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_tagging.load(Ordering::SeqCst) {
            return Err(SeederError::store_unavailable("tag_resource", "tagging rejected"));
        }

        let mut secret = self.secrets.get_mut(name).ok_or_else(|| {
            SeederError::store_unavailable("tag_resource", format!("secret {} not found", name))
        })?;
        secret.tags.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    fn store_type(&self) -> SecretStoreType {
        SecretStoreType::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_secret<'a>(name: &'a str, payload: &'a str) -> NewSecret<'a> {
        NewSecret { name, payload, kms_key_id: None }
    }

    #[tokio::test]
    async fn test_create_then_collide() {
        let store = InMemorySecretStore::new();

        let first = store.create_secret(new_secret("a", "one")).await.unwrap();
        let second = store.create_secret(new_secret("a", "two")).await.unwrap();

        assert_eq!(first, CreateOutcome::Created);
        assert_eq!(second, CreateOutcome::AlreadyExists);
        assert_eq!(store.payload("a").as_deref(), Some("one"));
        assert_eq!(store.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_pending_deletion_is_described_but_unreadable() {
        let store = InMemorySecretStore::new();
        store.seed("gone", "{}");
        store.schedule_deletion("gone");

        assert_eq!(
            store.describe_secret("gone").await.unwrap(),
            Some(SecretState::PendingDeletion)
        );
        assert!(store.get_secret_string("gone").await.is_err());
        assert_eq!(store.describe_secret("never").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = InMemorySecretStore::new();
        store.set_unavailable(true);

        let err = store.describe_secret("x").await.unwrap_err();
        assert!(matches!(err, SeederError::StoreUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_tag_missing_secret_fails() {
        let store = InMemorySecretStore::new();
        let tags = BTreeMap::from([("env".to_string(), "test".to_string())]);

        assert!(store.tag_secret("missing", &tags).await.is_err());
    }
}
