//! Common test utilities for all integration tests.
//!
//! Provides an in-memory store wired into a reconciler, canned invocation
//! properties and payload helpers.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use serde_json::{json, Value};
use std::sync::Arc;

use secret_seeder::secrets::GatewayOptions;
use secret_seeder::{InMemorySecretStore, Reconciler, ResourceEvent, SecretGateway};

pub const MASTER_SECRET: &str = "omix3-test-master-db";

/// A reconciler over a fresh in-memory store; the store handle is returned
/// for seeding and inspection.
pub fn memory_reconciler() -> (Arc<InMemorySecretStore>, Reconciler) {
    let store = Arc::new(InMemorySecretStore::new());
    let reconciler = Reconciler::new(SecretGateway::new(store.clone()));
    (store, reconciler)
}

pub fn reconciler_with(store: &Arc<InMemorySecretStore>, options: GatewayOptions) -> Reconciler {
    Reconciler::new(SecretGateway::with_options(store.clone(), options))
}

/// Store holding the master coordinate secret `{host: db.local, port: 5432}`
pub fn seeded_store() -> Arc<InMemorySecretStore> {
    let store = Arc::new(InMemorySecretStore::new());
    store.seed(MASTER_SECRET, r#"{"host":"db.local","port":5432}"#);
    store
}

/// `omix3`/`test` with two services, 10-character passwords and no optional flags
pub fn omix3_properties() -> Value {
    json!({
        "project": "omix3",
        "envName": "test",
        "services": ["index", "fence"],
        "masterSecretName": MASTER_SECRET,
        "passwordLength": 10,
        "create": {},
    })
}

pub fn event(request_type: &str, properties: Value) -> ResourceEvent {
    let raw = json!({
        "RequestType": request_type,
        "RequestId": "request-1",
        "StackId": "arn:aws:cloudformation:us-east-1:123456789012:stack/omix3/abc",
        "LogicalResourceId": "G3AutoSecrets",
        "ResourceType": "Custom::G3AutoSecrets",
        "ResourceProperties": properties,
    });
    ResourceEvent::from_json(&raw.to_string()).expect("valid test event")
}

/// Parsed JSON payload of a stored secret
pub fn payload(store: &InMemorySecretStore, name: &str) -> Value {
    let raw = store.payload(name).unwrap_or_else(|| panic!("secret {name} missing"));
    serde_json::from_str(&raw).unwrap_or_else(|e| panic!("secret {name} is not JSON: {e}"))
}

/// Every stored payload, sorted by name
pub fn snapshot(store: &InMemorySecretStore) -> Vec<(String, String)> {
    let mut names = store.names();
    names.sort();
    names
        .into_iter()
        .map(|name| {
            let payload = store.payload(&name).unwrap_or_default();
            (name, payload)
        })
        .collect()
}
