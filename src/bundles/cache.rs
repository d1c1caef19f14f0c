//! Passwords produced during the current pass.
//!
//! Only values that were actually persisted go in here: a password generated
//! for a secret that turned out to exist already never reached the store, so
//! reusing it elsewhere would desynchronize the two services.

use std::collections::HashMap;

use crate::secrets::SecretString;

#[derive(Debug, Default)]
pub struct PassCache {
    db_passwords: HashMap<String, SecretString>,
    metadata_admin: Option<SecretString>,
    dispatcher_indexing: Option<SecretString>,
}

impl PassCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the password of a per-service credential created this pass.
    pub fn record_db_password(&mut self, service: &str, password: SecretString) {
        self.db_passwords.insert(service.to_string(), password);
    }

    pub fn db_password(&self, service: &str) -> Option<&SecretString> {
        self.db_passwords.get(service)
    }

    /// Record the `gateway` admin password of a metadata bundle created this pass.
    pub fn record_metadata_admin(&mut self, password: SecretString) {
        self.metadata_admin = Some(password);
    }

    pub fn metadata_admin(&self) -> Option<&SecretString> {
        self.metadata_admin.as_ref()
    }

    /// Record the indexing job password of a dispatcher bundle created this pass.
    pub fn record_dispatcher_indexing(&mut self, password: SecretString) {
        self.dispatcher_indexing = Some(password);
    }

    pub fn dispatcher_indexing(&self) -> Option<&SecretString> {
        self.dispatcher_indexing.as_ref()
    }
}
