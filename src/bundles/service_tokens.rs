//! Shared service-token bundle: one flat `{user: token}` map that lets the
//! index service authenticate its callers.
//!
//! Tokens are not generated here. Each user's token must equal a password
//! some other secret already holds, so the builder resolves it from the pass
//! cache first and reads the existing secret second. Users with no source
//! get [`PLACEHOLDER`].

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::extract::{
    extract_admin_password_from_metadata_bundle, extract_password_from_dispatcher_bundle,
};
use super::{BuiltBundle, BundleKind, PassCache, Payload, SecretNamer, PLACEHOLDER};
use crate::errors::{Result, SeederError};
use crate::secrets::{SecretGateway, SecretState, SecretString};

/// Users required when the invocation does not name its own
pub const DEFAULT_USERS: [&str; 4] = ["sheepdog", "fence", "ssj", "gateway"];

/// Read access to secrets persisted by earlier passes.
#[async_trait]
pub trait SecretReader: Send + Sync {
    /// Parsed JSON payload, or `None` when the secret does not exist or is
    /// scheduled for deletion.
    async fn read_existing(&self, name: &str) -> Result<Option<Value>>;
}

#[async_trait]
impl SecretReader for SecretGateway {
    async fn read_existing(&self, name: &str) -> Result<Option<Value>> {
        match self.state(name).await? {
            None => Ok(None),
            Some(SecretState::PendingDeletion) => {
                // The value is unreadable until the recovery window closes
                warn!(secret = %name, "Token source is scheduled for deletion; ignoring it");
                Ok(None)
            }
            Some(SecretState::Active) => self.try_read_json(name).await,
        }
    }
}

/// Where a user's token comes from when no static value is given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenSource {
    DbPassword,
    DispatcherIndexing,
    MetadataAdmin,
    Unknown,
}

impl TokenSource {
    fn for_user(user: &str) -> Self {
        match user {
            "sheepdog" | "fence" => Self::DbPassword,
            "ssj" => Self::DispatcherIndexing,
            "gateway" => Self::MetadataAdmin,
            _ => Self::Unknown,
        }
    }
}

/// Inputs for one service-token build
#[derive(Debug, Clone, Copy)]
pub struct TokenRequest<'a> {
    /// `None` means [`DEFAULT_USERS`]
    pub users: Option<&'a [String]>,
    pub static_tokens: &'a BTreeMap<String, SecretString>,
}

pub async fn build(
    namer: &SecretNamer,
    request: TokenRequest<'_>,
    cache: &PassCache,
    reader: &dyn SecretReader,
) -> Result<BuiltBundle> {
    let users: Vec<&str> = match request.users {
        Some(users) => users.iter().map(String::as_str).collect(),
        None => DEFAULT_USERS.to_vec(),
    };

    let mut tokens = Map::new();
    for user in users {
        let token = match request.static_tokens.get(user).filter(|t| !t.is_empty()) {
            Some(token) => Some(token.expose_secret().to_string()),
            None => resolve(namer, user, cache, reader).await?,
        };

        let token = token.unwrap_or_else(|| {
            warn!(user = %user, "No token source found; writing placeholder");
            PLACEHOLDER.to_string()
        });
        tokens.insert(user.to_string(), Value::String(token));
    }

    Ok(BuiltBundle {
        kind: BundleKind::ServiceTokens,
        name: namer.bundle(BundleKind::ServiceTokens),
        payload: Payload::Json(Value::Object(tokens)),
    })
}

async fn resolve(
    namer: &SecretNamer,
    user: &str,
    cache: &PassCache,
    reader: &dyn SecretReader,
) -> Result<Option<String>> {
    let source = TokenSource::for_user(user);
    let cached = match source {
        TokenSource::DbPassword => cache.db_password(user),
        TokenSource::DispatcherIndexing => cache.dispatcher_indexing(),
        TokenSource::MetadataAdmin => cache.metadata_admin(),
        TokenSource::Unknown => return Ok(None),
    };
    if let Some(password) = cached {
        debug!(user = %user, source = ?source, "Token resolved from this pass");
        return Ok(Some(password.expose_secret().to_string()));
    }

    let name = match source {
        TokenSource::DbPassword => namer.service(user),
        TokenSource::DispatcherIndexing => namer.bundle(BundleKind::DispatcherJob),
        TokenSource::MetadataAdmin => namer.bundle(BundleKind::Metadata),
        TokenSource::Unknown => return Ok(None),
    };

    let Some(existing) = read_tolerant(reader, &name).await? else {
        return Ok(None);
    };

    let token = match source {
        TokenSource::DbPassword => {
            existing.get("password").and_then(Value::as_str).map(str::to_string)
        }
        TokenSource::DispatcherIndexing => extract_password_from_dispatcher_bundle(&existing),
        TokenSource::MetadataAdmin => extract_admin_password_from_metadata_bundle(&existing),
        TokenSource::Unknown => None,
    };
    debug!(user = %user, secret = %name, found = token.is_some(), "Token read through");
    Ok(token.filter(|t| !t.is_empty()))
}

/// A malformed existing secret counts as no source; store failures propagate.
async fn read_tolerant(reader: &dyn SecretReader, name: &str) -> Result<Option<Value>> {
    match reader.read_existing(name).await {
        Ok(value) => Ok(value),
        Err(SeederError::Serialization { context, .. }) => {
            warn!(secret = %name, reason = %context, "Ignoring unreadable existing secret");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
