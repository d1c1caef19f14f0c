//! AWS Secrets Manager store
//!
//! ## Configuration
//!
//! - `SECRET_SEEDER_REGION` - Optional region (falls back to the default provider chain)
//! - `SECRET_SEEDER_SM_ENDPOINT` - Optional endpoint override (LocalStack and similar)
//!
//! Credentials come from the standard AWS provider chain.
//!
//! ## Semantics
//!
//! - `DescribeSecret` decides existence. A secret with a deletion date is
//!   still reported, because Secrets Manager keeps the name reserved until
//!   the recovery window closes.
//! - `CreateSecret` failing with `ResourceExistsException` means another pass
//!   won the race and is reported as [`CreateOutcome::AlreadyExists`].

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::config::Region;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::types::Tag;
use aws_sdk_secretsmanager::Client;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::store::{CreateOutcome, NewSecret, SecretState, SecretStore, SecretStoreType};
use crate::config::SeederConfig;
use crate::errors::{Result, SeederError};

/// Secrets Manager backed store.
#[derive(Clone)]
pub struct AwsSecretStore {
    client: Client,
}

impl std::fmt::Debug for AwsSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretStore").field("client", &"[SecretsManager]").finish()
    }
}

impl AwsSecretStore {
    /// Wrap an already configured client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the shared AWS configuration plus seeder overrides.
    pub async fn from_config(config: &SeederConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = config.region.clone() {
            loader = loader.region(Region::new(region));
        }
        let shared_config = loader.load().await;

        let mut builder = aws_sdk_secretsmanager::config::Builder::from(&shared_config);
        if let Some(endpoint) = config.secrets_endpoint.as_deref() {
            builder = builder.endpoint_url(endpoint);
        }

        info!(
            region = ?shared_config.region().map(|r| r.to_string()),
            endpoint_override = config.secrets_endpoint.is_some(),
            "Initialized AWS Secrets Manager store"
        );

        Self::new(Client::from_conf(builder.build()))
    }
}

fn unavailable<E>(operation: &str, err: E) -> SeederError
where
    E: std::error::Error,
{
    SeederError::store_unavailable(operation, DisplayErrorContext(&err).to_string())
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    async fn describe_secret(&self, name: &str) -> Result<Option<SecretState>> {
        match self.client.describe_secret().secret_id(name).send().await {
            Ok(output) => {
                let state = if output.deleted_date().is_some() {
                    SecretState::PendingDeletion
                } else {
                    SecretState::Active
                };
                debug!(secret = %name, ?state, "Secret present");
                Ok(Some(state))
            }
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_resource_not_found_exception()) {
                    Ok(None)
                } else {
                    Err(unavailable("describe_secret", err))
                }
            }
        }
    }

    async fn get_secret_string(&self, name: &str) -> Result<Option<String>> {
        match self.client.get_secret_value().secret_id(name).send().await {
            Ok(output) => {
                if let Some(value) = output.secret_string() {
                    return Ok(Some(value.to_string()));
                }
                match output.secret_binary() {
                    Some(blob) => String::from_utf8(blob.as_ref().to_vec()).map(Some).map_err(|e| {
                        SeederError::invalid_input(format!(
                            "secret {} holds non UTF-8 binary data: {}",
                            name, e
                        ))
                    }),
                    None => Ok(None),
                }
            }
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_resource_not_found_exception()) {
                    Ok(None)
                } else {
                    Err(unavailable("get_secret_value", err))
                }
            }
        }
    }

    async fn create_secret(&self, secret: NewSecret<'_>) -> Result<CreateOutcome> {
        let request = self
            .client
            .create_secret()
            .name(secret.name)
            .secret_string(secret.payload)
            .set_kms_key_id(secret.kms_key_id.map(str::to_string));

        match request.send().await {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_resource_exists_exception()) {
                    Ok(CreateOutcome::AlreadyExists)
                } else {
                    Err(unavailable("create_secret", err))
                }
            }
        }
    }

    async fn tag_secret(&self, name: &str, tags: &BTreeMap<String, String>) -> Result<()> {
        let tags: Vec<Tag> =
            tags.iter().map(|(key, value)| Tag::builder().key(key).value(value).build()).collect();

        self.client
            .tag_resource()
            .secret_id(name)
            .set_tags(Some(tags))
            .send()
            .await
            .map(|_| ())
            .map_err(|err| unavailable("tag_resource", err))
    }

    fn store_type(&self) -> SecretStoreType {
        SecretStoreType::AwsSecretsManager
    }
}
