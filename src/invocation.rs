//! # Invocation Context
//!
//! Typed view of a custom resource's `ResourceProperties`. CloudFormation
//! passes every scalar property as a string, so numbers and booleans are
//! accepted either as JSON scalars or as their string spelling, and empty
//! strings are treated as absent.
//!
//! Bundle-specific inputs live in per-bundle structs under [`G3AutoInputs`];
//! each builder checks its own preconditions when it runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::bundles::BundleKind;
use crate::errors::{Result, SeederError};
use crate::random::DEFAULT_SIGNING_KEY_BITS;
use crate::secrets::SecretString;

/// Default generated password length
pub const DEFAULT_PASSWORD_LENGTH: usize = 24;

fn default_password_length() -> usize {
    DEFAULT_PASSWORD_LENGTH
}

fn default_signing_key_bits() -> usize {
    DEFAULT_SIGNING_KEY_BITS
}

fn enabled() -> bool {
    true
}

/// Inputs to one reconciliation pass
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InvocationContext {
    #[validate(length(min = 1, message = "project cannot be empty"))]
    pub project: String,

    #[validate(length(min = 1, message = "envName cannot be empty"))]
    pub env_name: String,

    /// Secret holding `{host, port}` for every per-service credential
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub master_secret_name: Option<String>,

    /// Services that get a database credential, in order
    #[serde(default)]
    pub services: Vec<String>,

    #[serde(default = "default_password_length", deserialize_with = "lenient::usize")]
    #[validate(range(min = 1, max = 4096, message = "passwordLength must be between 1 and 4096"))]
    pub password_length: usize,

    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub encryption_key_id: Option<String>,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub db_host_override: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub db_port_override: Option<String>,

    #[serde(default)]
    pub create: CreateFlags,

    #[serde(default)]
    pub g3auto: G3AutoInputs,

    /// Replaces the default service-token users
    #[serde(default)]
    pub indexd_service_users: Option<Vec<String>>,

    /// Explicit tokens, highest priority in the service-token bundle
    #[serde(default)]
    pub indexd_service_static: BTreeMap<String, SecretString>,

    #[serde(default = "default_signing_key_bits", deserialize_with = "lenient::usize")]
    #[validate(range(
        min = 1024,
        max = 8192,
        message = "signingKeyBits must be between 1024 and 8192"
    ))]
    pub signing_key_bits: usize,
}

impl InvocationContext {
    /// Parse and validate a `ResourceProperties` object.
    pub fn from_properties(properties: &serde_json::Value) -> Result<Self> {
        let context: Self = serde_json::from_value(properties.clone()).map_err(|e| {
            SeederError::invalid_input(format!("invalid resource properties: {}", e))
        })?;
        context.validate()?;
        Ok(context)
    }

    /// Minimal context for a project/env with every optional bundle disabled
    /// except the service tokens.
    pub fn new(project: impl Into<String>, env_name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            env_name: env_name.into(),
            master_secret_name: None,
            services: Vec::new(),
            password_length: DEFAULT_PASSWORD_LENGTH,
            encryption_key_id: None,
            tags: BTreeMap::new(),
            db_host_override: None,
            db_port_override: None,
            create: CreateFlags::default(),
            g3auto: G3AutoInputs::default(),
            indexd_service_users: None,
            indexd_service_static: BTreeMap::new(),
            signing_key_bits: DEFAULT_SIGNING_KEY_BITS,
        }
    }

    /// Run the field-level validation rules.
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(SeederError::from)
    }
}

/// Feature flags gating the optional bundles
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFlags {
    #[serde(default, deserialize_with = "lenient::bool")]
    pub metadata_g3auto: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub wts_g3auto: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub pelicanservice_g3auto: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub manifestservice_g3auto: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub audit_g3auto: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub ssjdispatcher_creds: bool,
    /// On unless explicitly disabled
    #[serde(default = "enabled", deserialize_with = "lenient::bool")]
    pub indexd_service: bool,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub fence_jwt_key: bool,
}

impl Default for CreateFlags {
    fn default() -> Self {
        Self {
            metadata_g3auto: false,
            wts_g3auto: false,
            pelicanservice_g3auto: false,
            manifestservice_g3auto: false,
            audit_g3auto: false,
            ssjdispatcher_creds: false,
            indexd_service: true,
            fence_jwt_key: false,
        }
    }
}

impl CreateFlags {
    pub fn is_enabled(&self, kind: BundleKind) -> bool {
        match kind {
            BundleKind::DatabaseCredential => true,
            BundleKind::Metadata => self.metadata_g3auto,
            BundleKind::IdentityBroker => self.wts_g3auto,
            BundleKind::PelicanStorage => self.pelicanservice_g3auto,
            BundleKind::ManifestStorage => self.manifestservice_g3auto,
            BundleKind::Audit => self.audit_g3auto,
            BundleKind::DispatcherJob => self.ssjdispatcher_creds,
            BundleKind::ServiceTokens => self.indexd_service,
            BundleKind::SigningKey => self.fence_jwt_key,
        }
    }

    /// Enable or disable one bundle.
    pub fn set(&mut self, kind: BundleKind, on: bool) {
        let flag = match kind {
            BundleKind::DatabaseCredential => return,
            BundleKind::Metadata => &mut self.metadata_g3auto,
            BundleKind::IdentityBroker => &mut self.wts_g3auto,
            BundleKind::PelicanStorage => &mut self.pelicanservice_g3auto,
            BundleKind::ManifestStorage => &mut self.manifestservice_g3auto,
            BundleKind::Audit => &mut self.audit_g3auto,
            BundleKind::DispatcherJob => &mut self.ssjdispatcher_creds,
            BundleKind::ServiceTokens => &mut self.indexd_service,
            BundleKind::SigningKey => &mut self.fence_jwt_key,
        };
        *flag = on;
    }
}

/// Bundle-specific optional inputs
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct G3AutoInputs {
    /// Public hostname shared by every bundle unless overridden
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub hostname: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub region: Option<String>,
    #[serde(default)]
    pub metadata: MetadataInputs,
    #[serde(default)]
    pub wts: IdentityBrokerInputs,
    #[serde(default)]
    pub pelicanservice: StorageInputs,
    #[serde(default)]
    pub manifestservice: StorageInputs,
    #[serde(default)]
    pub audit: AuditInputs,
    #[serde(default)]
    pub ssjdispatcher: DispatcherInputs,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataInputs {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityBrokerInputs {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub hostname: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub wts_base_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub fence_base_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub oidc_client_id: Option<String>,
    #[serde(default)]
    pub oidc_client_secret: Option<SecretString>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInputs {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub hostname: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub bucket_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub prefix: Option<String>,
    /// Only honoured by the manifestservice bundle, and only with the secret key
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub aws_access_key_id: Option<String>,
    #[serde(default)]
    pub aws_secret_access_key: Option<SecretString>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditInputs {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub queue_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherInputs {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub queue_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub region: Option<String>,
    /// Upload bucket the job pattern watches
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub bucket_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub pattern: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub indexd_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub indexd_username: Option<String>,
    #[serde(default)]
    pub indexd_password: Option<SecretString>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub metadata_service_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub metadata_service_username: Option<String>,
    #[serde(default)]
    pub metadata_service_password: Option<SecretString>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub service_account_name: Option<String>,
    #[serde(default)]
    pub resource_requests: Option<ResourceRequests>,
}

/// Kubernetes resource requests for the indexing job
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResourceRequests {
    pub cpu: String,
    pub memory: String,
}

impl Default for ResourceRequests {
    fn default() -> Self {
        Self { cpu: "0.1".to_string(), memory: "0.1Gi".to_string() }
    }
}

/// Deserializers tolerant of CloudFormation's stringified scalars.
mod lenient {
    use serde::de::{Deserializer, Error};
    use serde::Deserialize;
    use serde_json::Value;

    pub fn bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" | "" => Ok(false),
                other => Err(D::Error::custom(format!("expected a boolean, got '{}'", other))),
            },
            other => Err(D::Error::custom(format!("expected a boolean, got {}", other))),
        }
    }

    pub fn usize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| D::Error::custom(format!("expected a positive integer, got {}", n))),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("expected a positive integer, got '{}'", s))),
            other => Err(D::Error::custom(format!("expected a positive integer, got {}", other))),
        }
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            other => Err(D::Error::custom(format!("expected a string, got {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_properties_use_defaults() {
        let ctx = InvocationContext::from_properties(&json!({
            "project": "omix3",
            "envName": "test",
        }))
        .unwrap();

        assert_eq!(ctx.password_length, DEFAULT_PASSWORD_LENGTH);
        assert!(ctx.services.is_empty());
        assert!(ctx.create.is_enabled(BundleKind::ServiceTokens));
        assert!(!ctx.create.is_enabled(BundleKind::SigningKey));
        assert!(ctx.indexd_service_users.is_none());
    }

    #[test]
    fn test_cloudformation_stringified_scalars() {
        let ctx = InvocationContext::from_properties(&json!({
            "ServiceToken": "arn:aws:lambda:us-east-1:123:function:seed",
            "project": "omix3",
            "envName": "test",
            "passwordLength": "10",
            "dbPortOverride": 5432,
            "dbHostOverride": "",
            "create": {"metadataG3auto": "true", "indexdService": "false", "auditG3auto": true},
        }))
        .unwrap();

        assert_eq!(ctx.password_length, 10);
        assert_eq!(ctx.db_port_override.as_deref(), Some("5432"));
        assert!(ctx.db_host_override.is_none());
        assert!(ctx.create.metadata_g3auto);
        assert!(ctx.create.audit_g3auto);
        assert!(!ctx.create.indexd_service);
    }

    #[test]
    fn test_nested_g3auto_inputs() {
        let ctx = InvocationContext::from_properties(&json!({
            "project": "omix3",
            "envName": "test",
            "g3auto": {
                "hostname": "data.example.org",
                "manifestservice": {"bucketName": "manifests", "awsAccessKeyId": "AKIA"},
                "ssjdispatcher": {
                    "queueUrl": "https://sqs.us-east-1.amazonaws.com/1/uploads",
                    "resourceRequests": {"cpu": "0.5", "memory": "1Gi"}
                },
                "wts": {"oidcClientSecret": "s3cr3t"}
            },
            "indexdServiceStatic": {"fence": "static"},
        }))
        .unwrap();

        assert_eq!(ctx.g3auto.hostname.as_deref(), Some("data.example.org"));
        assert_eq!(ctx.g3auto.manifestservice.bucket_name.as_deref(), Some("manifests"));
        assert!(ctx.g3auto.manifestservice.aws_secret_access_key.is_none());
        assert_eq!(
            ctx.g3auto.ssjdispatcher.resource_requests,
            Some(ResourceRequests { cpu: "0.5".into(), memory: "1Gi".into() })
        );
        assert!(!format!("{:?}", ctx).contains("s3cr3t"));
        assert_eq!(ctx.indexd_service_static["fence"].expose_secret(), "static");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let err = InvocationContext::from_properties(&json!({
            "project": "",
            "envName": "test",
        }))
        .unwrap_err();
        assert!(matches!(err, SeederError::Config(_)));

        let err = InvocationContext::from_properties(&json!({
            "project": "omix3",
            "envName": "test",
            "passwordLength": "ten",
        }))
        .unwrap_err();
        assert!(matches!(err, SeederError::InvalidInput { .. }));

        let err = InvocationContext::from_properties(&json!({
            "project": "omix3",
            "envName": "test",
            "create": {"wtsG3auto": "maybe"},
        }))
        .unwrap_err();
        assert!(err.to_string().contains("expected a boolean"));
    }

    #[test]
    fn test_flag_set_roundtrip() {
        let mut flags = CreateFlags::default();
        for kind in BundleKind::OPTIONAL_ORDER {
            flags.set(kind, true);
            assert!(flags.is_enabled(kind));
        }
        flags.set(BundleKind::ServiceTokens, false);
        assert!(!flags.is_enabled(BundleKind::ServiceTokens));
    }
}
