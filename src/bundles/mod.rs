//! # Secret Bundles
//!
//! One builder per secret kind. Builders are pure: given typed inputs and the
//! passwords resolved for this pass they return a [`BuiltBundle`] with a
//! deterministic name and a fully formed payload. Persisting is the driver's
//! job, as is deciding which passwords are fresh and which are reused.
//!
//! Secret names are a function of `(project, env, kind)` only:
//!
//! | Kind | Name |
//! |---|---|
//! | per-service database credential | `<project>-<env>-<service>` |
//! | metadata | `<project>-<env>-metadata-g3auto` |
//! | identity broker | `<project>-<env>-wts-g3auto` |
//! | storage pointer (simple) | `<project>-<env>-pelicanservice-g3auto` |
//! | storage pointer (credentials) | `<project>-<env>-manifestservice-g3auto` |
//! | audit | `<project>-<env>-audit-g3auto` |
//! | dispatcher job | `<project>-<env>-ssjdispatcher-creds` |
//! | shared service tokens | `<project>-<env>-indexd-service` |
//! | signing key | `<project>-<env>-fence-jwt-key` |

pub mod audit;
pub mod cache;
pub mod database;
pub mod dispatcher;
pub mod extract;
pub mod identity;
pub mod metadata;
pub mod service_tokens;
pub mod signing;
pub mod storage;

pub use cache::PassCache;
pub use database::DbCoordinates;

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::errors::{Result, SeederError};
use crate::secrets::SecretString;

/// Sentinel written where an operator must supply the real value later
pub const PLACEHOLDER: &str = "REPLACE_ME";

/// Region assumed when neither inputs nor the queue URL name one
pub const DEFAULT_REGION: &str = "us-east-1";

/// The secret kinds a pass can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleKind {
    DatabaseCredential,
    Metadata,
    IdentityBroker,
    PelicanStorage,
    ManifestStorage,
    Audit,
    DispatcherJob,
    ServiceTokens,
    SigningKey,
}

impl BundleKind {
    /// Optional bundles in dependency order. Service tokens read values
    /// produced by the metadata and dispatcher bundles, so they come after.
    pub const OPTIONAL_ORDER: [BundleKind; 8] = [
        BundleKind::Metadata,
        BundleKind::IdentityBroker,
        BundleKind::PelicanStorage,
        BundleKind::ManifestStorage,
        BundleKind::Audit,
        BundleKind::DispatcherJob,
        BundleKind::ServiceTokens,
        BundleKind::SigningKey,
    ];

    /// Name suffix after `<project>-<env>-`; `None` for per-service credentials.
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            Self::DatabaseCredential => None,
            Self::Metadata => Some("metadata-g3auto"),
            Self::IdentityBroker => Some("wts-g3auto"),
            Self::PelicanStorage => Some("pelicanservice-g3auto"),
            Self::ManifestStorage => Some("manifestservice-g3auto"),
            Self::Audit => Some("audit-g3auto"),
            Self::DispatcherJob => Some("ssjdispatcher-creds"),
            Self::ServiceTokens => Some("indexd-service"),
            Self::SigningKey => Some("fence-jwt-key"),
        }
    }

    /// Key of this bundle's flag in the invocation's `create` map
    pub fn flag_name(&self) -> &'static str {
        match self {
            Self::DatabaseCredential => "services",
            Self::Metadata => "metadataG3auto",
            Self::IdentityBroker => "wtsG3auto",
            Self::PelicanStorage => "pelicanserviceG3auto",
            Self::ManifestStorage => "manifestserviceG3auto",
            Self::Audit => "auditG3auto",
            Self::DispatcherJob => "ssjdispatcherCreds",
            Self::ServiceTokens => "indexdService",
            Self::SigningKey => "fenceJwtKey",
        }
    }
}

impl fmt::Display for BundleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix().unwrap_or("service-credential"))
    }
}

/// Derives secret names for one `(project, env)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretNamer {
    project: String,
    env: String,
}

impl SecretNamer {
    pub fn new(project: impl Into<String>, env: impl Into<String>) -> Self {
        Self { project: project.into(), env: env.into() }
    }

    /// Name of a fixed-suffix bundle
    pub fn bundle(&self, kind: BundleKind) -> String {
        match kind.suffix() {
            Some(suffix) => format!("{}-{}-{}", self.project, self.env, suffix),
            None => format!("{}-{}", self.project, self.env),
        }
    }

    /// Name of a per-service database credential
    pub fn service(&self, service: &str) -> String {
        format!("{}-{}-{}", self.project, self.env, service)
    }
}

/// Secret payload as persisted
#[derive(Debug, Clone)]
pub enum Payload {
    /// JSON document, stored serialized
    Json(Value),
    /// Opaque text stored verbatim
    Plain(SecretString),
}

/// A named payload ready for create-if-absent
#[derive(Debug, Clone)]
pub struct BuiltBundle {
    pub kind: BundleKind,
    pub name: String,
    pub payload: Payload,
}

impl BuiltBundle {
    /// The JSON payload, if this bundle has one
    pub fn json(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Json(value) => Some(value),
            Payload::Plain(_) => None,
        }
    }
}

/// First non-empty value among the candidates.
pub(crate) fn first_present<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates.iter().flatten().copied().find(|v| !v.trim().is_empty())
}

/// A precondition: the value must be present and non-empty.
pub(crate) fn require<'a>(
    kind: BundleKind,
    input: &str,
    candidates: &[Option<&'a str>],
) -> Result<&'a str> {
    first_present(candidates).ok_or_else(|| SeederError::missing_input(kind.to_string(), input))
}

/// Region for an SQS-backed bundle: explicit values first, then the region
/// embedded in the queue URL host, then [`DEFAULT_REGION`].
pub(crate) fn resolve_queue_region(explicit: &[Option<&str>], queue_url: &str) -> String {
    if let Some(region) = first_present(explicit) {
        return region.to_string();
    }
    region_from_queue_url(queue_url).unwrap_or_else(|| DEFAULT_REGION.to_string())
}

/// `https://sqs.<region>.amazonaws.com/...` or legacy `https://<region>.queue.amazonaws.com/...`
fn region_from_queue_url(queue_url: &str) -> Option<String> {
    let without_scheme = queue_url.split_once("://").map_or(queue_url, |(_, rest)| rest);
    let host = without_scheme.split('/').next()?;
    let labels: Vec<&str> = host.split('.').collect();

    match labels.as_slice() {
        ["sqs", region, ..] if labels.len() >= 3 => Some(region.to_string()),
        [region, "queue", ..] => Some(region.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bundle_names() {
        let namer = SecretNamer::new("omix3", "test");

        assert_eq!(namer.service("fence"), "omix3-test-fence");
        assert_eq!(namer.bundle(BundleKind::Metadata), "omix3-test-metadata-g3auto");
        assert_eq!(namer.bundle(BundleKind::IdentityBroker), "omix3-test-wts-g3auto");
        assert_eq!(namer.bundle(BundleKind::PelicanStorage), "omix3-test-pelicanservice-g3auto");
        assert_eq!(
            namer.bundle(BundleKind::ManifestStorage),
            "omix3-test-manifestservice-g3auto"
        );
        assert_eq!(namer.bundle(BundleKind::Audit), "omix3-test-audit-g3auto");
        assert_eq!(namer.bundle(BundleKind::DispatcherJob), "omix3-test-ssjdispatcher-creds");
        assert_eq!(namer.bundle(BundleKind::ServiceTokens), "omix3-test-indexd-service");
        assert_eq!(namer.bundle(BundleKind::SigningKey), "omix3-test-fence-jwt-key");
    }

    #[test]
    fn test_queue_region_resolution() {
        let url = "https://sqs.eu-west-2.amazonaws.com/123456789012/audit";
        assert_eq!(resolve_queue_region(&[None], url), "eu-west-2");
        assert_eq!(resolve_queue_region(&[Some(""), Some("us-west-1")], url), "us-west-1");
        assert_eq!(
            resolve_queue_region(&[], "https://ap-south-1.queue.amazonaws.com/1/q"),
            "ap-south-1"
        );
        assert_eq!(resolve_queue_region(&[], "http://localhost:4566/000/q"), DEFAULT_REGION);
    }

    #[test]
    fn test_require_reports_bundle_and_input() {
        let err = require(BundleKind::Audit, "queueUrl", &[None, Some("  ")]).unwrap_err();
        match err {
            SeederError::MissingRequiredInput { bundle, input } => {
                assert_eq!(bundle, "audit-g3auto");
                assert_eq!(input, "queueUrl");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    proptest! {
        #[test]
        fn prop_names_are_pure(project in "[a-z0-9]{1,12}", env in "[a-z0-9]{1,8}") {
            let a = SecretNamer::new(project.clone(), env.clone());
            let b = SecretNamer::new(project.clone(), env.clone());
            for kind in BundleKind::OPTIONAL_ORDER {
                let name = a.bundle(kind);
                prop_assert_eq!(&name, &b.bundle(kind));
                let expected_prefix = format!("{}-{}-", project, env);
                prop_assert!(name.starts_with(&expected_prefix));
            }
        }
    }
}
