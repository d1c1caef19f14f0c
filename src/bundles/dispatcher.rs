//! Upload dispatcher job configuration bundle.
//!
//! The dispatcher watches an SQS queue of bucket notifications and launches
//! an `indexing` job per matching object. The job needs credentials for the
//! index service and the metadata service; those are never placeholders.

use serde::Serialize;

use super::{require, resolve_queue_region, BuiltBundle, BundleKind, Payload, SecretNamer};
use crate::errors::Result;
use crate::invocation::{G3AutoInputs, ResourceRequests};
use crate::secrets::SecretString;

pub const INDEXING_JOB: &str = "indexing";
pub const DEFAULT_INDEXD_URL: &str = "http://indexd-service/index";
pub const DEFAULT_INDEXD_USERNAME: &str = "ssj";
pub const DEFAULT_METADATA_URL: &str = "http://revproxy-service/mds";
pub const DEFAULT_METADATA_USERNAME: &str = "gateway";
pub const DEFAULT_SERVICE_ACCOUNT: &str = "ssjdispatcher-job-sa";

/// Per-service passwords that back the job's default credentials
#[derive(Debug, Clone)]
pub struct DispatcherPasswords {
    pub indexing: SecretString,
    pub metadata_service: SecretString,
}

#[derive(Debug, Serialize)]
struct DispatcherConfig<'a> {
    region: String,
    queue_url: &'a str,
    #[serde(rename = "JOBS")]
    jobs: Vec<JobConfig<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobConfig<'a> {
    name: &'a str,
    pattern: String,
    image_config: ImageConfig<'a>,
    resource_requests: ResourceRequests,
    service_account_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig<'a> {
    url: &'a str,
    username: &'a str,
    password: &'a str,
    metadata_service: ServiceLogin<'a>,
}

#[derive(Debug, Serialize)]
struct ServiceLogin<'a> {
    url: &'a str,
    username: &'a str,
    password: &'a str,
}

fn explicit(secret: &Option<SecretString>) -> Option<&str> {
    secret.as_ref().map(|s| s.expose_secret()).filter(|s| !s.is_empty())
}

/// Build the bundle. Returns it with the indexing password it embeds.
pub fn build(
    namer: &SecretNamer,
    inputs: &G3AutoInputs,
    passwords: &DispatcherPasswords,
) -> Result<(BuiltBundle, SecretString)> {
    let ssj = &inputs.ssjdispatcher;
    let queue_url = require(BundleKind::DispatcherJob, "queueUrl", &[ssj.queue_url.as_deref()])?;
    let region =
        resolve_queue_region(&[ssj.region.as_deref(), inputs.region.as_deref()], queue_url);

    let pattern = match (ssj.pattern.as_deref(), ssj.bucket_name.as_deref()) {
        (Some(pattern), _) => pattern.to_string(),
        (None, Some(bucket)) => format!("s3://{}/*", bucket),
        (None, None) => "*".to_string(),
    };

    let indexing_password =
        explicit(&ssj.indexd_password).unwrap_or(passwords.indexing.expose_secret());
    let metadata_password = explicit(&ssj.metadata_service_password)
        .unwrap_or(passwords.metadata_service.expose_secret());

    let job = JobConfig {
        name: INDEXING_JOB,
        pattern,
        image_config: ImageConfig {
            url: ssj.indexd_url.as_deref().unwrap_or(DEFAULT_INDEXD_URL),
            username: ssj.indexd_username.as_deref().unwrap_or(DEFAULT_INDEXD_USERNAME),
            password: indexing_password,
            metadata_service: ServiceLogin {
                url: ssj.metadata_service_url.as_deref().unwrap_or(DEFAULT_METADATA_URL),
                username: ssj
                    .metadata_service_username
                    .as_deref()
                    .unwrap_or(DEFAULT_METADATA_USERNAME),
                password: metadata_password,
            },
        },
        resource_requests: ssj.resource_requests.clone().unwrap_or_default(),
        service_account_name: ssj
            .service_account_name
            .as_deref()
            .unwrap_or(DEFAULT_SERVICE_ACCOUNT),
    };

    let config = DispatcherConfig { region, queue_url, jobs: vec![job] };
    let bundle = BuiltBundle {
        kind: BundleKind::DispatcherJob,
        name: namer.bundle(BundleKind::DispatcherJob),
        payload: Payload::Json(serde_json::to_value(config)?),
    };

    Ok((bundle, SecretString::new(indexing_password)))
}
