//! Audit service configuration bundle.

use serde::Serialize;
use serde_json::json;

use super::{require, resolve_queue_region, BuiltBundle, BundleKind, Payload, SecretNamer};
use crate::errors::{Result, SeederError};
use crate::invocation::G3AutoInputs;

/// Key the rendered YAML is stored under
pub const CONFIG_FILE: &str = "audit-service-config.yaml";

// Field order here is the order in the rendered YAML
#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct AuditServiceConfig<'a> {
    pull_from_queue: bool,
    queue_config: QueueConfig<'a>,
}

#[derive(Debug, Serialize)]
struct QueueConfig<'a> {
    #[serde(rename = "type")]
    queue_type: &'a str,
    sqs_url: &'a str,
    region: &'a str,
}

/// Render the audit service YAML for an SQS queue.
pub fn render_config(queue_url: &str, region: &str) -> Result<String> {
    let config = AuditServiceConfig {
        pull_from_queue: true,
        queue_config: QueueConfig { queue_type: "aws_sqs", sqs_url: queue_url, region },
    };
    serde_yaml::to_string(&config)
        .map_err(|e| SeederError::serialization("Failed to render audit service config", e))
}

pub fn build(namer: &SecretNamer, inputs: &G3AutoInputs) -> Result<BuiltBundle> {
    let audit = &inputs.audit;
    let queue_url = require(BundleKind::Audit, "queueUrl", &[audit.queue_url.as_deref()])?;
    let region =
        resolve_queue_region(&[audit.region.as_deref(), inputs.region.as_deref()], queue_url);

    let yaml = render_config(queue_url, &region)?;

    Ok(BuiltBundle {
        kind: BundleKind::Audit,
        name: namer.bundle(BundleKind::Audit),
        payload: Payload::Json(json!({ CONFIG_FILE: yaml })),
    })
}
