//! Object-storage pointer bundles for the pelican and manifest services.

use serde::Serialize;

use super::{require, BuiltBundle, BundleKind, Payload, SecretNamer};
use crate::errors::Result;
use crate::invocation::{G3AutoInputs, StorageInputs};

#[derive(Debug, Serialize)]
struct StoragePointer<'a> {
    bucket_name: &'a str,
    hostname: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aws_access_key_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aws_secret_access_key: Option<&'a str>,
}

/// `{bucket_name, hostname, prefix?}` for the pelican export service.
pub fn build_pelican(namer: &SecretNamer, inputs: &G3AutoInputs) -> Result<BuiltBundle> {
    build(namer, BundleKind::PelicanStorage, inputs, &inputs.pelicanservice, false)
}

/// As [`build_pelican`], plus an access key pair when both halves are supplied.
pub fn build_manifest(namer: &SecretNamer, inputs: &G3AutoInputs) -> Result<BuiltBundle> {
    build(namer, BundleKind::ManifestStorage, inputs, &inputs.manifestservice, true)
}

fn build(
    namer: &SecretNamer,
    kind: BundleKind,
    inputs: &G3AutoInputs,
    storage: &StorageInputs,
    with_credentials: bool,
) -> Result<BuiltBundle> {
    let bucket_name = require(kind, "bucketName", &[storage.bucket_name.as_deref()])?;
    let hostname =
        require(kind, "hostname", &[storage.hostname.as_deref(), inputs.hostname.as_deref()])?;

    // Never fabricate keys: both halves or neither
    let credentials = if with_credentials {
        match (storage.aws_access_key_id.as_deref(), storage.aws_secret_access_key.as_ref()) {
            (Some(id), Some(secret)) if !secret.is_empty() => Some((id, secret.expose_secret())),
            _ => None,
        }
    } else {
        None
    };

    let pointer = StoragePointer {
        bucket_name,
        hostname,
        prefix: storage.prefix.as_deref(),
        aws_access_key_id: credentials.map(|(id, _)| id),
        aws_secret_access_key: credentials.map(|(_, secret)| secret),
    };

    let payload = Payload::Json(serde_json::to_value(pointer)?);
    Ok(BuiltBundle { kind, name: namer.bundle(kind), payload })
}
