//! Identity broker (workspace token service) bundle.

use serde::Serialize;

use super::{require, BuiltBundle, BundleKind, Payload, SecretNamer, PLACEHOLDER};
use crate::errors::Result;
use crate::invocation::G3AutoInputs;
use crate::random;

/// Bytes of random key material behind each generated key
const KEY_BYTES: usize = 32;

#[derive(Debug, Serialize)]
struct IdentityBrokerConfig<'a> {
    wts_base_url: String,
    fence_base_url: String,
    encryption_key: &'a str,
    secret_key: &'a str,
    oidc_client_id: &'a str,
    oidc_client_secret: &'a str,
}

pub fn build(namer: &SecretNamer, inputs: &G3AutoInputs) -> Result<BuiltBundle> {
    let wts = &inputs.wts;
    let hostname = require(
        BundleKind::IdentityBroker,
        "hostname",
        &[wts.hostname.as_deref(), inputs.hostname.as_deref()],
    )?;

    let encryption_key = random::generate_random_bytes_base64(KEY_BYTES)?;
    let secret_key = random::generate_random_bytes_base64(KEY_BYTES)?;

    let config = IdentityBrokerConfig {
        wts_base_url: wts
            .wts_base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}/wts/", hostname)),
        fence_base_url: wts
            .fence_base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}/user/", hostname)),
        encryption_key: encryption_key.expose_secret(),
        secret_key: secret_key.expose_secret(),
        oidc_client_id: wts.oidc_client_id.as_deref().unwrap_or(PLACEHOLDER),
        oidc_client_secret: wts
            .oidc_client_secret
            .as_ref()
            .map(|s| s.expose_secret())
            .filter(|s| !s.is_empty())
            .unwrap_or(PLACEHOLDER),
    };

    Ok(BuiltBundle {
        kind: BundleKind::IdentityBroker,
        name: namer.bundle(BundleKind::IdentityBroker),
        payload: Payload::Json(serde_json::to_value(config)?),
    })
}
